//! # Postgres Store Tests
//!
//! Exercise [`PgStore`] against a real database: the `ON CONFLICT` insert
//! path, DID convergence, and offline entry resolution.
//!
//! Requires `DATABASE_URL`; every test returns early without it:
//!   DATABASE_URL=postgres://... cargo test -p inkless-api --test pg_store_test
//!
//! Fingerprints and DIDs are random per run so tests share one database
//! safely. Assertions use pair-scoped results, never the global pending count.

use std::sync::Arc;

use chrono::Utc;
use inkless_api::db::{self, PgStore};
use inkless_core::{
    Did, DocumentFingerprint, HardwareId, OfflineSignatureEntry, SignatureMetadata,
    SignatureRecord, TxReference,
};
use inkless_registry::{IdentityStore, InsertOutcome, SignatureStore, StoreError};
use uuid::Uuid;

async fn pg_store() -> Option<PgStore> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = db::init_pool(Some(&url))
        .await
        .expect("DATABASE_URL is set but the database is unreachable")?;
    Some(PgStore::new(pool))
}

fn unique(prefix: &str) -> String {
    format!("{prefix}{}", Uuid::new_v4().simple())
}

fn fp() -> DocumentFingerprint {
    DocumentFingerprint::new(unique("")).unwrap()
}

fn did() -> Did {
    Did::new(unique("did:test:")).unwrap()
}

fn hw() -> HardwareId {
    HardwareId::new("hw-1").unwrap()
}

#[tokio::test]
async fn users_converge_on_one_id_per_did() {
    let Some(store) = pg_store().await else { return };
    let did = did();

    assert_eq!(store.find_user(&did).await.unwrap(), None);
    let a = store.find_or_create_user(&did, &hw()).await.unwrap();
    let b = store.find_or_create_user(&did, &hw()).await.unwrap();
    assert_eq!(a, b);
    assert_eq!(store.find_user(&did).await.unwrap(), Some(a));
}

#[tokio::test]
async fn conflicting_insert_returns_the_stored_record() {
    let Some(store) = pg_store().await else { return };
    let signer = store.find_or_create_user(&did(), &hw()).await.unwrap();
    let fingerprint = fp();
    let record = |tx| {
        SignatureRecord::anchored(
            fingerprint.clone(),
            signer,
            hw(),
            SignatureMetadata::default(),
            tx,
            Utc::now(),
        )
    };

    let first = record(TxReference::fallback());
    let first_id = first.id;
    let first_tx = first.tx_reference.clone();
    assert!(matches!(
        store.insert_signature(first).await.unwrap(),
        InsertOutcome::Inserted(_)
    ));

    match store.insert_signature(record(TxReference::fallback())).await.unwrap() {
        InsertOutcome::Duplicate(existing) => {
            assert_eq!(existing.id, first_id);
            assert_eq!(existing.tx_reference, first_tx);
        }
        other => panic!("expected a duplicate, got {other:?}"),
    }
    assert_eq!(store.signatures_for_document(&fingerprint).await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_inserts_for_one_pair_store_one_row() {
    let Some(store) = pg_store().await else { return };
    let store = Arc::new(store);
    let signer = store.find_or_create_user(&did(), &hw()).await.unwrap();
    let fingerprint = fp();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            let record = SignatureRecord::anchored(
                fingerprint.clone(),
                signer,
                hw(),
                SignatureMetadata::default(),
                TxReference::fallback(),
                Utc::now(),
            );
            tokio::spawn(async move { store.insert_signature(record).await })
        })
        .collect();

    let mut inserted = 0;
    for task in tasks {
        if let InsertOutcome::Inserted(_) = task.await.unwrap().unwrap() {
            inserted += 1;
        }
    }
    assert_eq!(inserted, 1);
    assert_eq!(store.signatures_for_document(&fingerprint).await.unwrap().len(), 1);
}

#[tokio::test]
async fn resolve_marks_only_pending_entries_of_the_pair() {
    let Some(store) = pg_store().await else { return };
    let (fingerprint, signer) = (fp(), did());
    let entry = |fingerprint: &DocumentFingerprint, signer: &Did| {
        OfflineSignatureEntry::pending(
            fingerprint.clone(),
            vec![1, 2, 3],
            hw(),
            signer.clone(),
            Utc::now(),
            Utc::now(),
        )
    };

    let failed = entry(&fingerprint, &signer);
    let failed_id = failed.id;
    store.insert_offline(failed).await.unwrap();
    store.record_offline_error(failed_id, "ledger timed out").await.unwrap();
    store.insert_offline(entry(&fingerprint, &signer)).await.unwrap();
    store.insert_offline(entry(&fingerprint, &did())).await.unwrap();
    store.insert_offline(entry(&fp(), &signer)).await.unwrap();

    let resolved = store
        .resolve_offline_pending(&fingerprint, &signer, Utc::now())
        .await
        .unwrap();
    assert_eq!(resolved, 2);

    let again = store
        .resolve_offline_pending(&fingerprint, &signer, Utc::now())
        .await
        .unwrap();
    assert_eq!(again, 0);
}

#[tokio::test]
async fn recording_error_on_unknown_entry_is_not_found() {
    let Some(store) = pg_store().await else { return };
    let err = store
        .record_offline_error(inkless_core::OfflineEntryId::new(), "boom")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}
