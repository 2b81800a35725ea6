//! Anchoring service behaviour over the in-memory store.

mod common;

use std::sync::Arc;
use std::time::Duration;

use inkless_core::{AuditAction, SignatureStatus, TxReferenceKind};
use inkless_ledger::{AnchorError, LedgerAccess, LedgerMode};
use inkless_registry::{
    AnchorOutcome, AnchoringError, AnchoringService, RequestOrigin, DEFAULT_LEDGER_DEADLINE,
};

use common::{request, AuditFailingStore, Harness, Script};

// ── fallback mode ────────────────────────────────────────────────────

#[tokio::test]
async fn fallback_anchor_then_repeat_is_already_signed() {
    let harness = Harness::fallback();
    let origin = RequestOrigin::from_ip("10.0.0.7");

    let first = harness
        .anchoring
        .anchor(&request("abc123", "did:x:1"), &origin)
        .await
        .unwrap();
    let AnchorOutcome::Anchored(receipt) = &first else {
        panic!("expected a fresh anchor, got {first:?}");
    };
    assert_eq!(receipt.status, SignatureStatus::Anchored);
    assert_eq!(receipt.mode, LedgerMode::Fallback);
    assert_eq!(receipt.tx_reference.kind(), TxReferenceKind::Fallback);
    assert!(receipt.tx_reference.as_str().starts_with("mock-tx-"));

    let second = harness
        .anchoring
        .anchor(&request("abc123", "did:x:1"), &origin)
        .await
        .unwrap();
    assert_eq!(
        second,
        AnchorOutcome::AlreadySigned {
            record_id: receipt.record_id,
            tx_reference: Some(receipt.tx_reference.clone()),
        }
    );
    assert_eq!(harness.store.signature_count(), 1);
}

#[tokio::test]
async fn fallback_references_are_unique_per_anchor() {
    let harness = Harness::fallback();
    let origin = RequestOrigin::default();
    let mut seen = std::collections::HashSet::new();
    for i in 0..50 {
        let outcome = harness
            .anchoring
            .anchor(&request(&format!("doc-{i}"), "did:x:1"), &origin)
            .await
            .unwrap();
        let reference = outcome.tx_reference().unwrap().clone();
        assert!(seen.insert(reference));
    }
}

#[tokio::test]
async fn anchor_appends_audit_entry_with_origin() {
    let harness = Harness::fallback();
    harness
        .anchoring
        .anchor(&request("abc123", "did:x:1"), &RequestOrigin::from_ip("10.0.0.7"))
        .await
        .unwrap();

    let audit = harness.store.audit_entries();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, AuditAction::SignatureAnchor);
    assert_eq!(audit[0].ip_address.as_deref(), Some("10.0.0.7"));
    assert_eq!(audit[0].detail["docHash"], "abc123");
    assert_eq!(audit[0].detail["hardwareID"], "hw-1");
    assert_eq!(audit[0].detail["category"], "general_contract");
}

// ── live mode ────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicates_anchor_exactly_once() {
    let (harness, _ledger) = Harness::scripted(Script::Accept, DEFAULT_LEDGER_DEADLINE);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let service = harness.anchoring.clone();
            tokio::spawn(async move {
                service
                    .anchor(&request("abc123", "did:x:1"), &RequestOrigin::default())
                    .await
            })
        })
        .collect();

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap().unwrap());
    }

    let anchored: Vec<_> = outcomes
        .iter()
        .filter(|o| matches!(o, AnchorOutcome::Anchored(_)))
        .collect();
    assert_eq!(anchored.len(), 1);

    let winner = anchored[0].tx_reference().cloned();
    assert!(outcomes.iter().all(|o| o.tx_reference().cloned() == winner));
    assert_eq!(harness.store.signature_count(), 1);
}

#[tokio::test]
async fn distinct_signers_each_anchor_once() {
    let (harness, ledger) = Harness::scripted(Script::Accept, DEFAULT_LEDGER_DEADLINE);
    for signer in ["did:x:1", "did:x:2", "did:x:3"] {
        let outcome = harness
            .anchoring
            .anchor(&request("abc123", signer), &RequestOrigin::default())
            .await
            .unwrap();
        let reference = outcome.tx_reference().unwrap();
        assert_eq!(reference.kind(), TxReferenceKind::Ledger);
    }
    assert_eq!(ledger.calls(), 3);
    assert_eq!(harness.store.signature_count(), 3);
}

#[tokio::test]
async fn ledger_rejection_persists_nothing() {
    let (harness, _ledger) = Harness::scripted(Script::Reject, DEFAULT_LEDGER_DEADLINE);
    let err = harness
        .anchoring
        .anchor(&request("abc123", "did:x:1"), &RequestOrigin::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AnchoringError::LedgerSubmissionFailed(AnchorError::Submission(_))
    ));
    assert_eq!(harness.store.signature_count(), 0);
    assert!(harness.store.audit_entries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn deadline_overrun_persists_nothing() {
    let (harness, _ledger) = Harness::scripted(
        Script::Stall(Duration::from_secs(60)),
        Duration::from_millis(50),
    );
    let err = harness
        .anchoring
        .anchor(&request("abc123", "did:x:1"), &RequestOrigin::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AnchoringError::LedgerSubmissionFailed(AnchorError::DeadlineExceeded { millis: 50 })
    ));
    assert_eq!(harness.store.signature_count(), 0);
}

#[tokio::test]
async fn audit_failure_does_not_undo_the_anchor() {
    let store = AuditFailingStore::default();
    let service = AnchoringService::new(
        Arc::new(store.clone()),
        LedgerAccess::fallback(),
        DEFAULT_LEDGER_DEADLINE,
    );

    let outcome = service
        .anchor(&request("abc123", "did:x:1"), &RequestOrigin::default())
        .await
        .unwrap();
    assert!(matches!(outcome, AnchorOutcome::Anchored(_)));
    assert_eq!(store.inner.signature_count(), 1);
}
