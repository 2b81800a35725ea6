//! # Database Persistence Layer
//!
//! Postgres persistence via SQLx. The database is **optional**: when
//! `DATABASE_URL` is unset the service runs on the in-memory store and state
//! does not survive restarts.
//!
//! [`PgStore`] implements the registry's store traits over the free
//! functions in the submodules, one per table.

pub mod audit;
pub mod offline;
pub mod signatures;
pub mod users;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inkless_core::{
    AuditEntry, Did, DocumentFingerprint, HardwareId, OfflineEntryId, OfflineSignatureEntry,
    SignatureRecord, UserId,
};
use inkless_registry::{IdentityStore, InsertOutcome, SignatureStore, SignerEntry, StoreError};
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connect and run migrations.
///
/// Returns `None` if no URL is configured (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool(database_url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = database_url else {
        tracing::warn!(
            "DATABASE_URL not set: running in-memory only mode. \
             State will not survive restarts."
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Postgres-backed registry store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap a migrated pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn find_or_create_user(
        &self,
        did: &Did,
        hardware_id: &HardwareId,
    ) -> Result<UserId, StoreError> {
        users::find_or_create(&self.pool, did.as_str(), hardware_id.as_str())
            .await
            .map(UserId::from_uuid)
            .map_err(backend)
    }

    async fn find_user(&self, did: &Did) -> Result<Option<UserId>, StoreError> {
        users::find(&self.pool, did.as_str())
            .await
            .map(|id| id.map(UserId::from_uuid))
            .map_err(backend)
    }
}

#[async_trait]
impl SignatureStore for PgStore {
    async fn find_signature(
        &self,
        fingerprint: &DocumentFingerprint,
        signer: UserId,
    ) -> Result<Option<SignatureRecord>, StoreError> {
        let row = signatures::find(&self.pool, fingerprint.as_str(), *signer.as_uuid())
            .await
            .map_err(backend)?;
        row.map(|r| r.into_entry().map(|e| e.record)).transpose()
    }

    async fn insert_signature(&self, record: SignatureRecord) -> Result<InsertOutcome, StoreError> {
        if signatures::insert_if_absent(&self.pool, &record)
            .await
            .map_err(backend)?
        {
            return Ok(InsertOutcome::Inserted(record));
        }

        let existing = self
            .find_signature(&record.fingerprint, record.signer_id)
            .await?
            .ok_or_else(|| {
                StoreError::Backend(format!(
                    "conflict on ({}, {}) but no existing row",
                    record.fingerprint, record.signer_id
                ))
            })?;
        Ok(InsertOutcome::Duplicate(existing))
    }

    async fn signatures_for_document(
        &self,
        fingerprint: &DocumentFingerprint,
    ) -> Result<Vec<SignerEntry>, StoreError> {
        signatures::for_document(&self.pool, fingerprint.as_str())
            .await
            .map_err(backend)?
            .into_iter()
            .map(signatures::SignatureRow::into_entry)
            .collect()
    }

    async fn recent_signatures(&self, limit: usize) -> Result<Vec<SignerEntry>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        signatures::recent(&self.pool, limit)
            .await
            .map_err(backend)?
            .into_iter()
            .map(signatures::SignatureRow::into_entry)
            .collect()
    }

    async fn append_audit(&self, entry: AuditEntry) -> Result<(), StoreError> {
        audit::append(&self.pool, &entry).await.map_err(backend)
    }

    async fn insert_offline(&self, entry: OfflineSignatureEntry) -> Result<(), StoreError> {
        offline::insert(&self.pool, &entry).await.map_err(backend)
    }

    async fn resolve_offline_pending(
        &self,
        fingerprint: &DocumentFingerprint,
        signer_did: &Did,
        synced_at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        offline::resolve_pending(&self.pool, fingerprint.as_str(), signer_did.as_str(), synced_at)
            .await
            .map_err(backend)
    }

    async fn record_offline_error(&self, id: OfflineEntryId, message: &str) -> Result<(), StoreError> {
        if offline::record_error(&self.pool, *id.as_uuid(), message)
            .await
            .map_err(backend)?
        {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                entity: "offline signature",
                id: id.to_string(),
            })
        }
    }

    async fn count_offline_pending(&self) -> Result<u64, StoreError> {
        let count = offline::count_pending(&self.pool).await.map_err(backend)?;
        u64::try_from(count).map_err(|_| StoreError::Corrupt(format!("negative count {count}")))
    }
}
