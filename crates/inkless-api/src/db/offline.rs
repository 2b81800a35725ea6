//! Offline signature persistence.
//!
//! Entries are never deleted. A failed anchoring attempt updates
//! `error_message` and leaves `sync_status` at `pending`.

use chrono::{DateTime, Utc};
use inkless_core::{OfflineSignatureEntry, SyncStatus};
use sqlx::PgPool;
use uuid::Uuid;

/// Insert a newly ingested entry.
pub async fn insert(pool: &PgPool, entry: &OfflineSignatureEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO offline_signatures (id, doc_hash, pqc_signature, hardware_id, signer_did,
             local_timestamp, sync_status, error_message, created_at, synced_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(entry.id.as_uuid())
    .bind(entry.fingerprint.as_str())
    .bind(&entry.signature)
    .bind(entry.hardware_id.as_str())
    .bind(entry.signer_did.as_str())
    .bind(entry.local_timestamp)
    .bind(entry.sync_status.as_str())
    .bind(entry.error_message.as_deref())
    .bind(entry.created_at)
    .bind(entry.synced_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark every pending entry for `(doc_hash, signer_did)` synced. Returns
/// the number of entries changed.
pub async fn resolve_pending(
    pool: &PgPool,
    doc_hash: &str,
    signer_did: &str,
    synced_at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE offline_signatures
         SET sync_status = $1, synced_at = $2, error_message = NULL
         WHERE doc_hash = $3 AND signer_did = $4 AND sync_status = $5",
    )
    .bind(SyncStatus::Synced.as_str())
    .bind(synced_at)
    .bind(doc_hash)
    .bind(signer_did)
    .bind(SyncStatus::Pending.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Record an anchoring failure. Returns whether the entry exists.
pub async fn record_error(pool: &PgPool, id: Uuid, message: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE offline_signatures SET error_message = $1 WHERE id = $2")
        .bind(message)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Number of entries still pending.
pub async fn count_pending(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM offline_signatures WHERE sync_status = $1")
            .bind(SyncStatus::Pending.as_str())
            .fetch_one(pool)
            .await?;
    Ok(count)
}
