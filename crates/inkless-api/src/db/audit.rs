//! Append-only audit log persistence.

use inkless_core::AuditEntry;
use sqlx::PgPool;

/// Append one entry.
pub async fn append(pool: &PgPool, entry: &AuditEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_logs (user_id, action_type, ip_address, metadata, timestamp)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(entry.user_id.as_uuid())
    .bind(entry.action.as_str())
    .bind(entry.ip_address.as_deref())
    .bind(&entry.detail)
    .bind(entry.timestamp)
    .execute(pool)
    .await?;

    Ok(())
}
