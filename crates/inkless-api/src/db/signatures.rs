//! Signature record persistence.
//!
//! All functions take a `&PgPool` and operate on the `signature_metadata`
//! table. `(doc_hash, signer_id)` is unique; [`insert_if_absent`] relies on
//! that constraint rather than a prior read.

use chrono::{DateTime, Utc};
use inkless_core::{
    Did, DocumentCategory, DocumentFingerprint, HardwareId, RecordId, SignatureMetadata,
    SignatureRecord, SignatureStatus, TxReference, UserId,
};
use inkless_registry::{SignerEntry, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

const SELECT_JOINED: &str = "SELECT s.id, s.doc_hash, s.signer_id, s.document_category, s.file_name,
        s.file_size, s.mime_type, s.ledger_tx_hash, s.status, s.hardware_id, s.created_at,
        s.updated_at, u.did_address
     FROM signature_metadata s JOIN users u ON u.id = s.signer_id";

/// Insert `record` unless `(doc_hash, signer_id)` exists. Returns whether a
/// row was written.
pub async fn insert_if_absent(pool: &PgPool, record: &SignatureRecord) -> Result<bool, sqlx::Error> {
    let inserted: Option<(Uuid,)> = sqlx::query_as(
        "INSERT INTO signature_metadata (id, doc_hash, signer_id, document_category, file_name,
             file_size, mime_type, ledger_tx_hash, status, hardware_id, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
         ON CONFLICT (doc_hash, signer_id) DO NOTHING
         RETURNING id",
    )
    .bind(record.id.as_uuid())
    .bind(record.fingerprint.as_str())
    .bind(record.signer_id.as_uuid())
    .bind(record.metadata.category.as_str())
    .bind(record.metadata.file_name.as_deref())
    .bind(record.metadata.file_size.as_deref())
    .bind(record.metadata.mime_type.as_deref())
    .bind(record.tx_reference.as_ref().map(TxReference::as_str))
    .bind(record.status.as_str())
    .bind(record.hardware_id.as_str())
    .bind(record.created_at)
    .bind(record.updated_at)
    .fetch_optional(pool)
    .await?;

    Ok(inserted.is_some())
}

/// Fetch the record for `(doc_hash, signer_id)`.
pub async fn find(
    pool: &PgPool,
    doc_hash: &str,
    signer_id: Uuid,
) -> Result<Option<SignatureRow>, sqlx::Error> {
    sqlx::query_as::<_, SignatureRow>(&format!(
        "{SELECT_JOINED} WHERE s.doc_hash = $1 AND s.signer_id = $2"
    ))
    .bind(doc_hash)
    .bind(signer_id)
    .fetch_optional(pool)
    .await
}

/// Every record for `doc_hash`, oldest first.
pub async fn for_document(pool: &PgPool, doc_hash: &str) -> Result<Vec<SignatureRow>, sqlx::Error> {
    sqlx::query_as::<_, SignatureRow>(&format!(
        "{SELECT_JOINED} WHERE s.doc_hash = $1 ORDER BY s.created_at ASC, s.seq ASC"
    ))
    .bind(doc_hash)
    .fetch_all(pool)
    .await
}

/// The `limit` newest records.
pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<SignatureRow>, sqlx::Error> {
    sqlx::query_as::<_, SignatureRow>(&format!(
        "{SELECT_JOINED} ORDER BY s.created_at DESC, s.seq DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Row type for SQLx mapping, joined with the signer's DID.
#[derive(sqlx::FromRow)]
pub struct SignatureRow {
    id: Uuid,
    doc_hash: String,
    signer_id: Uuid,
    document_category: String,
    file_name: Option<String>,
    file_size: Option<String>,
    mime_type: Option<String>,
    ledger_tx_hash: Option<String>,
    status: String,
    hardware_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    did_address: String,
}

impl SignatureRow {
    /// Convert into the domain record and its signer's DID.
    pub fn into_entry(self) -> Result<SignerEntry, StoreError> {
        let corrupt = |e: inkless_core::ValidationError| {
            StoreError::Corrupt(format!("signature {}: {e}", self.id))
        };
        let record = SignatureRecord {
            id: RecordId::from_uuid(self.id),
            fingerprint: DocumentFingerprint::new(self.doc_hash.clone()).map_err(corrupt)?,
            signer_id: UserId::from_uuid(self.signer_id),
            metadata: SignatureMetadata {
                category: DocumentCategory::new(self.document_category.clone()).map_err(corrupt)?,
                file_name: self.file_name.clone(),
                file_size: self.file_size.clone(),
                mime_type: self.mime_type.clone(),
            },
            tx_reference: self
                .ledger_tx_hash
                .clone()
                .map(TxReference::parse)
                .transpose()
                .map_err(corrupt)?,
            status: self
                .status
                .parse::<SignatureStatus>()
                .map_err(corrupt)?,
            hardware_id: HardwareId::new(self.hardware_id.clone()).map_err(corrupt)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        let did = Did::new(self.did_address.clone()).map_err(corrupt)?;
        Ok(SignerEntry { did, record })
    }
}
