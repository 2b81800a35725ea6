//! Signer identity persistence.
//!
//! Identities are keyed by DID. Creation is `ON CONFLICT DO NOTHING` on the
//! unique `did_address`, so concurrent first sightings converge on one row.

use sqlx::PgPool;
use uuid::Uuid;

/// Return the id for `did`, inserting a row on first sight.
pub async fn find_or_create(pool: &PgPool, did: &str, hardware_id: &str) -> Result<Uuid, sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (id, did_address, device_pub_key)
         VALUES ($1, $2, $3)
         ON CONFLICT (did_address) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(did)
    .bind(format!("device:{hardware_id}"))
    .execute(pool)
    .await?;

    let (id,): (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE did_address = $1")
        .bind(did)
        .fetch_one(pool)
        .await?;
    Ok(id)
}

/// Return the id for `did`, if the identity exists.
pub async fn find(pool: &PgPool, did: &str) -> Result<Option<Uuid>, sqlx::Error> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE did_address = $1")
        .bind(did)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(id,)| id))
}
