//! Encrypted SSN storage.

use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::schema::SsnRow;
use chrono::Utc;
use customers_core::{mask_ssn, SsnOwnerKind, SsnRecord};
use customers_secrets::{seal, SecretKeeper};
use sqlx::SqlitePool;

/// Repository for the `ssns` table
pub struct SsnRepo;

impl SsnRepo {
    /// Encrypt `ssn` with the at-rest keeper and upsert it for the owner.
    ///
    /// Surrounding whitespace is stripped before masking and encryption.
    /// `ssn` is zeroized whether or not the write succeeds.
    pub async fn save(
        pool: &SqlitePool,
        keeper: &dyn SecretKeeper,
        owner_id: &str,
        owner_kind: SsnOwnerKind,
        ssn: &mut String,
    ) -> PersistenceResult<SsnRecord> {
        trim_in_place(ssn);
        let masked = mask_ssn(ssn);
        let encrypted = seal(keeper, ssn)
            .await
            .map_err(|e| PersistenceError::keeper("saveSSN", e))?;

        let record = SsnRecord {
            owner_id: owner_id.to_string(),
            owner_kind,
            encrypted,
            masked,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO ssns (owner_id, owner_kind, encrypted, masked, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (owner_id, owner_kind) DO UPDATE SET
                encrypted = excluded.encrypted,
                masked = excluded.masked,
                created_at = excluded.created_at
            "#,
        )
        .bind(&record.owner_id)
        .bind(record.owner_kind.as_str())
        .bind(&record.encrypted)
        .bind(&record.masked)
        .bind(record.created_at)
        .execute(pool)
        .await?;

        tracing::debug!(owner_id, owner_kind = %owner_kind, "saved encrypted SSN");
        Ok(record)
    }

    pub async fn get(
        pool: &SqlitePool,
        owner_id: &str,
        owner_kind: SsnOwnerKind,
    ) -> PersistenceResult<SsnRecord> {
        sqlx::query_as::<_, SsnRow>("SELECT * FROM ssns WHERE owner_id = ? AND owner_kind = ?")
            .bind(owner_id)
            .bind(owner_kind.as_str())
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| PersistenceError::not_found("SSN", owner_id))
            .and_then(SsnRecord::try_from)
    }
}

/// Trim without copying the value; `seal` zeroizes the full buffer.
fn trim_in_place(value: &mut String) {
    let end = value.trim_end().len();
    value.truncate(end);
    let start = value.len() - value.trim_start().len();
    value.replace_range(..start, "");
}
