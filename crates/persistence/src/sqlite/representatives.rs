//! Business representatives (owners and controllers).

use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::contacts::{AddressRepo, PhoneRepo};
use crate::sqlite::schema::RepresentativeRow;
use chrono::Utc;
use customers_core::{Representative, RepresentativeRequest};
use sqlx::SqlitePool;

/// Repository for the `representatives` table
pub struct RepresentativeRepo;

impl RepresentativeRepo {
    /// Insert a representative with its phones and addresses.
    pub async fn create(
        pool: &SqlitePool,
        representative: &Representative,
        request: &RepresentativeRequest,
    ) -> PersistenceResult<()> {
        let mut tx = pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO representatives (
                representative_id, customer_id, representative_type, first_name, last_name,
                job_title, birth_date, created_at, last_modified
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&representative.representative_id)
        .bind(&representative.customer_id)
        .bind(representative.representative_type.as_str())
        .bind(&representative.first_name)
        .bind(&representative.last_name)
        .bind(&representative.job_title)
        .bind(representative.birth_date)
        .bind(representative.created_at)
        .bind(representative.last_modified)
        .execute(&mut *tx)
        .await
        .map_err(|e| PersistenceError::from_write(e, "representative"))?;

        PhoneRepo::replace(&mut tx, &representative.representative_id, &request.phones).await?;
        AddressRepo::replace(&mut tx, &representative.representative_id, &request.addresses).await?;
        tx.commit().await.map_err(PersistenceError::commit)?;
        Ok(())
    }

    pub async fn update(
        pool: &SqlitePool,
        customer_id: &str,
        representative_id: &str,
        request: &RepresentativeRequest,
    ) -> PersistenceResult<()> {
        let updated = request.to_representative(representative_id, customer_id);
        let mut tx = pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE representatives
            SET representative_type = ?, first_name = ?, last_name = ?, job_title = ?,
                birth_date = ?, last_modified = ?
            WHERE customer_id = ? AND representative_id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(updated.representative_type.as_str())
        .bind(&updated.first_name)
        .bind(&updated.last_name)
        .bind(&updated.job_title)
        .bind(updated.birth_date)
        .bind(updated.last_modified)
        .bind(customer_id)
        .bind(representative_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Representative", representative_id));
        }
        PhoneRepo::replace(&mut tx, representative_id, &request.phones).await?;
        AddressRepo::replace(&mut tx, representative_id, &request.addresses).await?;
        tx.commit().await.map_err(PersistenceError::commit)?;
        Ok(())
    }

    /// Hydrated representative.
    pub async fn get(
        pool: &SqlitePool,
        customer_id: &str,
        representative_id: &str,
    ) -> PersistenceResult<Representative> {
        let row = sqlx::query_as::<_, RepresentativeRow>(
            "SELECT * FROM representatives WHERE customer_id = ? AND representative_id = ? AND deleted_at IS NULL",
        )
        .bind(customer_id)
        .bind(representative_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| PersistenceError::not_found("Representative", representative_id))?;

        Self::hydrate(pool, row).await
    }

    /// Hydrated representatives of a customer, oldest first.
    pub async fn list(pool: &SqlitePool, customer_id: &str) -> PersistenceResult<Vec<Representative>> {
        let rows = sqlx::query_as::<_, RepresentativeRow>(
            "SELECT * FROM representatives WHERE customer_id = ? AND deleted_at IS NULL ORDER BY created_at, rowid",
        )
        .bind(customer_id)
        .fetch_all(pool)
        .await?;

        let mut representatives = Vec::with_capacity(rows.len());
        for row in rows {
            representatives.push(Self::hydrate(pool, row).await?);
        }
        Ok(representatives)
    }

    /// Soft delete. Idempotent for an existing representative.
    pub async fn delete(
        pool: &SqlitePool,
        customer_id: &str,
        representative_id: &str,
    ) -> PersistenceResult<()> {
        let result = sqlx::query(
            "UPDATE representatives SET deleted_at = COALESCE(deleted_at, ?) WHERE customer_id = ? AND representative_id = ?",
        )
        .bind(Utc::now())
        .bind(customer_id)
        .bind(representative_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Representative", representative_id));
        }
        Ok(())
    }

    async fn hydrate(pool: &SqlitePool, row: RepresentativeRow) -> PersistenceResult<Representative> {
        let mut representative = Representative::try_from(row)?;
        representative.phones = PhoneRepo::list(pool, &representative.representative_id).await?;
        representative.addresses = AddressRepo::list(pool, &representative.representative_id).await?;
        Ok(representative)
    }
}
