//! Phones and addresses, shared by customers and representatives.
//!
//! Rows are keyed by `owner_id`. Writes take a connection so callers can run
//! them inside their own transaction.

use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::schema::{AddressRow, PhoneRow};
use chrono::Utc;
use customers_core::{new_id, Address, AddressRequest, AddressType, Phone, PhoneRequest};
use sqlx::{SqliteConnection, SqlitePool};

/// Repository for the `phones` table
pub struct PhoneRepo;

impl PhoneRepo {
    pub async fn list(pool: &SqlitePool, owner_id: &str) -> PersistenceResult<Vec<Phone>> {
        let rows = sqlx::query_as::<_, PhoneRow>(
            "SELECT * FROM phones WHERE owner_id = ? ORDER BY rowid",
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(Phone::try_from).collect()
    }

    /// Replace the owner's phones with `phones`. Repeated numbers collapse to
    /// the last entry.
    pub async fn replace(
        conn: &mut SqliteConnection,
        owner_id: &str,
        phones: &[PhoneRequest],
    ) -> PersistenceResult<()> {
        sqlx::query("DELETE FROM phones WHERE owner_id = ?")
            .bind(owner_id)
            .execute(&mut *conn)
            .await?;

        for phone in phones {
            sqlx::query(
                r#"
                INSERT INTO phones (owner_id, number, phone_type, validated)
                VALUES (?, ?, ?, 0)
                ON CONFLICT (owner_id, number) DO UPDATE SET phone_type = excluded.phone_type
                "#,
            )
            .bind(owner_id)
            .bind(phone.number.trim())
            .bind(phone.phone_type.as_str())
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}

/// Repository for the `addresses` table
pub struct AddressRepo;

impl AddressRepo {
    /// Non-deleted addresses, oldest first.
    pub async fn list(pool: &SqlitePool, owner_id: &str) -> PersistenceResult<Vec<Address>> {
        let rows = sqlx::query_as::<_, AddressRow>(
            "SELECT * FROM addresses WHERE owner_id = ? AND deleted_at IS NULL ORDER BY created_at, rowid",
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(Address::try_from).collect()
    }

    pub async fn get(
        pool: &SqlitePool,
        owner_id: &str,
        address_id: &str,
    ) -> PersistenceResult<Address> {
        sqlx::query_as::<_, AddressRow>(
            "SELECT * FROM addresses WHERE owner_id = ? AND address_id = ? AND deleted_at IS NULL",
        )
        .bind(owner_id)
        .bind(address_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| PersistenceError::not_found("Address", address_id))
        .and_then(Address::try_from)
    }

    /// Add one address. A second primary is rejected.
    pub async fn add(
        pool: &SqlitePool,
        owner_id: &str,
        request: &AddressRequest,
    ) -> PersistenceResult<Address> {
        let mut tx = pool.begin().await?;
        if request.address_type == AddressType::Primary
            && Self::primary_id(&mut *tx, owner_id).await?.is_some()
        {
            return Err(duplicate_primary(owner_id));
        }
        let address_id = Self::insert(&mut *tx, owner_id, request).await?;
        tx.commit().await.map_err(PersistenceError::commit)?;

        Self::get(pool, owner_id, &address_id).await
    }

    /// Overwrite one address in place.
    pub async fn update(
        pool: &SqlitePool,
        owner_id: &str,
        address_id: &str,
        request: &AddressRequest,
    ) -> PersistenceResult<Address> {
        let mut tx = pool.begin().await?;
        if request.address_type == AddressType::Primary {
            if let Some(existing) = Self::primary_id(&mut *tx, owner_id).await? {
                if existing != address_id {
                    return Err(duplicate_primary(owner_id));
                }
            }
        }

        let result = sqlx::query(
            r#"
            UPDATE addresses
            SET address_type = ?, address1 = ?, address2 = ?, city = ?, state = ?,
                postal_code = ?, country = ?
            WHERE owner_id = ? AND address_id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(request.address_type.as_str())
        .bind(request.address1.trim())
        .bind(request.address2.as_deref().map(str::trim))
        .bind(request.city.trim())
        .bind(request.normalized_state())
        .bind(request.postal_code.trim())
        .bind(request.country.trim())
        .bind(owner_id)
        .bind(address_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| address_write_error(e, owner_id))?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Address", address_id));
        }
        tx.commit().await.map_err(PersistenceError::commit)?;

        Self::get(pool, owner_id, address_id).await
    }

    /// Soft-delete one address. Deleting an already deleted address is a no-op.
    pub async fn delete(pool: &SqlitePool, owner_id: &str, address_id: &str) -> PersistenceResult<()> {
        let result = sqlx::query(
            "UPDATE addresses SET deleted_at = COALESCE(deleted_at, ?) WHERE owner_id = ? AND address_id = ?",
        )
        .bind(Utc::now())
        .bind(owner_id)
        .bind(address_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Address", address_id));
        }
        Ok(())
    }

    /// Bring the owner's addresses in line with `requested`.
    ///
    /// Existing rows are matched on `address1`. Unmatched rows are
    /// soft-deleted, matched rows updated, new rows inserted. Primary rows are
    /// written last so the one-primary index never sees two at once.
    pub async fn replace(
        conn: &mut SqliteConnection,
        owner_id: &str,
        requested: &[AddressRequest],
    ) -> PersistenceResult<()> {
        let existing = sqlx::query_as::<_, AddressRow>(
            "SELECT * FROM addresses WHERE owner_id = ? AND deleted_at IS NULL",
        )
        .bind(owner_id)
        .fetch_all(&mut *conn)
        .await?;

        let now = Utc::now();
        for row in &existing {
            let kept = requested
                .iter()
                .any(|r| r.address1.trim() == row.address1);
            if !kept {
                sqlx::query("UPDATE addresses SET deleted_at = ? WHERE address_id = ?")
                    .bind(now)
                    .bind(&row.address_id)
                    .execute(&mut *conn)
                    .await?;
            }
        }

        let mut ordered: Vec<&AddressRequest> = requested.iter().collect();
        ordered.sort_by_key(|r| r.address_type == AddressType::Primary);

        for request in ordered {
            let matched = existing
                .iter()
                .find(|row| row.address1 == request.address1.trim());
            match matched {
                Some(row) => {
                    sqlx::query(
                        r#"
                        UPDATE addresses
                        SET address_type = ?, address2 = ?, city = ?, state = ?,
                            postal_code = ?, country = ?
                        WHERE address_id = ?
                        "#,
                    )
                    .bind(request.address_type.as_str())
                    .bind(request.address2.as_deref().map(str::trim))
                    .bind(request.city.trim())
                    .bind(request.normalized_state())
                    .bind(request.postal_code.trim())
                    .bind(request.country.trim())
                    .bind(&row.address_id)
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| address_write_error(e, owner_id))?;
                }
                None => {
                    Self::insert(conn, owner_id, request).await?;
                }
            }
        }
        Ok(())
    }

    /// Insert a new address row and return its id.
    pub async fn insert(
        conn: &mut SqliteConnection,
        owner_id: &str,
        request: &AddressRequest,
    ) -> PersistenceResult<String> {
        let address_id = new_id();
        sqlx::query(
            r#"
            INSERT INTO addresses (
                address_id, owner_id, address_type, address1, address2, city, state,
                postal_code, country, validated, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(&address_id)
        .bind(owner_id)
        .bind(request.address_type.as_str())
        .bind(request.address1.trim())
        .bind(request.address2.as_deref().map(str::trim))
        .bind(request.city.trim())
        .bind(request.normalized_state())
        .bind(request.postal_code.trim())
        .bind(request.country.trim())
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .map_err(|e| address_write_error(e, owner_id))?;
        Ok(address_id)
    }

    async fn primary_id(
        conn: &mut SqliteConnection,
        owner_id: &str,
    ) -> PersistenceResult<Option<String>> {
        let id = sqlx::query_scalar::<_, String>(
            "SELECT address_id FROM addresses WHERE owner_id = ? AND address_type = 'primary' AND deleted_at IS NULL",
        )
        .bind(owner_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(id)
    }
}

fn duplicate_primary(owner_id: &str) -> PersistenceError {
    PersistenceError::DuplicateAddressKind {
        owner_id: owner_id.to_string(),
        kind: AddressType::Primary.to_string(),
    }
}

fn address_write_error(err: sqlx::Error, owner_id: &str) -> PersistenceError {
    match PersistenceError::from_write(err, "address") {
        PersistenceError::UniqueViolation(_) => duplicate_primary(owner_id),
        other => other,
    }
}
