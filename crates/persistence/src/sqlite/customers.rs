//! Customer records, metadata, status audit and OFAC search history.

use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::contacts::{AddressRepo, PhoneRepo};
use crate::sqlite::representatives::RepresentativeRepo;
use crate::sqlite::schema::{CustomerRow, OfacSearchRow, StatusUpdateRow};
use chrono::Utc;
use customers_core::{Customer, CustomerRequest, CustomerSearch, CustomerStatus, OfacSearch, StatusUpdate};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;

/// Repository for the `customers` table and its satellites
pub struct CustomerRepo;

impl CustomerRepo {
    /// Insert the customer with phones, addresses and metadata in one
    /// transaction.
    pub async fn create(
        pool: &SqlitePool,
        customer: &Customer,
        request: &CustomerRequest,
    ) -> PersistenceResult<()> {
        let mut tx = pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO customers (
                customer_id, organization, customer_type, first_name, middle_name, last_name,
                nick_name, suffix, birth_date, email, business_name, doing_business_as,
                website, status, created_at, last_modified
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&customer.customer_id)
        .bind(&customer.organization)
        .bind(customer.customer_type.as_str())
        .bind(&customer.first_name)
        .bind(&customer.middle_name)
        .bind(&customer.last_name)
        .bind(&customer.nick_name)
        .bind(&customer.suffix)
        .bind(customer.birth_date)
        .bind(&customer.email)
        .bind(&customer.business_name)
        .bind(&customer.doing_business_as)
        .bind(&customer.website)
        .bind(customer.status.as_str())
        .bind(customer.created_at)
        .bind(customer.last_modified)
        .execute(&mut *tx)
        .await
        .map_err(|e| match PersistenceError::from_write(e, "customer") {
            PersistenceError::UniqueViolation(_) => {
                PersistenceError::already_exists("Customer", &customer.customer_id)
            }
            other => other,
        })?;

        PhoneRepo::replace(&mut tx, &customer.customer_id, &request.phones).await?;
        AddressRepo::replace(&mut tx, &customer.customer_id, &request.addresses).await?;
        Self::write_metadata(&mut tx, &customer.customer_id, &request.metadata).await?;
        tx.commit().await.map_err(PersistenceError::commit)?;

        tracing::debug!(customer_id = %customer.customer_id, "customer row created");
        Ok(())
    }

    /// Replace the customer's fields, phones, addresses and metadata.
    /// Status is left untouched.
    pub async fn update(
        pool: &SqlitePool,
        customer_id: &str,
        organization: &str,
        request: &CustomerRequest,
    ) -> PersistenceResult<()> {
        let updated = request.to_customer(customer_id, organization);
        let mut tx = pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE customers
            SET customer_type = ?, first_name = ?, middle_name = ?, last_name = ?,
                nick_name = ?, suffix = ?, birth_date = ?, email = ?, business_name = ?,
                doing_business_as = ?, website = ?, last_modified = ?
            WHERE customer_id = ? AND organization = ? AND deleted_at IS NULL
            "#,
        )
        .bind(updated.customer_type.as_str())
        .bind(&updated.first_name)
        .bind(&updated.middle_name)
        .bind(&updated.last_name)
        .bind(&updated.nick_name)
        .bind(&updated.suffix)
        .bind(updated.birth_date)
        .bind(&updated.email)
        .bind(&updated.business_name)
        .bind(&updated.doing_business_as)
        .bind(&updated.website)
        .bind(updated.last_modified)
        .bind(customer_id)
        .bind(organization)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Customer", customer_id));
        }

        PhoneRepo::replace(&mut tx, customer_id, &request.phones).await?;
        AddressRepo::replace(&mut tx, customer_id, &request.addresses).await?;
        Self::write_metadata(&mut tx, customer_id, &request.metadata).await?;
        tx.commit().await.map_err(PersistenceError::commit)?;
        Ok(())
    }

    /// Fully hydrated customer visible to `organization`.
    pub async fn get(
        pool: &SqlitePool,
        customer_id: &str,
        organization: &str,
    ) -> PersistenceResult<Customer> {
        let row = Self::get_row(pool, customer_id, organization).await?;
        Self::hydrate(pool, row).await
    }

    /// Customer row only, for existence checks.
    pub async fn get_row(
        pool: &SqlitePool,
        customer_id: &str,
        organization: &str,
    ) -> PersistenceResult<CustomerRow> {
        sqlx::query_as::<_, CustomerRow>(
            "SELECT * FROM customers WHERE customer_id = ? AND organization = ? AND deleted_at IS NULL",
        )
        .bind(customer_id)
        .bind(organization)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| PersistenceError::not_found("Customer", customer_id))
    }

    /// Search within one organization, newest first.
    pub async fn search(
        pool: &SqlitePool,
        params: &CustomerSearch,
        max_count: i64,
    ) -> PersistenceResult<Vec<Customer>> {
        let (skip, count) = params.page(max_count);

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT * FROM customers WHERE deleted_at IS NULL AND organization = ",
        );
        qb.push_bind(params.organization.clone());

        if let Some(query) = params.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = format!("%{}%", query.to_lowercase());
            qb.push(" AND (lower(first_name || ' ' || last_name) LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR lower(COALESCE(nick_name, '')) LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR lower(COALESCE(business_name, '')) LIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
        if let Some(email) = params.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            qb.push(" AND lower(COALESCE(email, '')) LIKE ");
            qb.push_bind(format!("%{}%", email.to_lowercase()));
        }
        if let Some(status) = params.status {
            qb.push(" AND status = ");
            qb.push_bind(status.as_str());
        }
        if let Some(customer_type) = params.customer_type {
            qb.push(" AND customer_type = ");
            qb.push_bind(customer_type.as_str());
        }
        if !params.customer_ids.is_empty() {
            qb.push(" AND customer_id IN (");
            let mut ids = qb.separated(", ");
            for id in &params.customer_ids {
                ids.push_bind(id.clone());
            }
            ids.push_unseparated(")");
        }

        qb.push(" ORDER BY created_at DESC, rowid DESC LIMIT ");
        qb.push_bind(count);
        qb.push(" OFFSET ");
        qb.push_bind(skip);

        let rows = qb.build_query_as::<CustomerRow>().fetch_all(pool).await?;

        let mut customers = Vec::with_capacity(rows.len());
        for row in rows {
            customers.push(Self::hydrate(pool, row).await?);
        }
        Ok(customers)
    }

    /// Soft delete. Deleting an already deleted customer is a no-op.
    pub async fn delete(pool: &SqlitePool, customer_id: &str, organization: &str) -> PersistenceResult<()> {
        let result = sqlx::query(
            "UPDATE customers SET deleted_at = COALESCE(deleted_at, ?) WHERE customer_id = ? AND organization = ?",
        )
        .bind(Utc::now())
        .bind(customer_id)
        .bind(organization)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Customer", customer_id));
        }
        Ok(())
    }

    /// Set the status and append the audit record atomically.
    pub async fn update_status(
        pool: &SqlitePool,
        customer_id: &str,
        organization: &str,
        status: CustomerStatus,
        comment: &str,
    ) -> PersistenceResult<StatusUpdate> {
        let changed_at = Utc::now();
        let mut tx = pool.begin().await?;

        let result = sqlx::query(
            "UPDATE customers SET status = ?, last_modified = ? WHERE customer_id = ? AND organization = ? AND deleted_at IS NULL",
        )
        .bind(status.as_str())
        .bind(changed_at)
        .bind(customer_id)
        .bind(organization)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Customer", customer_id));
        }

        sqlx::query(
            "INSERT INTO customer_status_updates (customer_id, future_status, comment, changed_at) VALUES (?, ?, ?, ?)",
        )
        .bind(customer_id)
        .bind(status.as_str())
        .bind(comment)
        .bind(changed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await.map_err(PersistenceError::commit)?;

        Ok(StatusUpdate {
            customer_id: customer_id.to_string(),
            future_status: status,
            comment: comment.to_string(),
            changed_at,
        })
    }

    /// Status history, oldest first.
    pub async fn status_updates(pool: &SqlitePool, customer_id: &str) -> PersistenceResult<Vec<StatusUpdate>> {
        let rows = sqlx::query_as::<_, StatusUpdateRow>(
            "SELECT * FROM customer_status_updates WHERE customer_id = ? ORDER BY changed_at, rowid",
        )
        .bind(customer_id)
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(StatusUpdate::try_from).collect()
    }

    /// Replace the whole metadata map.
    pub async fn replace_metadata(
        pool: &SqlitePool,
        customer_id: &str,
        organization: &str,
        metadata: &HashMap<String, String>,
    ) -> PersistenceResult<()> {
        let mut tx = pool.begin().await?;
        let result = sqlx::query(
            "UPDATE customers SET last_modified = ? WHERE customer_id = ? AND organization = ? AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(customer_id)
        .bind(organization)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Customer", customer_id));
        }
        Self::write_metadata(&mut tx, customer_id, metadata).await?;
        tx.commit().await.map_err(PersistenceError::commit)?;
        Ok(())
    }

    pub async fn metadata(pool: &SqlitePool, customer_id: &str) -> PersistenceResult<HashMap<String, String>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT meta_key, meta_value FROM customer_metadata WHERE customer_id = ?",
        )
        .bind(customer_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn save_ofac_search(
        pool: &SqlitePool,
        customer_id: &str,
        search: &OfacSearch,
    ) -> PersistenceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO customer_ofac_searches (
                customer_id, entity_id, sdn_name, sdn_type, match_score, blocked, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(customer_id)
        .bind(&search.entity_id)
        .bind(&search.sdn_name)
        .bind(&search.sdn_type)
        .bind(search.match_score)
        .bind(search.blocked)
        .bind(search.created_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Most recent OFAC search for a customer visible to `organization`.
    pub async fn latest_ofac_search(
        pool: &SqlitePool,
        customer_id: &str,
        organization: &str,
    ) -> PersistenceResult<Option<OfacSearch>> {
        let row = sqlx::query_as::<_, OfacSearchRow>(
            r#"
            SELECT s.* FROM customer_ofac_searches s
            JOIN customers c ON c.customer_id = s.customer_id
            WHERE s.customer_id = ? AND c.organization = ?
            ORDER BY s.created_at DESC, s.rowid DESC
            LIMIT 1
            "#,
        )
        .bind(customer_id)
        .bind(organization)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(OfacSearch::from))
    }

    async fn write_metadata(
        conn: &mut SqliteConnection,
        customer_id: &str,
        metadata: &HashMap<String, String>,
    ) -> PersistenceResult<()> {
        sqlx::query("DELETE FROM customer_metadata WHERE customer_id = ?")
            .bind(customer_id)
            .execute(&mut *conn)
            .await?;

        for (key, value) in metadata {
            sqlx::query(
                "INSERT INTO customer_metadata (customer_id, meta_key, meta_value) VALUES (?, ?, ?)",
            )
            .bind(customer_id)
            .bind(key)
            .bind(value)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    async fn hydrate(pool: &SqlitePool, row: CustomerRow) -> PersistenceResult<Customer> {
        let mut customer = row.into_customer()?;
        customer.phones = PhoneRepo::list(pool, &customer.customer_id).await?;
        customer.addresses = AddressRepo::list(pool, &customer.customer_id).await?;
        customer.metadata = Self::metadata(pool, &customer.customer_id).await?;
        customer.representatives = RepresentativeRepo::list(pool, &customer.customer_id).await?;
        Ok(customer)
    }
}
