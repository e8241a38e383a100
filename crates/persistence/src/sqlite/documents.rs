//! Document metadata and disclaimers.

use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::schema::{DisclaimerRow, DocumentRow};
use chrono::Utc;
use customers_core::{new_id, Disclaimer, Document};
use sqlx::SqlitePool;

/// Repository for the `documents` table
pub struct DocumentRepo;

impl DocumentRepo {
    pub async fn create(pool: &SqlitePool, document: &Document) -> PersistenceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (document_id, customer_id, document_type, content_type, uploaded_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&document.document_id)
        .bind(&document.customer_id)
        .bind(document.document_type.as_str())
        .bind(&document.content_type)
        .bind(document.uploaded_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn list(pool: &SqlitePool, customer_id: &str) -> PersistenceResult<Vec<Document>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT document_id, customer_id, document_type, content_type, uploaded_at
            FROM documents WHERE customer_id = ? AND deleted_at IS NULL
            ORDER BY uploaded_at, rowid
            "#,
        )
        .bind(customer_id)
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(Document::try_from).collect()
    }

    pub async fn get(pool: &SqlitePool, customer_id: &str, document_id: &str) -> PersistenceResult<Document> {
        sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT document_id, customer_id, document_type, content_type, uploaded_at
            FROM documents WHERE customer_id = ? AND document_id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(customer_id)
        .bind(document_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| PersistenceError::not_found("Document", document_id))
        .and_then(Document::try_from)
    }

    /// Soft delete. Idempotent for an existing document.
    pub async fn delete(pool: &SqlitePool, customer_id: &str, document_id: &str) -> PersistenceResult<()> {
        let result = sqlx::query(
            "UPDATE documents SET deleted_at = COALESCE(deleted_at, ?) WHERE customer_id = ? AND document_id = ?",
        )
        .bind(Utc::now())
        .bind(customer_id)
        .bind(document_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Document", document_id));
        }
        Ok(())
    }
}

const DISCLAIMER_SELECT: &str = r#"
    SELECT d.disclaimer_id, d.customer_id, d.text, d.document_id, d.created_at, a.accepted_at
    FROM disclaimers d
    LEFT JOIN disclaimer_acceptances a
        ON a.disclaimer_id = d.disclaimer_id AND a.customer_id = d.customer_id
"#;

/// Repository for `disclaimers` and their acceptances
pub struct DisclaimerRepo;

impl DisclaimerRepo {
    pub async fn create(
        pool: &SqlitePool,
        customer_id: &str,
        text: &str,
        document_id: Option<&str>,
    ) -> PersistenceResult<Disclaimer> {
        let disclaimer = Disclaimer {
            disclaimer_id: new_id(),
            customer_id: customer_id.to_string(),
            text: text.to_string(),
            document_id: document_id.map(str::to_string),
            accepted_at: None,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO disclaimers (disclaimer_id, customer_id, text, document_id, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&disclaimer.disclaimer_id)
        .bind(&disclaimer.customer_id)
        .bind(&disclaimer.text)
        .bind(&disclaimer.document_id)
        .bind(disclaimer.created_at)
        .execute(pool)
        .await?;

        Ok(disclaimer)
    }

    pub async fn list(pool: &SqlitePool, customer_id: &str) -> PersistenceResult<Vec<Disclaimer>> {
        let rows = sqlx::query_as::<_, DisclaimerRow>(&format!(
            "{} WHERE d.customer_id = ? AND d.deleted_at IS NULL ORDER BY d.created_at, d.rowid",
            DISCLAIMER_SELECT
        ))
        .bind(customer_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(Disclaimer::from).collect())
    }

    pub async fn get(pool: &SqlitePool, customer_id: &str, disclaimer_id: &str) -> PersistenceResult<Disclaimer> {
        sqlx::query_as::<_, DisclaimerRow>(&format!(
            "{} WHERE d.customer_id = ? AND d.disclaimer_id = ? AND d.deleted_at IS NULL",
            DISCLAIMER_SELECT
        ))
        .bind(customer_id)
        .bind(disclaimer_id)
        .fetch_optional(pool)
        .await?
        .map(Disclaimer::from)
        .ok_or_else(|| PersistenceError::not_found("Disclaimer", disclaimer_id))
    }

    /// Record acceptance. Accepting twice is a unique violation.
    pub async fn accept(pool: &SqlitePool, customer_id: &str, disclaimer_id: &str) -> PersistenceResult<Disclaimer> {
        Self::get(pool, customer_id, disclaimer_id).await?;

        sqlx::query(
            "INSERT INTO disclaimer_acceptances (disclaimer_id, customer_id, accepted_at) VALUES (?, ?, ?)",
        )
        .bind(disclaimer_id)
        .bind(customer_id)
        .bind(Utc::now())
        .execute(pool)
        .await
        .map_err(|e| PersistenceError::from_write(e, "disclaimer already accepted"))?;

        Self::get(pool, customer_id, disclaimer_id).await
    }
}
