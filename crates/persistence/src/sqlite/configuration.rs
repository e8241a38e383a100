//! Per-organization configuration.

use crate::error::PersistenceResult;
use crate::sqlite::schema::OrganizationConfigurationRow;
use chrono::Utc;
use customers_core::OrganizationConfiguration;
use sqlx::SqlitePool;

/// Repository for the `organization_configuration` table
pub struct ConfigurationRepo;

impl ConfigurationRepo {
    /// Stored configuration, or an empty one for unknown organizations.
    pub async fn get(pool: &SqlitePool, organization: &str) -> PersistenceResult<OrganizationConfiguration> {
        let row = sqlx::query_as::<_, OrganizationConfigurationRow>(
            "SELECT * FROM organization_configuration WHERE organization = ?",
        )
        .bind(organization)
        .fetch_optional(pool)
        .await?;

        Ok(row
            .map(|r| OrganizationConfiguration {
                legal_entity: r.legal_entity,
                primary_account: r.primary_account,
            })
            .unwrap_or_default())
    }

    pub async fn upsert(
        pool: &SqlitePool,
        organization: &str,
        config: &OrganizationConfiguration,
    ) -> PersistenceResult<OrganizationConfiguration> {
        sqlx::query(
            r#"
            INSERT INTO organization_configuration (organization, legal_entity, primary_account, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (organization) DO UPDATE SET
                legal_entity = excluded.legal_entity,
                primary_account = excluded.primary_account,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(organization)
        .bind(&config.legal_entity)
        .bind(&config.primary_account)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Self::get(pool, organization).await
    }
}
