//! Per-organization configuration

use crate::context::ServiceContext;
use crate::error::{ServiceError, ServiceResult};
use customers_core::OrganizationConfiguration;
use customers_persistence::{AccountRepo, ConfigurationRepo, CustomerRepo, PersistenceError};

/// Configuration Service
pub struct ConfigurationService<'a> {
    ctx: &'a ServiceContext,
}

fn outside_organization(organization: &str) -> impl Fn(PersistenceError) -> ServiceError + '_ {
    move |e| {
        if e.is_not_found() {
            ServiceError::Unauthorized(format!("outside organization {}: {}", organization, e))
        } else {
            e.into()
        }
    }
}

impl<'a> ConfigurationService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Stored configuration; empty for an unknown organization.
    pub async fn get(&self, organization: &str) -> ServiceResult<OrganizationConfiguration> {
        Ok(ConfigurationRepo::get(self.ctx.pool(), organization).await?)
    }

    /// Replace the configuration. The legal entity must be a customer of the
    /// organization and the primary account one of its accounts.
    pub async fn update(
        &self,
        organization: &str,
        config: &OrganizationConfiguration,
    ) -> ServiceResult<OrganizationConfiguration> {
        let (Some(customer_id), Some(account_id)) = (&config.legal_entity, &config.primary_account) else {
            return Err(ServiceError::BadRequest(
                "legal entity and primary account are required".into(),
            ));
        };

        CustomerRepo::get_row(self.ctx.pool(), customer_id, organization)
            .await
            .map_err(outside_organization(organization))?;
        AccountRepo::get_for_customer(self.ctx.pool(), customer_id, account_id)
            .await
            .map_err(outside_organization(organization))?;

        ConfigurationRepo::upsert(self.ctx.pool(), organization, config).await?;
        tracing::info!(organization, legal_entity = %customer_id, primary_account = %account_id, "organization configuration updated");
        self.get(organization).await
    }
}
