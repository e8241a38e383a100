//! Disclaimers a customer must accept

use crate::context::ServiceContext;
use crate::customers::require_customer;
use crate::error::{ServiceError, ServiceResult};
use customers_core::Disclaimer;
use customers_persistence::{DisclaimerRepo, DocumentRepo};

/// Disclaimer Service
pub struct DisclaimerService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> DisclaimerService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create a disclaimer, optionally tied to one of the customer's documents.
    pub async fn create(
        &self,
        organization: &str,
        customer_id: &str,
        text: &str,
        document_id: Option<&str>,
    ) -> ServiceResult<Disclaimer> {
        if text.trim().is_empty() {
            return Err(ServiceError::BadRequest("disclaimer text is required".into()));
        }
        require_customer(self.ctx, organization, customer_id).await?;
        if let Some(document_id) = document_id {
            DocumentRepo::get(self.ctx.pool(), customer_id, document_id).await?;
        }

        let disclaimer = DisclaimerRepo::create(self.ctx.pool(), customer_id, text.trim(), document_id).await?;
        tracing::info!(customer_id, disclaimer_id = %disclaimer.disclaimer_id, "disclaimer created");
        Ok(disclaimer)
    }

    pub async fn list(&self, organization: &str, customer_id: &str) -> ServiceResult<Vec<Disclaimer>> {
        require_customer(self.ctx, organization, customer_id).await?;
        Ok(DisclaimerRepo::list(self.ctx.pool(), customer_id).await?)
    }

    /// Accept a disclaimer. A second acceptance is a conflict.
    pub async fn accept(&self, organization: &str, customer_id: &str, disclaimer_id: &str) -> ServiceResult<Disclaimer> {
        require_customer(self.ctx, organization, customer_id).await?;
        let disclaimer = DisclaimerRepo::accept(self.ctx.pool(), customer_id, disclaimer_id).await?;
        tracing::info!(customer_id, disclaimer_id, "disclaimer accepted");
        Ok(disclaimer)
    }
}
