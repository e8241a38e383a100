//! Business representatives (owners and controllers)

use crate::context::ServiceContext;
use crate::customers::{require_customer, save_ssn};
use crate::error::{ServiceError, ServiceResult};
use customers_core::{new_id, CustomerType, Representative, RepresentativeRequest, SsnOwnerKind};
use customers_persistence::{CustomerRepo, RepresentativeRepo};
use zeroize::Zeroizing;

/// Representative Service
pub struct RepresentativeService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RepresentativeService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Add a representative to a business customer.
    pub async fn create(
        &self,
        organization: &str,
        customer_id: &str,
        mut request: RepresentativeRequest,
    ) -> ServiceResult<Representative> {
        let ssn = request.ssn.take().map(Zeroizing::new);
        request.validate()?;

        let customer = CustomerRepo::get(self.ctx.pool(), customer_id, organization).await?;
        if customer.customer_type != CustomerType::Business {
            return Err(ServiceError::BadRequest(
                "representatives can only be added to business customers".into(),
            ));
        }

        let representative_id = new_id();
        if let Some(ssn) = ssn {
            save_ssn(self.ctx, &representative_id, SsnOwnerKind::Representative, ssn).await?;
        }

        let representative = request.to_representative(&representative_id, customer_id);
        RepresentativeRepo::create(self.ctx.pool(), &representative, &request).await?;
        tracing::info!(customer_id, representative_id = %representative_id, "representative created");

        self.get(organization, customer_id, &representative_id).await
    }

    pub async fn update(
        &self,
        organization: &str,
        customer_id: &str,
        representative_id: &str,
        mut request: RepresentativeRequest,
    ) -> ServiceResult<Representative> {
        let ssn = request.ssn.take().map(Zeroizing::new);
        request.validate()?;
        self.get(organization, customer_id, representative_id).await?;

        if let Some(ssn) = ssn {
            save_ssn(self.ctx, representative_id, SsnOwnerKind::Representative, ssn).await?;
        }
        RepresentativeRepo::update(self.ctx.pool(), customer_id, representative_id, &request).await?;

        self.get(organization, customer_id, representative_id).await
    }

    pub async fn get(
        &self,
        organization: &str,
        customer_id: &str,
        representative_id: &str,
    ) -> ServiceResult<Representative> {
        require_customer(self.ctx, organization, customer_id).await?;
        Ok(RepresentativeRepo::get(self.ctx.pool(), customer_id, representative_id).await?)
    }

    pub async fn list(&self, organization: &str, customer_id: &str) -> ServiceResult<Vec<Representative>> {
        require_customer(self.ctx, organization, customer_id).await?;
        Ok(RepresentativeRepo::list(self.ctx.pool(), customer_id).await?)
    }

    /// Soft delete. Deleting twice succeeds.
    pub async fn delete(&self, organization: &str, customer_id: &str, representative_id: &str) -> ServiceResult<()> {
        require_customer(self.ctx, organization, customer_id).await?;
        RepresentativeRepo::delete(self.ctx.pool(), customer_id, representative_id).await?;
        tracing::info!(customer_id, representative_id, "representative deleted");
        Ok(())
    }
}
