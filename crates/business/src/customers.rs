//! Customer operations - create, update, status, metadata, addresses
//!
//! CustomerService owns the create flow: SSN first, then the customer
//! aggregate, then sanctions screening.

use crate::context::ServiceContext;
use crate::error::{with_timeout, ServiceError, ServiceResult};
use crate::ofac::OfacService;
use customers_core::validate::validate_metadata;
use customers_core::{
    new_id, Address, AddressRequest, Customer, CustomerRequest, CustomerSearch, CustomerStatus,
    SsnOwnerKind, StatusUpdate,
};
use customers_persistence::{AddressRepo, CustomerRepo, PersistenceError, SsnRepo};
use std::collections::HashMap;
use zeroize::Zeroizing;

/// Fail with `NotFound` unless the customer is visible to `organization`.
pub(crate) async fn require_customer(
    ctx: &ServiceContext,
    organization: &str,
    customer_id: &str,
) -> ServiceResult<()> {
    CustomerRepo::get_row(ctx.pool(), customer_id, organization).await?;
    Ok(())
}

/// Encrypt and store an SSN. Any failure is an internal `saveSSN` fault.
pub(crate) async fn save_ssn(
    ctx: &ServiceContext,
    owner_id: &str,
    owner_kind: SsnOwnerKind,
    mut ssn: Zeroizing<String>,
) -> ServiceResult<()> {
    if ssn.trim().is_empty() {
        return Ok(());
    }
    SsnRepo::save(ctx.pool(), ctx.at_rest(), owner_id, owner_kind, &mut ssn)
        .await
        .map_err(|e| match e {
            PersistenceError::Keeper { source, .. } => ServiceError::keeper("saveSSN", source),
            other => ServiceError::internal("saveSSN", other),
        })?;
    Ok(())
}

/// Customer Service
pub struct CustomerService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> CustomerService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create a customer in `organization` with status `unknown`.
    ///
    /// Sanctions failures are logged; the customer is still created.
    pub async fn create(&self, organization: &str, mut request: CustomerRequest) -> ServiceResult<Customer> {
        let ssn = request.ssn.take().map(Zeroizing::new);
        request.validate()?;

        let customer_id = new_id();
        if let Some(ssn) = ssn {
            save_ssn(self.ctx, &customer_id, SsnOwnerKind::Customer, ssn).await?;
        }

        let customer = request.to_customer(&customer_id, organization);
        with_timeout("customers.create", self.ctx.config().write_timeout(), async {
            Ok(CustomerRepo::create(self.ctx.pool(), &customer, &request).await?)
        })
        .await?;
        tracing::info!(customer_id = %customer_id, organization, "customer created");

        if self.ctx.sanctions().is_some() {
            if let Err(e) = OfacService::new(self.ctx).screen(&customer).await {
                tracing::warn!(customer_id = %customer_id, error = %e, "sanctions screening failed");
            }
        } else {
            tracing::debug!(customer_id = %customer_id, "sanctions screening disabled");
        }

        self.get(organization, &customer_id).await
    }

    /// Replace a customer's fields, phones, addresses and metadata.
    pub async fn update(
        &self,
        organization: &str,
        customer_id: &str,
        mut request: CustomerRequest,
    ) -> ServiceResult<Customer> {
        let ssn = request.ssn.take().map(Zeroizing::new);
        request.validate()?;
        require_customer(self.ctx, organization, customer_id).await?;

        if let Some(ssn) = ssn {
            save_ssn(self.ctx, customer_id, SsnOwnerKind::Customer, ssn).await?;
        }

        with_timeout("customers.update", self.ctx.config().write_timeout(), async {
            Ok(CustomerRepo::update(self.ctx.pool(), customer_id, organization, &request).await?)
        })
        .await?;
        tracing::info!(customer_id, organization, "customer updated");

        self.get(organization, customer_id).await
    }

    pub async fn get(&self, organization: &str, customer_id: &str) -> ServiceResult<Customer> {
        Ok(CustomerRepo::get(self.ctx.pool(), customer_id, organization).await?)
    }

    pub async fn search(&self, params: &CustomerSearch) -> ServiceResult<Vec<Customer>> {
        Ok(CustomerRepo::search(self.ctx.pool(), params, self.ctx.config().search_max_count).await?)
    }

    /// Soft delete. Deleting twice succeeds.
    pub async fn delete(&self, organization: &str, customer_id: &str) -> ServiceResult<()> {
        CustomerRepo::delete(self.ctx.pool(), customer_id, organization).await?;
        tracing::info!(customer_id, organization, "customer deleted");
        Ok(())
    }

    /// Move the customer to `status`, recording the audit row.
    pub async fn update_status(
        &self,
        organization: &str,
        customer_id: &str,
        status: CustomerStatus,
        comment: &str,
    ) -> ServiceResult<StatusUpdate> {
        let update = with_timeout("customers.status", self.ctx.config().write_timeout(), async {
            Ok(CustomerRepo::update_status(self.ctx.pool(), customer_id, organization, status, comment).await?)
        })
        .await?;
        tracing::info!(customer_id, status = %status, "customer status updated");
        Ok(update)
    }

    /// Status audit trail, oldest first.
    pub async fn status_updates(&self, organization: &str, customer_id: &str) -> ServiceResult<Vec<StatusUpdate>> {
        require_customer(self.ctx, organization, customer_id).await?;
        Ok(CustomerRepo::status_updates(self.ctx.pool(), customer_id).await?)
    }

    pub async fn replace_metadata(
        &self,
        organization: &str,
        customer_id: &str,
        metadata: HashMap<String, String>,
    ) -> ServiceResult<HashMap<String, String>> {
        validate_metadata(&metadata)?;
        CustomerRepo::replace_metadata(self.ctx.pool(), customer_id, organization, &metadata).await?;
        self.metadata(organization, customer_id).await
    }

    pub async fn metadata(&self, organization: &str, customer_id: &str) -> ServiceResult<HashMap<String, String>> {
        require_customer(self.ctx, organization, customer_id).await?;
        Ok(CustomerRepo::metadata(self.ctx.pool(), customer_id).await?)
    }

    pub async fn add_address(
        &self,
        organization: &str,
        customer_id: &str,
        request: &AddressRequest,
    ) -> ServiceResult<Address> {
        request.validate()?;
        require_customer(self.ctx, organization, customer_id).await?;
        Ok(AddressRepo::add(self.ctx.pool(), customer_id, request).await?)
    }

    pub async fn update_address(
        &self,
        organization: &str,
        customer_id: &str,
        address_id: &str,
        request: &AddressRequest,
    ) -> ServiceResult<Address> {
        request.validate()?;
        require_customer(self.ctx, organization, customer_id).await?;
        Ok(AddressRepo::update(self.ctx.pool(), customer_id, address_id, request).await?)
    }

    pub async fn delete_address(&self, organization: &str, customer_id: &str, address_id: &str) -> ServiceResult<()> {
        require_customer(self.ctx, organization, customer_id).await?;
        Ok(AddressRepo::delete(self.ctx.pool(), customer_id, address_id).await?)
    }

    /// Masked SSN. The ciphertext never leaves the store.
    pub async fn masked_ssn(&self, organization: &str, customer_id: &str) -> ServiceResult<String> {
        require_customer(self.ctx, organization, customer_id).await?;
        let record = SsnRepo::get(self.ctx.pool(), customer_id, SsnOwnerKind::Customer).await?;
        Ok(record.masked)
    }
}
