//! Account operations and ownership validation
//!
//! ```text
//!   account:     none ──complete──► validated      (admin override may revert)
//!   validation:  init ──complete──► completed      (failed complete stays init)
//! ```
//!
//! An account has at most one validation in `init`. Re-initiating with the
//! same strategy returns that validation instead of starting another.

use crate::context::ServiceContext;
use crate::customers::require_customer;
use crate::error::{with_timeout, ServiceError, ServiceResult};
use crate::strategies::StrategyContext;
use chrono::Utc;
use customers_core::{
    new_id, Account, AccountStatus, CreateAccountRequest, Validation, ValidationStatus,
};
use customers_persistence::{AccountRepo, CustomerRepo, ValidationRepo};
use customers_secrets::rewrap;
use serde_json::Value;
use zeroize::Zeroize;

/// Account Service
pub struct AccountService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AccountService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create an account with status `none`.
    ///
    /// The raw account number is zeroized before this returns.
    pub async fn create(
        &self,
        organization: &str,
        customer_id: &str,
        user_id: &str,
        mut request: CreateAccountRequest,
    ) -> ServiceResult<Account> {
        let result = self.create_inner(organization, customer_id, user_id, &mut request).await;
        request.account_number.zeroize();
        result
    }

    async fn create_inner(
        &self,
        organization: &str,
        customer_id: &str,
        user_id: &str,
        request: &mut CreateAccountRequest,
    ) -> ServiceResult<Account> {
        request.validate()?;
        let customer = CustomerRepo::get(self.ctx.pool(), customer_id, organization).await?;

        match self.ctx.routing() {
            Some(cache) => {
                let institution = cache.require(&request.routing_number).await?;
                tracing::debug!(routing_number = %institution.routing_number, name = %institution.name, "routing number known");
            }
            None => tracing::debug!("routing lookup disabled, checksum only"),
        }

        if request.holder_name.trim().is_empty() {
            request.holder_name = customer.display_name();
        }

        let account = with_timeout("accounts.create", self.ctx.config().write_timeout(), async {
            Ok(AccountRepo::create(self.ctx.pool(), self.ctx.at_rest(), customer_id, user_id, &mut *request).await?)
        })
        .await?;
        tracing::info!(customer_id, account_id = %account.account_id, "account created");
        Ok(account)
    }

    pub async fn list(&self, organization: &str, customer_id: &str) -> ServiceResult<Vec<Account>> {
        require_customer(self.ctx, organization, customer_id).await?;
        Ok(AccountRepo::list_by_customer(self.ctx.pool(), customer_id).await?)
    }

    pub async fn get(&self, organization: &str, customer_id: &str, account_id: &str) -> ServiceResult<Account> {
        require_customer(self.ctx, organization, customer_id).await?;
        Ok(AccountRepo::get_for_customer(self.ctx.pool(), customer_id, account_id).await?)
    }

    /// Soft delete. Deleting twice succeeds.
    pub async fn delete(&self, organization: &str, customer_id: &str, account_id: &str) -> ServiceResult<()> {
        require_customer(self.ctx, organization, customer_id).await?;
        AccountRepo::deactivate(self.ctx.pool(), customer_id, account_id).await?;
        tracing::info!(customer_id, account_id, "account deactivated");
        Ok(())
    }

    /// Account number wrapped by the in-transit keeper, base64 encoded.
    pub async fn decrypt_account_number(
        &self,
        organization: &str,
        customer_id: &str,
        account_id: &str,
    ) -> ServiceResult<String> {
        require_customer(self.ctx, organization, customer_id).await?;
        let stored = AccountRepo::encrypted_account_number(self.ctx.pool(), customer_id, account_id).await?;
        rewrap(self.ctx.at_rest(), self.ctx.in_transit(), &stored)
            .await
            .map_err(|e| ServiceError::keeper("decryptAccountNumber", e))
    }

    /// Administrative status change. The only way back from `validated`.
    pub async fn override_status(&self, account_id: &str, status: AccountStatus) -> ServiceResult<Account> {
        Ok(AccountRepo::override_status(self.ctx.pool(), account_id, status).await?)
    }

    // ========================================================================
    // Validations
    // ========================================================================

    /// Start proving ownership of an account.
    pub async fn init_validation(
        &self,
        organization: &str,
        customer_id: &str,
        account_id: &str,
        user_id: &str,
        strategy: &str,
        vendor: &str,
    ) -> ServiceResult<Validation> {
        let account = self.get(organization, customer_id, account_id).await?;
        let (key, strategy) = self.ctx.strategies().get(strategy, vendor)?;

        if account.status == AccountStatus::Validated {
            return Err(ServiceError::BadRequest(format!(
                "account {} is already validated",
                account_id
            )));
        }

        if let Some(open) = ValidationRepo::open_for_account(self.ctx.pool(), account_id).await? {
            if open.strategy == key.strategy && open.vendor == key.vendor {
                tracing::debug!(account_id, validation_id = %open.validation_id, "returning open validation");
                return Ok(open);
            }
            return Err(ServiceError::Conflict(format!(
                "account has an open {}/{} validation",
                open.strategy, open.vendor
            )));
        }

        let stored = AccountRepo::encrypted_account_number(self.ctx.pool(), customer_id, account_id).await?;
        let strategy_ctx = StrategyContext {
            user_id,
            customer_id,
            account: &account,
            encrypted_account_number: &stored,
            keeper: self.ctx.at_rest(),
        };
        let vendor_response =
            with_timeout("strategy.init", self.ctx.config().vendor_timeout(), strategy.init(&strategy_ctx)).await?;

        let now = Utc::now();
        let validation = Validation {
            validation_id: new_id(),
            account_id: account_id.to_string(),
            status: ValidationStatus::Init,
            strategy: key.strategy.to_string(),
            vendor: key.vendor.to_string(),
            vendor_response,
            created_at: now,
            updated_at: now,
        };
        ValidationRepo::create(self.ctx.pool(), &validation).await?;
        tracing::info!(account_id, validation_id = %validation.validation_id, strategy = %key, "validation started");
        Ok(validation)
    }

    /// Finish a validation. On success the validation is `completed` and the
    /// account `validated` in one transaction; on failure nothing changes.
    pub async fn complete_validation(
        &self,
        organization: &str,
        customer_id: &str,
        account_id: &str,
        validation_id: &str,
        user_id: &str,
        request: &Value,
    ) -> ServiceResult<Validation> {
        let account = self.get(organization, customer_id, account_id).await?;
        let validation = ValidationRepo::get(self.ctx.pool(), account_id, validation_id).await?;
        if validation.status == ValidationStatus::Completed {
            return Err(ServiceError::BadRequest(format!(
                "validation {} is already completed",
                validation_id
            )));
        }
        let (key, strategy) = self.ctx.strategies().get(&validation.strategy, &validation.vendor)?;

        let stored = AccountRepo::encrypted_account_number(self.ctx.pool(), customer_id, account_id).await?;
        let strategy_ctx = StrategyContext {
            user_id,
            customer_id,
            account: &account,
            encrypted_account_number: &stored,
            keeper: self.ctx.at_rest(),
        };
        let outcome = match with_timeout(
            "strategy.complete",
            self.ctx.config().vendor_timeout(),
            strategy.complete(&strategy_ctx, request),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::info!(account_id, validation_id, strategy = %key, error = %e, "validation attempt failed");
                return Err(e);
            }
        };

        let completed = with_timeout("validations.complete", self.ctx.config().write_timeout(), async {
            Ok(ValidationRepo::complete(
                self.ctx.pool(),
                account_id,
                validation_id,
                &outcome.vendor_response,
                outcome.validate_account,
            )
            .await?)
        })
        .await?;
        tracing::info!(account_id, validation_id, strategy = %key, "validation completed");
        Ok(completed)
    }

    pub async fn list_validations(
        &self,
        organization: &str,
        customer_id: &str,
        account_id: &str,
    ) -> ServiceResult<Vec<Validation>> {
        self.get(organization, customer_id, account_id).await?;
        Ok(ValidationRepo::list(self.ctx.pool(), account_id).await?)
    }

    pub async fn get_validation(
        &self,
        organization: &str,
        customer_id: &str,
        account_id: &str,
        validation_id: &str,
    ) -> ServiceResult<Validation> {
        self.get(organization, customer_id, account_id).await?;
        Ok(ValidationRepo::get(self.ctx.pool(), account_id, validation_id).await?)
    }
}
