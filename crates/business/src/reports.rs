//! Cross-customer account reports

use crate::context::ServiceContext;
use crate::error::{ServiceError, ServiceResult};
use customers_core::{Account, Customer};
use customers_persistence::{AccountRepo, CustomerRepo};
use serde::Serialize;
use std::collections::HashSet;

/// Most accounts one report may name
pub const MAX_REPORT_ACCOUNTS: usize = 25;

/// An account with its owning customer
#[derive(Debug, Clone, Serialize)]
pub struct AccountReport {
    pub customer: Customer,
    pub account: Account,
}

/// Report Service
pub struct ReportService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ReportService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Accounts named by `account_ids` whose customer belongs to
    /// `organization`. Unknown ids are skipped.
    pub async fn accounts(&self, organization: &str, account_ids: &[String]) -> ServiceResult<Vec<AccountReport>> {
        let mut seen = HashSet::new();
        let ids: Vec<String> = account_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty() && seen.insert(*id))
            .map(str::to_string)
            .collect();
        if ids.is_empty() {
            return Err(ServiceError::BadRequest("no account IDs given".into()));
        }
        if ids.len() > MAX_REPORT_ACCOUNTS {
            return Err(ServiceError::BadRequest(format!(
                "at most {} account IDs per report",
                MAX_REPORT_ACCOUNTS
            )));
        }

        let mut reports = Vec::with_capacity(ids.len());
        for account in AccountRepo::get_by_ids(self.ctx.pool(), &ids).await? {
            match CustomerRepo::get(self.ctx.pool(), &account.customer_id, organization).await {
                Ok(customer) => reports.push(AccountReport { customer, account }),
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(reports)
    }
}
