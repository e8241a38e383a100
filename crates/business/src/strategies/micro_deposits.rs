//! Micro-deposit validation
//!
//! `init` asks the payments collaborator to credit small amounts to the
//! account. `complete` succeeds when the customer reports the same amounts.

use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use customers_core::{new_id, Account};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Collaborator status once deposits have landed
pub const PROCESSED: &str = "processed";

/// Deposits placed on one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroDeposits {
    #[serde(rename = "microDepositID")]
    pub micro_deposit_id: String,
    #[serde(rename = "accountID")]
    pub account_id: String,
    /// Amounts as `"USD 0.03"`
    pub amounts: Vec<String>,
    pub status: String,
}

/// Payments service placing micro-deposits.
#[async_trait]
pub trait MicroDepositClient: Send + Sync {
    async fn initiate(&self, user_id: &str, account: &Account) -> ServiceResult<MicroDeposits>;

    /// Deposits for `account_id`, `None` if never initiated.
    async fn get(&self, account_id: &str) -> ServiceResult<Option<MicroDeposits>>;
}

/// Parse `"USD 0.03"` into its currency and amount.
pub fn parse_amount(raw: &str) -> ServiceResult<(String, Decimal)> {
    let invalid = || ServiceError::BadRequest(format!("invalid micro-deposit amount: {}", raw));
    let mut parts = raw.split_whitespace();
    let (currency, value) = match (parts.next(), parts.next(), parts.next()) {
        (Some(currency), Some(value), None) => (currency, value),
        _ => return Err(invalid()),
    };
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid());
    }
    let amount = Decimal::from_str(value).map_err(|_| invalid())?;
    if amount <= Decimal::ZERO {
        return Err(invalid());
    }
    Ok((currency.to_ascii_uppercase(), amount.normalize()))
}

/// True when both lists hold the same amounts in any order.
pub fn amounts_match(reported: &[String], expected: &[String]) -> ServiceResult<bool> {
    if reported.is_empty() || reported.len() != expected.len() {
        return Ok(false);
    }
    let mut reported = reported
        .iter()
        .map(|a| parse_amount(a))
        .collect::<ServiceResult<Vec<_>>>()?;
    let mut expected = expected
        .iter()
        .map(|a| parse_amount(a))
        .collect::<ServiceResult<Vec<_>>>()?;
    reported.sort();
    expected.sort();
    Ok(reported == expected)
}

/// Reported amounts from a completion request: `{"micro-deposits": [..]}`.
pub fn requested_amounts(request: &serde_json::Value) -> ServiceResult<Vec<String>> {
    let amounts = request
        .get("micro-deposits")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ServiceError::BadRequest("missing micro-deposits".into()))?;
    amounts
        .iter()
        .map(|a| {
            a.as_str()
                .map(str::to_string)
                .ok_or_else(|| ServiceError::BadRequest("micro-deposit amounts must be strings".into()))
        })
        .collect()
}

/// Check reported amounts against the collaborator's record.
pub fn verify(deposits: &MicroDeposits, reported: &[String]) -> ServiceResult<()> {
    if deposits.status != PROCESSED {
        return Err(ServiceError::NotReady(format!(
            "micro-deposits are {}",
            deposits.status
        )));
    }
    if !amounts_match(reported, &deposits.amounts)? {
        return Err(ServiceError::ValidationFailed(
            "micro-deposit amounts do not match".into(),
        ));
    }
    Ok(())
}

/// HTTP client for the payments service.
///
/// `POST {endpoint}/accounts/{id}/micro-deposits` initiates,
/// `GET` on the same path reads back the deposits.
pub struct HttpMicroDeposits {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpMicroDeposits {
    pub fn new(endpoint: &str, timeout: Duration) -> ServiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::internal("microDeposits.client", e))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, account_id: &str) -> String {
        format!("{}/accounts/{}/micro-deposits", self.endpoint, account_id)
    }
}

#[async_trait]
impl MicroDepositClient for HttpMicroDeposits {
    async fn initiate(&self, user_id: &str, account: &Account) -> ServiceResult<MicroDeposits> {
        let body = serde_json::json!({
            "destination": {
                "customerID": account.customer_id,
                "accountID": account.account_id,
            }
        });
        self.client
            .post(self.url(&account.account_id))
            .header("X-User-ID", user_id)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ServiceError::internal("microDeposits.initiate", e))?
            .json()
            .await
            .map_err(|e| ServiceError::internal("microDeposits.initiate", e))
    }

    async fn get(&self, account_id: &str) -> ServiceResult<Option<MicroDeposits>> {
        let response = self
            .client
            .get(self.url(account_id))
            .send()
            .await
            .map_err(|e| ServiceError::internal("microDeposits.get", e))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        response
            .error_for_status()
            .map_err(|e| ServiceError::internal("microDeposits.get", e))?
            .json()
            .await
            .map(Some)
            .map_err(|e| ServiceError::internal("microDeposits.get", e))
    }
}

/// In-memory payments collaborator.
///
/// Initiating twice for the same account returns the first record.
pub struct MockMicroDeposits {
    amounts: Vec<String>,
    status: RwLock<String>,
    deposits: RwLock<HashMap<String, MicroDeposits>>,
    initiated: AtomicUsize,
}

impl MockMicroDeposits {
    /// Collaborator placing `amounts`, already `processed`.
    pub fn new(amounts: &[&str]) -> Self {
        Self {
            amounts: amounts.iter().map(|a| a.to_string()).collect(),
            status: RwLock::new(PROCESSED.to_string()),
            deposits: RwLock::new(HashMap::new()),
            initiated: AtomicUsize::new(0),
        }
    }

    pub fn with_status(self, status: &str) -> Self {
        *self.status.write() = status.to_string();
        self
    }

    /// Move every record, present and future, to `status`.
    pub fn set_status(&self, status: &str) {
        *self.status.write() = status.to_string();
        for deposits in self.deposits.write().values_mut() {
            deposits.status = status.to_string();
        }
    }

    /// Number of distinct initiations
    pub fn initiated(&self) -> usize {
        self.initiated.load(Ordering::SeqCst)
    }
}

impl Default for MockMicroDeposits {
    fn default() -> Self {
        Self::new(&["USD 0.03", "USD 0.07"])
    }
}

#[async_trait]
impl MicroDepositClient for MockMicroDeposits {
    async fn initiate(&self, _user_id: &str, account: &Account) -> ServiceResult<MicroDeposits> {
        let mut deposits = self.deposits.write();
        if let Some(existing) = deposits.get(&account.account_id) {
            return Ok(existing.clone());
        }
        let record = MicroDeposits {
            micro_deposit_id: new_id(),
            account_id: account.account_id.clone(),
            amounts: self.amounts.clone(),
            status: self.status.read().clone(),
        };
        deposits.insert(account.account_id.clone(), record.clone());
        self.initiated.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    async fn get(&self, account_id: &str) -> ServiceResult<Option<MicroDeposits>> {
        Ok(self.deposits.read().get(account_id).cloned())
    }
}
