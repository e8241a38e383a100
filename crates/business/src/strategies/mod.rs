//! Account validation strategies
//!
//! A strategy proves that a customer owns an account. Each is registered
//! under a `(strategy, vendor)` key:
//!
//! | strategy         | vendor  | variant                    |
//! |------------------|---------|----------------------------|
//! | `micro-deposits` | `moov`  | [`Strategy::MicroDeposits`] |
//! | `instant`        | `plaid` | [`Strategy::Plaid`]         |
//! | `instant`        | `mx`    | [`Strategy::Mx`]            |
//! | `test`           | `moov`  | [`Strategy::Test`]          |

pub mod instant;
pub mod micro_deposits;

pub use instant::{LinkVendor, LinkedAccount, MockLinkVendor, MxClient, PlaidClient};
pub use micro_deposits::{
    HttpMicroDeposits, MicroDepositClient, MicroDeposits, MockMicroDeposits,
};

use crate::config::VendorCredentials;
use crate::error::{ServiceError, ServiceResult};
use customers_core::Account;
use customers_secrets::SecretKeeper;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use zeroize::Zeroizing;

/// Registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StrategyKey {
    pub strategy: &'static str,
    pub vendor: &'static str,
}

impl StrategyKey {
    pub const MICRO_DEPOSITS: StrategyKey = StrategyKey::new("micro-deposits", "moov");
    pub const PLAID: StrategyKey = StrategyKey::new("instant", "plaid");
    pub const MX: StrategyKey = StrategyKey::new("instant", "mx");
    pub const TEST: StrategyKey = StrategyKey::new("test", "moov");

    pub const ALL: [StrategyKey; 4] = [Self::MICRO_DEPOSITS, Self::PLAID, Self::MX, Self::TEST];

    const fn new(strategy: &'static str, vendor: &'static str) -> Self {
        Self { strategy, vendor }
    }

    /// Known key for a caller-supplied pair, case-insensitive.
    pub fn parse(strategy: &str, vendor: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| {
            k.strategy.eq_ignore_ascii_case(strategy.trim()) && k.vendor.eq_ignore_ascii_case(vendor.trim())
        })
    }
}

impl fmt::Display for StrategyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.strategy, self.vendor)
    }
}

/// What a strategy needs to know about the account under validation.
pub struct StrategyContext<'a> {
    pub user_id: &'a str,
    pub customer_id: &'a str,
    pub account: &'a Account,
    /// At-rest ciphertext of the account number
    pub encrypted_account_number: &'a str,
    pub keeper: &'a dyn SecretKeeper,
}

impl StrategyContext<'_> {
    /// Decrypted account number.
    pub async fn account_number(&self) -> ServiceResult<Zeroizing<String>> {
        customers_secrets::open(self.keeper, self.encrypted_account_number)
            .await
            .map_err(|e| ServiceError::keeper("decryptAccountNumber", e))
    }
}

/// Result of a successful `complete`
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub vendor_response: Value,
    /// Whether the account moves to `validated`
    pub validate_account: bool,
}

impl StrategyOutcome {
    fn validated(vendor_response: Value) -> Self {
        Self {
            vendor_response,
            validate_account: true,
        }
    }
}

/// Closed family of validation strategies.
#[derive(Clone)]
pub enum Strategy {
    MicroDeposits(Arc<dyn MicroDepositClient>),
    Plaid(Arc<dyn LinkVendor>),
    Mx(Arc<dyn LinkVendor>),
    Test,
}

impl Strategy {
    pub fn kind(&self) -> &'static str {
        match self {
            Strategy::MicroDeposits(_) => "micro-deposits",
            Strategy::Plaid(_) => "plaid",
            Strategy::Mx(_) => "mx",
            Strategy::Test => "test",
        }
    }

    /// Start a validation; the response is handed back to the caller.
    pub async fn init(&self, ctx: &StrategyContext<'_>) -> ServiceResult<Value> {
        match self {
            Strategy::MicroDeposits(client) => {
                let deposits = client.initiate(ctx.user_id, ctx.account).await?;
                tracing::info!(
                    account_id = %ctx.account.account_id,
                    micro_deposit_id = %deposits.micro_deposit_id,
                    "micro-deposits initiated"
                );
                Ok(json!({
                    "microDepositID": deposits.micro_deposit_id,
                    "status": deposits.status,
                }))
            }
            Strategy::Plaid(vendor) | Strategy::Mx(vendor) => {
                vendor.link_token(ctx.user_id, ctx.customer_id).await
            }
            Strategy::Test => Ok(json!({ "result": "initiated" })),
        }
    }

    /// Prove ownership with the caller's `request`.
    pub async fn complete(&self, ctx: &StrategyContext<'_>, request: &Value) -> ServiceResult<StrategyOutcome> {
        match self {
            Strategy::MicroDeposits(client) => {
                let reported = micro_deposits::requested_amounts(request)?;
                let deposits = client
                    .get(&ctx.account.account_id)
                    .await?
                    .ok_or_else(|| ServiceError::BadRequest("micro-deposits were never initiated".into()))?;
                micro_deposits::verify(&deposits, &reported)?;
                Ok(StrategyOutcome::validated(json!({
                    "microDepositID": deposits.micro_deposit_id,
                    "result": "validated",
                })))
            }
            Strategy::Plaid(vendor) | Strategy::Mx(vendor) => {
                let token = instant::requested_token(request)?;
                let linked = vendor.exchange(ctx.user_id, &token).await?;
                let account_number = ctx.account_number().await?;
                instant::verify(&linked, &account_number, &ctx.account.routing_number)?;
                Ok(StrategyOutcome::validated(json!({
                    "vendor": vendor.name(),
                    "result": "validated",
                })))
            }
            Strategy::Test => Ok(StrategyOutcome::validated(json!({ "result": "validated" }))),
        }
    }
}

/// Maps `(strategy, vendor)` to a configured [`Strategy`].
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<StrategyKey, Strategy>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: StrategyKey, strategy: Strategy) {
        tracing::info!(strategy = %key, "validation strategy registered");
        self.strategies.insert(key, strategy);
    }

    pub fn with(mut self, key: StrategyKey, strategy: Strategy) -> Self {
        self.register(key, strategy);
        self
    }

    /// Register every strategy whose collaborator is available. Vendors
    /// without credentials are skipped.
    pub fn from_credentials(
        credentials: &VendorCredentials,
        micro_deposits: Option<Arc<dyn MicroDepositClient>>,
        enable_test: bool,
        timeout: Duration,
    ) -> ServiceResult<Self> {
        let mut registry = Self::new();

        match micro_deposits {
            Some(client) => registry.register(StrategyKey::MICRO_DEPOSITS, Strategy::MicroDeposits(client)),
            None => tracing::warn!(strategy = %StrategyKey::MICRO_DEPOSITS, "no payments collaborator, strategy disabled"),
        }
        match &credentials.plaid {
            Some(creds) => {
                let client = PlaidClient::new(creds.clone(), instant::PLAID_SANDBOX, timeout)?;
                registry.register(StrategyKey::PLAID, Strategy::Plaid(Arc::new(client)));
            }
            None => tracing::warn!(strategy = %StrategyKey::PLAID, "missing credentials, strategy disabled"),
        }
        match &credentials.mx {
            Some(creds) => {
                let client = MxClient::new(creds.clone(), instant::MX_INTEGRATION, timeout)?;
                registry.register(StrategyKey::MX, Strategy::Mx(Arc::new(client)));
            }
            None => tracing::warn!(strategy = %StrategyKey::MX, "missing credentials, strategy disabled"),
        }
        if enable_test {
            registry.register(StrategyKey::TEST, Strategy::Test);
        }
        Ok(registry)
    }

    /// Registered strategy for a caller-supplied pair.
    pub fn get(&self, strategy: &str, vendor: &str) -> ServiceResult<(StrategyKey, &Strategy)> {
        let unknown = || ServiceError::UnknownStrategy {
            strategy: strategy.to_string(),
            vendor: vendor.to_string(),
        };
        let key = StrategyKey::parse(strategy, vendor).ok_or_else(unknown)?;
        self.strategies
            .get(&key)
            .map(|s| (key, s))
            .ok_or_else(unknown)
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<StrategyKey> {
        let mut keys: Vec<_> = self.strategies.keys().copied().collect();
        keys.sort();
        keys
    }
}
