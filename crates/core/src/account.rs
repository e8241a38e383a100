//! # Account Module
//!
//! Bank accounts attached to customers, and the validation records that prove
//! ownership of them.
//!
//! Account status only moves forward on the normal path:
//! `none -> validated`. Any other change is an administrative override.

use crate::error::{CoreError, CoreResult};
use crate::validate::{validate_account_number, validate_routing_number};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Created, ownership not proven yet
    None,
    /// Ownership proven through a validation strategy
    Validated,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::None => "none",
            AccountStatus::Validated => "validated",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Some(AccountStatus::None),
            "validated" => Some(AccountStatus::Validated),
            _ => None,
        }
    }

    /// Transition rule for the normal (non-administrative) path.
    pub fn check_transition(self, to: AccountStatus) -> CoreResult<()> {
        match (self, to) {
            (AccountStatus::None, _) => Ok(()),
            (AccountStatus::Validated, AccountStatus::Validated) => Ok(()),
            (from, to) => Err(CoreError::InvalidAccountTransition {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccountType {
    Checking,
    Savings,
    Loan,
    GeneralLedger,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
            AccountType::Loan => "loan",
            AccountType::GeneralLedger => "generalLedger",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['_', '-'], "").as_str() {
            "checking" => Some(AccountType::Checking),
            "savings" => Some(AccountType::Savings),
            "loan" => Some(AccountType::Loan),
            "generalledger" => Some(AccountType::GeneralLedger),
            _ => None,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolderType {
    Individual,
    Business,
}

impl HolderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HolderType::Individual => "individual",
            HolderType::Business => "business",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "individual" => Some(HolderType::Individual),
            "business" => Some(HolderType::Business),
            _ => None,
        }
    }
}

impl fmt::Display for HolderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bank account as exposed to callers. Carries only the masked number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub customer_id: String,
    /// Actor who created the account
    pub user_id: String,
    pub masked_account_number: String,
    pub routing_number: String,
    pub holder_name: String,
    pub holder_type: HolderType,
    pub account_type: AccountType,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

/// Payload for creating an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub holder_name: String,
    pub holder_type: HolderType,
    pub account_type: AccountType,
    pub routing_number: String,
    /// Raw account number; encrypted before it reaches the store.
    pub account_number: String,
}

impl CreateAccountRequest {
    pub fn new(routing_number: &str, account_number: &str, account_type: AccountType) -> Self {
        Self {
            holder_name: String::new(),
            holder_type: HolderType::Individual,
            account_type,
            routing_number: routing_number.to_string(),
            account_number: account_number.to_string(),
        }
    }

    pub fn with_holder(mut self, holder_name: &str, holder_type: HolderType) -> Self {
        self.holder_name = holder_name.to_string();
        self.holder_type = holder_type;
        self
    }

    pub fn validate(&self) -> CoreResult<()> {
        validate_routing_number(&self.routing_number)?;
        validate_account_number(&self.account_number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Init,
    Completed,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Init => "init",
            ValidationStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "init" => Some(ValidationStatus::Init),
            "completed" => Some(ValidationStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One attempt at proving ownership of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    pub validation_id: String,
    pub account_id: String,
    pub status: ValidationStatus,
    pub strategy: String,
    pub vendor: String,
    /// Response returned by the strategy's `init` call, replayed on re-init
    pub vendor_response: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Financial institution details behind a routing number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    pub routing_number: String,
    pub name: String,
    pub city: Option<String>,
    pub state: Option<String>,
}

impl Institution {
    pub fn new(routing_number: &str, name: &str) -> Self {
        Self {
            routing_number: routing_number.to_string(),
            name: name.to_string(),
            city: None,
            state: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_status_transitions() {
        assert!(AccountStatus::None
            .check_transition(AccountStatus::Validated)
            .is_ok());
        assert!(AccountStatus::Validated
            .check_transition(AccountStatus::Validated)
            .is_ok());
        assert!(matches!(
            AccountStatus::Validated.check_transition(AccountStatus::None),
            Err(CoreError::InvalidAccountTransition { .. })
        ));
    }

    #[test]
    fn test_account_type_str() {
        assert_eq!(AccountType::from_str("Checking"), Some(AccountType::Checking));
        assert_eq!(
            AccountType::from_str("general_ledger"),
            Some(AccountType::GeneralLedger)
        );
        assert_eq!(AccountType::GeneralLedger.as_str(), "generalLedger");
        assert_eq!(AccountType::from_str("brokerage"), None);
    }

    #[test]
    fn test_create_request_validation() {
        let req = CreateAccountRequest::new("987654320", "123", AccountType::Checking);
        assert!(req.validate().is_ok());

        let req = CreateAccountRequest::new("987654321", "123", AccountType::Checking);
        assert!(matches!(
            req.validate(),
            Err(CoreError::InvalidRoutingNumber(_))
        ));

        let req = CreateAccountRequest::new("987654320", "", AccountType::Savings);
        assert!(matches!(req.validate(), Err(CoreError::InvalidAccountNumber)));
    }
}
