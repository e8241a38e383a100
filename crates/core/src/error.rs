//! # Error Module
//!
//! Domain errors for customer records, using thiserror.

use std::fmt;
use thiserror::Error;

/// Error kinds surfaced to callers of the service layer.
///
/// Every error in the workspace maps onto exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Conflict,
    Unauthorized,
    ValidationFailed,
    NotReady,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::NotReady => "not_ready",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Core domain errors.
///
/// Validation failures of payloads and identifiers; nothing here touches
/// infrastructure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    // === Customer payload ===
    #[error("invalid customer: {0}")]
    InvalidCustomer(String),

    #[error("invalid customer type: {0}")]
    InvalidCustomerType(String),

    #[error("invalid customer status: {0}")]
    InvalidCustomerStatus(String),

    #[error("invalid representative type: {0}")]
    InvalidRepresentativeType(String),

    // === Metadata ===
    #[error("metadata has {count} entries, limit is {limit}")]
    TooManyMetadataEntries { count: usize, limit: usize },

    #[error("metadata value for key {key} exceeds {limit} characters")]
    MetadataValueTooLong { key: String, limit: usize },

    #[error("metadata keys must not be empty")]
    EmptyMetadataKey,

    // === Addresses and phones ===
    #[error("invalid address type: {0}")]
    InvalidAddressType(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("address is missing {0}")]
    IncompleteAddress(&'static str),

    #[error("customer already has an address of type {0}")]
    DuplicateAddressKind(String),

    #[error("invalid phone type: {0}")]
    InvalidPhoneType(String),

    // === Accounts ===
    #[error("invalid routing number: {0}")]
    InvalidRoutingNumber(String),

    #[error("invalid account number")]
    InvalidAccountNumber,

    #[error("invalid account type: {0}")]
    InvalidAccountType(String),

    #[error("invalid holder type: {0}")]
    InvalidHolderType(String),

    #[error("invalid account status: {0}")]
    InvalidAccountStatus(String),

    #[error("account status cannot move from {from} to {to}")]
    InvalidAccountTransition { from: String, to: String },

    // === Documents ===
    #[error("invalid document type: {0}")]
    InvalidDocumentType(String),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Every core error is a caller mistake.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::BadRequest
    }

    pub fn is_metadata_error(&self) -> bool {
        matches!(
            self,
            CoreError::TooManyMetadataEntries { .. }
                | CoreError::MetadataValueTooLong { .. }
                | CoreError::EmptyMetadataKey
        )
    }
}
