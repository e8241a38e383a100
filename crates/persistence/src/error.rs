//! # Persistence Errors
//!
//! Error types for the persistence layer, wrapping sqlx and keeper errors.

use customers_core::{CoreError, ErrorKind};
use customers_secrets::KeeperError;
use thiserror::Error;

/// Persistence layer errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    // === Database errors ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Transaction commit failed: {0}")]
    Commit(#[source] sqlx::Error),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity} with id {id}")]
    AlreadyExists { entity: String, id: String },

    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    #[error("Owner {owner_id} already has a {kind} address")]
    DuplicateAddressKind { owner_id: String, kind: String },

    // === Domain rule violations raised at write time ===
    #[error("{0}")]
    Rule(#[from] CoreError),

    // === Secret keeper ===
    #[error("Keeper error during {subsystem}: {source}")]
    Keeper {
        subsystem: &'static str,
        #[source]
        source: KeeperError,
    },

    // === Conversion errors ===
    #[error("Invalid enum value: {field} = {value}")]
    InvalidEnumValue { field: String, value: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for PersistenceError
pub type PersistenceResult<T> = Result<T, PersistenceError>;

impl PersistenceError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn already_exists(entity: &str, id: &str) -> Self {
        Self::AlreadyExists {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn invalid_enum(field: &str, value: &str) -> Self {
        Self::InvalidEnumValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn commit(err: sqlx::Error) -> Self {
        Self::Commit(err)
    }

    pub fn keeper(subsystem: &'static str, source: KeeperError) -> Self {
        Self::Keeper { subsystem, source }
    }

    /// Turn a unique-constraint failure into [`PersistenceError::UniqueViolation`].
    pub fn from_write(err: sqlx::Error, what: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::UniqueViolation(what.to_string())
            }
            _ => Self::Database(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } | Self::UniqueViolation(_) => ErrorKind::Conflict,
            Self::DuplicateAddressKind { .. } | Self::Rule(_) => ErrorKind::BadRequest,
            Self::Database(_)
            | Self::Commit(_)
            | Self::Keeper { .. }
            | Self::InvalidEnumValue { .. }
            | Self::Serialization(_) => ErrorKind::Internal,
        }
    }
}
