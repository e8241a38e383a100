//! Business layer errors
//!
//! Every failure maps to one caller-facing [`ErrorKind`] through
//! [`ServiceError::kind`].

use customers_core::{CoreError, ErrorKind};
use customers_persistence::PersistenceError;
use customers_secrets::KeeperError;
use thiserror::Error;

/// Business operation errors
#[derive(Debug, Error)]
pub enum ServiceError {
    // === Caller errors ===
    #[error("{0}")]
    BadRequest(String),

    #[error("Routing number not found: {0}")]
    RoutingUnknown(String),

    #[error("Unknown validation strategy {strategy} for vendor {vendor}")]
    UnknownStrategy { strategy: String, vendor: String },

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // === Validation outcomes ===
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Not ready: {0}")]
    NotReady(String),

    // === Internal faults ===
    #[error("Internal error in {subsystem}: {message}")]
    Internal {
        subsystem: &'static str,
        message: String,
    },

    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: &'static str, after_ms: u64 },

    // === Wrapped errors ===
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Persistence(PersistenceError),
}

/// Result type alias for business operations
pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(entity: &'static str, id: &str) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Internal fault tagged with its subsystem. Logged on construction.
    pub fn internal(subsystem: &'static str, err: impl std::fmt::Display) -> Self {
        let message = err.to_string();
        tracing::error!(subsystem, error = %message, "internal error");
        Self::Internal { subsystem, message }
    }

    pub fn keeper(subsystem: &'static str, err: KeeperError) -> Self {
        Self::internal(subsystem, err)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest(_)
            | Self::RoutingUnknown(_)
            | Self::UnknownStrategy { .. }
            | Self::PayloadTooLarge(_) => ErrorKind::BadRequest,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::ValidationFailed(_) => ErrorKind::ValidationFailed,
            Self::NotReady(_) => ErrorKind::NotReady,
            Self::Internal { .. } | Self::Timeout { .. } => ErrorKind::Internal,
            Self::Core(e) => e.kind(),
            Self::Persistence(e) => e.kind(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<PersistenceError> for ServiceError {
    /// Store faults become `Internal` tagged with their subsystem; domain
    /// outcomes (not found, conflicts, rule violations) pass through.
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::Keeper { subsystem, source } => Self::internal(subsystem, source),
            PersistenceError::Commit(e) => Self::internal("tx.Commit", e),
            PersistenceError::Database(e) => Self::internal("store", e),
            other => Self::Persistence(other),
        }
    }
}

/// Run `fut` under a deadline, mapping expiry to [`ServiceError::Timeout`].
pub async fn with_timeout<T, F>(
    operation: &'static str,
    after: std::time::Duration,
    fut: F,
) -> ServiceResult<T>
where
    F: std::future::Future<Output = ServiceResult<T>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => {
            let after_ms = after.as_millis() as u64;
            tracing::warn!(operation, after_ms, "operation timed out");
            Err(ServiceError::Timeout { operation, after_ms })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ServiceError::RoutingUnknown("1".into()).kind(), ErrorKind::BadRequest);
        assert_eq!(
            ServiceError::Persistence(PersistenceError::UniqueViolation("x".into())).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            ServiceError::Core(CoreError::InvalidAccountNumber).kind(),
            ErrorKind::BadRequest
        );
        assert_eq!(
            ServiceError::internal("saveSSN", "keeper closed").kind(),
            ErrorKind::Internal
        );
        assert!(ServiceError::from(PersistenceError::not_found("Customer", "c1")).is_not_found());
    }

    #[test]
    fn test_keeper_failure_keeps_subsystem() {
        let err = ServiceError::from(PersistenceError::keeper(
            "saveSSN",
            KeeperError::Unavailable("closed".into()),
        ));
        assert!(matches!(err, ServiceError::Internal { subsystem: "saveSSN", .. }));
    }

    #[test]
    fn test_internal_carries_subsystem() {
        let err = ServiceError::internal("tx.Commit", "disk full");
        assert_eq!(err.to_string(), "Internal error in tx.Commit: disk full");
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result: ServiceResult<()> = with_timeout("sanctions.search", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ServiceError::Timeout { .. })));

        let ok = with_timeout("noop", Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);
    }
}
