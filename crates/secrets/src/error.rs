//! Keeper errors

use thiserror::Error;

/// Errors from a secret keeper
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeeperError {
    /// Key source unreachable, or the keeper was closed
    #[error("keeper unavailable: {0}")]
    Unavailable(String),

    /// Ciphertext is corrupt or was produced by another key
    #[error("malformed ciphertext: {0}")]
    Malformed(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("unsupported keeper uri: {0}")]
    UnsupportedUri(String),
}

/// Result type for keeper operations
pub type KeeperResult<T> = Result<T, KeeperError>;
