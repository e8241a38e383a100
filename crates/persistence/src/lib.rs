//! # Customers Persistence
//!
//! SQLite stores for customers, representatives, accounts, validations,
//! documents, disclaimers and organization configuration.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use customers_persistence::{CustomerRepo, Database};
//!
//! let db = Database::init("sqlite:customers.db").await?;
//! let customer = CustomerRepo::get(db.pool(), &id, "moov").await?;
//! ```
//!
//! Soft-deleted rows (`deleted_at` set) are invisible to every read.

pub mod error;
pub mod sqlite;

pub use error::{PersistenceError, PersistenceResult};
pub use sqlite::{
    create_pool, create_schema, init_database, AccountRepo, AddressRepo, ConfigurationRepo,
    CustomerRepo, DisclaimerRepo, DocumentRepo, PhoneRepo, RepresentativeRepo, SsnRepo,
    ValidationRepo,
};

use sqlx::SqlitePool;

/// Database facade
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect and create the schema.
    ///
    /// # Arguments
    /// * `db_url` - SQLite database URL (e.g., "sqlite:customers.db" or "sqlite::memory:")
    pub async fn init(db_url: &str) -> PersistenceResult<Self> {
        let pool = init_database(db_url).await?;
        Ok(Self { pool })
    }

    /// Fresh in-memory database with the schema applied.
    pub async fn in_memory() -> PersistenceResult<Self> {
        Self::init("sqlite::memory:").await
    }

    /// Get SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
