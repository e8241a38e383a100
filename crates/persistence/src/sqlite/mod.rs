//! SQLite persistence module
//!
//! Repository pattern for SQLite database access.

pub mod accounts;
pub mod configuration;
pub mod contacts;
pub mod customers;
pub mod documents;
pub mod representatives;
pub mod schema;
pub mod ssns;

pub use accounts::{AccountRepo, ValidationRepo};
pub use configuration::ConfigurationRepo;
pub use contacts::{AddressRepo, PhoneRepo};
pub use customers::CustomerRepo;
pub use documents::{DisclaimerRepo, DocumentRepo};
pub use representatives::RepresentativeRepo;
pub use schema::create_schema;
pub use ssns::SsnRepo;

use crate::error::PersistenceResult;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Open a pool, creating the database file if missing.
///
/// In-memory databases are pinned to a single connection that never expires,
/// since every connection to `:memory:` sees its own database.
pub async fn create_pool(database_url: &str) -> PersistenceResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new().connect_with(options).await?
    };
    Ok(pool)
}

/// Open the database and create the schema.
pub async fn init_database(database_url: &str) -> PersistenceResult<SqlitePool> {
    let pool = create_pool(database_url).await?;
    create_schema(&pool).await?;
    tracing::info!(database_url, "database schema ready");
    Ok(pool)
}
