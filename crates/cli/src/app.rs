//! Process setup: logging, configuration and the service context

use anyhow::{anyhow, Context, Result};
use customers_business::{Collaborators, ServiceConfig, ServiceContext, VendorCredentials};
use customers_persistence::Database;
use serde::Serialize;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use crate::Cli;

const KEY_SCHEME: &str = "base64key://";

/// `RUST_LOG` filter, `info` by default.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn database_url(db_path: &Path) -> String {
    format!("sqlite:{}", db_path.display())
}

/// Create the schema, optionally starting from an empty file.
pub async fn init_database(db_path: &Path, force: bool) -> Result<()> {
    if force && db_path.exists() {
        std::fs::remove_file(db_path).context("Failed to remove existing database")?;
        tracing::info!(path = %db_path.display(), "removed existing database");
    }
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create data directory")?;
    }

    let db = Database::init(&database_url(db_path))
        .await
        .context("Failed to initialize database")?;
    db.close().await;
    Ok(())
}

/// Configuration from the optional file, then flags and environment on top.
pub fn load_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut config = match &cli.config {
        Some(path) => ServiceConfig::from_file(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?,
        None => ServiceConfig::default(),
    }
    .with_env_overrides();

    if let Some(endpoint) = &cli.sanctions_endpoint {
        config.sanctions_endpoint = Some(endpoint.clone());
    }
    if let Some(endpoint) = &cli.fed_endpoint {
        config.routing_lookup_endpoint = Some(endpoint.clone());
    }
    if let Some(key) = &cli.app_secret_key {
        config.keepers.at_rest_uri = format!("{}{}", KEY_SCHEME, key.trim());
    }
    if let Some(key) = &cli.transit_secret_key {
        config.keepers.in_transit_uri = format!("{}{}", KEY_SCHEME, key.trim());
    }
    if let Some(secret) = &cli.blob_signing_secret {
        config.blob.fileblob_signing_secret = secret.clone();
    }
    Ok(config)
}

/// Everything a command needs.
pub struct App {
    db: Database,
    ctx: ServiceContext,
    organization: Option<String>,
    user: String,
}

impl App {
    pub async fn open(cli: &Cli) -> Result<Self> {
        if !cli.db.exists() {
            return Err(anyhow!(
                "Database not found at {}. Run 'customers init' first.",
                cli.db.display()
            ));
        }
        let config = load_config(cli)?;
        let collaborators = Collaborators::from_config(&config, &VendorCredentials::from_env())
            .context("Failed to set up collaborators")?;

        let db = Database::init(&database_url(&cli.db))
            .await
            .context("Failed to connect to database")?;
        let ctx = ServiceContext::new(&db, config, collaborators);

        Ok(Self {
            db,
            ctx,
            organization: cli.organization.clone(),
            user: cli.user.clone(),
        })
    }

    pub fn ctx(&self) -> &ServiceContext {
        &self.ctx
    }

    /// Organization for customer-scoped commands.
    pub fn organization(&self) -> Result<&str> {
        self.organization
            .as_deref()
            .map(str::trim)
            .filter(|org| !org.is_empty())
            .ok_or_else(|| anyhow!("--organization (or ORGANIZATION) is required"))
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub async fn close(&self) {
        self.ctx.close_keepers();
        self.db.close().await;
    }
}

/// Pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
