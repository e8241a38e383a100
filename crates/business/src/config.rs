//! Service configuration
//!
//! Every value has a default; a JSON file may override any subset.
//! Vendor credentials come from the environment only.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the customer services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    // === Sanctions ===
    /// Scores at or above this block the customer
    #[serde(default = "default_ofac_match_threshold")]
    pub ofac_match_threshold: f64,

    #[serde(default)]
    pub sanctions_endpoint: Option<String>,

    // === Timeouts ===
    #[serde(default = "default_sanctions_timeout_ms")]
    pub sanctions_timeout_ms: u64,

    #[serde(default = "default_blob_open_timeout_ms")]
    pub blob_open_timeout_ms: u64,

    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// Per-call timeout for strategy vendors (payments, Plaid, MX)
    #[serde(default = "default_vendor_timeout_ms")]
    pub vendor_timeout_ms: u64,

    // === Validation strategies ===
    /// Payments service placing micro-deposits
    #[serde(default)]
    pub payments_endpoint: Option<String>,

    // === Routing numbers ===
    #[serde(default)]
    pub routing_lookup_endpoint: Option<String>,

    #[serde(default = "default_routing_cache_capacity")]
    pub routing_cache_capacity: usize,

    // === Storage ===
    #[serde(default)]
    pub blob: BlobConfig,

    #[serde(default)]
    pub keepers: KeeperConfig,

    /// Let keeper URIs without a key generate a per-process random key.
    /// Values sealed under such a key cannot be read after a restart.
    #[serde(default)]
    pub allow_ephemeral_keys: bool,

    // === Transport ===
    /// Header carrying the organization on every request
    #[serde(default = "default_organization_header")]
    pub organization_header: String,

    /// Upper bound for search page size
    #[serde(default = "default_search_max_count")]
    pub search_max_count: i64,

    /// Register the always-succeeding `test` strategy
    #[serde(default)]
    pub enable_test_strategy: bool,
}

/// Blob store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BlobProvider {
    #[default]
    File,
    S3,
    Gcs,
}

impl BlobProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobProvider::File => "file",
            BlobProvider::S3 => "s3",
            BlobProvider::Gcs => "gcs",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobConfig {
    #[serde(default)]
    pub provider: BlobProvider,

    /// Bucket name; a directory for the file provider
    #[serde(default = "default_bucket")]
    pub bucket: String,

    #[serde(default = "default_fileblob_base_url")]
    pub fileblob_base_url: String,

    #[serde(default)]
    pub fileblob_signing_secret: String,

    #[serde(default = "default_fileblob_path")]
    pub fileblob_path: String,
}

/// Keeper URIs. See `customers_secrets::open_keeper` for the schemes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeeperConfig {
    #[serde(default = "default_keeper_uri")]
    pub at_rest_uri: String,

    #[serde(default = "default_keeper_uri")]
    pub in_transit_uri: String,
}

// Default value functions for serde
fn default_ofac_match_threshold() -> f64 {
    0.99
}

fn default_sanctions_timeout_ms() -> u64 {
    10_000
}

fn default_blob_open_timeout_ms() -> u64 {
    10_000
}

fn default_write_timeout_ms() -> u64 {
    60_000
}

fn default_vendor_timeout_ms() -> u64 {
    10_000
}

fn default_routing_cache_capacity() -> usize {
    1_000
}

fn default_organization_header() -> String {
    "X-Organization".to_string()
}

fn default_search_max_count() -> i64 {
    200
}

fn default_bucket() -> String {
    "./storage".to_string()
}

fn default_fileblob_base_url() -> String {
    "http://localhost:8087".to_string()
}

fn default_fileblob_path() -> String {
    "/files".to_string()
}

fn default_keeper_uri() -> String {
    "base64key://".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            ofac_match_threshold: default_ofac_match_threshold(),
            sanctions_endpoint: None,
            sanctions_timeout_ms: default_sanctions_timeout_ms(),
            blob_open_timeout_ms: default_blob_open_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            vendor_timeout_ms: default_vendor_timeout_ms(),
            payments_endpoint: None,
            routing_lookup_endpoint: None,
            routing_cache_capacity: default_routing_cache_capacity(),
            blob: BlobConfig::default(),
            keepers: KeeperConfig::default(),
            allow_ephemeral_keys: false,
            organization_header: default_organization_header(),
            search_max_count: default_search_max_count(),
            enable_test_strategy: false,
        }
    }
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            provider: BlobProvider::default(),
            bucket: default_bucket(),
            fileblob_base_url: default_fileblob_base_url(),
            fileblob_signing_secret: String::new(),
            fileblob_path: default_fileblob_path(),
        }
    }
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            at_rest_uri: default_keeper_uri(),
            in_transit_uri: default_keeper_uri(),
        }
    }
}

impl KeeperConfig {
    /// Names of keepers whose URI carries no key material.
    pub fn ephemeral_keepers(&self) -> Vec<&'static str> {
        [("at-rest", &self.at_rest_uri), ("in-transit", &self.in_transit_uri)]
            .into_iter()
            .filter(|(_, uri)| uri.trim() == default_keeper_uri())
            .map(|(name, _)| name)
            .collect()
    }
}

impl ServiceConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Apply `ORGANIZATION_HEADER` from the environment when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(header) = std::env::var("ORGANIZATION_HEADER") {
            if !header.trim().is_empty() {
                self.organization_header = header.trim().to_string();
            }
        }
        self
    }

    pub fn sanctions_timeout(&self) -> Duration {
        Duration::from_millis(self.sanctions_timeout_ms)
    }

    pub fn blob_open_timeout(&self) -> Duration {
        Duration::from_millis(self.blob_open_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn vendor_timeout(&self) -> Duration {
        Duration::from_millis(self.vendor_timeout_ms)
    }

    /// Organization named by the configured header, matched case-insensitively.
    pub fn organization_from_headers<'h>(
        &self,
        headers: impl IntoIterator<Item = (&'h str, &'h str)>,
    ) -> Option<String> {
        headers
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&self.organization_header))
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

/// Plaid API credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaidCredentials {
    pub client_id: String,
    pub secret: String,
}

/// MX API credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxCredentials {
    pub client_id: String,
    pub api_key: String,
}

/// Strategy vendor credentials. A vendor is absent when any of its
/// variables is missing or empty.
#[derive(Debug, Clone, Default)]
pub struct VendorCredentials {
    pub plaid: Option<PlaidCredentials>,
    pub mx: Option<MxCredentials>,
}

impl VendorCredentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let plaid = match (get("PLAID_CLIENT_ID"), get("PLAID_SECRET")) {
            (Some(client_id), Some(secret)) => Some(PlaidCredentials { client_id, secret }),
            _ => None,
        };
        let mx = match (get("MX_CLIENT_ID"), get("MX_API_KEY")) {
            (Some(client_id), Some(api_key)) => Some(MxCredentials { client_id, api_key }),
            _ => None,
        };
        Self { plaid, mx }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();

        assert_eq!(config.ofac_match_threshold, 0.99);
        assert_eq!(config.sanctions_timeout(), Duration::from_secs(10));
        assert_eq!(config.blob_open_timeout(), Duration::from_secs(10));
        assert_eq!(config.write_timeout(), Duration::from_secs(60));
        assert_eq!(config.routing_cache_capacity, 1_000);
        assert_eq!(config.organization_header, "X-Organization");
        assert_eq!(config.search_max_count, 200);
        assert_eq!(config.blob.provider, BlobProvider::File);
        assert_eq!(config.blob.fileblob_path, "/files");
        assert_eq!(config.keepers.at_rest_uri, "base64key://");
        assert!(!config.enable_test_strategy);
        assert_eq!(config.vendor_timeout(), Duration::from_secs(10));
        assert!(config.payments_endpoint.is_none());
    }

    #[test]
    fn test_organization_from_headers() {
        let config = ServiceConfig::default();
        let headers = [("content-type", "application/json"), ("x-organization", " org1 ")];
        assert_eq!(config.organization_from_headers(headers), Some("org1".to_string()));
        assert_eq!(config.organization_from_headers([("X-Organization", "  ")]), None);
        assert_eq!(config.organization_from_headers([("X-Tenant", "org1")]), None);
    }

    #[test]
    fn test_config_partial_json() {
        let json = r#"{ "ofac_match_threshold": 0.9, "blob": { "provider": "s3", "bucket": "docs" } }"#;
        let config: ServiceConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.ofac_match_threshold, 0.9);
        assert_eq!(config.blob.provider, BlobProvider::S3);
        assert_eq!(config.blob.bucket, "docs");
        assert_eq!(config.blob.fileblob_path, "/files");
        assert_eq!(config.sanctions_timeout_ms, 10_000);
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "search_max_count": 50 }"#).unwrap();

        let config = ServiceConfig::from_file(&path).unwrap();
        assert_eq!(config.search_max_count, 50);

        std::fs::write(&path, "not json").unwrap();
        assert!(ServiceConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_vendor_credentials_require_all_keys() {
        let env: HashMap<&str, &str> = [
            ("PLAID_CLIENT_ID", "id"),
            ("PLAID_SECRET", "secret"),
            ("MX_CLIENT_ID", "mx-id"),
            ("MX_API_KEY", " "),
        ]
        .into_iter()
        .collect();

        let creds = VendorCredentials::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(creds.plaid.unwrap().client_id, "id");
        assert!(creds.mx.is_none());
    }
}
