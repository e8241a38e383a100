//! Shared state handed to every service
//!
//! One `ServiceContext` lives for the whole process. Services borrow it:
//! `CustomerService::new(&ctx).create(..)`.

use crate::blob::{open_blob_store, BlobStore};
use crate::config::{ServiceConfig, VendorCredentials};
use crate::error::{ServiceError, ServiceResult};
use crate::routing::{HttpRoutingLookup, RoutingLookup, RoutingNumberCache};
use crate::sanctions::{HttpSanctionsClient, SanctionsClient};
use crate::strategies::{HttpMicroDeposits, MicroDepositClient, StrategyRegistry};
use customers_persistence::Database;
use customers_secrets::{open_keeper, SecretKeeper};
use sqlx::SqlitePool;
use std::sync::Arc;

/// External collaborators of the services.
pub struct Collaborators {
    pub at_rest: Arc<dyn SecretKeeper>,
    pub in_transit: Arc<dyn SecretKeeper>,
    /// `None` disables sanctions screening
    pub sanctions: Option<Arc<dyn SanctionsClient>>,
    /// `None` skips the routing-number preflight
    pub routing: Option<Arc<dyn RoutingLookup>>,
    pub strategies: StrategyRegistry,
    pub blobs: Arc<dyn BlobStore>,
}

impl Collaborators {
    /// Build production collaborators from configuration and vendor
    /// credentials.
    ///
    /// Keepers without a key are refused unless
    /// `allow_ephemeral_keys` is set.
    pub fn from_config(config: &ServiceConfig, credentials: &VendorCredentials) -> ServiceResult<Self> {
        let ephemeral = config.keepers.ephemeral_keepers();
        if !ephemeral.is_empty() && !config.allow_ephemeral_keys {
            return Err(ServiceError::internal(
                "keeper.open",
                format!(
                    "no key configured for {} keeper; set APP_SECRET_KEY and TRANSIT_SECRET_KEY",
                    ephemeral.join(", ")
                ),
            ));
        }

        let at_rest = open_keeper("at-rest", &config.keepers.at_rest_uri)
            .map_err(|e| ServiceError::keeper("keeper.open", e))?;
        let in_transit = open_keeper("in-transit", &config.keepers.in_transit_uri)
            .map_err(|e| ServiceError::keeper("keeper.open", e))?;

        let sanctions: Option<Arc<dyn SanctionsClient>> = match &config.sanctions_endpoint {
            Some(endpoint) => Some(Arc::new(HttpSanctionsClient::new(endpoint, config.sanctions_timeout())?)),
            None => {
                tracing::warn!("no sanctions endpoint configured, screening disabled");
                None
            }
        };

        let routing: Option<Arc<dyn RoutingLookup>> = match &config.routing_lookup_endpoint {
            Some(endpoint) => Some(Arc::new(HttpRoutingLookup::new(endpoint, config.vendor_timeout())?)),
            None => None,
        };

        let micro_deposits: Option<Arc<dyn MicroDepositClient>> = match &config.payments_endpoint {
            Some(endpoint) => Some(Arc::new(HttpMicroDeposits::new(endpoint, config.vendor_timeout())?)),
            None => None,
        };
        let strategies = StrategyRegistry::from_credentials(
            credentials,
            micro_deposits,
            config.enable_test_strategy,
            config.vendor_timeout(),
        )?;

        Ok(Self {
            at_rest,
            in_transit,
            sanctions,
            routing,
            strategies,
            blobs: open_blob_store(&config.blob)?,
        })
    }
}

/// Context for business operations
pub struct ServiceContext {
    pool: SqlitePool,
    config: ServiceConfig,
    at_rest: Arc<dyn SecretKeeper>,
    in_transit: Arc<dyn SecretKeeper>,
    sanctions: Option<Arc<dyn SanctionsClient>>,
    routing: Option<RoutingNumberCache>,
    strategies: StrategyRegistry,
    blobs: Arc<dyn BlobStore>,
}

impl ServiceContext {
    pub fn new(db: &Database, config: ServiceConfig, collaborators: Collaborators) -> Self {
        Self::from_pool(db.pool().clone(), config, collaborators)
    }

    pub fn from_pool(pool: SqlitePool, config: ServiceConfig, collaborators: Collaborators) -> Self {
        let routing = collaborators
            .routing
            .map(|lookup| RoutingNumberCache::new(lookup, config.routing_cache_capacity));
        Self {
            pool,
            config,
            at_rest: collaborators.at_rest,
            in_transit: collaborators.in_transit,
            sanctions: collaborators.sanctions,
            routing,
            strategies: collaborators.strategies,
            blobs: collaborators.blobs,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn at_rest(&self) -> &dyn SecretKeeper {
        self.at_rest.as_ref()
    }

    pub fn in_transit(&self) -> &dyn SecretKeeper {
        self.in_transit.as_ref()
    }

    pub fn sanctions(&self) -> Option<&dyn SanctionsClient> {
        self.sanctions.as_deref()
    }

    pub fn routing(&self) -> Option<&RoutingNumberCache> {
        self.routing.as_ref()
    }

    pub fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    pub fn blobs(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }

    /// Close both keepers. No request may be in flight.
    pub fn close_keepers(&self) {
        self.at_rest.close();
        self.in_transit.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeeperConfig;

    const KEY: &str = "base64key://AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

    fn config_with_blob_secret() -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.blob.fileblob_signing_secret = "s3cret".to_string();
        config
    }

    #[test]
    fn test_from_config_refuses_keyless_keepers() {
        let config = config_with_blob_secret();
        let err = Collaborators::from_config(&config, &VendorCredentials::default())
            .err()
            .unwrap();
        match err {
            ServiceError::Internal { subsystem, message } => {
                assert_eq!(subsystem, "keeper.open");
                assert!(message.contains("at-rest, in-transit"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let mut config = config_with_blob_secret();
        config.keepers.at_rest_uri = KEY.to_string();
        let err = Collaborators::from_config(&config, &VendorCredentials::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("in-transit keeper"));
    }

    #[test]
    fn test_from_config_with_keys() {
        let mut config = config_with_blob_secret();
        config.keepers = KeeperConfig {
            at_rest_uri: KEY.to_string(),
            in_transit_uri: KEY.to_string(),
        };
        assert!(config.keepers.ephemeral_keepers().is_empty());
        assert!(Collaborators::from_config(&config, &VendorCredentials::default()).is_ok());
    }

    #[test]
    fn test_from_config_allows_ephemeral_keys_when_asked() {
        let mut config = config_with_blob_secret();
        config.allow_ephemeral_keys = true;
        assert!(Collaborators::from_config(&config, &VendorCredentials::default()).is_ok());
    }
}
