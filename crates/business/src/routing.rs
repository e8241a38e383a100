//! Routing-number lookup and its process-wide LRU cache.

use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use customers_core::Institution;
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Resolves a routing number to its institution.
#[async_trait]
pub trait RoutingLookup: Send + Sync {
    /// `None` when the routing number is unknown.
    async fn lookup(&self, routing_number: &str) -> ServiceResult<Option<Institution>>;
}

/// Fed ACH directory search over HTTP:
/// `GET {endpoint}/fed/ach/search?routingNumber=..`
pub struct HttpRoutingLookup {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct AchSearchResponse {
    #[serde(rename = "achParticipants", default)]
    participants: Vec<AchParticipant>,
}

#[derive(Debug, Deserialize)]
struct AchParticipant {
    #[serde(rename = "routingNumber")]
    routing_number: String,
    #[serde(rename = "customerName")]
    customer_name: String,
    #[serde(rename = "achLocation", default)]
    location: Option<AchLocation>,
}

#[derive(Debug, Deserialize)]
struct AchLocation {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

impl HttpRoutingLookup {
    pub fn new(endpoint: &str, timeout: Duration) -> ServiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::internal("routing.client", e))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RoutingLookup for HttpRoutingLookup {
    async fn lookup(&self, routing_number: &str) -> ServiceResult<Option<Institution>> {
        let response = self
            .client
            .get(format!("{}/fed/ach/search", self.endpoint))
            .query(&[("routingNumber", routing_number)])
            .send()
            .await
            .map_err(|e| ServiceError::internal("routing.lookup", e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: AchSearchResponse = response
            .error_for_status()
            .map_err(|e| ServiceError::internal("routing.lookup", e))?
            .json()
            .await
            .map_err(|e| ServiceError::internal("routing.lookup", e))?;

        Ok(body
            .participants
            .into_iter()
            .find(|p| p.routing_number == routing_number)
            .map(|p| {
                let (city, state) = p
                    .location
                    .map(|l| (l.city, l.state))
                    .unwrap_or((None, None));
                Institution {
                    routing_number: p.routing_number,
                    name: p.customer_name,
                    city,
                    state,
                }
            }))
    }
}

/// Fixed routing directory, for tests and deployments without a lookup
/// endpoint.
#[derive(Default)]
pub struct StaticRoutingLookup {
    institutions: RwLock<HashMap<String, Institution>>,
    lookups: AtomicUsize,
}

impl StaticRoutingLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, routing_number: &str, name: &str) -> Self {
        self.insert(Institution::new(routing_number, name));
        self
    }

    pub fn insert(&self, institution: Institution) {
        self.institutions
            .write()
            .insert(institution.routing_number.clone(), institution);
    }

    /// Number of lookups served
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoutingLookup for StaticRoutingLookup {
    async fn lookup(&self, routing_number: &str) -> ServiceResult<Option<Institution>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.institutions.read().get(routing_number).cloned())
    }
}

/// LRU cache in front of a [`RoutingLookup`].
///
/// Only found institutions are cached. Unknown numbers and lookup errors go
/// back to the source on the next call.
pub struct RoutingNumberCache {
    source: Arc<dyn RoutingLookup>,
    cache: Mutex<LruCache<String, Institution>>,
}

impl RoutingNumberCache {
    pub fn new(source: Arc<dyn RoutingLookup>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            source,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn lookup(&self, routing_number: &str) -> ServiceResult<Option<Institution>> {
        let cached = self.cache.lock().get(routing_number).cloned();
        if let Some(hit) = cached {
            tracing::debug!(routing_number, "routing cache hit");
            return Ok(Some(hit));
        }

        let found = self.source.lookup(routing_number).await?;
        if let Some(institution) = &found {
            self.cache
                .lock()
                .put(routing_number.to_string(), institution.clone());
        }
        Ok(found)
    }

    /// Fail with `RoutingUnknown` unless the routing number resolves.
    pub async fn require(&self, routing_number: &str) -> ServiceResult<Institution> {
        self.lookup(routing_number)
            .await?
            .ok_or_else(|| ServiceError::RoutingUnknown(routing_number.to_string()))
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}
