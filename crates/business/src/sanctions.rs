//! Sanctions list clients
//!
//! The screening workflow lives in [`crate::ofac`]; this module only talks to
//! the search service.

use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use customers_core::SdnMatch;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Searches the sanctions (SDN) list by name.
#[async_trait]
pub trait SanctionsClient: Send + Sync {
    /// Best match for `name`, if the list has any entry for it.
    async fn search(&self, name: &str) -> ServiceResult<Option<SdnMatch>>;
}

/// HTTP client for a watchman-style search service.
///
/// `GET {endpoint}/search?name=..&limit=1` answering
/// `{"SDNs":[{"entityID","sdnName","sdnType","match"}]}`.
pub struct HttpSanctionsClient {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "SDNs", default)]
    sdns: Vec<SdnEntry>,
}

#[derive(Debug, Deserialize)]
struct SdnEntry {
    #[serde(rename = "entityID")]
    entity_id: String,
    #[serde(rename = "sdnName")]
    sdn_name: String,
    #[serde(rename = "sdnType", default)]
    sdn_type: String,
    #[serde(rename = "match", default)]
    match_score: f64,
}

impl HttpSanctionsClient {
    pub fn new(endpoint: &str, timeout: Duration) -> ServiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::internal("sanctions.client", e))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SanctionsClient for HttpSanctionsClient {
    async fn search(&self, name: &str) -> ServiceResult<Option<SdnMatch>> {
        let response = self
            .client
            .get(format!("{}/search", self.endpoint))
            .query(&[("name", name), ("limit", "1")])
            .send()
            .await
            .map_err(|e| ServiceError::internal("sanctions.search", e))?
            .error_for_status()
            .map_err(|e| ServiceError::internal("sanctions.search", e))?;

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::internal("sanctions.search", e))?;

        Ok(body
            .sdns
            .into_iter()
            .next()
            .map(|sdn| SdnMatch::new(&sdn.entity_id, &sdn.sdn_name, &sdn.sdn_type, sdn.match_score)))
    }
}

/// In-memory sanctions client for tests and local runs.
///
/// Answers per-name matches first, then the default match.
pub struct MockSanctionsClient {
    default_match: RwLock<Option<SdnMatch>>,
    by_name: RwLock<HashMap<String, SdnMatch>>,
    failing: AtomicBool,
    calls: RwLock<Vec<String>>,
}

impl MockSanctionsClient {
    /// Client that finds nothing
    pub fn new() -> Self {
        Self {
            default_match: RwLock::new(None),
            by_name: RwLock::new(HashMap::new()),
            failing: AtomicBool::new(false),
            calls: RwLock::new(Vec::new()),
        }
    }

    /// Client answering every name with one entity at `score`
    pub fn returning(entity_id: &str, score: f64) -> Self {
        let client = Self::new();
        client.set_match(entity_id, score);
        client
    }

    pub fn set_match(&self, entity_id: &str, score: f64) {
        *self.default_match.write() = Some(SdnMatch::new(entity_id, "MOCK SDN", "individual", score));
    }

    pub fn set_match_for(&self, name: &str, sdn: SdnMatch) {
        self.by_name.write().insert(name.to_string(), sdn);
    }

    /// Make every search fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Names searched so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().clone()
    }
}

impl Default for MockSanctionsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SanctionsClient for MockSanctionsClient {
    async fn search(&self, name: &str) -> ServiceResult<Option<SdnMatch>> {
        self.calls.write().push(name.to_string());
        if self.failing.load(Ordering::SeqCst) {
            return Err(ServiceError::internal("sanctions.search", "mock sanctions failure"));
        }
        if let Some(sdn) = self.by_name.read().get(name) {
            return Ok(Some(sdn.clone()));
        }
        Ok(self.default_match.read().clone())
    }
}
