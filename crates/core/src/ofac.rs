//! Sanctions screening results, status audit rows and SSN records.

use crate::customer::CustomerStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Best match returned by a sanctions list lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdnMatch {
    pub entity_id: String,
    pub sdn_name: String,
    pub sdn_type: String,
    /// Match score in `[0, 1]`
    pub match_score: f64,
}

impl SdnMatch {
    pub fn new(entity_id: &str, sdn_name: &str, sdn_type: &str, match_score: f64) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            sdn_name: sdn_name.to_string(),
            sdn_type: sdn_type.to_string(),
            match_score: match_score.clamp(0.0, 1.0),
        }
    }
}

/// Persisted OFAC snapshot. The latest one per customer is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfacSearch {
    pub entity_id: String,
    pub sdn_name: String,
    pub sdn_type: String,
    pub match_score: f64,
    pub blocked: bool,
    pub created_at: DateTime<Utc>,
}

impl OfacSearch {
    pub fn from_match(sdn: &SdnMatch, blocked: bool) -> Self {
        Self {
            entity_id: sdn.entity_id.clone(),
            sdn_name: sdn.sdn_name.clone(),
            sdn_type: sdn.sdn_type.clone(),
            match_score: sdn.match_score,
            blocked,
            created_at: Utc::now(),
        }
    }
}

/// Append-only audit row written together with every status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub customer_id: String,
    pub future_status: CustomerStatus,
    pub comment: String,
    pub changed_at: DateTime<Utc>,
}

/// Who an SSN record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SsnOwnerKind {
    Customer,
    Representative,
}

impl SsnOwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SsnOwnerKind::Customer => "customer",
            SsnOwnerKind::Representative => "representative",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(SsnOwnerKind::Customer),
            "representative" => Some(SsnOwnerKind::Representative),
            _ => None,
        }
    }
}

impl fmt::Display for SsnOwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Encrypted SSN. The raw value is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsnRecord {
    pub owner_id: String,
    pub owner_kind: SsnOwnerKind,
    /// Base64 ciphertext from the at-rest keeper
    #[serde(skip_serializing)]
    pub encrypted: String,
    pub masked: String,
    pub created_at: DateTime<Utc>,
}
