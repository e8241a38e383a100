//! Identity documents and disclaimers.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    DriversLicense,
    Passport,
    UtilityBill,
    BankStatement,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::DriversLicense => "DriversLicense",
            DocumentType::Passport => "Passport",
            DocumentType::UtilityBill => "UtilityBill",
            DocumentType::BankStatement => "BankStatement",
        }
    }

    /// Case-insensitive parse.
    pub fn parse(s: &str) -> CoreResult<Self> {
        match s.trim().to_lowercase().replace(['_', '-', ' '], "").as_str() {
            "driverslicense" => Ok(DocumentType::DriversLicense),
            "passport" => Ok(DocumentType::Passport),
            "utilitybill" => Ok(DocumentType::UtilityBill),
            "bankstatement" => Ok(DocumentType::BankStatement),
            _ => Err(CoreError::InvalidDocumentType(s.to_string())),
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata for an uploaded document. The bytes live in the blob store under
/// [`document_key`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub document_id: String,
    pub customer_id: String,
    pub document_type: DocumentType,
    /// Detected from the payload, never taken from the client
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Blob store key for a document.
pub fn document_key(customer_id: &str, document_id: &str) -> String {
    format!("customers/{}/documents/{}", customer_id, document_id)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disclaimer {
    pub disclaimer_id: String,
    pub customer_id: String,
    pub text: String,
    pub document_id: Option<String>,
    /// Set once the customer accepted it
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Disclaimer {
    pub fn is_accepted(&self) -> bool {
        self.accepted_at.is_some()
    }
}
