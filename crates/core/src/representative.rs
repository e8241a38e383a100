//! # Representative Module
//!
//! Natural persons acting for a business customer (beneficial owners and
//! controllers).

use crate::customer::{check_single_primary, Address, AddressRequest, Phone, PhoneRequest};
use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepresentativeType {
    /// Beneficial owner
    Owner,
    /// Individual with significant control
    Controller,
}

impl RepresentativeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepresentativeType::Owner => "owner",
            RepresentativeType::Controller => "controller",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "owner" => Some(RepresentativeType::Owner),
            "controller" => Some(RepresentativeType::Controller),
            _ => None,
        }
    }
}

impl fmt::Display for RepresentativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Representative {
    pub representative_id: String,
    pub customer_id: String,
    pub representative_type: RepresentativeType,
    pub first_name: String,
    pub last_name: String,
    pub job_title: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phones: Vec<Phone>,
    pub addresses: Vec<Address>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepresentativeRequest {
    pub representative_type: RepresentativeType,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub ssn: Option<String>,
    #[serde(default)]
    pub phones: Vec<PhoneRequest>,
    #[serde(default)]
    pub addresses: Vec<AddressRequest>,
}

impl RepresentativeRequest {
    pub fn new(kind: RepresentativeType, first_name: &str, last_name: &str) -> Self {
        Self {
            representative_type: kind,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            job_title: None,
            birth_date: None,
            ssn: None,
            phones: Vec::new(),
            addresses: Vec::new(),
        }
    }

    pub fn with_ssn(mut self, ssn: &str) -> Self {
        self.ssn = Some(ssn.to_string());
        self
    }

    pub fn with_address(mut self, address: AddressRequest) -> Self {
        self.addresses.push(address);
        self
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(CoreError::InvalidCustomer(
                "representative first and last name are required".into(),
            ));
        }
        for address in &self.addresses {
            address.validate()?;
        }
        check_single_primary(&self.addresses)
    }

    pub fn to_representative(&self, representative_id: &str, customer_id: &str) -> Representative {
        let now = Utc::now();
        Representative {
            representative_id: representative_id.to_string(),
            customer_id: customer_id.to_string(),
            representative_type: self.representative_type,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            job_title: self
                .job_title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            birth_date: self.birth_date,
            phones: self
                .phones
                .iter()
                .map(|p| Phone {
                    number: p.number.trim().to_string(),
                    phone_type: p.phone_type,
                    validated: false,
                })
                .collect(),
            addresses: Vec::new(),
            created_at: now,
            last_modified: now,
        }
    }
}
