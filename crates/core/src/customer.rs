//! # Customer Module
//!
//! Customer aggregate: the canonical identity record for an individual or a
//! business, together with the phones, addresses and metadata it owns.

use crate::error::{CoreError, CoreResult};
use crate::mask::format_customer_name;
use crate::representative::Representative;
use crate::validate::{is_us_country, is_us_state, validate_metadata};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Individual or business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    Individual,
    Business,
}

impl CustomerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerType::Individual => "individual",
            CustomerType::Business => "business",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "individual" => Some(CustomerType::Individual),
            "business" => Some(CustomerType::Business),
            _ => None,
        }
    }
}

impl fmt::Display for CustomerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Approval status of a customer.
///
/// Every customer starts as `Unknown`; moving between statuses is an explicit
/// write that also appends a [`crate::StatusUpdate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CustomerStatus {
    Unknown,
    Rejected,
    ReviewRequired,
    ReceiveOnly,
    Verified,
    Frozen,
    Deceased,
}

impl CustomerStatus {
    pub const ALL: [CustomerStatus; 7] = [
        CustomerStatus::Unknown,
        CustomerStatus::Rejected,
        CustomerStatus::ReviewRequired,
        CustomerStatus::ReceiveOnly,
        CustomerStatus::Verified,
        CustomerStatus::Frozen,
        CustomerStatus::Deceased,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Unknown => "unknown",
            CustomerStatus::Rejected => "rejected",
            CustomerStatus::ReviewRequired => "reviewRequired",
            CustomerStatus::ReceiveOnly => "receiveOnly",
            CustomerStatus::Verified => "verified",
            CustomerStatus::Frozen => "frozen",
            CustomerStatus::Deceased => "deceased",
        }
    }

    /// Case-insensitive parse; accepts both `reviewRequired` and `review_required`.
    pub fn from_str(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "unknown" => Some(CustomerStatus::Unknown),
            "rejected" => Some(CustomerStatus::Rejected),
            "reviewrequired" => Some(CustomerStatus::ReviewRequired),
            "receiveonly" => Some(CustomerStatus::ReceiveOnly),
            "verified" => Some(CustomerStatus::Verified),
            "frozen" => Some(CustomerStatus::Frozen),
            "deceased" => Some(CustomerStatus::Deceased),
            _ => None,
        }
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhoneType {
    Home,
    Mobile,
    Work,
}

impl PhoneType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhoneType::Home => "home",
            PhoneType::Mobile => "mobile",
            PhoneType::Work => "work",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "home" => Some(PhoneType::Home),
            "mobile" => Some(PhoneType::Mobile),
            "work" => Some(PhoneType::Work),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressType {
    Primary,
    Secondary,
}

impl AddressType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressType::Primary => "primary",
            AddressType::Secondary => "secondary",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "primary" => Some(AddressType::Primary),
            "secondary" => Some(AddressType::Secondary),
            _ => None,
        }
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Phone number owned by a customer or representative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phone {
    pub number: String,
    pub phone_type: PhoneType,
    pub validated: bool,
}

/// Postal address owned by a customer or representative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub address_id: String,
    pub address_type: AddressType,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub validated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneRequest {
    pub number: String,
    pub phone_type: PhoneType,
}

impl PhoneRequest {
    pub fn new(number: &str, phone_type: PhoneType) -> Self {
        Self {
            number: number.to_string(),
            phone_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRequest {
    pub address_type: AddressType,
    pub address1: String,
    #[serde(default)]
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl AddressRequest {
    /// Required fields present; US addresses carry a known state abbreviation.
    pub fn validate(&self) -> CoreResult<()> {
        if self.address1.trim().is_empty() {
            return Err(CoreError::IncompleteAddress("address1"));
        }
        if self.city.trim().is_empty() {
            return Err(CoreError::IncompleteAddress("city"));
        }
        if self.postal_code.trim().is_empty() {
            return Err(CoreError::IncompleteAddress("postal_code"));
        }
        if self.country.trim().is_empty() {
            return Err(CoreError::IncompleteAddress("country"));
        }
        if is_us_country(&self.country) && !is_us_state(&self.state) {
            return Err(CoreError::InvalidState(self.state.clone()));
        }
        Ok(())
    }

    /// Normalized state abbreviation as stored.
    pub fn normalized_state(&self) -> String {
        if is_us_country(&self.country) {
            self.state.trim().to_ascii_uppercase()
        } else {
            self.state.trim().to_string()
        }
    }
}

/// Reject payloads that would leave more than one primary address.
pub fn check_single_primary(addresses: &[AddressRequest]) -> CoreResult<()> {
    let primaries = addresses
        .iter()
        .filter(|a| a.address_type == AddressType::Primary)
        .count();
    if primaries > 1 {
        return Err(CoreError::DuplicateAddressKind(
            AddressType::Primary.to_string(),
        ));
    }
    Ok(())
}

/// Customer record as returned by reads: hydrated with phones, addresses,
/// metadata and representatives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: String,
    pub organization: String,
    pub customer_type: CustomerType,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub nick_name: Option<String>,
    pub suffix: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub email: Option<String>,
    pub business_name: Option<String>,
    pub doing_business_as: Option<String>,
    pub website: Option<String>,
    pub status: CustomerStatus,
    pub phones: Vec<Phone>,
    pub addresses: Vec<Address>,
    pub metadata: HashMap<String, String>,
    pub representatives: Vec<Representative>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl Customer {
    /// Display name used for sanctions screening.
    pub fn display_name(&self) -> String {
        format_customer_name(
            &self.first_name,
            self.middle_name.as_deref(),
            &self.last_name,
            self.suffix.as_deref(),
        )
    }

    /// Non-empty trimmed nick name, if any.
    pub fn nick_name(&self) -> Option<&str> {
        self.nick_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    pub fn primary_address(&self) -> Option<&Address> {
        self.addresses
            .iter()
            .find(|a| a.address_type == AddressType::Primary)
    }
}

impl fmt::Display for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} - {})",
            self.display_name(),
            self.customer_id,
            self.status
        )
    }
}

/// Create/update payload for a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRequest {
    pub customer_type: CustomerType,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    #[serde(default)]
    pub nick_name: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub doing_business_as: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    /// Raw SSN; encrypted and dropped before the customer is persisted.
    #[serde(default)]
    pub ssn: Option<String>,
    #[serde(default)]
    pub phones: Vec<PhoneRequest>,
    #[serde(default)]
    pub addresses: Vec<AddressRequest>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CustomerRequest {
    /// Minimal individual request.
    pub fn individual(first_name: &str, last_name: &str) -> Self {
        Self {
            customer_type: CustomerType::Individual,
            first_name: first_name.to_string(),
            middle_name: None,
            last_name: last_name.to_string(),
            nick_name: None,
            suffix: None,
            birth_date: None,
            email: None,
            business_name: None,
            doing_business_as: None,
            website: None,
            ssn: None,
            phones: Vec::new(),
            addresses: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Minimal business request; name parts are those of the contact person.
    pub fn business(business_name: &str, first_name: &str, last_name: &str) -> Self {
        let mut req = Self::individual(first_name, last_name);
        req.customer_type = CustomerType::Business;
        req.business_name = Some(business_name.to_string());
        req
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn with_ssn(mut self, ssn: &str) -> Self {
        self.ssn = Some(ssn.to_string());
        self
    }

    pub fn with_address(mut self, address: AddressRequest) -> Self {
        self.addresses.push(address);
        self
    }

    pub fn with_phone(mut self, phone: PhoneRequest) -> Self {
        self.phones.push(phone);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.first_name.trim().is_empty() {
            return Err(CoreError::InvalidCustomer("first name is required".into()));
        }
        if self.last_name.trim().is_empty() {
            return Err(CoreError::InvalidCustomer("last name is required".into()));
        }
        if let Some(email) = &self.email {
            if !email.trim().is_empty() && !email.contains('@') {
                return Err(CoreError::InvalidCustomer(format!("invalid email: {}", email)));
            }
        }
        for phone in &self.phones {
            if phone.number.trim().is_empty() {
                return Err(CoreError::InvalidCustomer("phone number is required".into()));
            }
        }
        for address in &self.addresses {
            address.validate()?;
        }
        check_single_primary(&self.addresses)?;
        validate_metadata(&self.metadata)
    }

    /// Build the customer record (status `unknown`) this request describes.
    pub fn to_customer(&self, customer_id: &str, organization: &str) -> Customer {
        let now = Utc::now();
        Customer {
            customer_id: customer_id.to_string(),
            organization: organization.to_string(),
            customer_type: self.customer_type,
            first_name: self.first_name.trim().to_string(),
            middle_name: trimmed(&self.middle_name),
            last_name: self.last_name.trim().to_string(),
            nick_name: trimmed(&self.nick_name),
            suffix: trimmed(&self.suffix),
            birth_date: self.birth_date,
            email: trimmed(&self.email),
            business_name: trimmed(&self.business_name),
            doing_business_as: trimmed(&self.doing_business_as),
            website: trimmed(&self.website),
            status: CustomerStatus::Unknown,
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
            metadata: self.metadata.clone(),
            representatives: Vec::new(),
            created_at: now,
            last_modified: now,
        }
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Filters for customer search. Empty filters match everything in the
/// organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerSearch {
    pub organization: String,
    pub query: Option<String>,
    pub email: Option<String>,
    pub status: Option<CustomerStatus>,
    pub customer_type: Option<CustomerType>,
    pub customer_ids: Vec<String>,
    pub skip: Option<i64>,
    pub count: Option<i64>,
}

impl CustomerSearch {
    /// Default page size.
    pub const DEFAULT_COUNT: i64 = 20;

    pub fn new(organization: &str) -> Self {
        Self {
            organization: organization.to_string(),
            ..Default::default()
        }
    }

    /// Page bounds with the default count applied and `max_count` enforced.
    pub fn page(&self, max_count: i64) -> (i64, i64) {
        let skip = self.skip.unwrap_or(0).max(0);
        let count = match self.count {
            Some(c) if c > 0 => c.min(max_count),
            _ => Self::DEFAULT_COUNT.min(max_count),
        };
        (skip, count)
    }
}
