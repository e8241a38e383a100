//! Database schema definitions
//!
//! Tables are created idempotently by [`create_schema`]. Row types map the
//! tables for sqlx; enums are stored as their `as_str()` text.

use crate::error::{PersistenceError, PersistenceResult};
use chrono::{DateTime, NaiveDate, Utc};
use customers_core::{
    Account, AccountStatus, AccountType, Address, AddressType, Customer, CustomerStatus,
    CustomerType, Disclaimer, Document, DocumentType, HolderType, OfacSearch, Phone, PhoneType,
    Representative, RepresentativeType, SsnOwnerKind, SsnRecord, StatusUpdate, Validation,
    ValidationStatus,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS customers (
    customer_id TEXT PRIMARY KEY,
    organization TEXT NOT NULL,
    customer_type TEXT NOT NULL,
    first_name TEXT NOT NULL,
    middle_name TEXT,
    last_name TEXT NOT NULL,
    nick_name TEXT,
    suffix TEXT,
    birth_date TEXT,
    email TEXT,
    business_name TEXT,
    doing_business_as TEXT,
    website TEXT,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    deleted_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_customers_organization
    ON customers (organization, created_at);

CREATE TABLE IF NOT EXISTS phones (
    owner_id TEXT NOT NULL,
    number TEXT NOT NULL,
    phone_type TEXT NOT NULL,
    validated INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (owner_id, number)
);

CREATE TABLE IF NOT EXISTS addresses (
    address_id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    address_type TEXT NOT NULL,
    address1 TEXT NOT NULL,
    address2 TEXT,
    city TEXT NOT NULL,
    state TEXT NOT NULL,
    postal_code TEXT NOT NULL,
    country TEXT NOT NULL,
    validated INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    deleted_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_addresses_owner ON addresses (owner_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_addresses_one_primary
    ON addresses (owner_id) WHERE address_type = 'primary' AND deleted_at IS NULL;

CREATE TABLE IF NOT EXISTS customer_metadata (
    customer_id TEXT NOT NULL,
    meta_key TEXT NOT NULL,
    meta_value TEXT NOT NULL,
    PRIMARY KEY (customer_id, meta_key)
);

CREATE TABLE IF NOT EXISTS customer_status_updates (
    customer_id TEXT NOT NULL,
    future_status TEXT NOT NULL,
    comment TEXT NOT NULL,
    changed_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_status_updates_customer
    ON customer_status_updates (customer_id, changed_at);

CREATE TABLE IF NOT EXISTS customer_ofac_searches (
    customer_id TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    sdn_name TEXT NOT NULL,
    sdn_type TEXT NOT NULL,
    match_score REAL NOT NULL,
    blocked INTEGER NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_ofac_searches_customer
    ON customer_ofac_searches (customer_id, created_at);

CREATE TABLE IF NOT EXISTS ssns (
    owner_id TEXT NOT NULL,
    owner_kind TEXT NOT NULL,
    encrypted TEXT NOT NULL,
    masked TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (owner_id, owner_kind)
);

CREATE TABLE IF NOT EXISTS representatives (
    representative_id TEXT PRIMARY KEY,
    customer_id TEXT NOT NULL,
    representative_type TEXT NOT NULL,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    job_title TEXT,
    birth_date TEXT,
    created_at TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    deleted_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_representatives_customer ON representatives (customer_id);

CREATE TABLE IF NOT EXISTS accounts (
    account_id TEXT PRIMARY KEY,
    customer_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    encrypted_account_number TEXT NOT NULL,
    hashed_account_number TEXT NOT NULL,
    masked_account_number TEXT NOT NULL,
    routing_number TEXT NOT NULL,
    holder_name TEXT NOT NULL,
    holder_type TEXT NOT NULL,
    account_type TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    deleted_at TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_accounts_unique_number
    ON accounts (customer_id, hashed_account_number, routing_number)
    WHERE deleted_at IS NULL;

CREATE TABLE IF NOT EXISTS validations (
    validation_id TEXT PRIMARY KEY,
    account_id TEXT NOT NULL,
    status TEXT NOT NULL,
    strategy TEXT NOT NULL,
    vendor TEXT NOT NULL,
    vendor_response TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_validations_one_open
    ON validations (account_id) WHERE status = 'init';

CREATE TABLE IF NOT EXISTS documents (
    document_id TEXT PRIMARY KEY,
    customer_id TEXT NOT NULL,
    document_type TEXT NOT NULL,
    content_type TEXT NOT NULL,
    uploaded_at TEXT NOT NULL,
    deleted_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_documents_customer ON documents (customer_id);

CREATE TABLE IF NOT EXISTS disclaimers (
    disclaimer_id TEXT PRIMARY KEY,
    customer_id TEXT NOT NULL,
    text TEXT NOT NULL,
    document_id TEXT,
    created_at TEXT NOT NULL,
    deleted_at TEXT
);

CREATE TABLE IF NOT EXISTS disclaimer_acceptances (
    disclaimer_id TEXT NOT NULL,
    customer_id TEXT NOT NULL,
    accepted_at TEXT NOT NULL,
    PRIMARY KEY (disclaimer_id, customer_id)
);

CREATE TABLE IF NOT EXISTS organization_configuration (
    organization TEXT PRIMARY KEY,
    legal_entity TEXT,
    primary_account TEXT,
    updated_at TEXT NOT NULL
);
"#;

/// Create every table and index. Safe to run on an existing database.
pub async fn create_schema(pool: &SqlitePool) -> PersistenceResult<()> {
    sqlx::query(SCHEMA).execute(pool).await?;
    Ok(())
}

/// Row type for `customers`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct CustomerRow {
    pub customer_id: String,
    pub organization: String,
    pub customer_type: String,
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
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Row type for `phones`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PhoneRow {
    pub owner_id: String,
    pub number: String,
    pub phone_type: String,
    pub validated: bool,
}

/// Row type for `addresses`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AddressRow {
    pub address_id: String,
    pub owner_id: String,
    pub address_type: String,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub validated: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StatusUpdateRow {
    pub customer_id: String,
    pub future_status: String,
    pub comment: String,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OfacSearchRow {
    pub customer_id: String,
    pub entity_id: String,
    pub sdn_name: String,
    pub sdn_type: String,
    pub match_score: f64,
    pub blocked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SsnRow {
    pub owner_id: String,
    pub owner_kind: String,
    pub encrypted: String,
    pub masked: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RepresentativeRow {
    pub representative_id: String,
    pub customer_id: String,
    pub representative_type: String,
    pub first_name: String,
    pub last_name: String,
    pub job_title: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Row type for `accounts`. The encrypted number is selected separately.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    pub account_id: String,
    pub customer_id: String,
    pub user_id: String,
    pub masked_account_number: String,
    pub routing_number: String,
    pub holder_name: String,
    pub holder_type: String,
    pub account_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ValidationRow {
    pub validation_id: String,
    pub account_id: String,
    pub status: String,
    pub strategy: String,
    pub vendor: String,
    pub vendor_response: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DocumentRow {
    pub document_id: String,
    pub customer_id: String,
    pub document_type: String,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// `disclaimers` joined with `disclaimer_acceptances`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DisclaimerRow {
    pub disclaimer_id: String,
    pub customer_id: String,
    pub text: String,
    pub document_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrganizationConfigurationRow {
    pub organization: String,
    pub legal_entity: Option<String>,
    pub primary_account: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// === Conversion implementations ===

fn parse_enum<T>(field: &str, value: &str, parse: fn(&str) -> Option<T>) -> PersistenceResult<T> {
    parse(value).ok_or_else(|| PersistenceError::invalid_enum(field, value))
}

impl CustomerRow {
    /// Customer without phones, addresses, metadata or representatives.
    pub fn into_customer(self) -> PersistenceResult<Customer> {
        Ok(Customer {
            customer_type: parse_enum("customer_type", &self.customer_type, CustomerType::from_str)?,
            status: parse_enum("status", &self.status, CustomerStatus::from_str)?,
            customer_id: self.customer_id,
            organization: self.organization,
            first_name: self.first_name,
            middle_name: self.middle_name,
            last_name: self.last_name,
            nick_name: self.nick_name,
            suffix: self.suffix,
            birth_date: self.birth_date,
            email: self.email,
            business_name: self.business_name,
            doing_business_as: self.doing_business_as,
            website: self.website,
            phones: Vec::new(),
            addresses: Vec::new(),
            metadata: HashMap::new(),
            representatives: Vec::new(),
            created_at: self.created_at,
            last_modified: self.last_modified,
        })
    }
}

impl TryFrom<PhoneRow> for Phone {
    type Error = PersistenceError;

    fn try_from(row: PhoneRow) -> PersistenceResult<Self> {
        Ok(Phone {
            phone_type: parse_enum("phone_type", &row.phone_type, PhoneType::from_str)?,
            number: row.number,
            validated: row.validated,
        })
    }
}

impl TryFrom<AddressRow> for Address {
    type Error = PersistenceError;

    fn try_from(row: AddressRow) -> PersistenceResult<Self> {
        Ok(Address {
            address_type: parse_enum("address_type", &row.address_type, AddressType::from_str)?,
            address_id: row.address_id,
            address1: row.address1,
            address2: row.address2,
            city: row.city,
            state: row.state,
            postal_code: row.postal_code,
            country: row.country,
            validated: row.validated,
        })
    }
}

impl TryFrom<StatusUpdateRow> for StatusUpdate {
    type Error = PersistenceError;

    fn try_from(row: StatusUpdateRow) -> PersistenceResult<Self> {
        Ok(StatusUpdate {
            future_status: parse_enum("future_status", &row.future_status, CustomerStatus::from_str)?,
            customer_id: row.customer_id,
            comment: row.comment,
            changed_at: row.changed_at,
        })
    }
}

impl From<OfacSearchRow> for OfacSearch {
    fn from(row: OfacSearchRow) -> Self {
        OfacSearch {
            entity_id: row.entity_id,
            sdn_name: row.sdn_name,
            sdn_type: row.sdn_type,
            match_score: row.match_score,
            blocked: row.blocked,
            created_at: row.created_at,
        }
    }
}

impl TryFrom<SsnRow> for SsnRecord {
    type Error = PersistenceError;

    fn try_from(row: SsnRow) -> PersistenceResult<Self> {
        Ok(SsnRecord {
            owner_kind: parse_enum("owner_kind", &row.owner_kind, SsnOwnerKind::from_str)?,
            owner_id: row.owner_id,
            encrypted: row.encrypted,
            masked: row.masked,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<RepresentativeRow> for Representative {
    type Error = PersistenceError;

    fn try_from(row: RepresentativeRow) -> PersistenceResult<Self> {
        Ok(Representative {
            representative_type: parse_enum(
                "representative_type",
                &row.representative_type,
                RepresentativeType::from_str,
            )?,
            representative_id: row.representative_id,
            customer_id: row.customer_id,
            first_name: row.first_name,
            last_name: row.last_name,
            job_title: row.job_title,
            birth_date: row.birth_date,
            phones: Vec::new(),
            addresses: Vec::new(),
            created_at: row.created_at,
            last_modified: row.last_modified,
        })
    }
}

impl TryFrom<AccountRow> for Account {
    type Error = PersistenceError;

    fn try_from(row: AccountRow) -> PersistenceResult<Self> {
        Ok(Account {
            holder_type: parse_enum("holder_type", &row.holder_type, HolderType::from_str)?,
            account_type: parse_enum("account_type", &row.account_type, AccountType::from_str)?,
            status: parse_enum("status", &row.status, AccountStatus::from_str)?,
            account_id: row.account_id,
            customer_id: row.customer_id,
            user_id: row.user_id,
            masked_account_number: row.masked_account_number,
            routing_number: row.routing_number,
            holder_name: row.holder_name,
            created_at: row.created_at,
            last_modified: row.last_modified,
        })
    }
}

impl TryFrom<ValidationRow> for Validation {
    type Error = PersistenceError;

    fn try_from(row: ValidationRow) -> PersistenceResult<Self> {
        Ok(Validation {
            status: parse_enum("status", &row.status, ValidationStatus::from_str)?,
            vendor_response: serde_json::from_str(&row.vendor_response)?,
            validation_id: row.validation_id,
            account_id: row.account_id,
            strategy: row.strategy,
            vendor: row.vendor,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<DocumentRow> for Document {
    type Error = PersistenceError;

    fn try_from(row: DocumentRow) -> PersistenceResult<Self> {
        Ok(Document {
            document_type: DocumentType::parse(&row.document_type)
                .map_err(|_| PersistenceError::invalid_enum("document_type", &row.document_type))?,
            document_id: row.document_id,
            customer_id: row.customer_id,
            content_type: row.content_type,
            uploaded_at: row.uploaded_at,
        })
    }
}

impl From<DisclaimerRow> for Disclaimer {
    fn from(row: DisclaimerRow) -> Self {
        Disclaimer {
            disclaimer_id: row.disclaimer_id,
            customer_id: row.customer_id,
            text: row.text,
            document_id: row.document_id,
            accepted_at: row.accepted_at,
            created_at: row.created_at,
        }
    }
}
