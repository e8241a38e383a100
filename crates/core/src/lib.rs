//! # Customers Core
//!
//! Domain types for the customer-records service.
//!
//! - [`Customer`] and its phones, addresses, metadata and representatives
//! - [`Account`] and [`Validation`] records
//! - [`Document`] and [`Disclaimer`]
//! - Validators for routing numbers, states and metadata limits
//! - Masking helpers for SSNs and account numbers

pub mod account;
pub mod configuration;
pub mod customer;
pub mod document;
pub mod error;
pub mod id;
pub mod mask;
pub mod ofac;
pub mod representative;
pub mod validate;

pub use account::{
    Account, AccountStatus, AccountType, CreateAccountRequest, HolderType, Institution,
    Validation, ValidationStatus,
};
pub use configuration::OrganizationConfiguration;
pub use customer::{
    Address, AddressRequest, AddressType, Customer, CustomerRequest, CustomerSearch,
    CustomerStatus, CustomerType, Phone, PhoneRequest, PhoneType,
};
pub use document::{document_key, Disclaimer, Document, DocumentType};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use id::new_id;
pub use mask::{format_customer_name, hash_account_number, mask_account_number, mask_ssn};
pub use ofac::{OfacSearch, SdnMatch, SsnOwnerKind, SsnRecord, StatusUpdate};
pub use representative::{Representative, RepresentativeRequest, RepresentativeType};
