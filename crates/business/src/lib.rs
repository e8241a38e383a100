//! # Customers Business
//!
//! Business logic layer - customers, representatives, accounts and their
//! validation, sanctions screening, documents, disclaimers, organization
//! configuration and reports.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use customers_business::{Collaborators, CustomerService, ServiceConfig, ServiceContext, VendorCredentials};
//!
//! // keepers and blob signing secret must be set, see `ServiceConfig`
//! let config = ServiceConfig::from_file(Path::new("customers.json"))?;
//! let collaborators = Collaborators::from_config(&config, &VendorCredentials::from_env())?;
//! let ctx = ServiceContext::new(&db, config, collaborators);
//! let customer = CustomerService::new(&ctx).create("moov", request).await?;
//! ```

pub mod accounts;
pub mod blob;
pub mod config;
pub mod configuration;
pub mod context;
pub mod customers;
pub mod disclaimers;
pub mod documents;
pub mod error;
pub mod ofac;
pub mod reports;
pub mod representatives;
pub mod routing;
pub mod sanctions;
pub mod strategies;

pub use accounts::AccountService;
pub use blob::{open_blob_store, BlobStore, FileBlobStore, MemoryBlobStore};
pub use config::{BlobConfig, BlobProvider, KeeperConfig, ServiceConfig, VendorCredentials};
pub use configuration::ConfigurationService;
pub use context::{Collaborators, ServiceContext};
pub use customers::CustomerService;
pub use disclaimers::DisclaimerService;
pub use documents::{DocumentContent, DocumentService, DocumentUpload};
pub use error::{ServiceError, ServiceResult};
pub use ofac::OfacService;
pub use reports::{AccountReport, ReportService};
pub use representatives::RepresentativeService;
pub use routing::{HttpRoutingLookup, RoutingLookup, RoutingNumberCache, StaticRoutingLookup};
pub use sanctions::{HttpSanctionsClient, MockSanctionsClient, SanctionsClient};
pub use strategies::{
    MicroDepositClient, MockLinkVendor, MockMicroDeposits, Strategy, StrategyKey, StrategyRegistry,
};
