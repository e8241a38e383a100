//! Shared fixtures: an in-memory database with mock collaborators.

#![allow(dead_code)]

use customers_business::strategies::Strategy;
use customers_business::{
    Collaborators, MemoryBlobStore, MockLinkVendor, MockMicroDeposits, MockSanctionsClient,
    ServiceConfig, ServiceContext, StaticRoutingLookup, StrategyKey, StrategyRegistry,
};
use customers_core::{AccountType, AddressRequest, AddressType, CreateAccountRequest};
use customers_persistence::Database;
use customers_secrets::LocalKeeper;
use std::sync::Arc;

pub const ORG: &str = "org1";
pub const OTHER_ORG: &str = "org2";
pub const USER: &str = "user-1";

/// Known to the routing directory
pub const ROUTING: &str = "987654320";
pub const OTHER_ROUTING: &str = "121042882";
/// Valid checksum, absent from the directory
pub const UNKNOWN_ROUTING: &str = "021000021";

pub struct Harness {
    pub db: Database,
    pub ctx: ServiceContext,
    pub sanctions: Arc<MockSanctionsClient>,
    pub micro_deposits: Arc<MockMicroDeposits>,
    pub plaid: Arc<MockLinkVendor>,
    pub routing: Arc<StaticRoutingLookup>,
    pub blobs: Arc<MemoryBlobStore>,
    pub in_transit: Arc<LocalKeeper>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(ServiceConfig::default()).await
    }

    pub async fn with_config(config: ServiceConfig) -> Self {
        let db = Database::in_memory().await.unwrap();

        let sanctions = Arc::new(MockSanctionsClient::returning("14141", 0.99));
        let micro_deposits = Arc::new(MockMicroDeposits::new(&["USD 0.07", "USD 0.03"]));
        let plaid = Arc::new(MockLinkVendor::new("plaid", "123", ROUTING));
        let routing = Arc::new(
            StaticRoutingLookup::new()
                .with(ROUTING, "Moov Test Bank")
                .with(OTHER_ROUTING, "Wells Fargo"),
        );
        let blobs = Arc::new(MemoryBlobStore::new());
        let in_transit = Arc::new(LocalKeeper::random("in-transit"));

        let strategies = StrategyRegistry::new()
            .with(StrategyKey::MICRO_DEPOSITS, Strategy::MicroDeposits(micro_deposits.clone()))
            .with(StrategyKey::PLAID, Strategy::Plaid(plaid.clone()))
            .with(StrategyKey::TEST, Strategy::Test);

        let collaborators = Collaborators {
            at_rest: Arc::new(LocalKeeper::random("at-rest")),
            in_transit: in_transit.clone(),
            sanctions: Some(sanctions.clone()),
            routing: Some(routing.clone()),
            strategies,
            blobs: blobs.clone(),
        };
        let ctx = ServiceContext::new(&db, config, collaborators);

        Self {
            db,
            ctx,
            sanctions,
            micro_deposits,
            plaid,
            routing,
            blobs,
            in_transit,
        }
    }
}

pub fn address(line: &str, kind: AddressType) -> AddressRequest {
    AddressRequest {
        address_type: kind,
        address1: line.to_string(),
        address2: None,
        city: "Des Moines".to_string(),
        state: "IA".to_string(),
        postal_code: "50309".to_string(),
        country: "US".to_string(),
    }
}

pub fn checking(number: &str) -> CreateAccountRequest {
    CreateAccountRequest::new(ROUTING, number, AccountType::Checking)
}
