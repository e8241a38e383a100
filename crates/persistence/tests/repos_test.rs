//! Repository tests against an in-memory SQLite database.

use customers_core::{
    AccountStatus, AccountType, AddressRequest, AddressType, CreateAccountRequest,
    CustomerRequest, CustomerSearch, CustomerStatus, DocumentType, ErrorKind, OfacSearch,
    OrganizationConfiguration, PhoneRequest, PhoneType, RepresentativeRequest,
    RepresentativeType, SdnMatch, SsnOwnerKind, Validation, ValidationStatus,
};
use customers_persistence::{
    AccountRepo, AddressRepo, ConfigurationRepo, CustomerRepo, Database, DisclaimerRepo,
    DocumentRepo, PersistenceError, RepresentativeRepo, SsnRepo, ValidationRepo,
};
use customers_secrets::{open, LocalKeeper};

const ORG: &str = "moov";

fn address(line: &str, kind: AddressType) -> AddressRequest {
    AddressRequest {
        address_type: kind,
        address1: line.to_string(),
        address2: None,
        city: "Anytown".to_string(),
        state: "ca".to_string(),
        postal_code: "90210".to_string(),
        country: "US".to_string(),
    }
}

async fn create_customer(db: &Database, request: &CustomerRequest) -> String {
    let id = customers_core::new_id();
    let customer = request.to_customer(&id, ORG);
    CustomerRepo::create(db.pool(), &customer, request).await.unwrap();
    id
}

#[tokio::test]
async fn test_create_and_get_customer() {
    let db = Database::in_memory().await.unwrap();
    let request = CustomerRequest::individual("Jane", "Doe")
        .with_email("jane@example.com")
        .with_phone(PhoneRequest::new("555-0100", PhoneType::Mobile))
        .with_address(address("123 Main St", AddressType::Primary))
        .with_metadata("source", "web");
    let id = create_customer(&db, &request).await;

    let customer = CustomerRepo::get(db.pool(), &id, ORG).await.unwrap();
    assert_eq!(customer.first_name, "Jane");
    assert_eq!(customer.status, CustomerStatus::Unknown);
    assert_eq!(customer.phones.len(), 1);
    assert_eq!(customer.addresses.len(), 1);
    assert_eq!(customer.addresses[0].state, "CA");
    assert_eq!(customer.metadata.get("source").map(String::as_str), Some("web"));

    let other_org = CustomerRepo::get(db.pool(), &id, "other").await;
    assert!(matches!(other_org, Err(PersistenceError::NotFound { .. })));
}

#[tokio::test]
async fn test_update_replaces_addresses_by_line() {
    let db = Database::in_memory().await.unwrap();
    let request = CustomerRequest::individual("Jane", "Doe")
        .with_address(address("1 First St", AddressType::Primary))
        .with_address(address("2 Second St", AddressType::Secondary));
    let id = create_customer(&db, &request).await;
    let before = CustomerRepo::get(db.pool(), &id, ORG).await.unwrap();
    let second_id = before
        .addresses
        .iter()
        .find(|a| a.address1 == "2 Second St")
        .unwrap()
        .address_id
        .clone();

    // Swap primary, drop the first line, add a third.
    let update = CustomerRequest::individual("Jane", "Doe")
        .with_address(address("2 Second St", AddressType::Primary))
        .with_address(address("3 Third St", AddressType::Secondary));
    CustomerRepo::update(db.pool(), &id, ORG, &update).await.unwrap();

    let after = CustomerRepo::get(db.pool(), &id, ORG).await.unwrap();
    assert_eq!(after.addresses.len(), 2);
    let primary = after.primary_address().unwrap();
    assert_eq!(primary.address_id, second_id);
    assert!(after.addresses.iter().all(|a| a.address1 != "1 First St"));
}

#[tokio::test]
async fn test_second_primary_address_rejected() {
    let db = Database::in_memory().await.unwrap();
    let request = CustomerRequest::individual("Jane", "Doe")
        .with_address(address("1 First St", AddressType::Primary));
    let id = create_customer(&db, &request).await;

    let err = AddressRepo::add(db.pool(), &id, &address("9 Other St", AddressType::Primary))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::DuplicateAddressKind { .. }));
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let secondary = AddressRepo::add(db.pool(), &id, &address("9 Other St", AddressType::Secondary))
        .await
        .unwrap();
    AddressRepo::delete(db.pool(), &id, &secondary.address_id).await.unwrap();
    AddressRepo::delete(db.pool(), &id, &secondary.address_id).await.unwrap();
    assert_eq!(AddressRepo::list(db.pool(), &id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_search_orders_newest_first_and_pages() {
    let db = Database::in_memory().await.unwrap();
    let mut ids = Vec::new();
    for name in ["Alice", "Bob", "Carol"] {
        ids.push(create_customer(&db, &CustomerRequest::individual(name, "Smith")).await);
    }
    create_customer(&db, &CustomerRequest::individual("Dave", "Jones").with_email("dave@example.com")).await;

    let mut params = CustomerSearch::new(ORG);
    params.query = Some("smith".to_string());
    let found = CustomerRepo::search(db.pool(), &params, 200).await.unwrap();
    let names: Vec<_> = found.iter().map(|c| c.first_name.as_str()).collect();
    assert_eq!(names, vec!["Carol", "Bob", "Alice"]);

    params.skip = Some(1);
    params.count = Some(1);
    let page = CustomerRepo::search(db.pool(), &params, 200).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].first_name, "Bob");

    let mut by_email = CustomerSearch::new(ORG);
    by_email.email = Some("DAVE@example.com".to_string());
    assert_eq!(CustomerRepo::search(db.pool(), &by_email, 200).await.unwrap().len(), 1);

    let mut by_ids = CustomerSearch::new(ORG);
    by_ids.customer_ids = vec![ids[0].clone(), ids[2].clone()];
    assert_eq!(CustomerRepo::search(db.pool(), &by_ids, 200).await.unwrap().len(), 2);

    assert!(CustomerRepo::search(db.pool(), &CustomerSearch::new("other"), 200)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_delete_is_idempotent_and_hides_customer() {
    let db = Database::in_memory().await.unwrap();
    let id = create_customer(&db, &CustomerRequest::individual("Jane", "Doe")).await;

    CustomerRepo::delete(db.pool(), &id, ORG).await.unwrap();
    CustomerRepo::delete(db.pool(), &id, ORG).await.unwrap();
    assert!(CustomerRepo::get(db.pool(), &id, ORG).await.unwrap_err().is_not_found());
    assert!(CustomerRepo::delete(db.pool(), "missing", ORG).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_status_update_writes_audit_record() {
    let db = Database::in_memory().await.unwrap();
    let id = create_customer(&db, &CustomerRequest::individual("Jane", "Doe")).await;

    CustomerRepo::update_status(db.pool(), &id, ORG, CustomerStatus::ReviewRequired, "docs").await.unwrap();
    CustomerRepo::update_status(db.pool(), &id, ORG, CustomerStatus::Verified, "ok").await.unwrap();

    let customer = CustomerRepo::get(db.pool(), &id, ORG).await.unwrap();
    assert_eq!(customer.status, CustomerStatus::Verified);

    let history = CustomerRepo::status_updates(db.pool(), &id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].future_status, CustomerStatus::ReviewRequired);
    assert!(history[0].changed_at <= history[1].changed_at);

    let missing = CustomerRepo::update_status(db.pool(), "missing", ORG, CustomerStatus::Verified, "").await;
    assert!(missing.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_latest_ofac_search() {
    let db = Database::in_memory().await.unwrap();
    let id = create_customer(&db, &CustomerRequest::individual("Jane", "Doe")).await;
    assert!(CustomerRepo::latest_ofac_search(db.pool(), &id, ORG).await.unwrap().is_none());

    let first = OfacSearch::from_match(&SdnMatch::new("1", "JANE DOE", "individual", 0.5), false);
    let second = OfacSearch::from_match(&SdnMatch::new("2", "JANE DOE", "individual", 0.995), true);
    CustomerRepo::save_ofac_search(db.pool(), &id, &first).await.unwrap();
    CustomerRepo::save_ofac_search(db.pool(), &id, &second).await.unwrap();

    let latest = CustomerRepo::latest_ofac_search(db.pool(), &id, ORG).await.unwrap().unwrap();
    assert_eq!(latest.entity_id, "2");
    assert!(latest.blocked);
}

#[tokio::test]
async fn test_ssn_saved_encrypted_and_masked() {
    let db = Database::in_memory().await.unwrap();
    let keeper = LocalKeeper::random("app");
    let mut ssn = "123456789".to_string();

    let record = SsnRepo::save(db.pool(), &keeper, "c1", SsnOwnerKind::Customer, &mut ssn).await.unwrap();
    assert!(ssn.is_empty());
    assert_eq!(record.masked, "1#######9");

    let stored = SsnRepo::get(db.pool(), "c1", SsnOwnerKind::Customer).await.unwrap();
    assert_eq!(open(&keeper, &stored.encrypted).await.unwrap().as_str(), "123456789");
    assert!(SsnRepo::get(db.pool(), "c1", SsnOwnerKind::Representative).await.is_err());
}

#[tokio::test]
async fn test_ssn_trimmed_before_mask_and_encryption() {
    let db = Database::in_memory().await.unwrap();
    let keeper = LocalKeeper::random("app");
    let mut ssn = "  123456789\n".to_string();

    let record = SsnRepo::save(db.pool(), &keeper, "c1", SsnOwnerKind::Customer, &mut ssn).await.unwrap();
    assert!(ssn.is_empty());
    assert_eq!(record.masked, "1#######9");

    let stored = SsnRepo::get(db.pool(), "c1", SsnOwnerKind::Customer).await.unwrap();
    assert_eq!(open(&keeper, &stored.encrypted).await.unwrap().as_str(), "123456789");
}

#[tokio::test]
async fn test_representatives_hydrate_on_customer() {
    let db = Database::in_memory().await.unwrap();
    let id = create_customer(&db, &CustomerRequest::business("Acme", "Jane", "Doe")).await;

    let request = RepresentativeRequest::new(RepresentativeType::Owner, "John", "Smith")
        .with_address(address("1 Owner Way", AddressType::Primary));
    let rep = request.to_representative(&customers_core::new_id(), &id);
    RepresentativeRepo::create(db.pool(), &rep, &request).await.unwrap();

    let customer = CustomerRepo::get(db.pool(), &id, ORG).await.unwrap();
    assert_eq!(customer.representatives.len(), 1);
    assert_eq!(customer.representatives[0].addresses.len(), 1);

    RepresentativeRepo::delete(db.pool(), &id, &rep.representative_id).await.unwrap();
    assert!(RepresentativeRepo::list(db.pool(), &id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_account_create_encrypts_and_enforces_uniqueness() {
    let db = Database::in_memory().await.unwrap();
    let keeper = LocalKeeper::random("app");

    let mut request = CreateAccountRequest::new("273976369", "1234567890", AccountType::Checking);
    let account = AccountRepo::create(db.pool(), &keeper, "c1", "u1", &mut request).await.unwrap();
    assert!(request.account_number.is_empty());
    assert_eq!(account.masked_account_number, "1####7890");
    assert_eq!(account.status, AccountStatus::None);

    let stored = AccountRepo::encrypted_account_number(db.pool(), "c1", &account.account_id).await.unwrap();
    assert_eq!(open(&keeper, &stored).await.unwrap().as_str(), "1234567890");

    let mut duplicate = CreateAccountRequest::new("273976369", "1234567890", AccountType::Savings);
    let err = AccountRepo::create(db.pool(), &keeper, "c1", "u1", &mut duplicate).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // Same number for another customer, and again after deactivation.
    let mut other = CreateAccountRequest::new("273976369", "1234567890", AccountType::Checking);
    AccountRepo::create(db.pool(), &keeper, "c2", "u2", &mut other).await.unwrap();

    AccountRepo::deactivate(db.pool(), "c1", &account.account_id).await.unwrap();
    AccountRepo::deactivate(db.pool(), "c1", &account.account_id).await.unwrap();
    let mut again = CreateAccountRequest::new("273976369", "1234567890", AccountType::Checking);
    AccountRepo::create(db.pool(), &keeper, "c1", "u1", &mut again).await.unwrap();
    assert_eq!(AccountRepo::list_by_customer(db.pool(), "c1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_account_status_is_monotonic() {
    let db = Database::in_memory().await.unwrap();
    let keeper = LocalKeeper::random("app");
    let mut request = CreateAccountRequest::new("273976369", "1234567890", AccountType::Checking);
    let account = AccountRepo::create(db.pool(), &keeper, "c1", "u1", &mut request).await.unwrap();

    AccountRepo::update_status(db.pool(), &account.account_id, AccountStatus::Validated).await.unwrap();
    let err = AccountRepo::update_status(db.pool(), &account.account_id, AccountStatus::None)
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::Rule(_)));

    let reset = AccountRepo::override_status(db.pool(), &account.account_id, AccountStatus::None)
        .await
        .unwrap();
    assert_eq!(reset.status, AccountStatus::None);
}

#[tokio::test]
async fn test_validation_complete_marks_account_validated() {
    let db = Database::in_memory().await.unwrap();
    let keeper = LocalKeeper::random("app");
    let mut request = CreateAccountRequest::new("273976369", "1234567890", AccountType::Checking);
    let account = AccountRepo::create(db.pool(), &keeper, "c1", "u1", &mut request).await.unwrap();

    let now = chrono::Utc::now();
    let validation = Validation {
        validation_id: customers_core::new_id(),
        account_id: account.account_id.clone(),
        status: ValidationStatus::Init,
        strategy: "test".to_string(),
        vendor: "moov".to_string(),
        vendor_response: serde_json::json!({"result": "initiated"}),
        created_at: now,
        updated_at: now,
    };
    ValidationRepo::create(db.pool(), &validation).await.unwrap();

    let mut second = validation.clone();
    second.validation_id = customers_core::new_id();
    let err = ValidationRepo::create(db.pool(), &second).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let open_validation = ValidationRepo::open_for_account(db.pool(), &account.account_id).await.unwrap();
    assert_eq!(open_validation.unwrap().validation_id, validation.validation_id);

    let done = ValidationRepo::complete(
        db.pool(),
        &account.account_id,
        &validation.validation_id,
        &serde_json::json!({"result": "validated"}),
        true,
    )
    .await
    .unwrap();
    assert_eq!(done.status, ValidationStatus::Completed);
    assert_eq!(
        AccountRepo::get_by_id(db.pool(), &account.account_id).await.unwrap().status,
        AccountStatus::Validated
    );
    assert!(ValidationRepo::open_for_account(db.pool(), &account.account_id).await.unwrap().is_none());

    let again = ValidationRepo::complete(
        db.pool(),
        &account.account_id,
        &validation.validation_id,
        &serde_json::json!({}),
        true,
    )
    .await;
    assert!(again.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_documents_and_disclaimers() {
    let db = Database::in_memory().await.unwrap();
    let document = customers_core::Document {
        document_id: customers_core::new_id(),
        customer_id: "c1".to_string(),
        document_type: DocumentType::Passport,
        content_type: "image/png".to_string(),
        uploaded_at: chrono::Utc::now(),
    };
    DocumentRepo::create(db.pool(), &document).await.unwrap();
    assert_eq!(DocumentRepo::list(db.pool(), "c1").await.unwrap().len(), 1);
    assert!(DocumentRepo::get(db.pool(), "c2", &document.document_id).await.is_err());

    let disclaimer = DisclaimerRepo::create(db.pool(), "c1", "Terms apply", Some(&document.document_id))
        .await
        .unwrap();
    assert!(!disclaimer.is_accepted());

    let accepted = DisclaimerRepo::accept(db.pool(), "c1", &disclaimer.disclaimer_id).await.unwrap();
    assert!(accepted.is_accepted());
    let twice = DisclaimerRepo::accept(db.pool(), "c1", &disclaimer.disclaimer_id).await.unwrap_err();
    assert_eq!(twice.kind(), ErrorKind::Conflict);

    DocumentRepo::delete(db.pool(), "c1", &document.document_id).await.unwrap();
    assert!(DocumentRepo::list(db.pool(), "c1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_organization_configuration_upsert() {
    let db = Database::in_memory().await.unwrap();
    assert!(ConfigurationRepo::get(db.pool(), ORG).await.unwrap().is_empty());

    let config = OrganizationConfiguration::new("le-1", "acct-1");
    ConfigurationRepo::upsert(db.pool(), ORG, &config).await.unwrap();
    let updated = OrganizationConfiguration::new("le-2", "acct-1");
    let stored = ConfigurationRepo::upsert(db.pool(), ORG, &updated).await.unwrap();
    assert_eq!(stored, updated);
}

#[tokio::test]
async fn test_file_database_persists_across_pools() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("customers.db").display());

    let db = Database::init(&url).await.unwrap();
    let id = create_customer(&db, &CustomerRequest::individual("Jane", "Doe")).await;
    db.close().await;

    let reopened = Database::init(&url).await.unwrap();
    assert_eq!(CustomerRepo::get(reopened.pool(), &id, ORG).await.unwrap().last_name, "Doe");
}
