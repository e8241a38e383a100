//! Customer, sanctions, representative and configuration flows.

mod common;

use common::{address, checking, Harness, ORG, OTHER_ORG, USER};
use customers_business::{
    ConfigurationService, CustomerService, OfacService, ReportService, RepresentativeService,
    ServiceError,
};
use customers_core::{
    AddressType, CustomerRequest, CustomerSearch, CustomerStatus, ErrorKind,
    OrganizationConfiguration, RepresentativeRequest, RepresentativeType, SdnMatch,
};
use std::collections::HashMap;

#[tokio::test]
async fn test_create_customer_runs_sanctions_screening() {
    let h = Harness::new().await;
    let customers = CustomerService::new(&h.ctx);

    let request = CustomerRequest::individual("Jane", "Doe").with_email("jane@example.com");
    let customer = customers.create(ORG, request).await.unwrap();

    assert_eq!(customer.status, CustomerStatus::Unknown);
    assert_eq!(customer.organization, ORG);

    let search = OfacService::new(&h.ctx)
        .latest(ORG, &customer.customer_id)
        .await
        .unwrap()
        .expect("snapshot stored");
    assert_eq!(search.entity_id, "14141");
    assert_eq!(search.match_score, 0.99);
    assert!(search.blocked);
    assert_eq!(h.sanctions.calls(), vec!["Jane Doe"]);
}

#[tokio::test]
async fn test_sanctions_failure_does_not_block_create() {
    let h = Harness::new().await;
    h.sanctions.set_failing(true);

    let customer = CustomerService::new(&h.ctx)
        .create(ORG, CustomerRequest::individual("Jane", "Doe"))
        .await
        .unwrap();

    assert_eq!(customer.status, CustomerStatus::Unknown);
    let latest = OfacService::new(&h.ctx).latest(ORG, &customer.customer_id).await.unwrap();
    assert!(latest.is_none());
}

#[tokio::test]
async fn test_refresh_rejects_above_threshold() {
    let h = Harness::new().await;
    let customers = CustomerService::new(&h.ctx);
    let ofac = OfacService::new(&h.ctx);
    let customer = customers
        .create(ORG, CustomerRequest::individual("Jane", "Doe"))
        .await
        .unwrap();
    let id = customer.customer_id;

    h.sanctions.set_match("14141", 0.90);
    let search = ofac.refresh(ORG, &id).await.unwrap().unwrap();
    assert_eq!(search.match_score, 0.90);
    assert!(!search.blocked);
    assert_ne!(customers.get(ORG, &id).await.unwrap().status, CustomerStatus::Rejected);

    h.sanctions.set_match("14141", 1.0);
    ofac.refresh(ORG, &id).await.unwrap();
    assert_eq!(customers.get(ORG, &id).await.unwrap().status, CustomerStatus::Rejected);

    let updates = customers.status_updates(ORG, &id).await.unwrap();
    let last = updates.last().unwrap();
    assert_eq!(last.future_status, CustomerStatus::Rejected);
    assert_eq!(last.comment, "manual OFAC refresh");
}

#[tokio::test]
async fn test_refresh_at_threshold_does_not_reject() {
    let h = Harness::new().await;
    let customers = CustomerService::new(&h.ctx);
    let id = customers
        .create(ORG, CustomerRequest::individual("Jane", "Doe"))
        .await
        .unwrap()
        .customer_id;

    let search = OfacService::new(&h.ctx).refresh(ORG, &id).await.unwrap().unwrap();
    assert!(search.blocked);
    assert_eq!(customers.get(ORG, &id).await.unwrap().status, CustomerStatus::Unknown);
}

#[tokio::test]
async fn test_refresh_propagates_sanctions_errors() {
    let h = Harness::new().await;
    let id = CustomerService::new(&h.ctx)
        .create(ORG, CustomerRequest::individual("Jane", "Doe"))
        .await
        .unwrap()
        .customer_id;

    h.sanctions.set_failing(true);
    let err = OfacService::new(&h.ctx).refresh(ORG, &id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[tokio::test]
async fn test_screening_prefers_stronger_nick_name_match() {
    let h = Harness::new().await;
    h.sanctions.set_match("0", 0.1);
    h.sanctions.set_match_for("Jane Doe", SdnMatch::new("1", "JANE DOE", "individual", 0.5));
    h.sanctions.set_match_for("JD", SdnMatch::new("2", "J.D.", "individual", 0.8));

    let mut request = CustomerRequest::individual("Jane", "Doe");
    request.nick_name = Some("JD".to_string());
    let customer = CustomerService::new(&h.ctx).create(ORG, request).await.unwrap();

    let search = OfacService::new(&h.ctx)
        .latest(ORG, &customer.customer_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(search.entity_id, "2");
    assert_eq!(h.sanctions.calls(), vec!["Jane Doe", "JD"]);
}

#[tokio::test]
async fn test_screening_tie_goes_to_display_name() {
    let h = Harness::new().await;
    h.sanctions.set_match_for("Jane Doe", SdnMatch::new("1", "JANE DOE", "individual", 0.7));
    h.sanctions.set_match_for("JD", SdnMatch::new("2", "J.D.", "individual", 0.7));

    let mut request = CustomerRequest::individual("  Jane ", " Doe");
    request.nick_name = Some("JD".to_string());
    let customer = CustomerService::new(&h.ctx).create(ORG, request).await.unwrap();

    let search = OfacService::new(&h.ctx)
        .latest(ORG, &customer.customer_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(search.entity_id, "1");
}

#[tokio::test]
async fn test_ssn_is_masked() {
    let h = Harness::new().await;
    let customers = CustomerService::new(&h.ctx);
    let customer = customers
        .create(ORG, CustomerRequest::individual("Jane", "Doe").with_ssn("123456789"))
        .await
        .unwrap();

    let masked = customers.masked_ssn(ORG, &customer.customer_id).await.unwrap();
    assert_eq!(masked, "1#######9");
}

#[tokio::test]
async fn test_ssn_failure_aborts_create() {
    let h = Harness::new().await;
    let customers = CustomerService::new(&h.ctx);
    h.ctx.close_keepers();

    let err = customers
        .create(ORG, CustomerRequest::individual("Jane", "Doe").with_ssn("123456789"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Internal { subsystem: "saveSSN", .. }));

    let found = customers.search(&CustomerSearch::new(ORG)).await.unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_invalid_request_rejected() {
    let h = Harness::new().await;
    let customers = CustomerService::new(&h.ctx);

    let err = customers
        .create(ORG, CustomerRequest::individual("", "Doe"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let two_primaries = CustomerRequest::individual("Jane", "Doe")
        .with_address(address("1 Main St", AddressType::Primary))
        .with_address(address("2 Main St", AddressType::Primary));
    let err = customers.create(ORG, two_primaries).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let mut bad_state = address("1 Main St", AddressType::Primary);
    bad_state.state = "ZZ".to_string();
    let err = customers
        .create(ORG, CustomerRequest::individual("Jane", "Doe").with_address(bad_state))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn test_organization_isolation_and_delete() {
    let h = Harness::new().await;
    let customers = CustomerService::new(&h.ctx);
    let id = customers
        .create(ORG, CustomerRequest::individual("Jane", "Doe"))
        .await
        .unwrap()
        .customer_id;

    assert!(customers.get(OTHER_ORG, &id).await.unwrap_err().is_not_found());

    customers.delete(ORG, &id).await.unwrap();
    customers.delete(ORG, &id).await.unwrap();
    assert!(customers.get(ORG, &id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_update_replaces_addresses() {
    let h = Harness::new().await;
    let customers = CustomerService::new(&h.ctx);
    let request = CustomerRequest::individual("Jane", "Doe")
        .with_address(address("1 Main St", AddressType::Primary))
        .with_address(address("9 Side St", AddressType::Secondary));
    let id = customers.create(ORG, request).await.unwrap().customer_id;

    let update = CustomerRequest::individual("Janet", "Doe")
        .with_address(address("1 Main St", AddressType::Primary));
    let customer = customers.update(ORG, &id, update).await.unwrap();

    assert_eq!(customer.first_name, "Janet");
    assert_eq!(customer.addresses.len(), 1);
    assert_eq!(customer.addresses[0].address1, "1 Main St");

    let err = customers
        .update(OTHER_ORG, &id, CustomerRequest::individual("X", "Y"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_primary_address_invariant() {
    let h = Harness::new().await;
    let customers = CustomerService::new(&h.ctx);
    let id = customers
        .create(ORG, CustomerRequest::individual("Jane", "Doe"))
        .await
        .unwrap()
        .customer_id;

    let primary = customers
        .add_address(ORG, &id, &address("1 Main St", AddressType::Primary))
        .await
        .unwrap();
    let err = customers
        .add_address(ORG, &id, &address("2 Main St", AddressType::Primary))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    customers.delete_address(ORG, &id, &primary.address_id).await.unwrap();
    assert!(customers.get(ORG, &id).await.unwrap().addresses.is_empty());

    customers
        .add_address(ORG, &id, &address("2 Main St", AddressType::Primary))
        .await
        .unwrap();
    let customer = customers.get(ORG, &id).await.unwrap();
    assert_eq!(customer.primary_address().unwrap().address1, "2 Main St");
}

#[tokio::test]
async fn test_metadata_replace_roundtrip() {
    let h = Harness::new().await;
    let customers = CustomerService::new(&h.ctx);
    let id = customers
        .create(ORG, CustomerRequest::individual("Jane", "Doe").with_metadata("old", "1"))
        .await
        .unwrap()
        .customer_id;

    let metadata: HashMap<String, String> =
        [("source".to_string(), "web".to_string()), ("tier".to_string(), "gold".to_string())]
            .into_iter()
            .collect();
    let stored = customers.replace_metadata(ORG, &id, metadata.clone()).await.unwrap();
    assert_eq!(stored, metadata);

    let too_long: HashMap<String, String> = [("k".to_string(), "v".repeat(1001))].into_iter().collect();
    let err = customers.replace_metadata(ORG, &id, too_long).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert_eq!(customers.metadata(ORG, &id).await.unwrap(), metadata);
}

#[tokio::test]
async fn test_status_audit_trail() {
    let h = Harness::new().await;
    let customers = CustomerService::new(&h.ctx);
    let id = customers
        .create(ORG, CustomerRequest::individual("Jane", "Doe"))
        .await
        .unwrap()
        .customer_id;

    customers
        .update_status(ORG, &id, CustomerStatus::ReviewRequired, "docs pending")
        .await
        .unwrap();
    customers
        .update_status(ORG, &id, CustomerStatus::Verified, "docs approved")
        .await
        .unwrap();

    let updates = customers.status_updates(ORG, &id).await.unwrap();
    assert_eq!(updates.len(), 2);
    assert!(updates.windows(2).all(|w| w[0].changed_at <= w[1].changed_at));
    let current = customers.get(ORG, &id).await.unwrap().status;
    assert_eq!(updates.last().unwrap().future_status, current);
}

#[tokio::test]
async fn test_search_paging() {
    let h = Harness::new().await;
    let customers = CustomerService::new(&h.ctx);
    for i in 0..5 {
        customers
            .create(ORG, CustomerRequest::individual(&format!("Jane{}", i), "Doe"))
            .await
            .unwrap();
    }
    customers
        .create(OTHER_ORG, CustomerRequest::individual("Jane9", "Doe"))
        .await
        .unwrap();

    let mut params = CustomerSearch::new(ORG);
    params.count = Some(2);
    let page = customers.search(&params).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].first_name, "Jane4");

    let mut params = CustomerSearch::new(ORG);
    params.query = Some("jane3".to_string());
    let found = customers.search(&params).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].first_name, "Jane3");
}

#[tokio::test]
async fn test_representatives_for_business_customers() {
    let h = Harness::new().await;
    let customers = CustomerService::new(&h.ctx);
    let representatives = RepresentativeService::new(&h.ctx);

    let business = customers
        .create(ORG, CustomerRequest::business("Acme Corp", "Jane", "Doe"))
        .await
        .unwrap();
    let request = RepresentativeRequest::new(RepresentativeType::Owner, "John", "Smith")
        .with_ssn("987654321")
        .with_address(address("5 Owner Way", AddressType::Primary));
    let representative = representatives
        .create(ORG, &business.customer_id, request)
        .await
        .unwrap();
    assert_eq!(representative.addresses.len(), 1);

    let hydrated = customers.get(ORG, &business.customer_id).await.unwrap();
    assert_eq!(hydrated.representatives.len(), 1);
    assert_eq!(hydrated.representatives[0].first_name, "John");

    representatives
        .delete(ORG, &business.customer_id, &representative.representative_id)
        .await
        .unwrap();
    assert!(representatives.list(ORG, &business.customer_id).await.unwrap().is_empty());

    let individual = customers
        .create(ORG, CustomerRequest::individual("Solo", "Person"))
        .await
        .unwrap();
    let err = representatives
        .create(
            ORG,
            &individual.customer_id,
            RepresentativeRequest::new(RepresentativeType::Controller, "A", "B"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn test_configuration_requires_same_organization() {
    let h = Harness::new().await;
    let customers = CustomerService::new(&h.ctx);
    let accounts = customers_business::AccountService::new(&h.ctx);
    let configuration = ConfigurationService::new(&h.ctx);

    assert!(configuration.get(ORG).await.unwrap().is_empty());

    let other = customers
        .create(OTHER_ORG, CustomerRequest::business("Other Inc", "Al", "Other"))
        .await
        .unwrap();
    let other_account = accounts
        .create(OTHER_ORG, &other.customer_id, USER, checking("555"))
        .await
        .unwrap();

    let foreign = OrganizationConfiguration::new(&other.customer_id, &other_account.account_id);
    let err = configuration.update(ORG, &foreign).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let mine = customers
        .create(ORG, CustomerRequest::business("Mine LLC", "Me", "Mine"))
        .await
        .unwrap();
    let mixed = OrganizationConfiguration::new(&mine.customer_id, &other_account.account_id);
    let err = configuration.update(ORG, &mixed).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let my_account = accounts
        .create(ORG, &mine.customer_id, USER, checking("777"))
        .await
        .unwrap();
    let valid = OrganizationConfiguration::new(&mine.customer_id, &my_account.account_id);
    assert_eq!(configuration.update(ORG, &valid).await.unwrap(), valid);
    assert_eq!(configuration.get(ORG).await.unwrap(), valid);

    let err = configuration
        .update(ORG, &OrganizationConfiguration::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn test_account_report_filters_by_organization() {
    let h = Harness::new().await;
    let customers = CustomerService::new(&h.ctx);
    let accounts = customers_business::AccountService::new(&h.ctx);

    let mine = customers.create(ORG, CustomerRequest::individual("Jane", "Doe")).await.unwrap();
    let theirs = customers.create(OTHER_ORG, CustomerRequest::individual("Al", "Other")).await.unwrap();
    let a = accounts.create(ORG, &mine.customer_id, USER, checking("111")).await.unwrap();
    let b = accounts.create(OTHER_ORG, &theirs.customer_id, USER, checking("222")).await.unwrap();

    let ids = vec![a.account_id.clone(), b.account_id.clone(), "missing".to_string()];
    let report = ReportService::new(&h.ctx).accounts(ORG, &ids).await.unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].account.account_id, a.account_id);
    assert_eq!(report[0].customer.customer_id, mine.customer_id);

    let too_many: Vec<String> = (0..26).map(|i| format!("acct-{}", i)).collect();
    let err = ReportService::new(&h.ctx).accounts(ORG, &too_many).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn test_account_report_collapses_repeated_ids() {
    let h = Harness::new().await;
    let customers = CustomerService::new(&h.ctx);
    let accounts = customers_business::AccountService::new(&h.ctx);

    let jane = customers.create(ORG, CustomerRequest::individual("Jane", "Doe")).await.unwrap();
    let a = accounts.create(ORG, &jane.customer_id, USER, checking("111")).await.unwrap();
    let b = accounts.create(ORG, &jane.customer_id, USER, checking("222")).await.unwrap();

    let ids = vec![a.account_id.clone(), b.account_id.clone(), format!(" {} ", a.account_id)];
    let report = ReportService::new(&h.ctx).accounts(ORG, &ids).await.unwrap();
    let mut reported: Vec<&str> = report.iter().map(|r| r.account.account_id.as_str()).collect();
    reported.sort();
    let mut expected = vec![a.account_id.as_str(), b.account_id.as_str()];
    expected.sort();
    assert_eq!(reported, expected);

    // Repeats do not count against the per-report limit
    let mut within_limit: Vec<String> = (0..24).map(|i| format!("acct-{}", i)).collect();
    within_limit.push(a.account_id.clone());
    within_limit.extend((0..5).map(|_| a.account_id.clone()));
    let report = ReportService::new(&h.ctx).accounts(ORG, &within_limit).await.unwrap();
    assert_eq!(report.len(), 1);
}

#[tokio::test]
async fn test_search_default_and_capped_page() {
    let h = Harness::new().await;
    let customers = CustomerService::new(&h.ctx);
    for i in 0..100 {
        customers
            .create(ORG, CustomerRequest::individual(&format!("Person{}", i), "Doe"))
            .await
            .unwrap();
    }

    let page = customers.search(&CustomerSearch::new(ORG)).await.unwrap();
    assert_eq!(page.len(), 20);
    assert_eq!(page[0].first_name, "Person99");

    let mut params = CustomerSearch::new(ORG);
    params.count = Some(120);
    assert_eq!(customers.search(&params).await.unwrap().len(), 100);
}
