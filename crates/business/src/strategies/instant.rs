//! Instant account verification through Plaid and MX
//!
//! `init` hands the caller a link token (Plaid) or widget URL (MX). After the
//! customer links their bank, `complete` exchanges the resulting token and
//! compares the vendor's account and routing numbers with the stored account.

use crate::config::{MxCredentials, PlaidCredentials};
use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use zeroize::Zeroize;

/// Account details reported by a vendor after linking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedAccount {
    pub account_number: String,
    pub routing_number: String,
}

impl Drop for LinkedAccount {
    fn drop(&mut self) {
        self.account_number.zeroize();
    }
}

/// Bank-linking vendor.
#[async_trait]
pub trait LinkVendor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Token or URL the caller uses to open the vendor's link flow.
    async fn link_token(&self, user_id: &str, customer_id: &str) -> ServiceResult<Value>;

    /// Trade the short-lived token for the linked account's numbers.
    async fn exchange(&self, user_id: &str, token: &str) -> ServiceResult<LinkedAccount>;
}

/// Token from a completion request: `{"public_token": ..}` or `{"token": ..}`.
pub fn requested_token(request: &Value) -> ServiceResult<String> {
    ["public_token", "token"]
        .iter()
        .find_map(|field| request.get(*field).and_then(Value::as_str))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ServiceError::BadRequest("missing link token".into()))
}

/// Compare the linked account with the stored one.
pub fn verify(linked: &LinkedAccount, account_number: &str, routing_number: &str) -> ServiceResult<()> {
    if linked.account_number.trim() != account_number.trim()
        || linked.routing_number.trim() != routing_number.trim()
    {
        return Err(ServiceError::ValidationFailed(
            "linked account does not match".into(),
        ));
    }
    Ok(())
}

fn http_client(subsystem: &'static str, timeout: Duration) -> ServiceResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ServiceError::internal(subsystem, e))
}

// ============================================================================
// Plaid
// ============================================================================

pub const PLAID_SANDBOX: &str = "https://sandbox.plaid.com";

pub struct PlaidClient {
    client: reqwest::Client,
    base_url: String,
    credentials: PlaidCredentials,
}

#[derive(Deserialize)]
struct PlaidExchange {
    access_token: String,
}

#[derive(Deserialize)]
struct PlaidAuth {
    numbers: PlaidNumbers,
}

#[derive(Deserialize)]
struct PlaidNumbers {
    #[serde(default)]
    ach: Vec<PlaidAch>,
}

#[derive(Deserialize)]
struct PlaidAch {
    account: String,
    routing: String,
}

impl PlaidClient {
    pub fn new(credentials: PlaidCredentials, base_url: &str, timeout: Duration) -> ServiceResult<Self> {
        Ok(Self {
            client: http_client("plaid.client", timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        subsystem: &'static str,
        path: &str,
        mut body: Value,
    ) -> ServiceResult<T> {
        if let Some(fields) = body.as_object_mut() {
            fields.insert("client_id".into(), json!(self.credentials.client_id));
            fields.insert("secret".into(), json!(self.credentials.secret));
        }
        self.client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ServiceError::internal(subsystem, e))?
            .json()
            .await
            .map_err(|e| ServiceError::internal(subsystem, e))
    }
}

#[async_trait]
impl LinkVendor for PlaidClient {
    fn name(&self) -> &'static str {
        "plaid"
    }

    async fn link_token(&self, user_id: &str, _customer_id: &str) -> ServiceResult<Value> {
        let body = json!({
            "client_name": "customers",
            "user": { "client_user_id": user_id },
            "products": ["auth"],
            "country_codes": ["US"],
            "language": "en",
        });
        self.post("plaid.linkToken", "/link/token/create", body).await
    }

    async fn exchange(&self, _user_id: &str, token: &str) -> ServiceResult<LinkedAccount> {
        let exchanged: PlaidExchange = self
            .post(
                "plaid.exchange",
                "/item/public_token/exchange",
                json!({ "public_token": token }),
            )
            .await?;
        let auth: PlaidAuth = self
            .post(
                "plaid.auth",
                "/auth/get",
                json!({ "access_token": exchanged.access_token }),
            )
            .await?;
        let ach = auth
            .numbers
            .ach
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::ValidationFailed("plaid returned no ACH numbers".into()))?;
        Ok(LinkedAccount {
            account_number: ach.account,
            routing_number: ach.routing,
        })
    }
}

// ============================================================================
// MX
// ============================================================================

pub const MX_INTEGRATION: &str = "https://int-api.mx.com";

pub struct MxClient {
    client: reqwest::Client,
    base_url: String,
    credentials: MxCredentials,
}

#[derive(Deserialize)]
struct MxAccountNumbers {
    #[serde(default)]
    account_numbers: Vec<MxAccountNumber>,
}

#[derive(Deserialize)]
struct MxAccountNumber {
    account_number: String,
    routing_number: String,
}

impl MxClient {
    pub fn new(credentials: MxCredentials, base_url: &str, timeout: Duration) -> ServiceResult<Self> {
        Ok(Self {
            client: http_client("mx.client", timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.api_key))
            .header("Accept", "application/vnd.mx.api.v1+json")
    }
}

#[async_trait]
impl LinkVendor for MxClient {
    fn name(&self) -> &'static str {
        "mx"
    }

    async fn link_token(&self, user_id: &str, _customer_id: &str) -> ServiceResult<Value> {
        self.request(reqwest::Method::POST, &format!("/users/{}/widget_urls", user_id))
            .json(&json!({ "widget_url": { "widget_type": "connect_widget" } }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ServiceError::internal("mx.widgetUrl", e))?
            .json()
            .await
            .map_err(|e| ServiceError::internal("mx.widgetUrl", e))
    }

    /// `token` is the member GUID created by the connect widget.
    async fn exchange(&self, user_id: &str, token: &str) -> ServiceResult<LinkedAccount> {
        let numbers: MxAccountNumbers = self
            .request(
                reqwest::Method::GET,
                &format!("/users/{}/members/{}/account_numbers", user_id, token),
            )
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ServiceError::internal("mx.accountNumbers", e))?
            .json()
            .await
            .map_err(|e| ServiceError::internal("mx.accountNumbers", e))?;
        let number = numbers
            .account_numbers
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::ValidationFailed("mx returned no account numbers".into()))?;
        Ok(LinkedAccount {
            account_number: number.account_number,
            routing_number: number.routing_number,
        })
    }
}

// ============================================================================
// Mock
// ============================================================================

/// Vendor that links every token to one configured account.
pub struct MockLinkVendor {
    name: &'static str,
    linked: RwLock<(String, String)>,
}

impl MockLinkVendor {
    pub fn new(name: &'static str, account_number: &str, routing_number: &str) -> Self {
        Self {
            name,
            linked: RwLock::new((account_number.to_string(), routing_number.to_string())),
        }
    }

    pub fn set_linked(&self, account_number: &str, routing_number: &str) {
        *self.linked.write() = (account_number.to_string(), routing_number.to_string());
    }
}

#[async_trait]
impl LinkVendor for MockLinkVendor {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn link_token(&self, _user_id: &str, customer_id: &str) -> ServiceResult<Value> {
        Ok(json!({ "link_token": format!("link-sandbox-{}", customer_id) }))
    }

    async fn exchange(&self, _user_id: &str, _token: &str) -> ServiceResult<LinkedAccount> {
        let (account_number, routing_number) = self.linked.read().clone();
        Ok(LinkedAccount {
            account_number,
            routing_number,
        })
    }
}
