//! Per-organization settings.

use serde::{Deserialize, Serialize};

/// Organization-level configuration. Both references point at records owned
/// by the same organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationConfiguration {
    pub legal_entity: Option<String>,
    pub primary_account: Option<String>,
}

impl OrganizationConfiguration {
    pub fn new(legal_entity: &str, primary_account: &str) -> Self {
        Self {
            legal_entity: Some(legal_entity.to_string()),
            primary_account: Some(primary_account.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.legal_entity.is_none() && self.primary_account.is_none()
    }
}
