//! Organization configuration, reports and administrative overrides

use anyhow::Result;
use customers_business::{AccountService, ConfigurationService, ReportService};
use customers_core::OrganizationConfiguration;

use crate::app::{print_json, App};
use crate::{AdminAction, ConfigAction};

pub async fn handle(app: &App, action: AdminAction) -> Result<()> {
    match action {
        AdminAction::Override { account_id, status } => {
            let account = AccountService::new(app.ctx())
                .override_status(&account_id, status)
                .await?;
            tracing::warn!(account_id = %account.account_id, status = %account.status, user = app.user(), "status overridden from CLI");
            print_json(&account)?;
        }
    }
    Ok(())
}

pub async fn handle_config(app: &App, action: ConfigAction) -> Result<()> {
    let org = app.organization()?;
    let configuration = ConfigurationService::new(app.ctx());

    let current = match action {
        ConfigAction::Get => configuration.get(org).await?,
        ConfigAction::Set {
            legal_entity,
            primary_account,
        } => {
            let requested = OrganizationConfiguration::new(&legal_entity, &primary_account);
            configuration.update(org, &requested).await?
        }
    };
    print_json(&current)
}

pub async fn report(app: &App, account_ids: &[String]) -> Result<()> {
    let org = app.organization()?;
    let report = ReportService::new(app.ctx()).accounts(org, account_ids).await?;
    print_json(&report)
}
