//! Account and validation commands

use anyhow::{Context, Result};
use customers_business::AccountService;
use customers_core::CreateAccountRequest;

use crate::app::{print_json, App};
use crate::{AccountAction, ValidateAction};

pub async fn handle(app: &App, action: AccountAction) -> Result<()> {
    let org = app.organization()?;
    let accounts = AccountService::new(app.ctx());

    match action {
        AccountAction::Create {
            customer_id,
            routing,
            number,
            r#type,
            holder,
            holder_type,
        } => {
            let request = CreateAccountRequest::new(&routing, &number, r#type.to_core_type())
                .with_holder(holder.as_deref().unwrap_or_default(), holder_type.to_core_type());
            let account = accounts.create(org, &customer_id, app.user(), request).await?;
            print_json(&account)?;
        }
        AccountAction::List { customer_id } => {
            print_json(&accounts.list(org, &customer_id).await?)?;
        }
        AccountAction::Decrypt {
            customer_id,
            account_id,
        } => {
            let wrapped = accounts.decrypt_account_number(org, &customer_id, &account_id).await?;
            println!("{}", wrapped);
        }
        AccountAction::Delete {
            customer_id,
            account_id,
        } => {
            accounts.delete(org, &customer_id, &account_id).await?;
            println!("Deleted account {}", account_id);
        }
        AccountAction::Validate { action } => validate(app, org, &accounts, action).await?,
    }
    Ok(())
}

async fn validate(app: &App, org: &str, accounts: &AccountService<'_>, action: ValidateAction) -> Result<()> {
    match action {
        ValidateAction::Init {
            customer_id,
            account_id,
            strategy,
            vendor,
        } => {
            let validation = accounts
                .init_validation(org, &customer_id, &account_id, app.user(), &strategy, &vendor)
                .await?;
            print_json(&validation)?;
        }
        ValidateAction::Complete {
            customer_id,
            account_id,
            validation_id,
            request,
        } => {
            let body: serde_json::Value =
                serde_json::from_str(&request).context("--request must be a JSON object")?;
            let validation = accounts
                .complete_validation(org, &customer_id, &account_id, &validation_id, app.user(), &body)
                .await?;
            print_json(&validation)?;
        }
        ValidateAction::List {
            customer_id,
            account_id,
        } => {
            print_json(&accounts.list_validations(org, &customer_id, &account_id).await?)?;
        }
    }
    Ok(())
}
