//! Customer and sanctions commands

use anyhow::Result;
use customers_business::{CustomerService, OfacService};
use customers_core::{CustomerRequest, CustomerSearch};

use crate::app::{print_json, App};
use crate::{CustomerAction, CustomerTypeArg, OfacAction};

pub async fn handle(app: &App, action: CustomerAction) -> Result<()> {
    let org = app.organization()?;
    let customers = CustomerService::new(app.ctx());

    match action {
        CustomerAction::Create {
            first,
            last,
            r#type,
            business_name,
            nick_name,
            email,
            ssn,
            metadata,
        } => {
            let mut request = match r#type {
                CustomerTypeArg::Individual => CustomerRequest::individual(&first, &last),
                CustomerTypeArg::Business => {
                    CustomerRequest::business(business_name.as_deref().unwrap_or_default(), &first, &last)
                }
            };
            request.nick_name = nick_name;
            request.email = email;
            request.ssn = ssn;
            request.metadata = metadata.into_iter().collect();

            let customer = customers.create(org, request).await?;
            print_json(&customer)?;
        }
        CustomerAction::Get { customer_id } => {
            print_json(&customers.get(org, &customer_id).await?)?;
        }
        CustomerAction::Search {
            query,
            email,
            status,
            skip,
            count,
        } => {
            let mut params = CustomerSearch::new(org);
            params.query = query;
            params.email = email;
            params.status = status;
            params.skip = skip;
            params.count = count;
            print_json(&customers.search(&params).await?)?;
        }
        CustomerAction::Status {
            customer_id,
            status,
            comment,
        } => {
            let update = customers.update_status(org, &customer_id, status, &comment).await?;
            println!("{} -> {}", update.customer_id, update.future_status);
        }
        CustomerAction::History { customer_id } => {
            print_json(&customers.status_updates(org, &customer_id).await?)?;
        }
        CustomerAction::Ssn { customer_id } => {
            println!("{}", customers.masked_ssn(org, &customer_id).await?);
        }
        CustomerAction::Delete { customer_id } => {
            customers.delete(org, &customer_id).await?;
            println!("Deleted customer {}", customer_id);
        }
    }
    Ok(())
}

pub async fn handle_ofac(app: &App, action: OfacAction) -> Result<()> {
    let org = app.organization()?;
    let ofac = OfacService::new(app.ctx());

    let search = match action {
        OfacAction::Refresh { customer_id } => ofac.refresh(org, &customer_id).await?,
        OfacAction::Latest { customer_id } => ofac.latest(org, &customer_id).await?,
    };
    match search {
        Some(search) => print_json(&search)?,
        None => println!("No sanctions match"),
    }
    Ok(())
}
