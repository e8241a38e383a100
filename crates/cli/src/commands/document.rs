//! Document commands

use anyhow::{Context, Result};
use customers_business::{DocumentService, DocumentUpload};

use crate::app::{print_json, App};
use crate::DocumentAction;

pub async fn handle(app: &App, action: DocumentAction) -> Result<()> {
    let org = app.organization()?;
    let documents = DocumentService::new(app.ctx());

    match action {
        DocumentAction::Upload {
            customer_id,
            r#type,
            path,
        } => {
            let data = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let document = documents
                .upload(org, &customer_id, DocumentUpload::new(&r#type, data))
                .await?;
            print_json(&document)?;
        }
        DocumentAction::List { customer_id } => {
            print_json(&documents.list(org, &customer_id).await?)?;
        }
        DocumentAction::Get {
            customer_id,
            document_id,
            output,
        } => {
            let content = documents.get(org, &customer_id, &document_id).await?;
            tokio::fs::write(&output, &content.data)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "Wrote {} bytes ({}) to {}",
                content.data.len(),
                content.document.content_type,
                output.display()
            );
        }
    }
    Ok(())
}
