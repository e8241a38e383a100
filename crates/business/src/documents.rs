//! Customer documents
//!
//! Metadata lives in the store, bytes in the blob store under
//! [`document_key`]. The content type is detected from the payload itself.

use crate::context::ServiceContext;
use crate::customers::require_customer;
use crate::error::{with_timeout, ServiceError, ServiceResult};
use chrono::Utc;
use customers_core::{document_key, new_id, Document, DocumentType};
use customers_persistence::DocumentRepo;

/// Largest accepted document
pub const MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;

/// Largest accepted upload form, document included
pub const MAX_FORM_BYTES: usize = 25 * 1024 * 1024;

/// Bytes inspected when detecting the content type
const SNIFF_LEN: usize = 512;

/// Content type of `data`, judged from its first 512 bytes.
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    let head = &data[..data.len().min(SNIFF_LEN)];

    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\xFF\xD8\xFF", "image/jpeg"),
        (b"\x89PNG\r\n\x1A\n", "image/png"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"BM", "image/bmp"),
        (b"%PDF-", "application/pdf"),
        (b"PK\x03\x04", "application/zip"),
    ];
    let known = SIGNATURES
        .iter()
        .find(|(magic, _)| head.starts_with(magic))
        .map(|(_, content_type)| *content_type);
    if let Some(content_type) = known {
        return content_type;
    }
    if head.len() >= 12 && &head[..4] == b"RIFF" && &head[8..12] == b"WEBP" {
        return "image/webp";
    }
    if head.is_empty() {
        return "text/plain; charset=utf-8";
    }

    let binary = head
        .iter()
        .any(|&b| matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F));
    if binary {
        "application/octet-stream"
    } else {
        "text/plain; charset=utf-8"
    }
}

/// One uploaded document.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    /// Caller-supplied type, parsed with [`DocumentType::parse`]
    pub document_type: String,
    pub data: Vec<u8>,
    /// Size of the whole upload form
    pub form_len: usize,
}

impl DocumentUpload {
    pub fn new(document_type: &str, data: Vec<u8>) -> Self {
        let form_len = data.len();
        Self {
            document_type: document_type.to_string(),
            data,
            form_len,
        }
    }

    pub fn with_form_len(mut self, form_len: usize) -> Self {
        self.form_len = form_len;
        self
    }

    fn check_limits(&self) -> ServiceResult<()> {
        if self.form_len > MAX_FORM_BYTES {
            return Err(ServiceError::PayloadTooLarge("form exceeds 25MB".into()));
        }
        if self.data.len() > MAX_DOCUMENT_BYTES {
            return Err(ServiceError::PayloadTooLarge("file exceeds 20MB".into()));
        }
        Ok(())
    }
}

/// Document with its bytes
#[derive(Debug, Clone)]
pub struct DocumentContent {
    pub document: Document,
    pub data: Vec<u8>,
    /// Redirect target when the blob store serves signed URLs
    pub signed_url: Option<String>,
}

/// Document Service
pub struct DocumentService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> DocumentService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn upload(
        &self,
        organization: &str,
        customer_id: &str,
        upload: DocumentUpload,
    ) -> ServiceResult<Document> {
        upload.check_limits()?;
        let document_type = DocumentType::parse(&upload.document_type)?;
        require_customer(self.ctx, organization, customer_id).await?;

        let document = Document {
            document_id: new_id(),
            customer_id: customer_id.to_string(),
            document_type,
            content_type: sniff_content_type(&upload.data).to_string(),
            uploaded_at: Utc::now(),
        };
        let key = document_key(customer_id, &document.document_id);

        with_timeout(
            "blob.put",
            self.ctx.config().blob_open_timeout(),
            self.ctx.blobs().put(&key, &upload.data, &document.content_type),
        )
        .await?;

        if let Err(e) = DocumentRepo::create(self.ctx.pool(), &document).await {
            if let Err(cleanup) = self.ctx.blobs().delete(&key).await {
                tracing::warn!(key = %key, error = %cleanup, "orphaned document blob");
            }
            return Err(e.into());
        }

        tracing::info!(
            customer_id,
            document_id = %document.document_id,
            content_type = %document.content_type,
            bytes = upload.data.len(),
            "document uploaded"
        );
        Ok(document)
    }

    pub async fn list(&self, organization: &str, customer_id: &str) -> ServiceResult<Vec<Document>> {
        require_customer(self.ctx, organization, customer_id).await?;
        Ok(DocumentRepo::list(self.ctx.pool(), customer_id).await?)
    }

    pub async fn get(&self, organization: &str, customer_id: &str, document_id: &str) -> ServiceResult<DocumentContent> {
        require_customer(self.ctx, organization, customer_id).await?;
        let document = DocumentRepo::get(self.ctx.pool(), customer_id, document_id).await?;
        let key = document_key(customer_id, document_id);

        let data = with_timeout("blob.get", self.ctx.config().blob_open_timeout(), self.ctx.blobs().get(&key))
            .await?
            .ok_or_else(|| ServiceError::internal("blob.get", format!("missing object {}", key)))?;

        Ok(DocumentContent {
            document,
            data,
            signed_url: self.ctx.blobs().signed_url(&key),
        })
    }

    /// Soft delete. The blob is kept.
    pub async fn delete(&self, organization: &str, customer_id: &str, document_id: &str) -> ServiceResult<()> {
        require_customer(self.ctx, organization, customer_id).await?;
        DocumentRepo::delete(self.ctx.pool(), customer_id, document_id).await?;
        tracing::info!(customer_id, document_id, "document deleted");
        Ok(())
    }
}
