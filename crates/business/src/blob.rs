//! Document blob storage
//!
//! Bytes live outside the database under `customers/{id}/documents/{doc}`.
//! The file provider serves them through signed URLs.

use crate::config::{BlobConfig, BlobProvider};
use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use parking_lot::RwLock;
use sha2::Sha256;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Object storage for document bytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> ServiceResult<()>;

    /// Object bytes, `None` when the key is absent.
    async fn get(&self, key: &str) -> ServiceResult<Option<Vec<u8>>>;

    /// Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> ServiceResult<()>;

    /// URL a caller may be redirected to, if the provider serves one.
    fn signed_url(&self, _key: &str) -> Option<String> {
        None
    }
}

/// Open the configured provider.
pub fn open_blob_store(config: &BlobConfig) -> ServiceResult<Arc<dyn BlobStore>> {
    match config.provider {
        BlobProvider::File => {
            if config.fileblob_signing_secret.trim().is_empty() {
                return Err(ServiceError::internal(
                    "blob.open",
                    "file provider requires fileblob_signing_secret",
                ));
            }
            Ok(Arc::new(FileBlobStore::new(config)))
        }
        other => Err(ServiceError::internal(
            "blob.open",
            format!("unsupported blob provider: {}", other.as_str()),
        )),
    }
}

/// Signed URLs stay valid for this long.
const SIGNED_URL_TTL_SECS: i64 = 15 * 60;

type HmacSha256 = Hmac<Sha256>;

/// Blob store on the local filesystem, rooted at the bucket directory.
pub struct FileBlobStore {
    root: PathBuf,
    base_url: String,
    url_path: String,
    secret: String,
}

impl FileBlobStore {
    pub fn new(config: &BlobConfig) -> Self {
        Self {
            root: PathBuf::from(&config.bucket),
            base_url: config.fileblob_base_url.trim_end_matches('/').to_string(),
            url_path: format!("/{}", config.fileblob_path.trim_matches('/')),
            secret: config.fileblob_signing_secret.clone(),
        }
    }

    fn path_for(&self, key: &str) -> ServiceResult<PathBuf> {
        let relative = Path::new(key);
        let clean = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !clean {
            return Err(ServiceError::BadRequest(format!("invalid blob key: {}", key)));
        }
        Ok(self.root.join(relative))
    }

    /// HMAC-SHA256 over `key:expiry`, `None` without a signing secret.
    fn mac(&self, key: &str, expiry: i64) -> Option<HmacSha256> {
        if self.secret.is_empty() {
            return None;
        }
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).ok()?;
        mac.update(key.as_bytes());
        mac.update(b":");
        mac.update(expiry.to_string().as_bytes());
        Some(mac)
    }

    fn signature(&self, key: &str, expiry: i64) -> String {
        self.mac(key, expiry)
            .map(|mac| hex::encode(mac.finalize().into_bytes()))
            .unwrap_or_default()
    }

    /// URL for `key` expiring at unix time `expiry`.
    pub fn sign_url(&self, key: &str, expiry: i64) -> String {
        format!(
            "{}{}/{}?expiry={}&signature={}",
            self.base_url,
            self.url_path,
            key,
            expiry,
            self.signature(key, expiry)
        )
    }

    /// Check a (key, expiry, signature) triple taken from a signed URL.
    pub fn verify_signed_url(&self, key: &str, expiry: i64, signature: &str) -> bool {
        if expiry < Utc::now().timestamp() {
            return false;
        }
        let (Some(mac), Ok(tag)) = (self.mac(key, expiry), hex::decode(signature)) else {
            return false;
        };
        // Constant-time comparison
        mac.verify_slice(&tag).is_ok()
    }
}

fn io_error(subsystem: &'static str) -> impl Fn(std::io::Error) -> ServiceError {
    move |e| ServiceError::internal(subsystem, e)
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn put(&self, key: &str, data: &[u8], _content_type: &str) -> ServiceResult<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(io_error("blob.put"))?;
        }
        tokio::fs::write(&path, data)
            .await
            .map_err(io_error("blob.put"))?;
        tracing::debug!(key, bytes = data.len(), "stored blob");
        Ok(())
    }

    async fn get(&self, key: &str) -> ServiceResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ServiceError::internal("blob.get", e)),
        }
    }

    async fn delete(&self, key: &str) -> ServiceResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ServiceError::internal("blob.delete", e)),
        }
    }

    fn signed_url(&self, key: &str) -> Option<String> {
        Some(self.sign_url(key, Utc::now().timestamp() + SIGNED_URL_TTL_SECS))
    }
}

/// In-memory blob store
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.read().contains_key(key)
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects.read().get(key).map(|(_, ct)| ct.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> ServiceResult<()> {
        self.objects
            .write()
            .insert(key.to_string(), (data.to_vec(), content_type.to_string()));
        Ok(())
    }

    async fn get(&self, key: &str) -> ServiceResult<Option<Vec<u8>>> {
        Ok(self.objects.read().get(key).map(|(data, _)| data.clone()))
    }

    async fn delete(&self, key: &str) -> ServiceResult<()> {
        self.objects.write().remove(key);
        Ok(())
    }
}
