//! # Secret Keeper
//!
//! Symmetric envelope encryption for short strings. Callers treat ciphertext
//! as opaque bytes and never see key material.
//!
//! ## Keeper URIs
//!
//! - `base64key://<standard base64 of 32 bytes>` - AES-256-GCM with that key
//! - `base64key://` - AES-256-GCM with a fresh random key (process lifetime)

use crate::error::{KeeperError, KeeperResult};
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use zeroize::Zeroizing;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const BASE64_KEY_SCHEME: &str = "base64key://";

/// Encrypts and decrypts short sensitive values.
///
/// Implementations are shared process-wide behind an `Arc`; a closed keeper
/// answers every call with [`KeeperError::Unavailable`].
#[async_trait]
pub trait SecretKeeper: Send + Sync {
    /// Keeper name for logging
    fn name(&self) -> &str;

    async fn encrypt(&self, plaintext: &[u8]) -> KeeperResult<Vec<u8>>;

    async fn decrypt(&self, ciphertext: &[u8]) -> KeeperResult<Vec<u8>>;

    /// Stop serving requests. Callers must not close a keeper with requests
    /// in flight.
    fn close(&self);
}

/// AES-256-GCM keeper holding its key in process memory.
///
/// Ciphertext layout: `nonce (12 bytes) || sealed payload`.
pub struct LocalKeeper {
    name: String,
    cipher: Aes256Gcm,
    closed: AtomicBool,
}

impl LocalKeeper {
    /// Build a keeper from raw key bytes.
    pub fn from_key(name: &str, key: &[u8]) -> KeeperResult<Self> {
        if key.len() != KEY_LEN {
            return Err(KeeperError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_LEN,
                key.len()
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| KeeperError::InvalidKey(e.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            cipher,
            closed: AtomicBool::new(false),
        })
    }

    /// Keeper with a freshly generated random key.
    pub fn random(name: &str) -> Self {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut key[..]);
        Self {
            name: name.to_string(),
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..])),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> KeeperResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(KeeperError::Unavailable(format!(
                "keeper {} is closed",
                self.name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SecretKeeper for LocalKeeper {
    fn name(&self) -> &str {
        &self.name
    }

    async fn encrypt(&self, plaintext: &[u8]) -> KeeperResult<Vec<u8>> {
        self.ensure_open()?;

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| KeeperError::Unavailable(format!("{}: encryption failed", self.name)))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> KeeperResult<Vec<u8>> {
        self.ensure_open()?;

        if ciphertext.len() <= NONCE_LEN {
            return Err(KeeperError::Malformed(format!(
                "ciphertext too short ({} bytes)",
                ciphertext.len()
            )));
        }
        let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| KeeperError::Malformed("authentication failed".to_string()))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        tracing::info!(keeper = %self.name, "secret keeper closed");
    }
}

/// Open a keeper from its URI. See the module docs for supported schemes.
pub fn open_keeper(name: &str, uri: &str) -> KeeperResult<Arc<dyn SecretKeeper>> {
    let Some(encoded) = uri.strip_prefix(BASE64_KEY_SCHEME) else {
        return Err(KeeperError::UnsupportedUri(redact_uri(uri)));
    };

    let keeper = if encoded.is_empty() {
        tracing::warn!(keeper = name, "no key configured, generated a random key");
        LocalKeeper::random(name)
    } else {
        let key = Zeroizing::new(
            BASE64
                .decode(encoded)
                .map_err(|e| KeeperError::InvalidKey(e.to_string()))?,
        );
        LocalKeeper::from_key(name, &key)?
    };
    Ok(Arc::new(keeper))
}

/// Keep the scheme only; URIs may embed key material.
fn redact_uri(uri: &str) -> String {
    match uri.find("://") {
        Some(idx) => format!("{}://...", &uri[..idx]),
        None => "<opaque>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_encrypt_decrypt_roundtrip() {
        let keeper = LocalKeeper::random("test");
        let ciphertext = keeper.encrypt(b"123456789").await.unwrap();
        assert_ne!(&ciphertext[NONCE_LEN..], b"123456789");

        let plaintext = keeper.decrypt(&ciphertext).await.unwrap();
        assert_eq!(plaintext, b"123456789");
    }

    #[tokio::test]
    async fn test_distinct_keepers_do_not_share_keys() {
        let at_rest = LocalKeeper::random("at-rest");
        let in_transit = LocalKeeper::random("in-transit");

        let ciphertext = at_rest.encrypt(b"secret").await.unwrap();
        assert!(matches!(
            in_transit.decrypt(&ciphertext).await,
            Err(KeeperError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_tampered_ciphertext_is_malformed() {
        let keeper = LocalKeeper::random("test");
        let mut ciphertext = keeper.encrypt(b"secret").await.unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0xFF;

        assert!(matches!(
            keeper.decrypt(&ciphertext).await,
            Err(KeeperError::Malformed(_))
        ));
        assert!(matches!(
            keeper.decrypt(b"short").await,
            Err(KeeperError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_closed_keeper_is_unavailable() {
        let keeper = LocalKeeper::random("test");
        let ciphertext = keeper.encrypt(b"secret").await.unwrap();
        keeper.close();

        assert!(matches!(
            keeper.encrypt(b"secret").await,
            Err(KeeperError::Unavailable(_))
        ));
        assert!(matches!(
            keeper.decrypt(&ciphertext).await,
            Err(KeeperError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_open_keeper_with_key() {
        let key = BASE64.encode([7u8; KEY_LEN]);
        let keeper = open_keeper("app", &format!("base64key://{}", key)).unwrap();
        let other = open_keeper("app", &format!("base64key://{}", key)).unwrap();

        let ciphertext = keeper.encrypt(b"shared").await.unwrap();
        assert_eq!(other.decrypt(&ciphertext).await.unwrap(), b"shared");
    }

    #[test]
    fn test_open_keeper_rejects_bad_uris() {
        assert!(matches!(
            open_keeper("app", "awskms://alias/customers"),
            Err(KeeperError::UnsupportedUri(_))
        ));
        assert!(matches!(
            open_keeper("app", "base64key://not base64!"),
            Err(KeeperError::InvalidKey(_))
        ));
        let short = BASE64.encode([1u8; 16]);
        assert!(matches!(
            open_keeper("app", &format!("base64key://{}", short)),
            Err(KeeperError::InvalidKey(_))
        ));
        assert!(open_keeper("app", "base64key://").is_ok());
    }
}
