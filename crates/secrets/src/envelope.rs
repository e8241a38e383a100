//! Envelope helpers shared by the SSN and account-number paths.
//!
//! Stored ciphertexts are standard base64 strings. Raw values handed to these
//! helpers are zeroized before they return.

use crate::error::{KeeperError, KeeperResult};
use crate::keeper::SecretKeeper;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use zeroize::{Zeroize, Zeroizing};

/// Encrypt `plaintext`, overwrite it in memory, return base64 ciphertext.
///
/// The raw value is zeroized on every path, including keeper failures.
pub async fn seal(keeper: &dyn SecretKeeper, plaintext: &mut String) -> KeeperResult<String> {
    let result = keeper.encrypt(plaintext.as_bytes()).await;
    plaintext.zeroize();
    Ok(BASE64.encode(result?))
}

/// Decrypt a base64 ciphertext produced by [`seal`].
pub async fn open(keeper: &dyn SecretKeeper, encoded: &str) -> KeeperResult<Zeroizing<String>> {
    let ciphertext = BASE64
        .decode(encoded)
        .map_err(|e| KeeperError::Malformed(e.to_string()))?;
    let plaintext = Zeroizing::new(keeper.decrypt(&ciphertext).await?);
    let text = std::str::from_utf8(&plaintext)
        .map_err(|_| KeeperError::Malformed("plaintext is not utf-8".to_string()))?;
    Ok(Zeroizing::new(text.to_string()))
}

/// Move a stored ciphertext from the at-rest keeper to the in-transit keeper
/// without the plaintext leaving this function.
pub async fn rewrap(
    at_rest: &dyn SecretKeeper,
    in_transit: &dyn SecretKeeper,
    stored: &str,
) -> KeeperResult<String> {
    let plaintext = open(at_rest, stored).await?;
    let wrapped = in_transit.encrypt(plaintext.as_bytes()).await?;
    Ok(BASE64.encode(wrapped))
}
