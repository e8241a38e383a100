//! Opaque record identifiers.

use rand::RngCore;

/// Generate a random 40-character lowercase hex identifier.
pub fn new_id() -> String {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Whether `id` has the shape produced by [`new_id`].
pub fn is_valid_id(id: &str) -> bool {
    id.len() == 40 && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
