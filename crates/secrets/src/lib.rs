//! # Customers Secrets
//!
//! Secret keepers used to hold SSNs and account numbers at rest, and to wrap
//! decrypted account numbers for transit.
//!
//! ```text
//!   raw value ──seal──► at-rest keeper ──► base64 ciphertext (store)
//!                                               │
//!                          rewrap ◄─────────────┘
//!                             │
//!                             ▼
//!                   in-transit keeper ──► base64 ciphertext (caller)
//! ```

pub mod envelope;
pub mod error;
pub mod keeper;

pub use envelope::{open, rewrap, seal};
pub use error::{KeeperError, KeeperResult};
pub use keeper::{open_keeper, LocalKeeper, SecretKeeper};
