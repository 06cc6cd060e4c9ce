//! # Courier Store
//!
//! Encrypted-at-rest installation storage for the Courier plugin bus.
//!
//! Two pieces live here:
//!
//! - [`TokenCipher`]: authenticated symmetric encryption of secrets, keyed
//!   by a deployment-wide passphrase. Each encryption uses a fresh random
//!   nonce, so two encryptions of the same plaintext never produce the same
//!   ciphertext.
//! - [`InstallationStore`]: the persistent map
//!   `(plugin_name, channel_id) → Installation` backed by SQLite. Tokens
//!   are encrypted before they touch disk and decrypted on the way out, so
//!   callers never observe ciphertext and raw rows never expose plaintext.
//!
//! The cipher is deliberately kept outside the store's schema so the
//! backing persistence can be swapped without touching key management.

pub mod cipher;
pub mod model;
pub mod store;

pub use cipher::{CipherError, TokenCipher};
pub use model::{Installation, InstallationUpdate};
pub use store::{InstallationStore, StoreError};
