//! # Card Vault
//!
//! Card and session repositories that delegate storage to an external
//! PCI-scope vault over JSON/HTTP.
//!
//! - [`VaultClient`]: request plumbing with masked logging
//! - [`VaultCardStore`]: `/v1/cards`
//! - [`VaultSessionStore`]: `/v1/sessions`

pub mod card_store;
pub mod client;
pub mod masking;
pub mod session_store;

pub use card_store::VaultCardStore;
pub use client::VaultClient;
pub use masking::mask_sensitive;
pub use session_store::VaultSessionStore;
