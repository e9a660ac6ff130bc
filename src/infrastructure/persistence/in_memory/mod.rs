//! # In-Memory Repositories
//!
//! Process-local storage for every entity, backed by [`InMemoryStore`].
//!
//! ## Thread Safety
//!
//! Each store owns one `tokio::sync::Mutex`; operations on different stores
//! never contend.

pub mod store;

pub use store::InMemoryStore;
