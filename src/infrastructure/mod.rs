//! # Infrastructure Layer
//!
//! Storage adapters behind the [`Repository`](persistence::Repository) port.
//!
//! - `persistence`: repository contract, in-memory and PostgreSQL stores
//! - `vault`: HTTP vault stores for cards and sessions
//! - `repositories`: one-call wiring of a complete repository set

pub mod persistence;
pub mod repositories;
pub mod vault;

pub use repositories::{Repositories, SensitiveBackend};
