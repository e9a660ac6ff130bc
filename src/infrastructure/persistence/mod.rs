//! # Persistence Layer
//!
//! Repository contract and its storage backends.
//!
//! ## Repository Traits (Ports)
//!
//! - [`Repository`]: add, delete, update and query for any entity
//! - [`TransactionRepository`]: adds per-type turnover aggregation
//!
//! ## Implementations
//!
//! - `in_memory`: insertion-ordered stores, one mutex per entity
//! - `postgres`: sqlx stores over a shared connection pool
//!
//! Both backends share [`EntityHooks`] for server-generated fields and
//! reference hydration.

pub mod hooks;
pub mod in_memory;
pub mod postgres;
pub mod traits;

pub use hooks::{
    AccountDeps, EntityHooks, ProfileDeps, RouteDeps, SessionOptions, TransactionDeps,
    resolve_references, resolve_self_references,
};
pub use traits::{
    QueryResult, Repository, RepositoryError, RepositoryResult, TransactionRepository,
    ensure_active,
};
