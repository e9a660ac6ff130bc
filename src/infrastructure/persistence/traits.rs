//! # Repository Traits
//!
//! The storage-independent repository contract.
//!
//! Every entity is served by an implementation of [`Repository`]; the
//! transaction repository additionally implements [`TransactionRepository`].
//! Implementations differ only in where records live:
//!
//! - `in_memory`: ordered map guarded by an async mutex
//! - `postgres`: tables accessed through a `sqlx::PgPool`
//! - `vault`: remote HTTP vault (card and session only)
//!
//! # Examples
//!
//! ```ignore
//! use paystore::domain::RequestContext;
//! use paystore::domain::entities::{Currency, CurrencySpec};
//! use paystore::infrastructure::persistence::Repository;
//!
//! async fn show(repo: &dyn Repository<Currency>) {
//!     let ctx = RequestContext::new();
//!     let result = repo.query(&ctx, &CurrencySpec::ByNumericCode(643)).await?;
//!     println!("{} of {} currencies", result.items.len(), result.total);
//! }
//! ```

use crate::domain::RequestContext;
use crate::domain::entities::{Entity, Transaction, TransactionSpec, TransactionType, Turnover};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Error type for repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Entity not found.
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        /// Type of entity.
        entity_type: &'static str,
        /// Entity identifier.
        id: String,
    },

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query error.
    #[error("Query error: {0}")]
    Query(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Operation not offered by the backend.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// The request was cancelled before the operation started.
    #[error("Request cancelled")]
    Cancelled,

    /// Resolving a reference failed.
    #[error("Failed to load {entity_type} references: {source}")]
    Hydration {
        /// Type of the referenced entity.
        entity_type: &'static str,
        /// Underlying failure.
        #[source]
        source: Box<RepositoryError>,
    },

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RepositoryError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error.
    #[must_use]
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Creates an unsupported operation error.
    #[must_use]
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Wraps a failure raised while loading `entity_type` references.
    #[must_use]
    pub fn hydration(entity_type: &'static str, source: RepositoryError) -> Self {
        Self::Hydration {
            entity_type,
            source: Box::new(source),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the backend does not offer the operation.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }

    /// Returns true if the request was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Fails with [`RepositoryError::Cancelled`] once `ctx` has been cancelled.
///
/// # Errors
///
/// Returns `RepositoryError::Cancelled` if the request was cancelled.
pub fn ensure_active(ctx: &RequestContext) -> RepositoryResult<()> {
    if ctx.is_cancelled() {
        return Err(RepositoryError::Cancelled);
    }
    Ok(())
}

/// Outcome of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<E> {
    /// Number of records in the store, regardless of the specification.
    pub total: u64,
    /// Matching records, in store order.
    pub items: Vec<E>,
}

impl<E> QueryResult<E> {
    /// Returns the first matching record.
    #[must_use]
    pub fn first(&self) -> Option<&E> {
        self.items.first()
    }

    /// Consumes the result, returning the first matching record.
    #[must_use]
    pub fn into_first(self) -> Option<E> {
        self.items.into_iter().next()
    }
}

impl<E> Default for QueryResult<E> {
    fn default() -> Self {
        Self {
            total: 0,
            items: Vec::new(),
        }
    }
}

/// Repository for one entity type.
///
/// Every returned record has its id-bearing references loaded; references
/// whose target no longer exists stay id-only.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync + fmt::Debug {
    /// Stores a new record.
    ///
    /// Assigns the id and the server-generated fields and returns the stored
    /// record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the record.
    async fn add(&self, ctx: &RequestContext, record: E) -> RepositoryResult<E>;

    /// Deletes a record, returning it as it was before deletion.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no record has this id.
    async fn delete(&self, ctx: &RequestContext, id: i64) -> RepositoryResult<E>;

    /// Merges `patch` into the stored record and returns the result.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no record has this id.
    async fn update(&self, ctx: &RequestContext, id: i64, patch: E::Patch) -> RepositoryResult<E>;

    /// Returns the records matching `spec` and the store total.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot evaluate the query.
    async fn query(&self, ctx: &RequestContext, spec: &E::Spec) -> RepositoryResult<QueryResult<E>>;

    /// Like [`Repository::query`], but references back into this same
    /// repository stay id-only. Self references are loaded through this, so
    /// they go one level deep and reference cycles terminate.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot evaluate the query.
    async fn query_flat(
        &self,
        ctx: &RequestContext,
        spec: &E::Spec,
    ) -> RepositoryResult<QueryResult<E>> {
        self.query(ctx, spec).await
    }
}

/// Transaction persistence, with per-type aggregation.
#[async_trait]
pub trait TransactionRepository: Repository<Transaction> {
    /// Count and amount sum of the transactions matching `spec`, per type.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot evaluate the query.
    async fn type_turnover(
        &self,
        ctx: &RequestContext,
        spec: &TransactionSpec,
    ) -> RepositoryResult<BTreeMap<TransactionType, Turnover>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    mod repository_error {
        use super::*;

        #[test]
        fn not_found_error() {
            let err = RepositoryError::not_found("card", 42);
            assert!(err.is_not_found());
            assert!(!err.is_unsupported());
            assert!(err.to_string().contains("not found"));
            assert!(err.to_string().contains("card"));
            assert!(err.to_string().contains("42"));
        }

        #[test]
        fn hydration_error_is_not_a_not_found() {
            let err = RepositoryError::hydration(
                "currency",
                RepositoryError::query("relation does not exist"),
            );
            assert!(!err.is_not_found());
            assert!(err.to_string().contains("currency"));
            assert!(err.to_string().contains("relation does not exist"));
        }

        #[test]
        fn unsupported_error() {
            let err = RepositoryError::unsupported("session delete");
            assert!(err.is_unsupported());
            assert!(err.to_string().contains("session delete"));
        }

        #[test]
        fn cancelled_context_is_rejected() {
            let ctx = RequestContext::new();
            assert!(ensure_active(&ctx).is_ok());
            ctx.cancel();
            assert!(ensure_active(&ctx).is_err_and(|e| e.is_cancelled()));
        }
    }

    #[test]
    fn query_result_first() {
        let result = QueryResult {
            total: 3,
            items: vec![1, 2],
        };
        assert_eq!(result.first(), Some(&1));
        assert_eq!(result.into_first(), Some(1));
        assert_eq!(QueryResult::<i32>::default().into_first(), None);
    }
}
