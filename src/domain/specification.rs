//! # Specifications
//!
//! Predicates deciding which records a query returns.
//!
//! Every entity has its own specification enum (for example
//! [`CurrencySpec`](crate::domain::entities::CurrencySpec)). In-memory stores
//! evaluate it record by record through [`Specification::is_satisfied_by`];
//! the PostgreSQL store renders it as a parameterized clause instead.
//!
//! # Pagination
//!
//! Limit/offset is emulated in memory without slicing: the store passes the
//! position of every visited record, matched or not, and a [`Page`] accepts
//! only positions in `offset..offset + limit`.
//!
//! ```
//! use paystore::domain::specification::Page;
//!
//! let page = Page::new(2, 1);
//! assert!(!page.contains(0));
//! assert!(page.contains(1));
//! assert!(page.contains(2));
//! assert!(!page.contains(3));
//! assert_eq!(page.expected_len(10), 2);
//! assert_eq!(page.expected_len(1), 0);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Record predicate used by the in-memory stores.
pub trait Specification<T>: Send + Sync + fmt::Debug {
    /// Returns true if `record`, visited at `position`, belongs to the result.
    ///
    /// `position` counts every record visited in the pass, including the
    /// ones rejected by this specification.
    fn is_satisfied_by(&self, record: &T, position: usize) -> bool;
}

/// Limit/offset window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Page {
    limit: usize,
    offset: usize,
}

impl Page {
    /// Creates a window of `limit` records starting at `offset`.
    #[must_use]
    pub const fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// Maximum number of records in the window.
    #[inline]
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Number of records skipped before the window.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Returns true if `position` falls inside the window.
    #[inline]
    #[must_use]
    pub const fn contains(&self, position: usize) -> bool {
        position >= self.offset && position < self.offset.saturating_add(self.limit)
    }

    /// Number of records the window yields over `total` records.
    #[must_use]
    pub const fn expected_len(&self, total: usize) -> usize {
        let remaining = total.saturating_sub(self.offset);
        if remaining < self.limit {
            remaining
        } else {
            self.limit
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "limit {} offset {}", self.limit, self.offset)
    }
}

/// Returns true if `id` is set and listed in `ids`.
#[inline]
#[must_use]
pub fn id_in(id: Option<i64>, ids: &[i64]) -> bool {
    id.is_some_and(|id| ids.contains(&id))
}
