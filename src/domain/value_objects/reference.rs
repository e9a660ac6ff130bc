//! # Entity References
//!
//! A reference field points at another entity either shallowly, by id only,
//! or as the fully loaded record.
//!
//! Stores persist only the id. Reads return shallow references which the
//! hydration step replaces with loaded records; a reference whose target
//! could not be found stays [`Reference::Id`].
//!
//! # Examples
//!
//! ```
//! use paystore::domain::entities::Currency;
//! use paystore::domain::value_objects::Reference;
//!
//! let shallow: Reference<Currency> = Reference::shallow(7);
//! assert_eq!(shallow.id(), Some(7));
//! assert_eq!(shallow.pending_id(), Some(7));
//!
//! let loaded = Reference::loaded(Currency { id: Some(7), ..Currency::default() });
//! assert_eq!(loaded.pending_id(), None);
//! assert_eq!(loaded.detached(), Some(shallow));
//! ```

use serde::{Deserialize, Serialize};

/// Anything that carries a store-assigned identifier.
pub trait Identified {
    /// Returns the identifier, if the record has been persisted.
    fn id(&self) -> Option<i64>;
}

/// Reference to another entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference<T> {
    /// Fully loaded record.
    Loaded(Box<T>),
    /// Id-only reference, not (yet) resolved.
    Id(i64),
}

impl<T: Identified> Reference<T> {
    /// Creates an id-only reference.
    #[must_use]
    pub const fn shallow(id: i64) -> Self {
        Self::Id(id)
    }

    /// Wraps a loaded record.
    #[must_use]
    pub fn loaded(value: T) -> Self {
        Self::Loaded(Box::new(value))
    }

    /// Returns the referenced id.
    ///
    /// `None` means the reference carries no id: an absent relation.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        match self {
            Self::Loaded(value) => value.id(),
            Self::Id(id) => Some(*id),
        }
    }

    /// Returns the id when the reference still needs resolving.
    #[must_use]
    pub fn pending_id(&self) -> Option<i64> {
        match self {
            Self::Loaded(_) => None,
            Self::Id(id) => Some(*id),
        }
    }

    /// Returns true if the record is loaded.
    #[inline]
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Returns the loaded record, if any.
    #[must_use]
    pub fn as_loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            Self::Id(_) => None,
        }
    }

    /// Returns the id-only form, or `None` for an id-less reference.
    #[must_use]
    pub fn detached(&self) -> Option<Self> {
        self.id().map(Self::Id)
    }
}

impl<T: Identified> From<T> for Reference<T> {
    fn from(value: T) -> Self {
        Self::loaded(value)
    }
}

/// Reduces an optional reference to its id-only form in place.
pub fn detach<T: Identified>(slot: &mut Option<Reference<T>>) {
    *slot = slot.as_ref().and_then(Reference::detached);
}

/// Merges a patched reference over the stored one.
///
/// A patch reference without an id counts as absent and keeps `stored`,
/// matching a `NULL` id under `COALESCE`.
#[must_use]
pub fn merge_reference<T: Identified>(
    patch: Option<Reference<T>>,
    stored: Option<Reference<T>>,
) -> Option<Reference<T>> {
    match patch {
        Some(reference) if reference.id().is_some() => Some(reference),
        _ => stored,
    }
}

/// Returns the id behind an optional reference.
#[must_use]
pub fn reference_id<T: Identified>(slot: &Option<Reference<T>>) -> Option<i64> {
    slot.as_ref().and_then(Reference::id)
}
