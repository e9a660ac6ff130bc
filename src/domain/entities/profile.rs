//! # Profile Entity
//!
//! Merchant profile: a unique key, a description and the currency amounts
//! are expressed in.

use crate::domain::entities::{Currency, Entity};
use crate::domain::specification::{Page, Specification, id_in};
use crate::domain::value_objects::{Identified, Reference, detach, merge_reference};
use serde::{Deserialize, Serialize};

/// Merchant profile.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Profile {
    /// Store-assigned identifier.
    pub id: Option<i64>,
    /// Unique key.
    pub key: Option<String>,
    /// Human readable description.
    pub description: Option<String>,
    /// Profile currency.
    pub currency: Option<Reference<Currency>>,
}

impl Profile {
    /// Creates an unsaved profile.
    #[must_use]
    pub fn new(key: impl Into<String>, currency: Option<Reference<Currency>>) -> Self {
        Self {
            id: None,
            key: Some(key.into()),
            description: None,
            currency,
        }
    }
}

/// Partial update of a [`Profile`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfilePatch {
    /// New key.
    pub key: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New currency.
    pub currency: Option<Reference<Currency>>,
}

/// Profile query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSpec {
    /// Every profile.
    All,
    /// Profile with this id.
    ById(i64),
    /// Profiles with any of these ids.
    ByIds(Vec<i64>),
    /// Profile with this key.
    ByKey(String),
    /// Limit/offset window.
    Page(Page),
}

impl Specification<Profile> for ProfileSpec {
    fn is_satisfied_by(&self, profile: &Profile, position: usize) -> bool {
        match self {
            Self::All => true,
            Self::ById(id) => profile.id == Some(*id),
            Self::ByIds(ids) => id_in(profile.id, ids),
            Self::ByKey(key) => profile.key.as_deref() == Some(key.as_str()),
            Self::Page(page) => page.contains(position),
        }
    }
}

impl Identified for Profile {
    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl Entity for Profile {
    const NAME: &'static str = "profile";

    type Patch = ProfilePatch;
    type Spec = ProfileSpec;

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn apply_patch(self, patch: ProfilePatch) -> Self {
        Self {
            id: self.id,
            key: patch.key.or(self.key),
            description: patch.description.or(self.description),
            currency: merge_reference(patch.currency, self.currency),
        }
    }

    fn by_ids(ids: Vec<i64>) -> ProfileSpec {
        ProfileSpec::ByIds(ids)
    }

    fn detach_references(&mut self) {
        detach(&mut self.currency);
    }
}
