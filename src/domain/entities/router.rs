//! # Router Entity

use crate::domain::entities::Entity;
use crate::domain::specification::{Page, Specification, id_in};
use crate::domain::value_objects::Identified;
use serde::{Deserialize, Serialize};

/// Routing strategy, identified by key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Router {
    /// Store-assigned identifier.
    pub id: Option<i64>,
    /// Unique key.
    pub key: Option<String>,
}

impl Router {
    /// Creates an unsaved router.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            id: None,
            key: Some(key.into()),
        }
    }
}

/// Partial update of a [`Router`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RouterPatch {
    /// New key.
    pub key: Option<String>,
}

/// Router query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterSpec {
    /// Every router.
    All,
    /// Router with this id.
    ById(i64),
    /// Routers with any of these ids.
    ByIds(Vec<i64>),
    /// Router with this key.
    ByKey(String),
    /// Limit/offset window.
    Page(Page),
}

impl Specification<Router> for RouterSpec {
    fn is_satisfied_by(&self, router: &Router, position: usize) -> bool {
        match self {
            Self::All => true,
            Self::ById(id) => router.id == Some(*id),
            Self::ByIds(ids) => id_in(router.id, ids),
            Self::ByKey(key) => router.key.as_deref() == Some(key.as_str()),
            Self::Page(page) => page.contains(position),
        }
    }
}

impl Identified for Router {
    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl Entity for Router {
    const NAME: &'static str = "router";

    type Patch = RouterPatch;
    type Spec = RouterSpec;

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn apply_patch(self, patch: RouterPatch) -> Self {
        Self {
            id: self.id,
            key: patch.key.or(self.key),
        }
    }

    fn by_ids(ids: Vec<i64>) -> RouterSpec {
        RouterSpec::ByIds(ids)
    }
}
