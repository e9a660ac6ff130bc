//! # Instrument Entity
//!
//! Payment instrument kind (card, wallet, ...), identified by key.

use crate::domain::entities::Entity;
use crate::domain::specification::{Page, Specification, id_in};
use crate::domain::value_objects::Identified;
use serde::{Deserialize, Serialize};

/// Payment instrument kind.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Instrument {
    /// Store-assigned identifier.
    pub id: Option<i64>,
    /// Unique key, e.g. `card`.
    pub key: Option<String>,
}

impl Instrument {
    /// Creates an unsaved instrument.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            id: None,
            key: Some(key.into()),
        }
    }
}

/// Partial update of an [`Instrument`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstrumentPatch {
    /// New key.
    pub key: Option<String>,
}

/// Instrument query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrumentSpec {
    /// Every instrument.
    All,
    /// Instrument with this id.
    ById(i64),
    /// Instruments with any of these ids.
    ByIds(Vec<i64>),
    /// Instrument with this key.
    ByKey(String),
    /// Limit/offset window.
    Page(Page),
}

impl Specification<Instrument> for InstrumentSpec {
    fn is_satisfied_by(&self, instrument: &Instrument, position: usize) -> bool {
        match self {
            Self::All => true,
            Self::ById(id) => instrument.id == Some(*id),
            Self::ByIds(ids) => id_in(instrument.id, ids),
            Self::ByKey(key) => instrument.key.as_deref() == Some(key.as_str()),
            Self::Page(page) => page.contains(position),
        }
    }
}

impl Identified for Instrument {
    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl Entity for Instrument {
    const NAME: &'static str = "instrument";

    type Patch = InstrumentPatch;
    type Spec = InstrumentSpec;

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn apply_patch(self, patch: InstrumentPatch) -> Self {
        Self {
            id: self.id,
            key: patch.key.or(self.key),
        }
    }

    fn by_ids(ids: Vec<i64>) -> InstrumentSpec {
        InstrumentSpec::ByIds(ids)
    }
}
