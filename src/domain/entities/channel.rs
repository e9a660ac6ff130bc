//! # Channel Entity
//!
//! Acquiring channel (processor connection) identified by a unique key.

use crate::domain::entities::Entity;
use crate::domain::specification::{Page, Specification, id_in};
use crate::domain::value_objects::Identified;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Acquiring channel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Channel {
    /// Store-assigned identifier.
    pub id: Option<i64>,
    /// Channel implementation type.
    pub type_id: Option<i32>,
    /// Unique key.
    pub key: Option<String>,
}

impl Channel {
    /// Creates an unsaved channel.
    #[must_use]
    pub fn new(type_id: i32, key: impl Into<String>) -> Self {
        Self {
            id: None,
            type_id: Some(type_id),
            key: Some(key.into()),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Channel <{}>", self.key.as_deref().unwrap_or("?"))
    }
}

/// Partial update of a [`Channel`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelPatch {
    /// New type.
    pub type_id: Option<i32>,
    /// New key.
    pub key: Option<String>,
}

/// Channel query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSpec {
    /// Every channel.
    All,
    /// Channel with this id.
    ById(i64),
    /// Channels with any of these ids.
    ByIds(Vec<i64>),
    /// Channels of this type.
    ByTypeId(i32),
    /// Channel with this key.
    ByKey(String),
    /// Limit/offset window.
    Page(Page),
}

impl Specification<Channel> for ChannelSpec {
    fn is_satisfied_by(&self, channel: &Channel, position: usize) -> bool {
        match self {
            Self::All => true,
            Self::ById(id) => channel.id == Some(*id),
            Self::ByIds(ids) => id_in(channel.id, ids),
            Self::ByTypeId(type_id) => channel.type_id == Some(*type_id),
            Self::ByKey(key) => channel.key.as_deref() == Some(key.as_str()),
            Self::Page(page) => page.contains(position),
        }
    }
}

impl Identified for Channel {
    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl Entity for Channel {
    const NAME: &'static str = "channel";

    type Patch = ChannelPatch;
    type Spec = ChannelSpec;

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn apply_patch(self, patch: ChannelPatch) -> Self {
        Self {
            id: self.id,
            type_id: patch.type_id.or(self.type_id),
            key: patch.key.or(self.key),
        }
    }

    fn by_ids(ids: Vec<i64>) -> ChannelSpec {
        ChannelSpec::ByIds(ids)
    }
}
