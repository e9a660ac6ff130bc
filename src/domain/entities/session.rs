//! # Session Entity
//!
//! Key/value session with a fixed time-to-live. Expired sessions disappear
//! from query results but stay addressable by id for update and delete.

use crate::domain::entities::Entity;
use crate::domain::specification::{Page, Specification, id_in};
use crate::domain::value_objects::Identified;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default session lifetime, in seconds.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 1800;

/// Session payload.
pub type SessionData = serde_json::Map<String, serde_json::Value>;

/// Expiring session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Session {
    /// Store-assigned identifier.
    pub id: Option<i64>,
    /// Lookup key.
    pub key: Option<String>,
    /// Payload.
    pub data: Option<SessionData>,
    /// Expiration instant, set when the session is stored.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Creates an unsaved session.
    #[must_use]
    pub fn new(key: impl Into<String>, data: SessionData) -> Self {
        Self {
            id: None,
            key: Some(key.into()),
            data: Some(data),
            expires_at: None,
        }
    }

    /// Sets the expiration `ttl` after `now`.
    pub fn start(&mut self, now: DateTime<Utc>, ttl: Duration) {
        self.expires_at = Some(now + ttl);
    }

    /// Returns true once `now` has reached the expiration instant.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// Partial update of a [`Session`]. The expiration is fixed at creation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionPatch {
    /// New key.
    pub key: Option<String>,
    /// New payload (replaces the stored one).
    pub data: Option<SessionData>,
}

/// Session query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSpec {
    /// Every session.
    All,
    /// Session with this id.
    ById(i64),
    /// Sessions with any of these ids.
    ByIds(Vec<i64>),
    /// Session with this key.
    ByKey(String),
    /// Limit/offset window.
    Page(Page),
}

impl Specification<Session> for SessionSpec {
    fn is_satisfied_by(&self, session: &Session, position: usize) -> bool {
        match self {
            Self::All => true,
            Self::ById(id) => session.id == Some(*id),
            Self::ByIds(ids) => id_in(session.id, ids),
            Self::ByKey(key) => session.key.as_deref() == Some(key.as_str()),
            Self::Page(page) => page.contains(position),
        }
    }
}

impl Identified for Session {
    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl Entity for Session {
    const NAME: &'static str = "session";

    type Patch = SessionPatch;
    type Spec = SessionSpec;

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn apply_patch(self, patch: SessionPatch) -> Self {
        Self {
            id: self.id,
            key: patch.key.or(self.key),
            data: patch.data.or(self.data),
            expires_at: self.expires_at,
        }
    }

    fn by_ids(ids: Vec<i64>) -> SessionSpec {
        SessionSpec::ByIds(ids)
    }

    fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_boundary() {
        let now = Utc::now();
        let mut session = Session::new("k", SessionData::new());
        assert!(session.is_live(now));

        session.start(now, Duration::seconds(10));
        assert!(session.is_live(now + Duration::seconds(9)));
        assert!(!session.is_live(now + Duration::seconds(10)));
    }

    #[test]
    fn patch_keeps_expiry() {
        let now = Utc::now();
        let mut session = Session::new("k", SessionData::new());
        session.start(now, Duration::seconds(60));
        let patched = session.clone().apply_patch(SessionPatch {
            key: Some("other".to_string()),
            data: None,
        });
        assert_eq!(patched.expires_at, session.expires_at);
        assert_eq!(patched.key.as_deref(), Some("other"));
        assert_eq!(patched.data, Some(SessionData::new()));
    }
}
