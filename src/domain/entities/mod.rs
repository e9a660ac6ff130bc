//! # Domain Entities
//!
//! Payment-domain records persisted by the repositories.
//!
//! ## Reference data
//!
//! - [`Currency`], [`Channel`], [`Router`], [`Instrument`]
//!
//! ## Merchant configuration
//!
//! - [`Account`]: acquiring account on a channel, in a currency
//! - [`Profile`]: merchant profile with its settlement currency
//! - [`Route`]: profile + instrument → account + router mapping
//!
//! ## Sensitive data
//!
//! - [`Card`]: vaulted card with masked PAN and access token
//! - [`Session`]: expiring key/value session
//!
//! ## Activity
//!
//! - [`Transaction`]: payment operation with its lifecycle status
//!
//! Every entity has a matching patch type (all fields optional, used by
//! `update`) and a specification enum (used by `query`).

pub mod account;
pub mod card;
pub mod channel;
pub mod currency;
pub mod instrument;
pub mod profile;
pub mod route;
pub mod router;
pub mod session;
pub mod transaction;

pub use account::{Account, AccountPatch, AccountSpec, Settings};
pub use card::{Card, CardPatch, CardSpec};
pub use channel::{Channel, ChannelPatch, ChannelSpec};
pub use currency::{Currency, CurrencyPatch, CurrencySpec};
pub use instrument::{Instrument, InstrumentPatch, InstrumentSpec};
pub use profile::{Profile, ProfilePatch, ProfileSpec};
pub use route::{Route, RoutePatch, RouteSpec};
pub use router::{Router, RouterPatch, RouterSpec};
pub use session::{DEFAULT_SESSION_TTL_SECS, Session, SessionData, SessionPatch, SessionSpec};
pub use transaction::{
    AdditionalData, InvalidTransactionStatusError, InvalidTransactionTypeError, ThreeDSMethodUrl,
    ThreeDSecure10, ThreeDSecure20, Transaction, TransactionPatch, TransactionSpec,
    TransactionStatus, TransactionType, Turnover,
};

use crate::domain::specification::Specification;
use crate::domain::value_objects::Identified;
use chrono::{DateTime, Utc};
use std::fmt;

/// A persistable record.
///
/// Ties a record type to its patch and specification types and provides the
/// store-independent pieces of the repository contract.
pub trait Entity: Identified + Clone + Send + Sync + fmt::Debug + 'static {
    /// Entity name used in errors and logs.
    const NAME: &'static str;

    /// Partial update; `None` fields keep the stored value.
    type Patch: Clone + Send + Sync + fmt::Debug + 'static;

    /// Query specification.
    type Spec: Specification<Self> + 'static;

    /// Stores the assigned identifier.
    fn set_id(&mut self, id: i64);

    /// Merges `patch` over `self`: present patch fields win, absent ones keep
    /// the current value. The id is never touched.
    #[must_use]
    fn apply_patch(self, patch: Self::Patch) -> Self;

    /// Specification selecting the given ids.
    fn by_ids(ids: Vec<i64>) -> Self::Spec;

    /// Reduces reference fields to their id-only form.
    fn detach_references(&mut self) {}

    /// Returns false for records that queries must skip at `now`.
    fn is_live(&self, _now: DateTime<Utc>) -> bool {
        true
    }
}
