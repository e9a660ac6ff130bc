//! # Route Entity
//!
//! Maps a (profile, instrument) pair to the account and router that handle
//! its payments.

use crate::domain::entities::{Account, Entity, Instrument, Profile, Router, Settings};
use crate::domain::specification::{Page, Specification, id_in};
use crate::domain::value_objects::{Identified, Reference, detach, merge_reference, reference_id};
use serde::{Deserialize, Serialize};

/// Payment route.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Route {
    /// Store-assigned identifier.
    pub id: Option<i64>,
    /// Merchant profile.
    pub profile: Option<Reference<Profile>>,
    /// Payment instrument.
    pub instrument: Option<Reference<Instrument>>,
    /// Acquiring account.
    pub account: Option<Reference<Account>>,
    /// Routing strategy.
    pub router: Option<Reference<Router>>,
    /// Router settings.
    pub settings: Option<Settings>,
}

/// Partial update of a [`Route`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoutePatch {
    /// New profile.
    pub profile: Option<Reference<Profile>>,
    /// New instrument.
    pub instrument: Option<Reference<Instrument>>,
    /// New account.
    pub account: Option<Reference<Account>>,
    /// New router.
    pub router: Option<Reference<Router>>,
    /// New settings (replaces the stored object).
    pub settings: Option<Settings>,
}

/// Route query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteSpec {
    /// Every route.
    All,
    /// Route with this id.
    ById(i64),
    /// Routes with any of these ids.
    ByIds(Vec<i64>),
    /// Route for a profile and instrument.
    ByProfileAndInstrument {
        /// Profile id.
        profile_id: i64,
        /// Instrument id.
        instrument_id: i64,
    },
    /// Limit/offset window.
    Page(Page),
}

impl Specification<Route> for RouteSpec {
    fn is_satisfied_by(&self, route: &Route, position: usize) -> bool {
        match self {
            Self::All => true,
            Self::ById(id) => route.id == Some(*id),
            Self::ByIds(ids) => id_in(route.id, ids),
            Self::ByProfileAndInstrument {
                profile_id,
                instrument_id,
            } => {
                reference_id(&route.profile) == Some(*profile_id)
                    && reference_id(&route.instrument) == Some(*instrument_id)
            }
            Self::Page(page) => page.contains(position),
        }
    }
}

impl Identified for Route {
    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl Entity for Route {
    const NAME: &'static str = "route";

    type Patch = RoutePatch;
    type Spec = RouteSpec;

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn apply_patch(self, patch: RoutePatch) -> Self {
        Self {
            id: self.id,
            profile: merge_reference(patch.profile, self.profile),
            instrument: merge_reference(patch.instrument, self.instrument),
            account: merge_reference(patch.account, self.account),
            router: merge_reference(patch.router, self.router),
            settings: patch.settings.or(self.settings),
        }
    }

    fn by_ids(ids: Vec<i64>) -> RouteSpec {
        RouteSpec::ByIds(ids)
    }

    fn detach_references(&mut self) {
        detach(&mut self.profile);
        detach(&mut self.instrument);
        detach(&mut self.account);
        detach(&mut self.router);
    }
}
