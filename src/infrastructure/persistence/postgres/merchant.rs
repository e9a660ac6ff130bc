//! Row mappings for accounts, profiles and routes.
//!
//! Reference columns hold plain ids (`<name>_id`); the rows come back with
//! shallow references that the store hydrates afterwards.

use crate::domain::entities::{
    Account, AccountPatch, AccountSpec, Profile, ProfilePatch, ProfileSpec, Route, RoutePatch,
    RouteSpec, Settings,
};
use crate::domain::specification::Page;
use crate::domain::value_objects::{Reference, reference_id};
use crate::infrastructure::persistence::postgres::store::{
    PgRecord, SqlList, SqlSpecification, push_eq_filter, push_id_filter, push_ids_filter,
    set_coalesce,
};
use crate::infrastructure::persistence::traits::RepositoryResult;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};

/// Raw `accounts` row.
#[derive(Debug, sqlx::FromRow)]
pub struct AccountRow {
    id: i64,
    is_enabled: Option<bool>,
    is_test: Option<bool>,
    rebill_enabled: Option<bool>,
    refund_enabled: Option<bool>,
    reversal_enabled: Option<bool>,
    partial_confirm_enabled: Option<bool>,
    partial_reversal_enabled: Option<bool>,
    partial_refund_enabled: Option<bool>,
    currency_conversion_enabled: Option<bool>,
    currency_id: Option<i64>,
    channel_id: Option<i64>,
    settings: Option<Json<Settings>>,
}

impl PgRecord for Account {
    const TABLE: &'static str = "accounts";
    const COLUMNS: &'static [&'static str] = &[
        "is_enabled",
        "is_test",
        "rebill_enabled",
        "refund_enabled",
        "reversal_enabled",
        "partial_confirm_enabled",
        "partial_reversal_enabled",
        "partial_refund_enabled",
        "currency_conversion_enabled",
        "currency_id",
        "channel_id",
        "settings",
    ];

    type Row = AccountRow;

    fn from_row(row: AccountRow) -> RepositoryResult<Self> {
        Ok(Self {
            id: Some(row.id),
            is_enabled: row.is_enabled,
            is_test: row.is_test,
            rebill_enabled: row.rebill_enabled,
            refund_enabled: row.refund_enabled,
            reversal_enabled: row.reversal_enabled,
            partial_confirm_enabled: row.partial_confirm_enabled,
            partial_reversal_enabled: row.partial_reversal_enabled,
            partial_refund_enabled: row.partial_refund_enabled,
            currency_conversion_enabled: row.currency_conversion_enabled,
            currency: row.currency_id.map(Reference::shallow),
            channel: row.channel_id.map(Reference::shallow),
            settings: row.settings.map(|Json(settings)| settings),
        })
    }

    fn push_values(&self, values: &mut SqlList<'_>) {
        values
            .push_bind(self.is_enabled)
            .push_bind(self.is_test)
            .push_bind(self.rebill_enabled)
            .push_bind(self.refund_enabled)
            .push_bind(self.reversal_enabled)
            .push_bind(self.partial_confirm_enabled)
            .push_bind(self.partial_reversal_enabled)
            .push_bind(self.partial_refund_enabled)
            .push_bind(self.currency_conversion_enabled)
            .push_bind(reference_id(&self.currency))
            .push_bind(reference_id(&self.channel))
            .push_bind(self.settings.clone().map(Json));
    }

    fn push_patch(patch: &AccountPatch, set: &mut SqlList<'_>) {
        set_coalesce(set, "is_enabled", patch.is_enabled);
        set_coalesce(set, "is_test", patch.is_test);
        set_coalesce(set, "rebill_enabled", patch.rebill_enabled);
        set_coalesce(set, "refund_enabled", patch.refund_enabled);
        set_coalesce(set, "reversal_enabled", patch.reversal_enabled);
        set_coalesce(set, "partial_confirm_enabled", patch.partial_confirm_enabled);
        set_coalesce(set, "partial_reversal_enabled", patch.partial_reversal_enabled);
        set_coalesce(set, "partial_refund_enabled", patch.partial_refund_enabled);
        set_coalesce(
            set,
            "currency_conversion_enabled",
            patch.currency_conversion_enabled,
        );
        set_coalesce(set, "currency_id", reference_id(&patch.currency));
        set_coalesce(set, "channel_id", reference_id(&patch.channel));
        set_coalesce(set, "settings", patch.settings.clone().map(Json));
    }
}

impl SqlSpecification for AccountSpec {
    fn push_filter(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        match self {
            Self::All | Self::Page(_) => {}
            Self::ById(id) => push_id_filter(qb, *id),
            Self::ByIds(ids) => push_ids_filter(qb, ids),
        }
    }

    fn page(&self) -> Option<Page> {
        match self {
            Self::Page(page) => Some(*page),
            _ => None,
        }
    }
}

/// Raw `profiles` row.
#[derive(Debug, sqlx::FromRow)]
pub struct ProfileRow {
    id: i64,
    key: Option<String>,
    description: Option<String>,
    currency_id: Option<i64>,
}

impl PgRecord for Profile {
    const TABLE: &'static str = "profiles";
    const COLUMNS: &'static [&'static str] = &["key", "description", "currency_id"];

    type Row = ProfileRow;

    fn from_row(row: ProfileRow) -> RepositoryResult<Self> {
        Ok(Self {
            id: Some(row.id),
            key: row.key,
            description: row.description,
            currency: row.currency_id.map(Reference::shallow),
        })
    }

    fn push_values(&self, values: &mut SqlList<'_>) {
        values
            .push_bind(self.key.clone())
            .push_bind(self.description.clone())
            .push_bind(reference_id(&self.currency));
    }

    fn push_patch(patch: &ProfilePatch, set: &mut SqlList<'_>) {
        set_coalesce(set, "key", patch.key.clone());
        set_coalesce(set, "description", patch.description.clone());
        set_coalesce(set, "currency_id", reference_id(&patch.currency));
    }
}

impl SqlSpecification for ProfileSpec {
    fn push_filter(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        match self {
            Self::All | Self::Page(_) => {}
            Self::ById(id) => push_id_filter(qb, *id),
            Self::ByIds(ids) => push_ids_filter(qb, ids),
            Self::ByKey(key) => push_eq_filter(qb, "key", key.clone()),
        }
    }

    fn page(&self) -> Option<Page> {
        match self {
            Self::Page(page) => Some(*page),
            _ => None,
        }
    }
}

/// Raw `routes` row.
#[derive(Debug, sqlx::FromRow)]
pub struct RouteRow {
    id: i64,
    profile_id: Option<i64>,
    instrument_id: Option<i64>,
    account_id: Option<i64>,
    router_id: Option<i64>,
    settings: Option<Json<Settings>>,
}

impl PgRecord for Route {
    const TABLE: &'static str = "routes";
    const COLUMNS: &'static [&'static str] = &[
        "profile_id",
        "instrument_id",
        "account_id",
        "router_id",
        "settings",
    ];

    type Row = RouteRow;

    fn from_row(row: RouteRow) -> RepositoryResult<Self> {
        Ok(Self {
            id: Some(row.id),
            profile: row.profile_id.map(Reference::shallow),
            instrument: row.instrument_id.map(Reference::shallow),
            account: row.account_id.map(Reference::shallow),
            router: row.router_id.map(Reference::shallow),
            settings: row.settings.map(|Json(settings)| settings),
        })
    }

    fn push_values(&self, values: &mut SqlList<'_>) {
        values
            .push_bind(reference_id(&self.profile))
            .push_bind(reference_id(&self.instrument))
            .push_bind(reference_id(&self.account))
            .push_bind(reference_id(&self.router))
            .push_bind(self.settings.clone().map(Json));
    }

    fn push_patch(patch: &RoutePatch, set: &mut SqlList<'_>) {
        set_coalesce(set, "profile_id", reference_id(&patch.profile));
        set_coalesce(set, "instrument_id", reference_id(&patch.instrument));
        set_coalesce(set, "account_id", reference_id(&patch.account));
        set_coalesce(set, "router_id", reference_id(&patch.router));
        set_coalesce(set, "settings", patch.settings.clone().map(Json));
    }
}

impl SqlSpecification for RouteSpec {
    fn push_filter(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        match self {
            Self::All | Self::Page(_) => {}
            Self::ById(id) => push_id_filter(qb, *id),
            Self::ByIds(ids) => push_ids_filter(qb, ids),
            Self::ByProfileAndInstrument {
                profile_id,
                instrument_id,
            } => {
                qb.push(" WHERE profile_id = ")
                    .push_bind(*profile_id)
                    .push(" AND instrument_id = ")
                    .push_bind(*instrument_id);
            }
        }
    }

    fn page(&self) -> Option<Page> {
        match self {
            Self::Page(page) => Some(*page),
            _ => None,
        }
    }
}
