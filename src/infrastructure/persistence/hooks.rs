//! # Entity Hooks
//!
//! Per-entity behavior shared by every store: server-generated fields on
//! `add`, and reference hydration after every read or mutation.
//!
//! Hydration is batched. For each reference field the distinct pending ids
//! of the whole batch are resolved with a single by-ids query against the
//! owning repository. A reference whose target is missing stays
//! [`Reference::Id`] and is reported with a warning.

use crate::domain::RequestContext;
use crate::domain::entities::{
    Account, Card, Channel, Currency, DEFAULT_SESSION_TTL_SECS, Entity, Instrument, Profile,
    Route, Router, Session, Transaction,
};
use crate::domain::value_objects::{Identified, Reference, TOKEN_ENTROPY_BYTES, generate_token};
use crate::infrastructure::persistence::traits::{Repository, RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Store-independent lifecycle hooks of an entity.
#[async_trait]
pub trait EntityHooks: Entity {
    /// What the hooks need: repositories of referenced entities, options.
    type Deps: Send + Sync + fmt::Debug;

    /// Fills server-generated fields before a record is first stored.
    ///
    /// # Errors
    ///
    /// Returns an error if a generated value cannot be produced.
    fn on_add(&mut self, _deps: &Self::Deps, _now: DateTime<Utc>) -> RepositoryResult<()> {
        Ok(())
    }

    /// Loads the references of `records`.
    ///
    /// `this` is the repository the records came from, for self references.
    /// It is `None` when self references must stay id-only.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Hydration` if a referenced repository fails.
    async fn hydrate(
        _deps: &Self::Deps,
        _this: Option<&dyn Repository<Self>>,
        _ctx: &RequestContext,
        _records: &mut [Self],
    ) -> RepositoryResult<()> {
        Ok(())
    }
}

fn pending<T: Identified>(slot: &Option<Reference<T>>) -> Option<i64> {
    slot.as_ref().and_then(Reference::pending_id)
}

/// Replaces every pending reference in `slots` with the record loaded from
/// `repo`, using one by-ids query.
///
/// # Errors
///
/// Returns `RepositoryError::Hydration` wrapping the query failure.
pub async fn resolve_references<T: Entity>(
    ctx: &RequestContext,
    repo: &dyn Repository<T>,
    slots: Vec<&mut Option<Reference<T>>>,
) -> RepositoryResult<()> {
    let Some(ids) = pending_ids(&slots) else {
        return Ok(());
    };
    let found = repo
        .query(ctx, &T::by_ids(ids))
        .await
        .map_err(|e| RepositoryError::hydration(T::NAME, e))?;
    fill_references(slots, found.items);
    Ok(())
}

/// [`resolve_references`] for references into `repo` itself: the loaded
/// records keep their own self references id-only.
///
/// # Errors
///
/// Returns `RepositoryError::Hydration` wrapping the query failure.
pub async fn resolve_self_references<T: Entity>(
    ctx: &RequestContext,
    repo: &dyn Repository<T>,
    slots: Vec<&mut Option<Reference<T>>>,
) -> RepositoryResult<()> {
    let Some(ids) = pending_ids(&slots) else {
        return Ok(());
    };
    let found = repo
        .query_flat(ctx, &T::by_ids(ids))
        .await
        .map_err(|e| RepositoryError::hydration(T::NAME, e))?;
    fill_references(slots, found.items);
    Ok(())
}

fn pending_ids<T: Identified>(slots: &[&mut Option<Reference<T>>]) -> Option<Vec<i64>> {
    let ids: BTreeSet<i64> = slots.iter().filter_map(|slot| pending(slot)).collect();
    (!ids.is_empty()).then(|| ids.into_iter().collect())
}

fn fill_references<T: Entity>(slots: Vec<&mut Option<Reference<T>>>, found: Vec<T>) {
    let by_id: HashMap<i64, T> = found
        .into_iter()
        .filter_map(|record| record.id().map(|id| (id, record)))
        .collect();

    for slot in slots {
        let Some(id) = pending(slot) else { continue };
        match by_id.get(&id) {
            Some(record) => *slot = Some(Reference::loaded(record.clone())),
            None => tracing::warn!(entity = T::NAME, id, "referenced record not found"),
        }
    }
}

macro_rules! leaf_hooks {
    ($($entity:ty),* $(,)?) => {
        $(
            #[async_trait]
            impl EntityHooks for $entity {
                type Deps = ();
            }
        )*
    };
}

leaf_hooks!(Currency, Channel, Router, Instrument);

#[async_trait]
impl EntityHooks for Card {
    type Deps = ();

    fn on_add(&mut self, _deps: &(), _now: DateTime<Utc>) -> RepositoryResult<()> {
        let token = generate_token(TOKEN_ENTROPY_BYTES)
            .map_err(|e| RepositoryError::internal(e.to_string()))?;
        self.token = Some(token);
        Ok(())
    }
}

/// Session lifetime settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Time from creation to expiry.
    pub ttl: Duration,
}

impl SessionOptions {
    /// Creates options with a TTL in seconds.
    #[must_use]
    pub fn with_ttl_secs(secs: u64) -> Self {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX);
        Self {
            ttl: Duration::try_seconds(secs).unwrap_or(Duration::MAX),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::with_ttl_secs(DEFAULT_SESSION_TTL_SECS)
    }
}

#[async_trait]
impl EntityHooks for Session {
    type Deps = SessionOptions;

    fn on_add(&mut self, options: &SessionOptions, now: DateTime<Utc>) -> RepositoryResult<()> {
        self.start(now, options.ttl);
        Ok(())
    }
}

/// Repositories an [`Account`] references.
#[derive(Debug, Clone)]
pub struct AccountDeps {
    /// Currency repository.
    pub currencies: Arc<dyn Repository<Currency>>,
    /// Channel repository.
    pub channels: Arc<dyn Repository<Channel>>,
}

#[async_trait]
impl EntityHooks for Account {
    type Deps = AccountDeps;

    async fn hydrate(
        deps: &AccountDeps,
        _this: Option<&dyn Repository<Self>>,
        ctx: &RequestContext,
        records: &mut [Self],
    ) -> RepositoryResult<()> {
        let currencies = records.iter_mut().map(|r| &mut r.currency).collect();
        resolve_references(ctx, deps.currencies.as_ref(), currencies).await?;
        let channels = records.iter_mut().map(|r| &mut r.channel).collect();
        resolve_references(ctx, deps.channels.as_ref(), channels).await
    }
}

/// Repositories a [`Profile`] references.
#[derive(Debug, Clone)]
pub struct ProfileDeps {
    /// Currency repository.
    pub currencies: Arc<dyn Repository<Currency>>,
}

#[async_trait]
impl EntityHooks for Profile {
    type Deps = ProfileDeps;

    async fn hydrate(
        deps: &ProfileDeps,
        _this: Option<&dyn Repository<Self>>,
        ctx: &RequestContext,
        records: &mut [Self],
    ) -> RepositoryResult<()> {
        let currencies = records.iter_mut().map(|r| &mut r.currency).collect();
        resolve_references(ctx, deps.currencies.as_ref(), currencies).await
    }
}

/// Repositories a [`Route`] references.
#[derive(Debug, Clone)]
pub struct RouteDeps {
    /// Profile repository.
    pub profiles: Arc<dyn Repository<Profile>>,
    /// Instrument repository.
    pub instruments: Arc<dyn Repository<Instrument>>,
    /// Account repository.
    pub accounts: Arc<dyn Repository<Account>>,
    /// Router repository.
    pub routers: Arc<dyn Repository<Router>>,
}

#[async_trait]
impl EntityHooks for Route {
    type Deps = RouteDeps;

    async fn hydrate(
        deps: &RouteDeps,
        _this: Option<&dyn Repository<Self>>,
        ctx: &RequestContext,
        records: &mut [Self],
    ) -> RepositoryResult<()> {
        let profiles = records.iter_mut().map(|r| &mut r.profile).collect();
        resolve_references(ctx, deps.profiles.as_ref(), profiles).await?;
        let instruments = records.iter_mut().map(|r| &mut r.instrument).collect();
        resolve_references(ctx, deps.instruments.as_ref(), instruments).await?;
        let accounts = records.iter_mut().map(|r| &mut r.account).collect();
        resolve_references(ctx, deps.accounts.as_ref(), accounts).await?;
        let routers = records.iter_mut().map(|r| &mut r.router).collect();
        resolve_references(ctx, deps.routers.as_ref(), routers).await
    }
}

/// Repositories a [`Transaction`] references, besides its own.
#[derive(Debug, Clone)]
pub struct TransactionDeps {
    /// Profile repository.
    pub profiles: Arc<dyn Repository<Profile>>,
    /// Account repository.
    pub accounts: Arc<dyn Repository<Account>>,
    /// Instrument repository.
    pub instruments: Arc<dyn Repository<Instrument>>,
    /// Currency repository.
    pub currencies: Arc<dyn Repository<Currency>>,
}

#[async_trait]
impl EntityHooks for Transaction {
    type Deps = TransactionDeps;

    fn on_add(&mut self, _deps: &TransactionDeps, now: DateTime<Utc>) -> RepositoryResult<()> {
        self.created = Some(now);
        Ok(())
    }

    async fn hydrate(
        deps: &TransactionDeps,
        this: Option<&dyn Repository<Self>>,
        ctx: &RequestContext,
        records: &mut [Self],
    ) -> RepositoryResult<()> {
        let profiles = records.iter_mut().map(|r| &mut r.profile).collect();
        resolve_references(ctx, deps.profiles.as_ref(), profiles).await?;
        let accounts = records.iter_mut().map(|r| &mut r.account).collect();
        resolve_references(ctx, deps.accounts.as_ref(), accounts).await?;
        let instruments = records.iter_mut().map(|r| &mut r.instrument).collect();
        resolve_references(ctx, deps.instruments.as_ref(), instruments).await?;
        // Both currency columns point at the same table: one lookup.
        let currencies = records
            .iter_mut()
            .flat_map(|r| [&mut r.currency, &mut r.currency_converted])
            .collect();
        resolve_references(ctx, deps.currencies.as_ref(), currencies).await?;
        let Some(this) = this else {
            return Ok(());
        };
        let references = records.iter_mut().map(|r| &mut r.reference).collect();
        resolve_self_references(ctx, this, references).await
    }
}
