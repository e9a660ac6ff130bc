//! # In-Memory Store
//!
//! [`Repository`] implementation over an insertion-ordered map.
//!
//! One async mutex per store serializes all operations on it. Ids come from
//! a counter starting at 1, so map order is insertion order. Records are
//! stored with references reduced to ids; the lock is released before
//! references are loaded, which lets a store hydrate through itself.

use crate::domain::entities::{Entity, Transaction, TransactionSpec, TransactionType, Turnover};
use crate::domain::specification::Specification;
use crate::domain::{Logger, RequestContext};
use crate::infrastructure::persistence::hooks::EntityHooks;
use crate::infrastructure::persistence::traits::{
    QueryResult, Repository, RepositoryError, RepositoryResult, TransactionRepository,
    ensure_active,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::fmt;
use tokio::sync::Mutex;
use tracing::Instrument;

#[derive(Debug)]
struct StoreState<E> {
    records: BTreeMap<i64, E>,
    next_id: i64,
}

impl<E> Default for StoreState<E> {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
            next_id: 1,
        }
    }
}

/// In-memory repository for `E`.
pub struct InMemoryStore<E: EntityHooks> {
    state: Mutex<StoreState<E>>,
    deps: E::Deps,
    logger: Logger,
}

impl<E: EntityHooks> InMemoryStore<E> {
    /// Creates an empty store.
    #[must_use]
    pub fn new(deps: E::Deps) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            deps,
            logger: Logger::default(),
        }
    }

    /// Replaces the per-request logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Returns the number of stored records.
    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    /// Returns true if the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Removes every record. The id counter keeps running.
    pub async fn clear(&self) {
        self.state.lock().await.records.clear();
    }

    async fn hydrate_one(&self, ctx: &RequestContext, record: E) -> RepositoryResult<E> {
        let mut batch = [record];
        E::hydrate(&self.deps, Some(self), ctx, &mut batch).await?;
        let [record] = batch;
        Ok(record)
    }

    async fn add_record(&self, ctx: &RequestContext, mut record: E) -> RepositoryResult<E> {
        ensure_active(ctx)?;
        record.on_add(&self.deps, Utc::now())?;
        record.detach_references();

        let stored = {
            let mut state = self.state.lock().await;
            let id = state.next_id;
            state.next_id += 1;
            record.set_id(id);
            state.records.insert(id, record.clone());
            record
        };
        tracing::debug!(entity = E::NAME, id = ?stored.id(), "record added");

        self.hydrate_one(ctx, stored).await
    }

    async fn delete_record(&self, ctx: &RequestContext, id: i64) -> RepositoryResult<E> {
        ensure_active(ctx)?;
        let removed = self
            .state
            .lock()
            .await
            .records
            .remove(&id)
            .ok_or_else(|| RepositoryError::not_found(E::NAME, id))?;
        tracing::debug!(entity = E::NAME, id, "record deleted");

        self.hydrate_one(ctx, removed).await
    }

    async fn update_record(
        &self,
        ctx: &RequestContext,
        id: i64,
        patch: E::Patch,
    ) -> RepositoryResult<E> {
        ensure_active(ctx)?;
        let merged = {
            let mut state = self.state.lock().await;
            let slot = state
                .records
                .get_mut(&id)
                .ok_or_else(|| RepositoryError::not_found(E::NAME, id))?;
            let mut merged = slot.clone().apply_patch(patch);
            merged.detach_references();
            *slot = merged.clone();
            merged
        };
        tracing::debug!(entity = E::NAME, id, "record updated");

        self.hydrate_one(ctx, merged).await
    }

    async fn query_records(
        &self,
        ctx: &RequestContext,
        spec: &E::Spec,
        follow_self: bool,
    ) -> RepositoryResult<QueryResult<E>> {
        ensure_active(ctx)?;
        let now = Utc::now();
        let (total, mut items) = {
            let state = self.state.lock().await;
            let items: Vec<E> = state
                .records
                .values()
                .enumerate()
                .filter(|(position, record)| {
                    spec.is_satisfied_by(record, *position) && record.is_live(now)
                })
                .map(|(_, record)| record.clone())
                .collect();
            (state.records.len() as u64, items)
        };
        tracing::debug!(entity = E::NAME, ?spec, total, found = items.len(), "query");

        let this: Option<&dyn Repository<E>> = if follow_self { Some(self) } else { None };
        E::hydrate(&self.deps, this, ctx, &mut items).await?;
        Ok(QueryResult { total, items })
    }
}

impl<E> Default for InMemoryStore<E>
where
    E: EntityHooks,
    E::Deps: Default,
{
    fn default() -> Self {
        Self::new(E::Deps::default())
    }
}

impl<E: EntityHooks> fmt::Debug for InMemoryStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("entity", &E::NAME)
            .field("deps", &self.deps)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<E: EntityHooks> Repository<E> for InMemoryStore<E> {
    async fn add(&self, ctx: &RequestContext, record: E) -> RepositoryResult<E> {
        self.add_record(ctx, record)
            .instrument(self.logger.span(ctx))
            .await
    }

    async fn delete(&self, ctx: &RequestContext, id: i64) -> RepositoryResult<E> {
        self.delete_record(ctx, id)
            .instrument(self.logger.span(ctx))
            .await
    }

    async fn update(&self, ctx: &RequestContext, id: i64, patch: E::Patch) -> RepositoryResult<E> {
        self.update_record(ctx, id, patch)
            .instrument(self.logger.span(ctx))
            .await
    }

    async fn query(&self, ctx: &RequestContext, spec: &E::Spec) -> RepositoryResult<QueryResult<E>> {
        self.query_records(ctx, spec, true)
            .instrument(self.logger.span(ctx))
            .await
    }

    async fn query_flat(
        &self,
        ctx: &RequestContext,
        spec: &E::Spec,
    ) -> RepositoryResult<QueryResult<E>> {
        self.query_records(ctx, spec, false)
            .instrument(self.logger.span(ctx))
            .await
    }
}

#[async_trait]
impl TransactionRepository for InMemoryStore<Transaction> {
    async fn type_turnover(
        &self,
        ctx: &RequestContext,
        spec: &TransactionSpec,
    ) -> RepositoryResult<BTreeMap<TransactionType, Turnover>> {
        ensure_active(ctx)?;
        let state = self.state.lock().await;
        let matching = state
            .records
            .values()
            .enumerate()
            .filter(|(position, tx)| spec.is_satisfied_by(tx, *position))
            .map(|(_, tx)| tx);
        Ok(Turnover::tally(matching))
    }
}
