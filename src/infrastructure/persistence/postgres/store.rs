//! # PostgreSQL Store
//!
//! Generic [`Repository`] implementation over a `sqlx::PgPool`.
//!
//! An entity opts in by implementing [`PgRecord`] (table layout and row
//! mapping) and giving its specification a [`SqlSpecification`]. Every value
//! reaches the database as a bound parameter; only table and column names,
//! which are compile-time constants, are written into SQL text.
//!
//! # Examples
//!
//! ```ignore
//! use sqlx::PgPool;
//! use paystore::domain::entities::Currency;
//! use paystore::infrastructure::persistence::postgres::PgStore;
//!
//! let pool = PgPool::connect("postgres://...").await?;
//! let currencies = PgStore::<Currency>::new(pool, ());
//! ```

use crate::domain::entities::Entity;
use crate::domain::specification::Page;
use crate::domain::{Logger, RequestContext};
use crate::infrastructure::persistence::hooks::EntityHooks;
use crate::infrastructure::persistence::traits::{
    QueryResult, Repository, RepositoryError, RepositoryResult, ensure_active,
};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::query_builder::Separated;
use sqlx::{Encode, FromRow, PgPool, Postgres, QueryBuilder, Type};
use std::fmt;
use tracing::Instrument;

/// Comma-separated list builder used for `VALUES (...)` and `SET ...`.
pub type SqlList<'qb> = Separated<'qb, 'static, Postgres, &'static str>;

/// Table layout and row mapping of a relational entity.
pub trait PgRecord: EntityHooks {
    /// Table name.
    const TABLE: &'static str;

    /// Writable columns, in the order [`PgRecord::push_values`] binds them.
    const COLUMNS: &'static [&'static str];

    /// Columns read back after `id`. Defaults to [`PgRecord::COLUMNS`].
    const SELECT_COLUMNS: &'static [&'static str] = Self::COLUMNS;

    /// Raw row.
    type Row: for<'r> FromRow<'r, PgRow> + Send + Unpin;

    /// Converts a raw row into the entity, with shallow references.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Serialization` for undecodable values.
    fn from_row(row: Self::Row) -> RepositoryResult<Self>;

    /// Binds one value per entry of [`PgRecord::COLUMNS`].
    fn push_values(&self, values: &mut SqlList<'_>);

    /// Adds one `column = COALESCE($n, column)` assignment per patchable
    /// column.
    fn push_patch(patch: &Self::Patch, set: &mut SqlList<'_>);
}

/// SQL rendering of a specification.
pub trait SqlSpecification {
    /// Appends the ` WHERE ...` part, if any.
    fn push_filter(&self, qb: &mut QueryBuilder<'static, Postgres>);

    /// Returns the limit/offset window, if any.
    fn page(&self) -> Option<Page> {
        None
    }

    /// Appends filter, ordering and window.
    fn push_clause(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        self.push_filter(qb);
        qb.push(" ORDER BY id");
        if let Some(page) = self.page() {
            qb.push(" LIMIT ")
                .push_bind(i64::try_from(page.limit()).unwrap_or(i64::MAX))
                .push(" OFFSET ")
                .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
        }
    }
}

/// Appends ` WHERE id = $n`.
pub fn push_id_filter(qb: &mut QueryBuilder<'static, Postgres>, id: i64) {
    qb.push(" WHERE id = ").push_bind(id);
}

/// Appends ` WHERE id = ANY($n)`.
pub fn push_ids_filter(qb: &mut QueryBuilder<'static, Postgres>, ids: &[i64]) {
    qb.push(" WHERE id = ANY(").push_bind(ids.to_vec()).push(")");
}

/// Appends ` WHERE column = $n`.
pub fn push_eq_filter<T>(qb: &mut QueryBuilder<'static, Postgres>, column: &'static str, value: T)
where
    T: 'static + Encode<'static, Postgres> + Type<Postgres> + Send,
{
    qb.push(" WHERE ").push(column).push(" = ").push_bind(value);
}

/// Adds `column = COALESCE($n, column)`: a `None` value keeps the stored one.
pub fn set_coalesce<T>(set: &mut SqlList<'_>, column: &'static str, value: Option<T>)
where
    T: 'static + Encode<'static, Postgres> + Type<Postgres> + Send,
{
    set.push(column)
        .push_unseparated(" = COALESCE(")
        .push_bind_unseparated(value)
        .push_unseparated(", ")
        .push_unseparated(column)
        .push_unseparated(")");
}

fn select_list<E: PgRecord>() -> String {
    let mut list = String::from("id");
    for column in E::SELECT_COLUMNS {
        list.push_str(", ");
        list.push_str(column);
    }
    list
}

fn query_error(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            RepositoryError::serialization(e.to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::connection(e.to_string())
        }
        _ => RepositoryError::query(e.to_string()),
    }
}

/// PostgreSQL repository for `E`.
pub struct PgStore<E: PgRecord> {
    pool: PgPool,
    deps: E::Deps,
    logger: Logger,
}

impl<E: PgRecord> PgStore<E> {
    /// Creates a store over `pool`.
    #[must_use]
    pub fn new(pool: PgPool, deps: E::Deps) -> Self {
        Self {
            pool,
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

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn returning(qb: &mut QueryBuilder<'static, Postgres>) {
        qb.push(" RETURNING ").push(select_list::<E>());
    }

    async fn fetch_returning(
        &self,
        mut qb: QueryBuilder<'static, Postgres>,
        id: Option<i64>,
    ) -> RepositoryResult<E> {
        Self::returning(&mut qb);
        let row = qb
            .build_query_as::<E::Row>()
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;
        match (row, id) {
            (Some(row), _) => E::from_row(row),
            (None, Some(id)) => Err(RepositoryError::not_found(E::NAME, id)),
            (None, None) => Err(RepositoryError::internal(format!(
                "insert into {} returned no row",
                E::TABLE
            ))),
        }
    }
}

impl<E> PgStore<E>
where
    E: PgRecord,
    E::Spec: SqlSpecification,
{
    async fn hydrate_one(&self, ctx: &RequestContext, record: E) -> RepositoryResult<E> {
        let mut batch = [record];
        E::hydrate(&self.deps, Some(self), ctx, &mut batch).await?;
        let [record] = batch;
        Ok(record)
    }

    async fn add_record(&self, ctx: &RequestContext, mut record: E) -> RepositoryResult<E> {
        ensure_active(ctx)?;
        record.on_add(&self.deps, chrono::Utc::now())?;

        let mut qb = QueryBuilder::new(format!(
            "INSERT INTO {} ({}) VALUES (",
            E::TABLE,
            E::COLUMNS.join(", ")
        ));
        {
            let mut values = qb.separated(", ");
            record.push_values(&mut values);
        }
        qb.push(")");
        let stored = self.fetch_returning(qb, None).await?;
        tracing::debug!(entity = E::NAME, id = ?stored.id(), "record added");

        self.hydrate_one(ctx, stored).await
    }

    async fn delete_record(&self, ctx: &RequestContext, id: i64) -> RepositoryResult<E> {
        ensure_active(ctx)?;
        let mut qb = QueryBuilder::new(format!("DELETE FROM {}", E::TABLE));
        push_id_filter(&mut qb, id);
        let removed = self.fetch_returning(qb, Some(id)).await?;
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
        let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", E::TABLE));
        {
            let mut set = qb.separated(", ");
            E::push_patch(&patch, &mut set);
        }
        push_id_filter(&mut qb, id);
        let merged = self.fetch_returning(qb, Some(id)).await?;
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
        let (total, rows) = {
            let mut conn = self
                .pool
                .acquire()
                .await
                .map_err(|e| RepositoryError::connection(e.to_string()))?;

            let count_sql = format!("SELECT COUNT(*) FROM {}", E::TABLE);
            let (total,): (i64,) = sqlx::query_as(&count_sql)
                .fetch_one(&mut *conn)
                .await
                .map_err(query_error)?;

            let mut qb = QueryBuilder::new(format!(
                "SELECT {} FROM {}",
                select_list::<E>(),
                E::TABLE
            ));
            spec.push_clause(&mut qb);
            let rows = qb
                .build_query_as::<E::Row>()
                .fetch_all(&mut *conn)
                .await
                .map_err(query_error)?;
            (total, rows)
        };

        let now = chrono::Utc::now();
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let record = E::from_row(row)?;
            if record.is_live(now) {
                items.push(record);
            }
        }
        tracing::debug!(entity = E::NAME, ?spec, total, found = items.len(), "query");

        let this: Option<&dyn Repository<E>> = if follow_self { Some(self) } else { None };
        E::hydrate(&self.deps, this, ctx, &mut items).await?;
        Ok(QueryResult {
            total: u64::try_from(total).unwrap_or_default(),
            items,
        })
    }
}

impl<E: PgRecord> fmt::Debug for PgStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgStore")
            .field("table", &E::TABLE)
            .field("deps", &self.deps)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<E> Repository<E> for PgStore<E>
where
    E: PgRecord,
    E::Spec: SqlSpecification,
{
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
