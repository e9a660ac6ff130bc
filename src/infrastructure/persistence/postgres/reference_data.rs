//! Row mappings for currencies, channels, routers and instruments.

use crate::domain::entities::{
    Channel, ChannelPatch, ChannelSpec, Currency, CurrencyPatch, CurrencySpec, Instrument,
    InstrumentPatch, InstrumentSpec, Router, RouterPatch, RouterSpec,
};
use crate::domain::specification::Page;
use crate::infrastructure::persistence::postgres::store::{
    PgRecord, SqlList, SqlSpecification, push_eq_filter, push_id_filter, push_ids_filter,
    set_coalesce,
};
use crate::infrastructure::persistence::traits::RepositoryResult;
use sqlx::{Postgres, QueryBuilder};

/// Raw `currencies` row.
#[derive(Debug, sqlx::FromRow)]
pub struct CurrencyRow {
    id: i64,
    numeric_code: Option<i32>,
    name: Option<String>,
    char_code: Option<String>,
    exponent: Option<i32>,
}

impl PgRecord for Currency {
    const TABLE: &'static str = "currencies";
    const COLUMNS: &'static [&'static str] = &["numeric_code", "name", "char_code", "exponent"];

    type Row = CurrencyRow;

    fn from_row(row: CurrencyRow) -> RepositoryResult<Self> {
        Ok(Self {
            id: Some(row.id),
            numeric_code: row.numeric_code,
            name: row.name,
            char_code: row.char_code,
            exponent: row.exponent,
        })
    }

    fn push_values(&self, values: &mut SqlList<'_>) {
        values
            .push_bind(self.numeric_code)
            .push_bind(self.name.clone())
            .push_bind(self.char_code.clone())
            .push_bind(self.exponent);
    }

    fn push_patch(patch: &CurrencyPatch, set: &mut SqlList<'_>) {
        set_coalesce(set, "numeric_code", patch.numeric_code);
        set_coalesce(set, "name", patch.name.clone());
        set_coalesce(set, "char_code", patch.char_code.clone());
        set_coalesce(set, "exponent", patch.exponent);
    }
}

impl SqlSpecification for CurrencySpec {
    fn push_filter(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        match self {
            Self::All | Self::Page(_) => {}
            Self::ById(id) => push_id_filter(qb, *id),
            Self::ByIds(ids) => push_ids_filter(qb, ids),
            Self::ByNumericCode(code) => push_eq_filter(qb, "numeric_code", *code),
        }
    }

    fn page(&self) -> Option<Page> {
        match self {
            Self::Page(page) => Some(*page),
            _ => None,
        }
    }
}

/// Raw `channels` row.
#[derive(Debug, sqlx::FromRow)]
pub struct ChannelRow {
    id: i64,
    type_id: Option<i32>,
    key: Option<String>,
}

impl PgRecord for Channel {
    const TABLE: &'static str = "channels";
    const COLUMNS: &'static [&'static str] = &["type_id", "key"];

    type Row = ChannelRow;

    fn from_row(row: ChannelRow) -> RepositoryResult<Self> {
        Ok(Self {
            id: Some(row.id),
            type_id: row.type_id,
            key: row.key,
        })
    }

    fn push_values(&self, values: &mut SqlList<'_>) {
        values.push_bind(self.type_id).push_bind(self.key.clone());
    }

    fn push_patch(patch: &ChannelPatch, set: &mut SqlList<'_>) {
        set_coalesce(set, "type_id", patch.type_id);
        set_coalesce(set, "key", patch.key.clone());
    }
}

impl SqlSpecification for ChannelSpec {
    fn push_filter(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        match self {
            Self::All | Self::Page(_) => {}
            Self::ById(id) => push_id_filter(qb, *id),
            Self::ByIds(ids) => push_ids_filter(qb, ids),
            Self::ByTypeId(type_id) => push_eq_filter(qb, "type_id", *type_id),
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

/// Row of a table holding only `id` and `key`.
#[derive(Debug, sqlx::FromRow)]
pub struct KeyedRow {
    id: i64,
    key: Option<String>,
}

impl PgRecord for Router {
    const TABLE: &'static str = "routers";
    const COLUMNS: &'static [&'static str] = &["key"];

    type Row = KeyedRow;

    fn from_row(row: KeyedRow) -> RepositoryResult<Self> {
        Ok(Self {
            id: Some(row.id),
            key: row.key,
        })
    }

    fn push_values(&self, values: &mut SqlList<'_>) {
        values.push_bind(self.key.clone());
    }

    fn push_patch(patch: &RouterPatch, set: &mut SqlList<'_>) {
        set_coalesce(set, "key", patch.key.clone());
    }
}

impl SqlSpecification for RouterSpec {
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

impl PgRecord for Instrument {
    const TABLE: &'static str = "instruments";
    const COLUMNS: &'static [&'static str] = &["key"];

    type Row = KeyedRow;

    fn from_row(row: KeyedRow) -> RepositoryResult<Self> {
        Ok(Self {
            id: Some(row.id),
            key: row.key,
        })
    }

    fn push_values(&self, values: &mut SqlList<'_>) {
        values.push_bind(self.key.clone());
    }

    fn push_patch(patch: &InstrumentPatch, set: &mut SqlList<'_>) {
        set_coalesce(set, "key", patch.key.clone());
    }
}

impl SqlSpecification for InstrumentSpec {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn render(spec: &impl SqlSpecification) -> String {
        let mut qb = QueryBuilder::new("SELECT id FROM t");
        spec.push_clause(&mut qb);
        qb.sql().to_string()
    }

    #[test]
    fn currency_clauses() {
        assert_eq!(render(&CurrencySpec::All), "SELECT id FROM t ORDER BY id");
        assert_eq!(
            render(&CurrencySpec::ByNumericCode(643)),
            "SELECT id FROM t WHERE numeric_code = $1 ORDER BY id"
        );
        assert_eq!(
            render(&CurrencySpec::Page(Page::new(5, 0))),
            "SELECT id FROM t ORDER BY id LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn channel_clauses() {
        assert_eq!(
            render(&ChannelSpec::ByKey("acq".to_string())),
            "SELECT id FROM t WHERE key = $1 ORDER BY id"
        );
        assert_eq!(
            render(&ChannelSpec::ByIds(vec![1, 2])),
            "SELECT id FROM t WHERE id = ANY($1) ORDER BY id"
        );
    }

    #[test]
    fn insert_binds_every_column() {
        let mut qb = QueryBuilder::<Postgres>::new("VALUES (");
        {
            let mut values = qb.separated(", ");
            Currency::new(643, "Ruble", "RUB", 2).push_values(&mut values);
        }
        qb.push(")");
        assert_eq!(qb.sql(), "VALUES ($1, $2, $3, $4)");
    }
}
