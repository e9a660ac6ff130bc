//! Row mapping and turnover aggregation for transactions.

use crate::domain::RequestContext;
use crate::domain::entities::{
    AdditionalData, ThreeDSMethodUrl, ThreeDSecure10, ThreeDSecure20, Transaction,
    TransactionPatch, TransactionSpec, TransactionType, Turnover,
};
use crate::domain::specification::Page;
use crate::domain::value_objects::{Reference, reference_id};
use crate::infrastructure::persistence::postgres::store::{
    PgRecord, PgStore, SqlList, SqlSpecification, push_id_filter, push_ids_filter, set_coalesce,
};
use crate::infrastructure::persistence::traits::{
    RepositoryError, RepositoryResult, TransactionRepository, ensure_active,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use std::collections::BTreeMap;

/// Raw `transactions` row.
#[derive(Debug, sqlx::FromRow)]
pub struct TransactionRow {
    id: i64,
    created: DateTime<Utc>,
    #[sqlx(rename = "type")]
    kind: Option<String>,
    status: Option<String>,
    profile_id: Option<i64>,
    account_id: Option<i64>,
    instrument_id: Option<i64>,
    instrument_ref: Option<i64>,
    amount: Option<i64>,
    currency_id: Option<i64>,
    amount_converted: Option<i64>,
    currency_converted_id: Option<i64>,
    auth_code: Option<String>,
    rrn: Option<String>,
    response_code: Option<String>,
    error_message: Option<String>,
    remote_id: Option<String>,
    order_id: Option<String>,
    reference_id: Option<i64>,
    three_ds10: Option<Json<ThreeDSecure10>>,
    three_ds20: Option<Json<ThreeDSecure20>>,
    three_ds_method_url: Option<Json<ThreeDSMethodUrl>>,
    additional_data: Option<Json<AdditionalData>>,
    customer: Option<String>,
}

const INSERT_COLUMNS: &[&str] = &[
    "type",
    "status",
    "profile_id",
    "account_id",
    "instrument_id",
    "instrument_ref",
    "amount",
    "currency_id",
    "amount_converted",
    "currency_converted_id",
    "auth_code",
    "rrn",
    "response_code",
    "error_message",
    "remote_id",
    "order_id",
    "reference_id",
    "three_ds10",
    "three_ds20",
    "three_ds_method_url",
    "additional_data",
    "customer",
];

const SELECT_COLUMNS: &[&str] = &[
    "created",
    "type",
    "status",
    "profile_id",
    "account_id",
    "instrument_id",
    "instrument_ref",
    "amount",
    "currency_id",
    "amount_converted",
    "currency_converted_id",
    "auth_code",
    "rrn",
    "response_code",
    "error_message",
    "remote_id",
    "order_id",
    "reference_id",
    "three_ds10",
    "three_ds20",
    "three_ds_method_url",
    "additional_data",
    "customer",
];

fn parse_column<T: std::str::FromStr>(value: Option<String>) -> RepositoryResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    value
        .map(|raw| raw.parse::<T>())
        .transpose()
        .map_err(|e| RepositoryError::serialization(e.to_string()))
}

impl PgRecord for Transaction {
    const TABLE: &'static str = "transactions";
    const COLUMNS: &'static [&'static str] = INSERT_COLUMNS;
    const SELECT_COLUMNS: &'static [&'static str] = SELECT_COLUMNS;

    type Row = TransactionRow;

    fn from_row(row: TransactionRow) -> RepositoryResult<Self> {
        Ok(Self {
            id: Some(row.id),
            created: Some(row.created),
            kind: parse_column(row.kind)?,
            status: parse_column(row.status)?,
            profile: row.profile_id.map(Reference::shallow),
            account: row.account_id.map(Reference::shallow),
            instrument: row.instrument_id.map(Reference::shallow),
            instrument_record: row.instrument_ref,
            amount: row.amount,
            currency: row.currency_id.map(Reference::shallow),
            amount_converted: row.amount_converted,
            currency_converted: row.currency_converted_id.map(Reference::shallow),
            auth_code: row.auth_code,
            rrn: row.rrn,
            response_code: row.response_code,
            error_message: row.error_message,
            remote_id: row.remote_id,
            order_id: row.order_id,
            reference: row.reference_id.map(Reference::shallow),
            three_ds10: row.three_ds10.map(|Json(v)| v),
            three_ds20: row.three_ds20.map(|Json(v)| v),
            three_ds_method_url: row.three_ds_method_url.map(|Json(v)| v),
            additional_data: row.additional_data.map(|Json(v)| v),
            customer: row.customer,
        })
    }

    fn push_values(&self, values: &mut SqlList<'_>) {
        values
            .push_bind(self.kind.map(|kind| kind.as_str()))
            .push_bind(self.status.map(|status| status.as_str()))
            .push_bind(reference_id(&self.profile))
            .push_bind(reference_id(&self.account))
            .push_bind(reference_id(&self.instrument))
            .push_bind(self.instrument_record)
            .push_bind(self.amount)
            .push_bind(reference_id(&self.currency))
            .push_bind(self.amount_converted)
            .push_bind(reference_id(&self.currency_converted))
            .push_bind(self.auth_code.clone())
            .push_bind(self.rrn.clone())
            .push_bind(self.response_code.clone())
            .push_bind(self.error_message.clone())
            .push_bind(self.remote_id.clone())
            .push_bind(self.order_id.clone())
            .push_bind(reference_id(&self.reference))
            .push_bind(self.three_ds10.clone().map(Json))
            .push_bind(self.three_ds20.clone().map(Json))
            .push_bind(self.three_ds_method_url.clone().map(Json))
            .push_bind(self.additional_data.clone().map(Json))
            .push_bind(self.customer.clone());
    }

    fn push_patch(patch: &TransactionPatch, set: &mut SqlList<'_>) {
        set_coalesce(set, "type", patch.kind.map(|kind| kind.as_str()));
        set_coalesce(set, "status", patch.status.map(|status| status.as_str()));
        set_coalesce(set, "profile_id", reference_id(&patch.profile));
        set_coalesce(set, "account_id", reference_id(&patch.account));
        set_coalesce(set, "instrument_id", reference_id(&patch.instrument));
        set_coalesce(set, "instrument_ref", patch.instrument_record);
        set_coalesce(set, "amount", patch.amount);
        set_coalesce(set, "currency_id", reference_id(&patch.currency));
        set_coalesce(set, "amount_converted", patch.amount_converted);
        set_coalesce(
            set,
            "currency_converted_id",
            reference_id(&patch.currency_converted),
        );
        set_coalesce(set, "auth_code", patch.auth_code.clone());
        set_coalesce(set, "rrn", patch.rrn.clone());
        set_coalesce(set, "response_code", patch.response_code.clone());
        set_coalesce(set, "error_message", patch.error_message.clone());
        set_coalesce(set, "remote_id", patch.remote_id.clone());
        set_coalesce(set, "order_id", patch.order_id.clone());
        set_coalesce(set, "reference_id", reference_id(&patch.reference));
        set_coalesce(set, "three_ds10", patch.three_ds10.clone().map(Json));
        set_coalesce(set, "three_ds20", patch.three_ds20.clone().map(Json));
        set_coalesce(
            set,
            "three_ds_method_url",
            patch.three_ds_method_url.clone().map(Json),
        );
        set_coalesce(set, "additional_data", patch.additional_data.clone().map(Json));
        set_coalesce(set, "customer", patch.customer.clone());
    }
}

impl SqlSpecification for TransactionSpec {
    fn push_filter(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        match self {
            Self::All | Self::Page(_) => {}
            Self::ById(id) => push_id_filter(qb, *id),
            Self::ByIds(ids) => push_ids_filter(qb, ids),
            Self::ByReferenceAndStatus {
                reference_id,
                status,
            } => {
                qb.push(" WHERE reference_id = ")
                    .push_bind(*reference_id)
                    .push(" AND status = ")
                    .push_bind(status.as_str());
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

fn turnover_query(spec: &TransactionSpec) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT type, COUNT(id), COALESCE(SUM(amount), 0)::BIGINT \
         FROM (SELECT id, type, amount FROM transactions",
    );
    spec.push_clause(&mut qb);
    qb.push(") t WHERE type IS NOT NULL GROUP BY type");
    qb
}

#[async_trait]
impl TransactionRepository for PgStore<Transaction> {
    async fn type_turnover(
        &self,
        ctx: &RequestContext,
        spec: &TransactionSpec,
    ) -> RepositoryResult<BTreeMap<TransactionType, Turnover>> {
        ensure_active(ctx)?;
        let mut qb = turnover_query(spec);
        let rows: Vec<(String, i64, i64)> = qb
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(|e| RepositoryError::query(e.to_string()))?;

        let mut result = BTreeMap::new();
        for (kind, count, sum) in rows {
            let kind = kind
                .parse::<TransactionType>()
                .map_err(|e| RepositoryError::serialization(e.to_string()))?;
            let count = u64::try_from(count).unwrap_or_default();
            result.insert(kind, Turnover { count, sum });
        }
        Ok(result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::entities::TransactionStatus;

    #[test]
    fn turnover_wraps_the_specification() {
        let qb = turnover_query(&TransactionSpec::ByReferenceAndStatus {
            reference_id: 7,
            status: TransactionStatus::Success,
        });
        assert_eq!(
            qb.sql(),
            "SELECT type, COUNT(id), COALESCE(SUM(amount), 0)::BIGINT \
             FROM (SELECT id, type, amount FROM transactions \
             WHERE reference_id = $1 AND status = $2 ORDER BY id) t \
             WHERE type IS NOT NULL GROUP BY type"
        );
    }

    #[test]
    fn unknown_status_is_a_serialization_error() {
        let err = parse_column::<TransactionStatus>(Some("pending".to_string())).unwrap_err();
        assert!(matches!(err, RepositoryError::Serialization(_)));
        assert!(matches!(parse_column::<TransactionStatus>(None), Ok(None)));
    }

    #[test]
    fn patch_covers_every_writable_column() {
        let mut qb = QueryBuilder::new("UPDATE transactions SET ");
        {
            let mut set = qb.separated(", ");
            Transaction::push_patch(&TransactionPatch::default(), &mut set);
        }
        let sql = qb.sql();
        for column in INSERT_COLUMNS {
            assert!(
                sql.contains(&format!("{column} = COALESCE(")),
                "{column} is not patchable"
            );
        }
        assert!(!sql.contains("created"));
    }

    #[test]
    fn insert_and_select_lists_differ_by_created() {
        assert_eq!(SELECT_COLUMNS.len(), INSERT_COLUMNS.len() + 1);
        assert_eq!(SELECT_COLUMNS.first(), Some(&"created"));
        assert_eq!(&SELECT_COLUMNS[1..], INSERT_COLUMNS);
    }
}
