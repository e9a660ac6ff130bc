//! Card repository backed by the vault's `/v1/cards` resource.
//!
//! The vault owns ids and tokens and only ever returns masked card numbers.
//! It offers add, delete and two lookups (by PAN, by window); anything else
//! is reported as [`RepositoryError::Unsupported`].

use crate::domain::entities::{Card, CardPatch, CardSpec};
use crate::domain::value_objects::ExpDate;
use crate::domain::{Logger, RequestContext};
use crate::infrastructure::persistence::{
    QueryResult, Repository, RepositoryError, RepositoryResult, ensure_active,
};
use crate::infrastructure::vault::client::VaultClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

const CARDS: [&str; 2] = ["v1", "cards"];

#[derive(Debug, Serialize)]
struct AddCardRequest<'a> {
    pan: Option<&'a str>,
    exp_date: Option<&'a ExpDate>,
    holder: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CardList {
    #[serde(default)]
    data: Vec<Card>,
    #[serde(default)]
    total: Option<u64>,
}

/// Vault-backed card repository.
#[derive(Clone)]
pub struct VaultCardStore {
    client: VaultClient,
    logger: Logger,
}

impl VaultCardStore {
    /// Creates a store talking to `client`.
    #[must_use]
    pub fn new(client: VaultClient) -> Self {
        Self {
            client,
            logger: Logger::default(),
        }
    }

    /// Replaces the per-request logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    async fn add_card(&self, ctx: &RequestContext, card: Card) -> RepositoryResult<Card> {
        ensure_active(ctx)?;
        let request = AddCardRequest {
            pan: card.pan.as_ref().map(|pan| pan.expose()),
            exp_date: card.exp_date.as_ref(),
            holder: card.holder.as_deref(),
        };
        let stored: Card = self.client.post(&CARDS, &request).await?;
        tracing::debug!(id = ?stored.id, "card vaulted");
        Ok(stored)
    }

    async fn delete_card(&self, ctx: &RequestContext, id: i64) -> RepositoryResult<Card> {
        ensure_active(ctx)?;
        let id_segment = id.to_string();
        self.client
            .delete::<Card>(&["v1", "cards", &id_segment])
            .await?
            .ok_or_else(|| RepositoryError::not_found("card", id))
    }

    async fn query_cards(
        &self,
        ctx: &RequestContext,
        spec: &CardSpec,
    ) -> RepositoryResult<QueryResult<Card>> {
        ensure_active(ctx)?;
        let params = query_params(spec)?;
        let list: Option<CardList> = self.client.get(&CARDS, &params).await?;
        let Some(list) = list else {
            return Ok(QueryResult::default());
        };
        let total = list.total.unwrap_or(list.data.len() as u64);
        tracing::debug!(?spec, total, found = list.data.len(), "card query");
        Ok(QueryResult {
            total,
            items: list.data,
        })
    }
}

fn query_params(spec: &CardSpec) -> RepositoryResult<Vec<(&'static str, String)>> {
    match spec {
        CardSpec::All => Ok(Vec::new()),
        CardSpec::ByPan(pan) => Ok(vec![
            ("pan", pan.expose().to_string()),
            ("limit", "1".to_string()),
        ]),
        CardSpec::Page(page) => Ok(vec![
            ("limit", page.limit().to_string()),
            ("offset", page.offset().to_string()),
        ]),
        CardSpec::ById(_) | CardSpec::ByIds(_) => Err(RepositoryError::unsupported(
            "card lookup by id is not offered by the vault",
        )),
    }
}

impl std::fmt::Debug for VaultCardStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultCardStore")
            .field("base_url", &self.client.base_url().as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Repository<Card> for VaultCardStore {
    async fn add(&self, ctx: &RequestContext, card: Card) -> RepositoryResult<Card> {
        self.add_card(ctx, card)
            .instrument(self.logger.span(ctx))
            .await
    }

    async fn delete(&self, ctx: &RequestContext, id: i64) -> RepositoryResult<Card> {
        self.delete_card(ctx, id)
            .instrument(self.logger.span(ctx))
            .await
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        _id: i64,
        _patch: CardPatch,
    ) -> RepositoryResult<Card> {
        ensure_active(ctx)?;
        Err(RepositoryError::unsupported(
            "card update is not offered by the vault",
        ))
    }

    async fn query(
        &self,
        ctx: &RequestContext,
        spec: &CardSpec,
    ) -> RepositoryResult<QueryResult<Card>> {
        self.query_cards(ctx, spec)
            .instrument(self.logger.span(ctx))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::specification::Page;
    use crate::domain::value_objects::Pan;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn store(server: &MockServer) -> VaultCardStore {
        VaultCardStore::new(VaultClient::new(&server.uri(), 2000).unwrap())
    }

    #[tokio::test]
    async fn add_posts_card_and_decodes_vault_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/cards"))
            .and(body_json(json!({
                "pan": "4111111111111111",
                "exp_date": "27/05",
                "holder": "A B"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 12,
                "token": "f00d",
                "pan": "************1111",
                "exp_date": "27/05",
                "holder": "A B"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let card = Card::new("4111111111111111", ExpDate::new(2027, 5).unwrap(), "A B");
        let stored = store(&server)
            .await
            .add(&RequestContext::new(), card)
            .await
            .unwrap();

        assert_eq!(stored.id, Some(12));
        assert_eq!(stored.token.as_deref(), Some("f00d"));
        assert_eq!(stored.pan.unwrap().to_string(), "************1111");
    }

    #[tokio::test]
    async fn query_by_pan_sends_limit_one() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/cards"))
            .and(query_param("pan", "4111111111111111"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "id": 3, "pan": "************1111", "exp_date": "27/05" }]
            })))
            .mount(&server)
            .await;

        let result = store(&server)
            .await
            .query(
                &RequestContext::new(),
                &CardSpec::ByPan(Pan::new("4111111111111111")),
            )
            .await
            .unwrap();

        assert_eq!(result.total, 1);
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].id, Some(3));
    }

    #[tokio::test]
    async fn page_query_uses_reported_total() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/cards"))
            .and(query_param("limit", "2"))
            .and(query_param("offset", "4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "id": 5 }, { "id": 6 }],
                "total": 40
            })))
            .mount(&server)
            .await;

        let result = store(&server)
            .await
            .query(&RequestContext::new(), &CardSpec::Page(Page::new(2, 4)))
            .await
            .unwrap();

        assert_eq!(result.total, 40);
        assert_eq!(result.items.len(), 2);
    }

    #[tokio::test]
    async fn delete_requires_exactly_ok() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/cards/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 7 })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v1/cards/8"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v1/cards/9"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "id": 9 })))
            .mount(&server)
            .await;

        let store = store(&server).await;
        let ctx = RequestContext::new();
        assert_eq!(store.delete(&ctx, 7).await.unwrap().id, Some(7));
        assert!(store.delete(&ctx, 8).await.unwrap_err().is_not_found());
        assert!(matches!(
            store.delete(&ctx, 9).await.unwrap_err(),
            RepositoryError::Connection(_)
        ));
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/cards"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = store(&server)
            .await
            .query(&RequestContext::new(), &CardSpec::All)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Connection(_)));
    }

    #[tokio::test]
    async fn unsupported_operations_do_not_call_the_vault() {
        let server = MockServer::start().await;
        let store = store(&server).await;
        let ctx = RequestContext::new();

        let err = store
            .update(&ctx, 1, CardPatch::default())
            .await
            .unwrap_err();
        assert!(err.is_unsupported());
        let err = store.query(&ctx, &CardSpec::ById(1)).await.unwrap_err();
        assert!(err.is_unsupported());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancelled_context_short_circuits() {
        let server = MockServer::start().await;
        let ctx = RequestContext::new();
        ctx.cancel();
        let err = store(&server)
            .await
            .query(&ctx, &CardSpec::All)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
