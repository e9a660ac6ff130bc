//! Session repository backed by the vault's `/v1/sessions` resource.
//!
//! Sessions are written once and looked up by key. Expiry is stamped
//! locally on add and enforced on lookup, the same way the in-memory store
//! does it. The vault has no expiry field of its own, so the instant travels
//! inside the JSON-encoded `body` next to the payload:
//!
//! ```text
//! {"data": {"step": "3ds"}, "expires_at": "2026-10-17T12:30:00Z"}
//! ```
//!
//! Bodies holding only a bare payload map are still read, without expiry.

use crate::domain::entities::{Session, SessionData, SessionPatch, SessionSpec};
use crate::domain::{Logger, RequestContext};
use crate::infrastructure::persistence::{
    EntityHooks, QueryResult, Repository, RepositoryError, RepositoryResult, SessionOptions,
    ensure_active,
};
use crate::infrastructure::vault::client::VaultClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

#[derive(Debug, Serialize)]
struct AddSessionRequest<'a> {
    key: Option<&'a str>,
    /// Session data, JSON-encoded into a string.
    body: String,
}

/// What the vault keeps in a session's `body`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SessionEnvelope {
    data: SessionData,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredBody {
    Envelope(SessionEnvelope),
    Bare(SessionData),
}

impl StoredBody {
    fn into_parts(self) -> (SessionData, Option<DateTime<Utc>>) {
        match self {
            Self::Envelope(envelope) => (envelope.data, Some(envelope.expires_at)),
            Self::Bare(data) => (data, None),
        }
    }
}

fn encode_body(session: &Session) -> RepositoryResult<String> {
    let data = session.data.clone().unwrap_or_default();
    let encoded = match session.expires_at {
        Some(expires_at) => serde_json::to_string(&SessionEnvelope { data, expires_at }),
        None => serde_json::to_string(&data),
    };
    encoded.map_err(|e| RepositoryError::serialization(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct VaultSession {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

impl VaultSession {
    /// Decodes the payload, falling back to `local` for missing fields.
    fn into_session(self, local: Option<&Session>) -> RepositoryResult<Session> {
        let (data, body_expiry) = match self.body {
            Some(body) => {
                let stored = serde_json::from_str::<StoredBody>(&body).map_err(|e| {
                    RepositoryError::serialization(format!("Invalid session body: {e}"))
                })?;
                let (data, expires_at) = stored.into_parts();
                (Some(data), expires_at)
            }
            None => (None, None),
        };
        Ok(Session {
            id: self.id.or_else(|| local.and_then(|s| s.id)),
            key: self.key.or_else(|| local.and_then(|s| s.key.clone())),
            data: data.or_else(|| local.and_then(|s| s.data.clone())),
            expires_at: self
                .expires_at
                .or(body_expiry)
                .or_else(|| local.and_then(|s| s.expires_at)),
        })
    }
}

/// Vault-backed session repository.
#[derive(Clone)]
pub struct VaultSessionStore {
    client: VaultClient,
    options: SessionOptions,
    logger: Logger,
}

impl VaultSessionStore {
    /// Creates a store talking to `client`.
    #[must_use]
    pub fn new(client: VaultClient, options: SessionOptions) -> Self {
        Self {
            client,
            options,
            logger: Logger::default(),
        }
    }

    /// Replaces the per-request logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    async fn add_session(
        &self,
        ctx: &RequestContext,
        mut session: Session,
    ) -> RepositoryResult<Session> {
        ensure_active(ctx)?;
        session.on_add(&self.options, Utc::now())?;
        let request = AddSessionRequest {
            key: session.key.as_deref(),
            body: encode_body(&session)?,
        };
        let stored: VaultSession = self.client.post(&["v1", "sessions"], &request).await?;
        let stored = stored.into_session(Some(&session))?;
        tracing::debug!(id = ?stored.id, "session stored");
        Ok(stored)
    }

    async fn query_sessions(
        &self,
        ctx: &RequestContext,
        spec: &SessionSpec,
    ) -> RepositoryResult<QueryResult<Session>> {
        ensure_active(ctx)?;
        let SessionSpec::ByKey(key) = spec else {
            return Err(RepositoryError::unsupported(
                "session lookup other than by key is not offered by the vault",
            ));
        };
        let found: Option<VaultSession> = self
            .client
            .get(&["v1", "sessions", key.as_str()], &[])
            .await?;
        let Some(found) = found else {
            return Ok(QueryResult::default());
        };

        let session = found.into_session(None)?;
        let items: Vec<Session> = std::iter::once(session)
            .filter(|session| !session.is_expired(Utc::now()))
            .collect();
        tracing::debug!(?spec, found = items.len(), "session query");
        Ok(QueryResult { total: 1, items })
    }
}

impl std::fmt::Debug for VaultSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSessionStore")
            .field("base_url", &self.client.base_url().as_str())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Repository<Session> for VaultSessionStore {
    async fn add(&self, ctx: &RequestContext, session: Session) -> RepositoryResult<Session> {
        self.add_session(ctx, session)
            .instrument(self.logger.span(ctx))
            .await
    }

    async fn delete(&self, ctx: &RequestContext, _id: i64) -> RepositoryResult<Session> {
        ensure_active(ctx)?;
        Err(RepositoryError::unsupported(
            "session delete is not offered by the vault",
        ))
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        _id: i64,
        _patch: SessionPatch,
    ) -> RepositoryResult<Session> {
        ensure_active(ctx)?;
        Err(RepositoryError::unsupported(
            "session update is not offered by the vault",
        ))
    }

    async fn query(
        &self,
        ctx: &RequestContext,
        spec: &SessionSpec,
    ) -> RepositoryResult<QueryResult<Session>> {
        self.query_sessions(ctx, spec)
            .instrument(self.logger.span(ctx))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> VaultSessionStore {
        VaultSessionStore::new(
            VaultClient::new(&server.uri(), 2000).unwrap(),
            SessionOptions::default(),
        )
    }

    fn data() -> SessionData {
        let mut data = SessionData::new();
        data.insert("step".to_string(), json!("3ds"));
        data
    }

    fn store_with_ttl(server: &MockServer, ttl_secs: u64) -> VaultSessionStore {
        VaultSessionStore::new(
            VaultClient::new(&server.uri(), 2000).unwrap(),
            SessionOptions::with_ttl_secs(ttl_secs),
        )
    }

    /// Body of the single POST the server has seen.
    async fn posted(server: &MockServer) -> serde_json::Value {
        let requests = server.received_requests().await.unwrap();
        let post = requests
            .iter()
            .find(|request| request.method.as_str() == "POST")
            .unwrap();
        serde_json::from_slice(&post.body).unwrap()
    }

    /// Stores a session, then serves it back by key exactly as it was sent.
    async fn round_trip(ttl_secs: u64) -> (Session, QueryResult<Session>) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1, "key": "k" })))
            .mount(&server)
            .await;
        let store = store_with_ttl(&server, ttl_secs);
        let ctx = RequestContext::new();
        let stored = store.add(&ctx, Session::new("k", data())).await.unwrap();

        let mut echoed = posted(&server).await;
        echoed["id"] = json!(1);
        Mock::given(method("GET"))
            .and(path("/v1/sessions/k"))
            .respond_with(ResponseTemplate::new(200).set_body_json(echoed))
            .mount(&server)
            .await;
        let found = store
            .query(&ctx, &SessionSpec::ByKey("k".to_string()))
            .await
            .unwrap();
        (stored, found)
    }

    #[tokio::test]
    async fn add_sends_expiry_inside_json_encoded_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 4, "key": "abc" })))
            .expect(1)
            .mount(&server)
            .await;

        let before = Utc::now();
        let stored = store(&server)
            .add(&RequestContext::new(), Session::new("abc", data()))
            .await
            .unwrap();

        assert_eq!(stored.id, Some(4));
        assert_eq!(stored.data, Some(data()));
        let expires_at = stored.expires_at.unwrap();
        assert!(expires_at >= before + Duration::seconds(1800));

        let sent = posted(&server).await;
        assert_eq!(sent["key"], json!("abc"));
        let body: serde_json::Value =
            serde_json::from_str(sent["body"].as_str().unwrap()).unwrap();
        assert_eq!(body["data"], json!({ "step": "3ds" }));
        let sent_expiry: DateTime<Utc> =
            serde_json::from_value(body["expires_at"].clone()).unwrap();
        assert_eq!(sent_expiry, expires_at);
    }

    #[tokio::test]
    async fn live_session_survives_vault_round_trip() {
        let (stored, found) = round_trip(1800).await;
        assert_eq!(found.total, 1);
        assert_eq!(found.items, vec![stored]);
    }

    #[tokio::test]
    async fn expired_session_is_hidden_after_vault_round_trip() {
        let (stored, found) = round_trip(0).await;
        assert!(stored.expires_at.is_some());
        assert_eq!(found.total, 1);
        assert!(found.items.is_empty());
    }

    #[tokio::test]
    async fn lookup_by_key_decodes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sessions/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 4,
                "key": "abc",
                "body": "{\"step\":\"3ds\"}"
            })))
            .mount(&server)
            .await;

        let result = store(&server)
            .query(&RequestContext::new(), &SessionSpec::ByKey("abc".to_string()))
            .await
            .unwrap();

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].data, Some(data()));
    }

    #[tokio::test]
    async fn missing_and_expired_sessions_are_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sessions/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/sessions/old"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1,
                "key": "old",
                "expires_at": "2020-01-01T00:00:00Z"
            })))
            .mount(&server)
            .await;

        let store = store(&server);
        let ctx = RequestContext::new();
        let gone = store
            .query(&ctx, &SessionSpec::ByKey("gone".to_string()))
            .await
            .unwrap();
        assert_eq!(gone.total, 0);
        assert!(gone.items.is_empty());

        let old = store
            .query(&ctx, &SessionSpec::ByKey("old".to_string()))
            .await
            .unwrap();
        assert!(old.items.is_empty());
    }

    #[tokio::test]
    async fn other_operations_are_unsupported() {
        let server = MockServer::start().await;
        let store = store(&server);
        let ctx = RequestContext::new();

        assert!(store.delete(&ctx, 1).await.unwrap_err().is_unsupported());
        assert!(
            store
                .update(&ctx, 1, SessionPatch::default())
                .await
                .unwrap_err()
                .is_unsupported()
        );
        assert!(
            store
                .query(&ctx, &SessionSpec::All)
                .await
                .unwrap_err()
                .is_unsupported()
        );
    }
}
