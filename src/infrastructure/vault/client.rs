//! # Vault HTTP Client
//!
//! Thin JSON-over-HTTP wrapper used by the vault stores.
//!
//! Each operation is a single request: no retries, no idempotency keys.
//! Requests and responses are logged at debug level with card numbers
//! masked by [`mask_sensitive`].
//!
//! # Examples
//!
//! ```ignore
//! use paystore::infrastructure::vault::VaultClient;
//!
//! let client = VaultClient::new("https://vault.internal", 5000)?;
//! let cards: Option<CardList> = client.get(&["v1", "cards"], &[("limit", "10".into())]).await?;
//! ```

use crate::infrastructure::persistence::{RepositoryError, RepositoryResult};
use crate::infrastructure::vault::masking::mask_sensitive;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client bound to one vault base URL.
#[derive(Debug, Clone)]
pub struct VaultClient {
    /// Inner reqwest client.
    client: Client,
    /// Vault root, e.g. `https://vault.internal/`.
    base_url: Url,
    /// Request timeout in milliseconds.
    timeout_ms: u64,
}

impl VaultClient {
    /// Creates a client for `base_url` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Internal` if the URL is invalid or the
    /// client cannot be created.
    pub fn new(base_url: &str, timeout_ms: u64) -> RepositoryResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| RepositoryError::internal(format!("Failed to create HTTP client: {e}")))?;
        Self::with_client(client, base_url, timeout_ms)
    }

    /// Wraps an existing reqwest client.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Internal` if the URL is invalid.
    pub fn with_client(client: Client, base_url: &str, timeout_ms: u64) -> RepositoryResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RepositoryError::internal(format!("Invalid vault URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RepositoryError::internal(format!(
                "Invalid vault URL {base_url}: not a base URL"
            )));
        }
        Ok(Self {
            client,
            base_url,
            timeout_ms,
        })
    }

    /// Returns the vault root URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the configured timeout in milliseconds.
    #[inline]
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Builds `base_url/<segments...>`, percent-encoding each segment.
    fn url(&self, segments: &[&str]) -> RepositoryResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RepositoryError::internal("vault URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// POSTs `body` as JSON and decodes the 2xx JSON response.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Connection` on transport failures and for
    /// non-2xx statuses, `RepositoryError::Serialization` if the response
    /// cannot be decoded.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> RepositoryResult<T> {
        let request = self.client.post(self.url(segments)?).json(body);
        let (status, text) = self.execute(request).await?;
        if !status.is_success() {
            return Err(map_status_error(status, &text));
        }
        decode(&text)
    }

    /// GETs a JSON resource. A 404 yields `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Connection` on transport failures and for
    /// other non-2xx statuses, `RepositoryError::Serialization` if the
    /// response cannot be decoded.
    pub async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &[(&str, String)],
    ) -> RepositoryResult<Option<T>> {
        let mut request = self.client.get(self.url(segments)?);
        if !params.is_empty() {
            request = request.query(params);
        }
        let (status, text) = self.execute(request).await?;
        match status {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => decode(&text).map(Some),
            s => Err(map_status_error(s, &text)),
        }
    }

    /// DELETEs a resource and decodes the returned record.
    ///
    /// Only `200 OK` counts as success; a 404 yields `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Connection` on transport failures and for
    /// any other status, `RepositoryError::Serialization` if the response
    /// cannot be decoded.
    pub async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> RepositoryResult<Option<T>> {
        let request = self.client.delete(self.url(segments)?);
        let (status, text) = self.execute(request).await?;
        match status {
            StatusCode::OK => decode(&text).map(Some),
            StatusCode::NOT_FOUND => Ok(None),
            s => Err(map_status_error(s, &text)),
        }
    }

    /// Sends the request, logging both directions with PANs masked.
    async fn execute(&self, request: RequestBuilder) -> RepositoryResult<(StatusCode, String)> {
        let request = request.build().map_err(map_reqwest_error)?;
        let body = request
            .body()
            .and_then(reqwest::Body::as_bytes)
            .map(String::from_utf8_lossy)
            .unwrap_or_default();
        tracing::debug!(
            method = %request.method(),
            url = %mask_sensitive(request.url().as_str()),
            body = %mask_sensitive(&body),
            "vault request"
        );

        let response = self
            .client
            .execute(request)
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;
        tracing::debug!(status = status.as_u16(), body = %mask_sensitive(&text), "vault response");

        Ok((status, text))
    }
}

fn decode<T: DeserializeOwned>(text: &str) -> RepositoryResult<T> {
    serde_json::from_str(text)
        .map_err(|e| RepositoryError::serialization(format!("Failed to parse vault response: {e}")))
}

/// Maps a reqwest error to a RepositoryError.
fn map_reqwest_error(error: reqwest::Error) -> RepositoryError {
    if error.is_timeout() {
        RepositoryError::connection("Vault request timed out")
    } else if error.is_connect() {
        RepositoryError::connection(format!("Connection failed: {error}"))
    } else if error.is_builder() {
        RepositoryError::internal(format!("Invalid vault request: {error}"))
    } else {
        RepositoryError::connection(format!("HTTP request failed: {error}"))
    }
}

/// Maps an unexpected HTTP status to a RepositoryError.
fn map_status_error(status: StatusCode, body: &str) -> RepositoryError {
    let body = mask_sensitive(body);
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            RepositoryError::query(format!("Vault rejected request ({status}): {body}"))
        }
        s if s.is_server_error() => {
            RepositoryError::connection(format!("Vault error ({status}): {body}"))
        }
        _ => RepositoryError::connection(format!("Unexpected vault status ({status}): {body}")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn segments_are_appended_and_encoded() {
        let client = VaultClient::new("http://vault.local/api/", 1000).unwrap();
        assert_eq!(
            client.url(&["v1", "sessions", "a b/c"]).unwrap().as_str(),
            "http://vault.local/api/v1/sessions/a%20b%2Fc"
        );

        let bare = VaultClient::new("http://vault.local", 1000).unwrap();
        assert_eq!(
            bare.url(&["v1", "cards"]).unwrap().as_str(),
            "http://vault.local/v1/cards"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(VaultClient::new("not a url", 1000).is_err());
        assert!(VaultClient::new("mailto:vault@example.com", 1000).is_err());
    }

    #[test]
    fn status_errors_mask_card_numbers() {
        let err = map_status_error(
            StatusCode::BAD_REQUEST,
            r#"{"pan":"4111111111111111","error":"expired"}"#,
        );
        let message = err.to_string();
        assert!(message.contains("************1111"));
        assert!(!message.contains("4111111111111111"));
        assert!(matches!(
            map_status_error(StatusCode::BAD_GATEWAY, ""),
            RepositoryError::Connection(_)
        ));
    }
}
