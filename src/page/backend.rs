use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::clients::pddikti::Resource;

#[derive(Debug, Error)]
pub enum BackendError {
    /// The session key was unresolvable and no fallback was available;
    /// callers should prompt a fresh search rather than show "no results".
    #[error("Search session expired or invalid")]
    SessionExpired,

    #[error("Connection failed: {0}")]
    Connection(String),

    /// Any other failure reported by the search service, message verbatim.
    #[error("{0}")]
    Service(String),
}

#[derive(Debug, Clone)]
pub struct InitiatedSearch {
    pub key: String,
    pub query: String,
}

#[derive(Debug, Clone)]
pub struct SearchPayload {
    pub data: Vec<Value>,
    pub query: String,
}

/// Network seam for the page controller and the autocomplete selects. The
/// production implementation talks HTTP to the proxy; tests substitute an
/// in-memory fake.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn initiate(&self, query: &str) -> Result<InitiatedSearch, BackendError>;

    async fn search(
        &self,
        resource: Resource,
        key: &str,
        fallback_q: Option<&str>,
    ) -> Result<SearchPayload, BackendError>;

    /// Raw-query search used by autocomplete selects.
    async fn suggest(&self, resource: Resource, query: &str) -> Result<Vec<Value>, BackendError>;
}

#[derive(Debug, Deserialize)]
struct WireInitiate {
    key: String,
    query: String,
}

#[derive(Debug, Deserialize)]
struct WireSearch {
    data: Vec<Value>,
    query: String,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
}

/// `SearchBackend` over HTTP, against the proxy's own API.
#[derive(Clone)]
pub struct HttpSearchBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSearchBackend {
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn error_from(response: reqwest::Response, keyed: bool) -> BackendError {
        let status = response.status();
        let message = match response.json::<WireError>().await {
            Ok(body) => body.message,
            Err(_) => format!("Search service returned status {status}"),
        };

        if keyed && status == reqwest::StatusCode::NOT_FOUND {
            BackendError::SessionExpired
        } else {
            BackendError::Service(message)
        }
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn initiate(&self, query: &str) -> Result<InitiatedSearch, BackendError> {
        let url = format!("{}/api/search/initiate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, false).await);
        }

        let body: WireInitiate = response
            .json()
            .await
            .map_err(|e| BackendError::Service(e.to_string()))?;

        Ok(InitiatedSearch {
            key: body.key,
            query: body.query,
        })
    }

    async fn search(
        &self,
        resource: Resource,
        key: &str,
        fallback_q: Option<&str>,
    ) -> Result<SearchPayload, BackendError> {
        let url = format!("{}/api/{}", self.base_url, resource.as_str());

        let mut request = self.client.get(&url).query(&[("key", key)]);
        if let Some(fallback) = fallback_q {
            request = request.query(&[("fallback_q", fallback)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, true).await);
        }

        let body: WireSearch = response
            .json()
            .await
            .map_err(|e| BackendError::Service(e.to_string()))?;

        Ok(SearchPayload {
            data: body.data,
            query: body.query,
        })
    }

    async fn suggest(&self, resource: Resource, query: &str) -> Result<Vec<Value>, BackendError> {
        let url = format!("{}/api/{}", self.base_url, resource.as_str());
        let response = self
            .client
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, false).await);
        }

        let body: WireSearch = response
            .json()
            .await
            .map_err(|e| BackendError::Service(e.to_string()))?;

        Ok(body.data)
    }
}
