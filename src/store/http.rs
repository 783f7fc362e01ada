//! HTTP client for the draft store REST surface.
//!
//! Talks to a draftsync server (or any compatible backend) over three
//! endpoints:
//!
//! - `GET /draft` -> `{ state, version, userId }`
//! - `GET /draft?meta=true` -> `{ version, userId }`
//! - `POST /draft` with `{ state, userId }` -> `{ version }`
//!
//! Status mapping: `404` means no draft exists yet, `503` means the backing
//! store is not provisioned. Transport failures are transient network errors.

use serde::{Deserialize, Serialize};

use super::{DraftMeta, DraftRecord, DraftStore, StoreError};
use crate::document::Draft;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PutRequest<'a> {
    state: &'a Draft,
    user_id: &'a str,
}

#[derive(Deserialize)]
struct PutResponse {
    version: u64,
}

/// Draft store client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDraftStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDraftStore {
    /// Creates a client for the given server URL.
    ///
    /// A bare `host:port` is assumed to be plain HTTP.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(server_url.into()),
            client: reqwest::Client::new(),
        }
    }

    /// Returns the normalized server base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Err(StoreError::NotFound)
        } else if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            Err(StoreError::NotConfigured)
        } else {
            Err(StoreError::Protocol(format!(
                "Server returned status {}",
                status
            )))
        }
    }
}

impl DraftStore for HttpDraftStore {
    async fn get(&self) -> Result<DraftRecord, StoreError> {
        let response = self
            .client
            .get(self.url("/draft"))
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Self::check(response)?
            .json::<DraftRecord>()
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))
    }

    async fn get_meta(&self) -> Result<DraftMeta, StoreError> {
        let response = self
            .client
            .get(self.url("/draft"))
            .query(&[("meta", "true")])
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Self::check(response)?
            .json::<DraftMeta>()
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))
    }

    async fn put(&self, draft: &Draft, editor_id: &str) -> Result<u64, StoreError> {
        let body = PutRequest {
            state: draft,
            user_id: editor_id,
        };

        let response = self
            .client
            .post(self.url("/draft"))
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let response = Self::check(response)?;
        let parsed: PutResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))?;

        Ok(parsed.version)
    }
}

/// Normalizes a server URL to an `http(s)://host` base with no trailing slash.
fn normalize_base_url(server_url: String) -> String {
    let with_scheme = if server_url.starts_with("http://") || server_url.starts_with("https://") {
        server_url
    } else {
        format!("http://{}", server_url)
    };
    with_scheme.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("http://localhost:8080".to_string()),
            "http://localhost:8080"
        );
        assert_eq!(
            normalize_base_url("https://drafts.example.com/".to_string()),
            "https://drafts.example.com"
        );
        assert_eq!(
            normalize_base_url("localhost:8080".to_string()),
            "http://localhost:8080"
        );
    }

    #[test]
    fn test_url_building() {
        let store = HttpDraftStore::new("localhost:8080");
        assert_eq!(store.url("/draft"), "http://localhost:8080/draft");

        let store = HttpDraftStore::new("https://drafts.example.com/");
        assert_eq!(store.base_url(), "https://drafts.example.com");
        assert_eq!(store.url("/draft"), "https://drafts.example.com/draft");
    }

    #[test]
    fn test_put_request_wire_shape() {
        let mut draft = Draft::new();
        draft.set("subject", serde_json::json!("Issue 1"));
        let body = PutRequest {
            state: &draft,
            user_id: "editor-1",
        };

        let encoded = serde_json::to_value(&body).unwrap();
        assert_eq!(encoded["userId"], "editor-1");
        assert_eq!(encoded["state"]["subject"], "Issue 1");
    }
}
