//! Status endpoint client
//!
//! One round of polling is a single GET against the token's status URL,
//! authenticated with the current client credential. Transport and
//! (de)serialization live here, behind the [`StatusApi`] trait so the
//! polling engine can be driven by an in-process fake in tests.

use crate::credential::Credential;
use crate::{ActionError, Result};
use async_trait::async_trait;
use http::HeaderName;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Header carrying the client credential on status queries
pub const CLIENT_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-client-token");

/// Default per-request timeout for status queries
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Wire status of one polling round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollStatus {
    /// The required action has not completed yet; poll again
    #[serde(rename = "PENDING")]
    Pending,
    /// The required action completed; the response id is the resume token
    #[serde(rename = "COMPLETE")]
    Complete,
    /// The payment reached a terminal failure; do not poll again
    #[serde(rename = "FAILED")]
    Failed,
}

/// One successfully parsed response from the status endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingResponse {
    /// Terminality of this round
    pub status: PollStatus,
    /// Resume token id once `status` is `COMPLETE`
    pub id: String,
    /// Originating system reported by the server
    #[serde(default)]
    pub source: String,
    /// Reason accompanying a `FAILED` status
    #[serde(rename = "failureReason", skip_serializing_if = "Option::is_none", default)]
    pub failure_reason: Option<String>,
}

/// One status query; the polling engine issues these sequentially
#[async_trait]
pub trait StatusApi: Send + Sync {
    /// Query the status endpoint once with the given credential
    async fn poll(&self, url: &Url, credential: &Credential) -> Result<PollingResponse>;
}

/// reqwest-backed [`StatusApi`] implementation
#[derive(Debug, Clone)]
pub struct HttpStatusClient {
    client: reqwest::Client,
}

impl HttpStatusClient {
    /// Create a client with the default request timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with a custom per-request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl StatusApi for HttpStatusClient {
    async fn poll(&self, url: &Url, credential: &Credential) -> Result<PollingResponse> {
        let response = self
            .client
            .get(url.clone())
            .header(CLIENT_TOKEN_HEADER, credential.token())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|e| format!("unreadable body: {}", e));
            return Err(ActionError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<PollingResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serde_json::json;

    fn credential() -> Credential {
        Credential::new("client-token-1")
    }

    fn status_url(server: &Server) -> Url {
        Url::parse(&format!("{}/status/1", server.url())).unwrap()
    }

    #[tokio::test]
    async fn test_poll_pending() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/status/1")
            .match_header(CLIENT_TOKEN_HEADER.as_str(), "client-token-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "status": "PENDING",
                    "id": "",
                    "source": "webhook"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = HttpStatusClient::new().unwrap();
        let response = client.poll(&status_url(&server), &credential()).await.unwrap();
        assert_eq!(response.status, PollStatus::Pending);
        assert_eq!(response.source, "webhook");
    }

    #[tokio::test]
    async fn test_poll_complete_carries_resume_token_id() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/status/1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "status": "COMPLETE",
                    "id": "resume-abc",
                    "source": "webhook"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = HttpStatusClient::new().unwrap();
        let response = client.poll(&status_url(&server), &credential()).await.unwrap();
        assert_eq!(response.status, PollStatus::Complete);
        assert_eq!(response.id, "resume-abc");
    }

    #[tokio::test]
    async fn test_poll_failed_carries_reason() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/status/1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "status": "FAILED",
                    "id": "resume-abc",
                    "failureReason": "authorization declined"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = HttpStatusClient::new().unwrap();
        let response = client.poll(&status_url(&server), &credential()).await.unwrap();
        assert_eq!(response.status, PollStatus::Failed);
        assert_eq!(
            response.failure_reason.as_deref(),
            Some("authorization declined")
        );
    }

    #[tokio::test]
    async fn test_server_error_maps_to_status_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/status/1")
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let client = HttpStatusClient::new().unwrap();
        let err = client
            .poll(&status_url(&server), &credential())
            .await
            .unwrap_err();

        match err {
            ActionError::Status { status, ref message } => {
                assert_eq!(status, 503);
                assert!(message.contains("upstream unavailable"));
            }
            other => panic!("expected Status error, got {:?}", other),
        }
        assert!(err.is_transient(true));
        assert!(!err.is_transient(false));
    }

    #[tokio::test]
    async fn test_client_error_is_not_transient() {
        let mut server = Server::new_async().await;
        let _m = server.mock("GET", "/status/1").with_status(404).create_async()
            .await;

        let client = HttpStatusClient::new().unwrap();
        let err = client
            .poll(&status_url(&server), &credential())
            .await
            .unwrap_err();

        assert!(matches!(err, ActionError::Status { status: 404, .. }));
        assert!(!err.is_transient(true));
    }

    #[tokio::test]
    async fn test_connection_failure_is_transient() {
        let client = HttpStatusClient::with_timeout(Duration::from_millis(50)).unwrap();
        let unreachable = Url::parse("http://127.0.0.1:1/status").unwrap();

        let err = client.poll(&unreachable, &credential()).await.unwrap_err();
        assert!(matches!(err, ActionError::Http(_)));
        assert!(err.is_transient(false));
    }
}
