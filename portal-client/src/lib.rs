//! # Portal Client SDK
//!
//! A typed Rust client for the merchant portal API.

use portal_types::{
    AnalyticsQueryParams, AnalyticsResponse, ErrorResponse, HealthResponse, IngestResponse,
    TransactionId, TransactionListResponse, TransactionQueryParams, TransactionResponse,
    WebhookIngestRequest,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} {code} - {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        request_id: Option<String>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// True when the server rejected a resubmitted `transaction_id`.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, ClientError::Api { code, .. } if code == "DUPLICATE_TRANSACTION")
    }
}

/// Merchant portal API client.
pub struct PortalClient {
    base_url: String,
    http: Client,
}

impl PortalClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// Fetches the health report.
    ///
    /// An unhealthy service answers 503 with the same body, so both are
    /// returned as `Ok`.
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        if resp.status() == StatusCode::SERVICE_UNAVAILABLE {
            let body = resp.text().await?;
            return Ok(serde_json::from_str(&body)?);
        }
        handle_response(resp).await
    }

    /// Submits a payment webhook.
    pub async fn ingest(
        &self,
        webhook: &WebhookIngestRequest,
    ) -> Result<IngestResponse, ClientError> {
        let resp = self
            .http
            .post(format!("{}/api/webhooks/ingest", self.base_url))
            .json(webhook)
            .send()
            .await?;
        handle_response(resp).await
    }

    /// Lists transactions matching the given query.
    pub async fn list_transactions(
        &self,
        query: &TransactionQueryParams,
    ) -> Result<TransactionListResponse, ClientError> {
        self.get("/api/transactions", query).await
    }

    /// Gets a transaction by ID.
    pub async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<TransactionResponse, ClientError> {
        let resp = self
            .http
            .get(format!("{}/api/transactions/{}", self.base_url, id))
            .send()
            .await?;
        handle_response(resp).await
    }

    /// Fetches the analytics summary.
    pub async fn analytics_summary(
        &self,
        query: &AnalyticsQueryParams,
    ) -> Result<AnalyticsResponse, ClientError> {
        self.get("/api/analytics/summary", query).await
    }

    async fn get<T: DeserializeOwned, Q: serde::Serialize>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, ClientError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await?;
        handle_response(resp).await
    }
}

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    let body = resp.text().await?;
    if status.is_success() {
        Ok(serde_json::from_str(&body)?)
    } else {
        Err(api_error(status.as_u16(), body))
    }
}

/// Builds an API error from the `{error: {...}}` envelope, falling back to
/// the raw body when the server sent something else.
fn api_error(status: u16, body: String) -> ClientError {
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(envelope) => ClientError::Api {
            status,
            code: envelope.error.code,
            message: envelope.error.message,
            request_id: Some(envelope.error.request_id),
        },
        Err(_) => ClientError::Api {
            status,
            code: "UNKNOWN".to_string(),
            message: body,
            request_id: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = PortalClient::new("http://localhost:3000");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_client_with_trailing_slash() {
        let client = PortalClient::new("http://localhost:3000/");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_api_error_from_envelope() {
        let body = r#"{"error":{"code":"DUPLICATE_TRANSACTION","message":"Transaction with this ID already exists","requestId":"req-1"}}"#;
        let err = api_error(409, body.to_string());

        assert!(err.is_duplicate());
        match err {
            ClientError::Api {
                status, request_id, ..
            } => {
                assert_eq!(status, 409);
                assert_eq!(request_id.as_deref(), Some("req-1"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_api_error_from_plain_body() {
        let err = api_error(502, "Bad Gateway".to_string());
        assert!(!err.is_duplicate());
        assert!(err.to_string().contains("Bad Gateway"));
    }
}
