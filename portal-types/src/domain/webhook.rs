//! Audit trail of inbound webhook attempts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use utoipa::ToSchema;
use uuid::Uuid;

use super::transaction::{Source, TransactionId};

/// Unique identifier for a WebhookLog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, format = Uuid)]
pub struct WebhookLogId(Uuid);

impl WebhookLogId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for WebhookLogId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WebhookLogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One audit row per ingestion attempt, whatever its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookLog {
    pub id: WebhookLogId,
    /// Created transaction, `None` when the attempt did not create one
    pub transaction_id: Option<TransactionId>,
    pub source: Source,
    /// Status code returned to the caller
    pub http_status: u16,
    /// Inbound body, verbatim
    pub request_payload: serde_json::Value,
    /// Outbound body, only on the created path
    pub response_payload: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub processing_time_ms: i64,
    pub created_at: DateTime<Utc>,
}

impl WebhookLog {
    /// Reconstructs a log row from database fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: WebhookLogId,
        transaction_id: Option<TransactionId>,
        source: Source,
        http_status: u16,
        request_payload: serde_json::Value,
        response_payload: Option<serde_json::Value>,
        error_message: Option<String>,
        processing_time_ms: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            transaction_id,
            source,
            http_status,
            request_payload,
            response_payload,
            error_message,
            processing_time_ms,
            created_at,
        }
    }
}

/// An audit row whose outcome is known but whose timing is not yet stamped.
///
/// `processing_time_ms` is measured when [`WebhookLogDraft::finish`] runs, so
/// adapters call it right before the insert, after the transaction write
/// has resolved.
#[derive(Debug, Clone)]
pub struct WebhookLogDraft {
    source: Source,
    http_status: u16,
    request_payload: serde_json::Value,
    response_payload: Option<serde_json::Value>,
    error_message: Option<String>,
    started: Instant,
}

impl WebhookLogDraft {
    /// Draft for a successfully created transaction.
    pub fn created(
        source: Source,
        request_payload: serde_json::Value,
        response_payload: serde_json::Value,
        started: Instant,
    ) -> Self {
        Self {
            source,
            http_status: 201,
            request_payload,
            response_payload: Some(response_payload),
            error_message: None,
            started,
        }
    }

    /// Draft for an attempt that did not create a transaction.
    pub fn rejected(
        source: Source,
        http_status: u16,
        request_payload: serde_json::Value,
        error_message: impl Into<String>,
        started: Instant,
    ) -> Self {
        Self {
            source,
            http_status,
            request_payload,
            response_payload: None,
            error_message: Some(error_message.into()),
            started,
        }
    }

    pub fn http_status(&self) -> u16 {
        self.http_status
    }

    /// Stamps the elapsed time and produces the row to insert.
    pub fn finish(self, transaction_id: Option<TransactionId>) -> WebhookLog {
        let elapsed = self.started.elapsed().as_millis();
        WebhookLog {
            id: WebhookLogId::new(),
            transaction_id,
            source: self.source,
            http_status: self.http_status,
            request_payload: self.request_payload,
            response_payload: self.response_payload,
            error_message: self.error_message,
            processing_time_ms: i64::try_from(elapsed).unwrap_or(i64::MAX),
            created_at: Utc::now(),
        }
    }
}
