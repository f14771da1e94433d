//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Transaction, TransactionId, TransactionStatus, WebhookLogId};
use crate::query::{AnalyticsSummary, Page};
use crate::validation::FieldError;

// ─────────────────────────────────────────────────────────────────────────────
// Webhook DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Webhook body sent by a payment source.
///
/// The ingest handler validates the raw JSON itself so it can report every
/// bad field; this type documents the shape and is what the client sends.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookIngestRequest {
    /// Payment origin, `[a-z0-9_-]{1,100}`
    #[schema(example = "stripe")]
    pub source: String,
    #[schema(example = "00000000-0000-0000-0000-000000000001")]
    pub merchant_id: String,
    /// Non-negative amount in major units
    #[schema(example = 100.5)]
    pub amount: f64,
    /// Three uppercase letters
    #[schema(example = "USD")]
    pub currency: String,
    pub status: TransactionStatus,
    /// External idempotency key, unique across all transactions
    #[schema(example = "txn_1")]
    pub transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Identifiers produced by a successful ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IngestData {
    pub transaction_id: TransactionId,
    /// Audit row id; `null` in the copy stored on the audit row itself
    pub webhook_log_id: Option<WebhookLogId>,
}

/// Response to a successful ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IngestResponse {
    pub success: bool,
    pub data: IngestData,
    #[schema(example = "Transaction created successfully")]
    pub message: String,
}

impl IngestResponse {
    pub fn created(transaction_id: TransactionId) -> Self {
        Self {
            success: true,
            data: IngestData {
                transaction_id,
                webhook_log_id: None,
            },
            message: "Transaction created successfully".to_string(),
        }
    }

    pub fn with_log_id(mut self, id: WebhookLogId) -> Self {
        self.data.webhook_log_id = Some(id);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transaction DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Raw query string of `GET /transactions`.
///
/// Everything is kept as text so the validator can report each bad value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionQueryParams {
    /// Filter by payment source
    pub source: Option<String>,
    /// Filter by status
    pub status: Option<String>,
    /// Filter by merchant UUID
    pub merchant_id: Option<String>,
    /// Inclusive lower bound (RFC 3339)
    pub date_from: Option<String>,
    /// Inclusive upper bound (RFC 3339)
    pub date_to: Option<String>,
    /// Page number, from 1
    pub page: Option<String>,
    /// Page size, 1-1000
    pub limit: Option<String>,
    /// `created_at`, `amount` or `status`
    pub sort_by: Option<String>,
    /// `asc` or `desc`
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

/// One page of transactions.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionListResponse {
    pub success: bool,
    pub data: Vec<Transaction>,
    pub pagination: PaginationInfo,
}

impl From<Page<Transaction>> for TransactionListResponse {
    fn from(page: Page<Transaction>) -> Self {
        let pagination = PaginationInfo {
            page: page.page,
            limit: page.limit,
            total: page.total,
            total_pages: page.total_pages(),
        };
        Self {
            success: true,
            data: page.items,
            pagination,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub success: bool,
    pub data: Transaction,
}

// ─────────────────────────────────────────────────────────────────────────────
// Analytics DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Raw query string of `GET /analytics/summary`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnalyticsQueryParams {
    pub merchant_id: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    /// Restrict to one currency
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsMetadata {
    /// Filtered currency, `USD` when none was given
    pub currency: String,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsResponse {
    pub success: bool,
    pub data: AnalyticsSummary,
    pub metadata: AnalyticsMetadata,
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors & health
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[schema(example = "VALIDATION_ERROR")]
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
    pub request_id: String,
}

/// Error envelope shared by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DatabaseHealth {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Liveness plus a database round-trip probe.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy` or `unhealthy`
    #[schema(example = "healthy")]
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    #[schema(example = "development")]
    pub environment: String,
    pub database: DatabaseHealth,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.database.connected
    }
}
