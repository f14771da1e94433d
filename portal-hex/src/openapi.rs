//! OpenAPI document and path descriptions.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use portal_types::domain::{
    Amount, CurrencyCode, ExternalId, MerchantId, Source, Transaction, TransactionId,
    TransactionStatus, WebhookLogId,
};
use portal_types::dto::{
    AnalyticsMetadata, AnalyticsQueryParams, AnalyticsResponse, DatabaseHealth, DateRange,
    ErrorBody, ErrorResponse, HealthResponse, IngestData, IngestResponse, PaginationInfo,
    TransactionListResponse, TransactionQueryParams, TransactionResponse, WebhookIngestRequest,
};
use portal_types::query::{AnalyticsSummary, SourceStats, StatusCounts};
use portal_types::validation::FieldError;
use utoipa::OpenApi;

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check with database probe
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service and database are reachable", body = HealthResponse),
        (status = 503, description = "Database probe failed", body = HealthResponse)
    )
)]
async fn health() {}

/// Ingest a payment webhook
///
/// Every attempt that passes validation leaves exactly one audit row,
/// whatever its outcome.
#[utoipa::path(
    post,
    path = "/api/webhooks/ingest",
    tag = "webhooks",
    request_body = WebhookIngestRequest,
    responses(
        (status = 201, description = "Transaction created", body = IngestResponse),
        (status = 400, description = "Validation failed; every bad field is listed", body = ErrorResponse),
        (status = 409, description = "transaction_id already ingested", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
async fn ingest_webhook() {}

/// List transactions
#[utoipa::path(
    get,
    path = "/api/transactions",
    tag = "transactions",
    params(TransactionQueryParams),
    responses(
        (status = 200, description = "One page of transactions", body = TransactionListResponse),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse)
    )
)]
async fn list_transactions() {}

/// Get a transaction by ID
#[utoipa::path(
    get,
    path = "/api/transactions/{id}",
    tag = "transactions",
    params(
        ("id" = String, Path, description = "Transaction ID (UUID)")
    ),
    responses(
        (status = 200, description = "Transaction found", body = TransactionResponse),
        (status = 400, description = "Malformed ID", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse)
    )
)]
async fn get_transaction() {}

/// Analytics summary
#[utoipa::path(
    get,
    path = "/api/analytics/summary",
    tag = "analytics",
    params(AnalyticsQueryParams),
    responses(
        (status = 200, description = "Aggregates over the filtered transactions", body = AnalyticsResponse),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse)
    )
)]
async fn analytics_summary() {}

/// OpenAPI documentation for the merchant portal API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Merchant Portal API",
        version = "1.0.0",
        description = "Webhook ingestion, transaction queries and analytics for a merchant payment portal.\n\n## Idempotency\n\nEach webhook carries a `transaction_id`. Resubmitting a known `transaction_id` returns `409 DUPLICATE_TRANSACTION` and creates nothing.\n\n## Errors\n\nEvery error has the shape `{\"error\": {\"code\", \"message\", \"details\"?, \"requestId\"}}`. The `requestId` matches the `x-request-id` response header.",
        license(name = "MIT"),
    ),
    paths(
        health,
        ingest_webhook,
        list_transactions,
        get_transaction,
        analytics_summary,
    ),
    components(
        schemas(
            WebhookIngestRequest,
            IngestResponse,
            IngestData,
            Transaction,
            TransactionId,
            TransactionStatus,
            MerchantId,
            Source,
            ExternalId,
            Amount,
            CurrencyCode,
            WebhookLogId,
            TransactionListResponse,
            TransactionResponse,
            PaginationInfo,
            AnalyticsResponse,
            AnalyticsSummary,
            AnalyticsMetadata,
            DateRange,
            StatusCounts,
            SourceStats,
            ErrorResponse,
            ErrorBody,
            FieldError,
            HealthResponse,
            DatabaseHealth,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "webhooks", description = "Payment webhook ingestion"),
        (name = "transactions", description = "Transaction queries"),
        (name = "analytics", description = "Aggregated transaction metrics"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/webhooks/ingest",
            "/api/transactions",
            "/api/transactions/{id}",
            "/api/analytics/summary",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
