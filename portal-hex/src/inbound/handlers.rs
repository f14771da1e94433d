//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::Value;

use portal_types::validation::{
    validate_analytics_query, validate_transaction_query, validate_webhook,
};
use portal_types::{
    AnalyticsQueryParams, AppError, HealthResponse, TransactionId, TransactionQueryParams,
    TransactionRepository, TransactionResponse,
};

use super::error::ApiError;
use super::server::ServerConfig;
use crate::PortalService;

const INVALID_PAYLOAD: &str = "Invalid request payload";
const INVALID_QUERY: &str = "Invalid query parameters";

/// Application state shared across handlers.
pub struct AppState<R: TransactionRepository> {
    pub service: PortalService<R>,
    pub config: ServerConfig,
}

// ─────────────────────────────────────────────────────────────────────────────
// Webhooks
// ─────────────────────────────────────────────────────────────────────────────

/// Ingest a payment webhook.
#[tracing::instrument(skip(state, payload))]
pub async fn ingest_webhook<R: TransactionRepository>(
    State(state): State<Arc<AppState<R>>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload
        .map_err(|rejection| AppError::invalid_field(INVALID_PAYLOAD, "body", rejection.body_text()))?;

    let webhook =
        validate_webhook(&body).map_err(|errors| ApiError::validation(INVALID_PAYLOAD, errors))?;

    let response = state.service.ingest_webhook(webhook).await.into_result()?;
    Ok((StatusCode::CREATED, Json(response)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Transactions
// ─────────────────────────────────────────────────────────────────────────────

/// List transactions with filters, sorting and pagination.
#[tracing::instrument(skip(state, params))]
pub async fn list_transactions<R: TransactionRepository>(
    State(state): State<Arc<AppState<R>>>,
    params: Result<Query<TransactionQueryParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params
        .map_err(|rejection| AppError::invalid_field(INVALID_QUERY, "query", rejection.body_text()))?;

    let filter = validate_transaction_query(&params)
        .map_err(|errors| ApiError::validation(INVALID_QUERY, errors))?;

    let page = state.service.list_transactions(filter).await?;
    Ok(Json(page))
}

/// Get a transaction by ID.
#[tracing::instrument(skip(state), fields(transaction_id = %id))]
pub async fn get_transaction<R: TransactionRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction_id: TransactionId = id.parse().map_err(|_| {
        AppError::invalid_field("Invalid transaction ID", "id", "id must be a valid UUID")
    })?;

    let transaction = state.service.get_transaction(transaction_id).await?;
    Ok(Json(TransactionResponse {
        success: true,
        data: transaction,
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Analytics
// ─────────────────────────────────────────────────────────────────────────────

/// Aggregate transaction analytics.
#[tracing::instrument(skip(state, params))]
pub async fn analytics_summary<R: TransactionRepository>(
    State(state): State<Arc<AppState<R>>>,
    params: Result<Query<AnalyticsQueryParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params
        .map_err(|rejection| AppError::invalid_field(INVALID_QUERY, "query", rejection.body_text()))?;

    let filter = validate_analytics_query(&params)
        .map_err(|errors| ApiError::validation(INVALID_QUERY, errors))?;

    let summary = state.service.analytics_summary(filter).await?;
    Ok(Json(summary))
}

// ─────────────────────────────────────────────────────────────────────────────
// Health & fallback
// ─────────────────────────────────────────────────────────────────────────────

/// Health check endpoint with a database probe.
pub async fn health<R: TransactionRepository>(
    State(state): State<Arc<AppState<R>>>,
) -> impl IntoResponse {
    let database = state.service.check_database().await;
    let healthy = database.connected;

    let body = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        timestamp: Utc::now(),
        uptime_seconds: state.service.uptime_seconds(),
        environment: state.config.environment.as_str().to_string(),
        database,
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

/// Any route that does not exist.
pub async fn not_found() -> ApiError {
    ApiError(AppError::NotFound("Endpoint not found".into()))
}
