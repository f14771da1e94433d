//! HTTP rendering of application errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use portal_types::{AppError, ErrorBody, ErrorResponse, ValidationErrors};

use super::context;

/// Message shown instead of internal error details in production.
const REDACTED_MESSAGE: &str = "An unexpected error occurred";

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    /// A 400 carrying every collected field error.
    pub fn validation(message: &str, errors: ValidationErrors) -> Self {
        ApiError(AppError::Validation {
            message: message.to_string(),
            details: errors.into_inner(),
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ctx = context::current();
        let request_id = ctx
            .as_ref()
            .map(|c| c.request_id.clone())
            .unwrap_or_default();
        let redact = ctx.map(|c| c.redact_internal).unwrap_or(false);

        let status =
            StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = self.0.code().to_string();

        let message = match &self.0 {
            AppError::Internal(detail) => {
                tracing::error!(request_id = %request_id, error = %detail, "internal error");
                if redact {
                    REDACTED_MESSAGE.to_string()
                } else {
                    detail.clone()
                }
            }
            other => other.to_string(),
        };

        let details = match self.0 {
            AppError::Validation { details, .. } if !details.is_empty() => Some(details),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message,
                details,
                request_id,
            },
        };

        (status, Json(body)).into_response()
    }
}
