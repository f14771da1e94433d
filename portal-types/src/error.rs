//! Error types for the merchant portal.

use crate::validation::FieldError;

/// Domain-level errors (value object rule violations).
///
/// The messages double as the field messages of the validation gate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("Amount must be non-negative")]
    NegativeAmount,

    #[error("Amount must be a finite number")]
    NonFiniteAmount,

    #[error("Currency must be a 3-letter ISO 4217 code")]
    CurrencyLength,

    #[error("Currency must be uppercase")]
    CurrencyCase,

    #[error("Source must be between 1 and 100 characters")]
    SourceLength,

    #[error("Source must be lowercase alphanumeric with hyphens/underscores")]
    SourcePattern,

    #[error("transaction_id must be between 1 and 255 characters")]
    ExternalIdLength,

    #[error(
        "Status must be one of: pending, processing, completed, failed, refunded, cancelled"
    )]
    InvalidStatus(String),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The store could not be reached (pool timeout, closed pool, IO).
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Entity not found")]
    NotFound,
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes and stable error codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<FieldError>,
    },

    #[error("Transaction with this ID already exists")]
    DuplicateTransaction,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::DuplicateTransaction => "DUPLICATE_TRANSACTION",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            AppError::Validation { .. } => 400,
            AppError::DuplicateTransaction => 409,
            AppError::NotFound(_) => 404,
            AppError::Internal(_) => 500,
        }
    }

    /// A validation failure for a single field.
    pub fn invalid_field(
        message: impl Into<String>,
        field: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        AppError::Validation {
            message: message.into(),
            details: vec![FieldError::new(field, detail)],
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Conflict(_) => AppError::DuplicateTransaction,
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Domain(e) => AppError::Internal(format!("Corrupt stored record: {}", e)),
            RepoError::Unavailable(e) => AppError::Internal(e),
            RepoError::Database(e) => AppError::Internal(e),
        }
    }
}
