//! # Portal Types
//!
//! Domain types, the validation gate and port traits for the merchant
//! portal backend. This crate has ZERO IO dependencies - only data
//! structures, business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Transactions, the webhook audit trail and value objects
//! - `validation` - Pure checks run on inbound payloads and query strings
//! - `query` - Filters, pagination and analytics aggregates
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto` - Data Transfer Objects for API boundaries
//! - `error` - Domain, repository and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;
pub mod query;
pub mod validation;

// Re-export commonly used types
pub use domain::{
    Amount, CurrencyCode, ExternalId, MerchantId, Source, Transaction, TransactionId,
    TransactionStatus, WebhookLog, WebhookLogDraft, WebhookLogId,
};
pub use dto::*;
pub use error::{AppError, DomainError, RepoError};
pub use ports::TransactionRepository;
pub use query::{
    AnalyticsAggregates, AnalyticsFilter, AnalyticsSummary, Page, Pagination, SortField,
    SortOrder, SourceStats, StatusCounts, TransactionFilter,
};
pub use validation::{FieldError, ValidatedWebhook, ValidationErrors};
