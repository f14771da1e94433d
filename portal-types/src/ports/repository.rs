//! Repository port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite, in-memory mocks) implement this trait.

use crate::domain::{Source, Transaction, TransactionId, WebhookLog, WebhookLogDraft};
use crate::error::RepoError;
use crate::query::{AnalyticsFilter, AnalyticsSummary, Page, TransactionFilter};

/// The persistence port for transactions and their audit trail.
///
/// A unique violation on the external idempotency key MUST surface as
/// [`RepoError::Conflict`]; a store that cannot be reached as
/// [`RepoError::Unavailable`].
#[async_trait::async_trait]
pub trait TransactionRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Ingestion (MUST be atomic)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Inserts a transaction and its audit row in one database transaction.
    ///
    /// The draft is finished with the new transaction id only after the
    /// transaction insert succeeded. On any error nothing is committed.
    async fn create_transaction_audited(
        &self,
        tx: &Transaction,
        log: WebhookLogDraft,
    ) -> Result<WebhookLog, RepoError>;

    /// Writes a standalone audit row for an attempt that created nothing.
    async fn create_webhook_log(&self, log: WebhookLogDraft) -> Result<WebhookLog, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────────

    /// Gets a transaction by ID.
    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, RepoError>;

    /// Lists transactions matching the filter, one page at a time.
    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Page<Transaction>, RepoError>;

    /// Aggregates transactions matching the filter.
    async fn analytics_summary(
        &self,
        filter: &AnalyticsFilter,
    ) -> Result<AnalyticsSummary, RepoError>;

    /// Audit rows for a source, oldest first.
    async fn webhook_logs_for_source(&self, source: &Source) -> Result<Vec<WebhookLog>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Health
    // ─────────────────────────────────────────────────────────────────────────────

    /// Round-trips a trivial query to the store.
    async fn ping(&self) -> Result<(), RepoError>;
}
