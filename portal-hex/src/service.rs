//! Portal Application Service
//!
//! Orchestrates ingestion and queries through the repository port.
//! Contains NO infrastructure logic - pure business orchestration.

use std::time::Instant;

use chrono::Utc;

use portal_types::{
    AnalyticsFilter, AnalyticsMetadata, AnalyticsResponse, AppError, DatabaseHealth, DateRange,
    IngestResponse, RepoError, Transaction, TransactionFilter, TransactionId,
    TransactionListResponse, TransactionRepository, ValidatedWebhook, WebhookLogDraft,
};

/// Currency reported in analytics metadata when no filter was given.
const DEFAULT_REPORT_CURRENCY: &str = "USD";

/// Result of one ingestion attempt.
///
/// Classified from the typed repository error; each variant has exactly one
/// audit row behind it.
#[derive(Debug)]
pub enum IngestOutcome {
    /// Transaction and audit row committed together.
    Created(IngestResponse),
    /// The external idempotency key was already taken.
    Duplicate,
    /// Anything else; carries the underlying error message.
    Fatal(String),
}

impl IngestOutcome {
    /// HTTP status reported to the caller and stored on the audit row.
    pub fn http_status(&self) -> u16 {
        match self {
            IngestOutcome::Created(_) => 201,
            IngestOutcome::Duplicate => 409,
            IngestOutcome::Fatal(_) => 500,
        }
    }

    pub fn into_result(self) -> Result<IngestResponse, AppError> {
        match self {
            IngestOutcome::Created(response) => Ok(response),
            IngestOutcome::Duplicate => Err(AppError::DuplicateTransaction),
            IngestOutcome::Fatal(message) => Err(AppError::Internal(message)),
        }
    }
}

/// Application service for the merchant portal, generic over the store it
/// ingests into and reports from.
pub struct PortalService<R: TransactionRepository> {
    repo: R,
    started: Instant,
}

impl<R: TransactionRepository> PortalService<R> {
    /// Creates a new portal service with the given repository.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            started: Instant::now(),
        }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Ingestion
    // ─────────────────────────────────────────────────────────────────────────────

    /// Persists a validated webhook and its audit row.
    ///
    /// Never retries. A failure to write the audit row of a rejected attempt
    /// is logged and does not change the outcome.
    #[tracing::instrument(
        skip(self, webhook),
        fields(source = %webhook.source, transaction_id = %webhook.transaction_id)
    )]
    pub async fn ingest_webhook(&self, webhook: ValidatedWebhook) -> IngestOutcome {
        let started = Instant::now();
        let ValidatedWebhook {
            source,
            merchant_id,
            amount,
            currency,
            status,
            transaction_id,
            metadata,
            request_payload,
        } = webhook;

        let tx = Transaction::ingest(
            source.clone(),
            merchant_id,
            amount,
            currency,
            status,
            &transaction_id,
            metadata,
        );
        let response = IngestResponse::created(tx.id);

        let result = match serde_json::to_value(&response) {
            Ok(response_payload) => {
                let draft = WebhookLogDraft::created(
                    source.clone(),
                    request_payload.clone(),
                    response_payload,
                    started,
                );
                self.repo.create_transaction_audited(&tx, draft).await
            }
            Err(e) => Err(RepoError::Database(e.to_string())),
        };

        match result {
            Ok(log) => {
                tracing::info!(id = %tx.id, webhook_log_id = %log.id, "transaction created");
                IngestOutcome::Created(response.with_log_id(log.id))
            }
            Err(RepoError::Conflict(detail)) => {
                tracing::warn!(%detail, "duplicate transaction rejected");
                let message = AppError::DuplicateTransaction.to_string();
                self.audit_rejection(WebhookLogDraft::rejected(
                    source,
                    409,
                    request_payload,
                    message,
                    started,
                ))
                .await;
                IngestOutcome::Duplicate
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!(error = %message, "transaction ingestion failed");
                self.audit_rejection(WebhookLogDraft::rejected(
                    source,
                    500,
                    request_payload,
                    message.clone(),
                    started,
                ))
                .await;
                IngestOutcome::Fatal(message)
            }
        }
    }

    async fn audit_rejection(&self, draft: WebhookLogDraft) {
        let status = draft.http_status();
        if let Err(e) = self.repo.create_webhook_log(draft).await {
            tracing::error!(error = %e, http_status = status, "failed to write webhook log");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────────

    /// Gets a transaction by ID.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, AppError> {
        self.repo
            .get_transaction(id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::NotFound("Transaction not found".into()))
    }

    /// Lists one page of transactions.
    pub async fn list_transactions(
        &self,
        filter: TransactionFilter,
    ) -> Result<TransactionListResponse, AppError> {
        let page = self.repo.list_transactions(&filter).await?;
        Ok(TransactionListResponse::from(page))
    }

    /// Aggregates transactions into an analytics summary.
    pub async fn analytics_summary(
        &self,
        filter: AnalyticsFilter,
    ) -> Result<AnalyticsResponse, AppError> {
        let summary = self.repo.analytics_summary(&filter).await?;

        let date_range = (filter.date_from.is_some() || filter.date_to.is_some()).then(|| {
            DateRange {
                from: filter.date_from,
                to: filter.date_to,
            }
        });

        Ok(AnalyticsResponse {
            success: true,
            data: summary,
            metadata: AnalyticsMetadata {
                currency: filter
                    .currency
                    .as_ref()
                    .map(|c| c.as_str().to_string())
                    .unwrap_or_else(|| DEFAULT_REPORT_CURRENCY.to_string()),
                generated_at: Utc::now(),
                date_range,
            },
        })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Health
    // ─────────────────────────────────────────────────────────────────────────────

    /// Probes the store with a round-trip query.
    pub async fn check_database(&self) -> DatabaseHealth {
        let probe = Instant::now();
        match self.repo.ping().await {
            Ok(()) => DatabaseHealth {
                connected: true,
                latency_ms: Some(u64::try_from(probe.elapsed().as_millis()).unwrap_or(u64::MAX)),
                error: None,
            },
            Err(e) => {
                tracing::error!(error = %e, "database health check failed");
                DatabaseHealth {
                    connected: false,
                    latency_ms: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Seconds since the service was built.
    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}
