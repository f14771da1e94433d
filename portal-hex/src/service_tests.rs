//! PortalService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use portal_types::validation::validate_webhook;
    use portal_types::{
        AnalyticsAggregates, AnalyticsFilter, AnalyticsSummary, AppError, CurrencyCode, Page,
        RepoError, Source, StatusCounts, Transaction, TransactionFilter, TransactionId,
        TransactionRepository, TransactionStatus, WebhookLog, WebhookLogDraft,
    };

    use crate::{IngestOutcome, PortalService};

    /// Simple in-memory repository for testing the service layer.
    ///
    /// Enforces external id uniqueness like the real stores and can be told
    /// to fail the transaction write or the audit write.
    #[derive(Default)]
    pub struct MockRepo {
        transactions: Mutex<HashMap<String, Transaction>>,
        logs: Mutex<Vec<WebhookLog>>,
        fail_transaction_write: AtomicBool,
        fail_log_write: AtomicBool,
        unreachable: AtomicBool,
    }

    impl MockRepo {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn logs(&self) -> Vec<WebhookLog> {
            self.logs.lock().unwrap().clone()
        }

        pub fn transaction_count(&self) -> usize {
            self.transactions.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TransactionRepository for MockRepo {
        async fn create_transaction_audited(
            &self,
            tx: &Transaction,
            log: WebhookLogDraft,
        ) -> Result<WebhookLog, RepoError> {
            if self.fail_transaction_write.load(Ordering::SeqCst) {
                return Err(RepoError::Unavailable("pool timed out".into()));
            }
            let key = tx.external_id().unwrap_or_default().to_string();
            let mut transactions = self.transactions.lock().unwrap();
            if transactions.contains_key(&key) {
                return Err(RepoError::Conflict("transactions.external_id".into()));
            }
            transactions.insert(key, tx.clone());

            let log = log.finish(Some(tx.id));
            self.logs.lock().unwrap().push(log.clone());
            Ok(log)
        }

        async fn create_webhook_log(&self, log: WebhookLogDraft) -> Result<WebhookLog, RepoError> {
            if self.fail_log_write.load(Ordering::SeqCst) {
                return Err(RepoError::Database("disk full".into()));
            }
            let log = log.finish(None);
            self.logs.lock().unwrap().push(log.clone());
            Ok(log)
        }

        async fn get_transaction(
            &self,
            id: TransactionId,
        ) -> Result<Option<Transaction>, RepoError> {
            Ok(self
                .transactions
                .lock()
                .unwrap()
                .values()
                .find(|t| t.id == id)
                .cloned())
        }

        async fn list_transactions(
            &self,
            filter: &TransactionFilter,
        ) -> Result<Page<Transaction>, RepoError> {
            let items: Vec<Transaction> = self
                .transactions
                .lock()
                .unwrap()
                .values()
                .filter(|t| filter.status.is_none_or(|s| t.status == s))
                .cloned()
                .collect();
            Ok(Page {
                total: items.len() as i64,
                items,
                page: filter.pagination.page,
                limit: filter.pagination.limit,
            })
        }

        async fn analytics_summary(
            &self,
            _filter: &AnalyticsFilter,
        ) -> Result<AnalyticsSummary, RepoError> {
            let transactions = self.transactions.lock().unwrap();
            let mut counts = StatusCounts::default();
            for status in TransactionStatus::ALL {
                let n = transactions.values().filter(|t| t.status == status).count();
                counts.set(status, n as i64);
            }
            let completed: Vec<f64> = transactions
                .values()
                .filter(|t| t.status == TransactionStatus::Completed)
                .map(|t| t.amount.value())
                .collect();
            let total_volume: f64 = completed.iter().sum();
            Ok(AnalyticsSummary::from(AnalyticsAggregates {
                total_volume,
                total_transactions: transactions.len() as i64,
                average_completed_amount: if completed.is_empty() {
                    0.0
                } else {
                    total_volume / completed.len() as f64
                },
                count_by_status: counts,
                top_sources: vec![],
            }))
        }

        async fn webhook_logs_for_source(
            &self,
            source: &Source,
        ) -> Result<Vec<WebhookLog>, RepoError> {
            Ok(self
                .logs
                .lock()
                .unwrap()
                .iter()
                .filter(|l| &l.source == source)
                .cloned()
                .collect())
        }

        async fn ping(&self) -> Result<(), RepoError> {
            if self.unreachable.load(Ordering::SeqCst) {
                return Err(RepoError::Unavailable("connection refused".into()));
            }
            Ok(())
        }
    }

    fn webhook(transaction_id: &str, amount: f64) -> portal_types::ValidatedWebhook {
        validate_webhook(&json!({
            "source": "stripe-test",
            "merchant_id": "00000000-0000-0000-0000-000000000001",
            "amount": amount,
            "currency": "USD",
            "status": "completed",
            "transaction_id": transaction_id,
            "metadata": {"customer_email": "test@example.com"}
        }))
        .unwrap()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ingestion
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_ingest_created() {
        let service = PortalService::new(MockRepo::new());

        let outcome = service.ingest_webhook(webhook("txn_1", 100.5)).await;
        assert_eq!(outcome.http_status(), 201);

        let response = outcome.into_result().unwrap();
        assert!(response.success);
        assert_eq!(response.message, "Transaction created successfully");

        let logs = service.repo().logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(response.data.webhook_log_id, Some(logs[0].id));
        assert_eq!(logs[0].transaction_id, Some(response.data.transaction_id));
        assert_eq!(logs[0].http_status, 201);
        assert!(logs[0].error_message.is_none());

        // The stored response body predates the log id.
        let stored = logs[0].response_payload.clone().unwrap();
        assert_eq!(stored["data"]["webhook_log_id"], serde_json::Value::Null);
        assert_eq!(
            stored["data"]["transaction_id"],
            response.data.transaction_id.to_string()
        );
    }

    #[tokio::test]
    async fn test_ingest_stores_metadata_and_key() {
        let service = PortalService::new(MockRepo::new());
        let response = service
            .ingest_webhook(webhook("txn_meta", 1.0))
            .await
            .into_result()
            .unwrap();

        let tx = service
            .get_transaction(response.data.transaction_id)
            .await
            .unwrap();
        assert_eq!(
            tx.payload,
            json!({"customer_email": "test@example.com", "transaction_id": "txn_meta"})
        );
    }

    #[tokio::test]
    async fn test_ingest_duplicate_is_audited() {
        let service = PortalService::new(MockRepo::new());

        service.ingest_webhook(webhook("txn_1", 10.0)).await;
        let outcome = service.ingest_webhook(webhook("txn_1", 20.0)).await;

        assert!(matches!(outcome, IngestOutcome::Duplicate));
        assert_eq!(outcome.http_status(), 409);
        assert!(matches!(
            outcome.into_result(),
            Err(AppError::DuplicateTransaction)
        ));

        let logs = service.repo().logs();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[1].http_status, 409);
        assert!(logs[1].transaction_id.is_none());
        assert!(logs[1].response_payload.is_none());
        assert_eq!(
            logs[1].error_message.as_deref(),
            Some("Transaction with this ID already exists")
        );
        assert_eq!(service.repo().transaction_count(), 1);
    }

    #[tokio::test]
    async fn test_ingest_store_failure_is_fatal_and_audited() {
        let repo = MockRepo::new();
        repo.fail_transaction_write.store(true, Ordering::SeqCst);
        let service = PortalService::new(repo);

        let outcome = service.ingest_webhook(webhook("txn_1", 10.0)).await;
        assert_eq!(outcome.http_status(), 500);
        let err = outcome.into_result().unwrap_err();
        assert_eq!(err.code(), "INTERNAL_ERROR");

        let logs = service.repo().logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].http_status, 500);
        assert!(logs[0].transaction_id.is_none());
        assert!(
            logs[0]
                .error_message
                .as_deref()
                .unwrap()
                .contains("pool timed out")
        );
        assert_eq!(service.repo().transaction_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_audit_write_keeps_outcome() {
        let repo = MockRepo::new();
        repo.fail_log_write.store(true, Ordering::SeqCst);
        let service = PortalService::new(repo);

        service.ingest_webhook(webhook("txn_1", 10.0)).await;
        let outcome = service.ingest_webhook(webhook("txn_1", 10.0)).await;

        assert!(matches!(outcome, IngestOutcome::Duplicate));
        assert_eq!(service.repo().logs().len(), 1);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_get_transaction_not_found() {
        let service = PortalService::new(MockRepo::new());
        let err = service
            .get_transaction(TransactionId::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(ref m) if m == "Transaction not found"));
    }

    #[tokio::test]
    async fn test_list_transactions_envelope() {
        let service = PortalService::new(MockRepo::new());
        service.ingest_webhook(webhook("a", 1.0)).await;
        service.ingest_webhook(webhook("b", 2.0)).await;

        let response = service
            .list_transactions(TransactionFilter::default())
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.data.len(), 2);
        assert_eq!(response.pagination.total, 2);
        assert_eq!(response.pagination.total_pages, 1);
        assert_eq!(response.pagination.limit, 50);
    }

    #[tokio::test]
    async fn test_analytics_metadata_defaults_to_usd() {
        let service = PortalService::new(MockRepo::new());
        service.ingest_webhook(webhook("a", 30.0)).await;

        let response = service
            .analytics_summary(AnalyticsFilter::default())
            .await
            .unwrap();
        assert_eq!(response.metadata.currency, "USD");
        assert!(response.metadata.date_range.is_none());
        assert_eq!(response.data.total_volume, 30.0);
        assert_eq!(response.data.success_rate, 100.0);

        let response = service
            .analytics_summary(AnalyticsFilter {
                currency: Some(CurrencyCode::parse("EUR").unwrap()),
                date_from: Some(chrono::Utc::now()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(response.metadata.currency, "EUR");
        let range = response.metadata.date_range.unwrap();
        assert!(range.from.is_some());
        assert!(range.to.is_none());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Health
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_check_database() {
        let service = PortalService::new(MockRepo::new());
        let health = service.check_database().await;
        assert!(health.connected);
        assert!(health.latency_ms.is_some());

        service.repo().unreachable.store(true, Ordering::SeqCst);
        let health = service.check_database().await;
        assert!(!health.connected);
        assert!(health.error.unwrap().contains("connection refused"));
    }
}
