//! SQLite repository integration tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use chrono::{Duration, Utc};
    use portal_types::{
        AnalyticsFilter, Amount, CurrencyCode, ExternalId, MerchantId, Pagination, RepoError,
        SortField, SortOrder, Source, Transaction, TransactionFilter, TransactionId,
        TransactionRepository, TransactionStatus, WebhookLogDraft,
    };
    use serde_json::json;
    use uuid::Uuid;

    use crate::SqliteRepo;

    async fn setup_repo() -> SqliteRepo {
        SqliteRepo::new("sqlite::memory:").await.unwrap()
    }

    fn merchant() -> MerchantId {
        MerchantId::from_uuid(Uuid::from_u128(1))
    }

    fn tx(source: &str, external_id: &str, amount: f64, status: TransactionStatus) -> Transaction {
        tx_for(source, external_id, amount, status, merchant(), "USD")
    }

    fn tx_for(
        source: &str,
        external_id: &str,
        amount: f64,
        status: TransactionStatus,
        merchant_id: MerchantId,
        currency: &str,
    ) -> Transaction {
        Transaction::ingest(
            Source::parse(source).unwrap(),
            merchant_id,
            Amount::new(amount).unwrap(),
            CurrencyCode::parse(currency).unwrap(),
            status,
            &ExternalId::parse(external_id).unwrap(),
            serde_json::Map::new(),
        )
    }

    fn created_draft(tx: &Transaction) -> WebhookLogDraft {
        WebhookLogDraft::created(
            tx.source.clone(),
            json!({"transaction_id": tx.external_id()}),
            json!({"success": true}),
            Instant::now(),
        )
    }

    async fn ingest(repo: &SqliteRepo, tx: &Transaction) -> Result<(), RepoError> {
        repo.create_transaction_audited(tx, created_draft(tx))
            .await
            .map(|_| ())
    }

    async fn count(repo: &SqliteRepo, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(repo.pool())
            .await
            .unwrap()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ingestion
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_and_get_transaction() {
        let repo = setup_repo().await;
        let mut metadata = serde_json::Map::new();
        metadata.insert("customer_email".into(), json!("test@example.com"));
        metadata.insert("items".into(), json!([{"sku": "a", "qty": 2}]));

        let tx = Transaction::ingest(
            Source::parse("stripe-test").unwrap(),
            merchant(),
            Amount::new(100.5).unwrap(),
            CurrencyCode::parse("USD").unwrap(),
            TransactionStatus::Completed,
            &ExternalId::parse("txn_1").unwrap(),
            metadata,
        );

        let log = repo
            .create_transaction_audited(&tx, created_draft(&tx))
            .await
            .unwrap();
        assert_eq!(log.transaction_id, Some(tx.id));
        assert_eq!(log.http_status, 201);

        let fetched = repo.get_transaction(tx.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, tx.id);
        assert_eq!(fetched.source.as_str(), "stripe-test");
        assert_eq!(fetched.amount.value(), 100.5);
        assert_eq!(fetched.status, TransactionStatus::Completed);
        assert_eq!(fetched.payload, tx.payload);
        assert_eq!(fetched.external_id(), Some("txn_1"));
    }

    #[tokio::test]
    async fn test_get_transaction_not_found() {
        let repo = setup_repo().await;
        let result = repo.get_transaction(TransactionId::new()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_external_id_is_conflict() {
        let repo = setup_repo().await;
        let first = tx("stripe", "txn_dup", 10.0, TransactionStatus::Completed);
        let second = tx("stripe", "txn_dup", 99.0, TransactionStatus::Failed);

        ingest(&repo, &first).await.unwrap();
        let err = ingest(&repo, &second).await.unwrap_err();

        assert!(matches!(err, RepoError::Conflict(_)));
        assert_eq!(count(&repo, "transactions").await, 1);
        // The rolled-back attempt leaves no audit row behind.
        assert_eq!(count(&repo, "webhook_logs").await, 1);
    }

    /// Races `n` writers on one external id. Losers write their rejected
    /// audit row the way the ingestion service does.
    async fn race_duplicates(repo: Arc<SqliteRepo>, n: usize) {
        let mut handles = Vec::new();
        for _ in 0..n {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                let t = tx("paypal", "txn_race", 5.0, TransactionStatus::Pending);
                let result = repo.create_transaction_audited(&t, created_draft(&t)).await;
                if let Err(RepoError::Conflict(_)) = &result {
                    let draft = WebhookLogDraft::rejected(
                        t.source.clone(),
                        409,
                        json!({"transaction_id": "txn_race"}),
                        "Transaction with this ID already exists",
                        Instant::now(),
                    );
                    repo.create_webhook_log(draft).await.unwrap();
                }
                result
            }));
        }

        let mut created = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(RepoError::Conflict(_)) => conflicts += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(conflicts, n - 1);
        assert_eq!(count(&repo, "transactions").await, 1);

        let logs = repo
            .webhook_logs_for_source(&Source::parse("paypal").unwrap())
            .await
            .unwrap();
        assert_eq!(logs.len(), n);
        assert_eq!(logs.iter().filter(|l| l.http_status == 201).count(), 1);
        assert_eq!(logs.iter().filter(|l| l.http_status == 409).count(), n - 1);
        assert_eq!(logs.iter().filter(|l| l.transaction_id.is_some()).count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicates_create_one_row() {
        race_duplicates(Arc::new(setup_repo().await), 8).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicates_file_backed() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("portal.db").display());
        let repo = Arc::new(SqliteRepo::new(&url).await.unwrap());
        race_duplicates(repo, 8).await;
    }

    #[tokio::test]
    async fn test_standalone_log_has_no_transaction() {
        let repo = setup_repo().await;
        let source = Source::parse("adyen").unwrap();

        let log = repo
            .create_webhook_log(WebhookLogDraft::rejected(
                source.clone(),
                409,
                json!({"transaction_id": "txn_1"}),
                "Transaction with this ID already exists",
                Instant::now(),
            ))
            .await
            .unwrap();
        assert!(log.transaction_id.is_none());

        let logs = repo.webhook_logs_for_source(&source).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, log.id);
        assert_eq!(logs[0].http_status, 409);
        assert!(logs[0].response_payload.is_none());
        assert_eq!(logs[0].request_payload, json!({"transaction_id": "txn_1"}));
        assert_eq!(
            logs[0].error_message.as_deref(),
            Some("Transaction with this ID already exists")
        );
    }

    #[tokio::test]
    async fn test_audited_log_round_trips_response() {
        let repo = setup_repo().await;
        let t = tx("square", "txn_sq", 1.0, TransactionStatus::Completed);
        ingest(&repo, &t).await.unwrap();

        let logs = repo.webhook_logs_for_source(&t.source).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].transaction_id, Some(t.id));
        assert_eq!(logs[0].response_payload, Some(json!({"success": true})));
        assert!(logs[0].error_message.is_none());
        assert!(logs[0].processing_time_ms >= 0);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Listing
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_list_filters_and_pagination() {
        let repo = setup_repo().await;
        for i in 0..5 {
            let status = if i % 2 == 0 {
                TransactionStatus::Completed
            } else {
                TransactionStatus::Failed
            };
            ingest(&repo, &tx("stripe", &format!("s_{}", i), i as f64, status))
                .await
                .unwrap();
        }
        ingest(&repo, &tx("paypal", "p_0", 50.0, TransactionStatus::Completed))
            .await
            .unwrap();

        let page = repo
            .list_transactions(&TransactionFilter {
                source: Some(Source::parse("stripe").unwrap()),
                status: Some(TransactionStatus::Completed),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert!(page.items.iter().all(|t| t.source.as_str() == "stripe"
            && t.status == TransactionStatus::Completed));

        let page = repo
            .list_transactions(&TransactionFilter {
                pagination: Pagination { page: 2, limit: 4 },
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 6);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_pages(), 2);
    }

    #[tokio::test]
    async fn test_list_sorts_by_amount() {
        let repo = setup_repo().await;
        for (i, amount) in [30.0, 10.0, 20.0].into_iter().enumerate() {
            ingest(
                &repo,
                &tx("stripe", &format!("a_{}", i), amount, TransactionStatus::Pending),
            )
            .await
            .unwrap();
        }

        let page = repo
            .list_transactions(&TransactionFilter {
                sort_by: SortField::Amount,
                sort_order: SortOrder::Asc,
                ..Default::default()
            })
            .await
            .unwrap();
        let amounts: Vec<f64> = page.items.iter().map(|t| t.amount.value()).collect();
        assert_eq!(amounts, vec![10.0, 20.0, 30.0]);
    }

    #[tokio::test]
    async fn test_list_date_range_is_inclusive() {
        let repo = setup_repo().await;
        let t = tx("stripe", "d_1", 1.0, TransactionStatus::Pending);
        ingest(&repo, &t).await.unwrap();

        let exact = repo
            .list_transactions(&TransactionFilter {
                date_from: Some(t.created_at),
                date_to: Some(t.created_at),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(exact.total, 1);

        let later = repo
            .list_transactions(&TransactionFilter {
                date_from: Some(Utc::now() + Duration::hours(1)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(later.total, 0);
        assert!(later.items.is_empty());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Analytics
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_analytics_summary() {
        let repo = setup_repo().await;
        ingest(&repo, &tx("stripe", "x1", 100.0, TransactionStatus::Completed)).await.unwrap();
        ingest(&repo, &tx("stripe", "x2", 50.0, TransactionStatus::Completed)).await.unwrap();
        ingest(&repo, &tx("stripe", "x3", 70.0, TransactionStatus::Failed)).await.unwrap();
        ingest(&repo, &tx("paypal", "x4", 30.0, TransactionStatus::Completed)).await.unwrap();

        let summary = repo
            .analytics_summary(&AnalyticsFilter::default())
            .await
            .unwrap();

        assert_eq!(summary.total_transactions, 4);
        assert_eq!(summary.total_volume, 180.0);
        assert_eq!(summary.average_transaction_amount, 60.0);
        assert_eq!(summary.count_by_status.completed, 3);
        assert_eq!(summary.count_by_status.failed, 1);
        assert_eq!(summary.count_by_status.refunded, 0);
        assert_eq!(summary.success_rate, 75.0);

        assert_eq!(summary.top_sources.len(), 2);
        assert_eq!(summary.top_sources[0].source, "stripe");
        assert_eq!(summary.top_sources[0].count, 3);
        assert_eq!(summary.top_sources[0].volume, 150.0);
        assert_eq!(summary.top_sources[1].source, "paypal");
    }

    #[tokio::test]
    async fn test_analytics_filters_by_merchant_and_currency() {
        let repo = setup_repo().await;
        let other = MerchantId::from_uuid(Uuid::from_u128(2));
        ingest(&repo, &tx("stripe", "m1", 10.0, TransactionStatus::Completed)).await.unwrap();
        ingest(
            &repo,
            &tx_for("stripe", "m2", 20.0, TransactionStatus::Completed, other, "USD"),
        )
        .await
        .unwrap();
        ingest(
            &repo,
            &tx_for("stripe", "m3", 40.0, TransactionStatus::Completed, other, "EUR"),
        )
        .await
        .unwrap();

        let summary = repo
            .analytics_summary(&AnalyticsFilter {
                merchant_id: Some(other),
                currency: Some(CurrencyCode::parse("EUR").unwrap()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(summary.total_transactions, 1);
        assert_eq!(summary.total_volume, 40.0);
    }

    #[tokio::test]
    async fn test_analytics_top_sources_capped_at_five() {
        let repo = setup_repo().await;
        for i in 0..7 {
            ingest(
                &repo,
                &tx(&format!("src-{}", i), &format!("t_{}", i), 1.0, TransactionStatus::Pending),
            )
            .await
            .unwrap();
        }

        let summary = repo
            .analytics_summary(&AnalyticsFilter::default())
            .await
            .unwrap();
        assert_eq!(summary.top_sources.len(), 5);
        assert_eq!(summary.success_rate, 0.0);
        assert_eq!(summary.total_volume, 0.0);
    }

    #[tokio::test]
    async fn test_analytics_empty_store() {
        let repo = setup_repo().await;
        let summary = repo
            .analytics_summary(&AnalyticsFilter::default())
            .await
            .unwrap();

        assert_eq!(summary.total_transactions, 0);
        assert_eq!(summary.average_transaction_amount, 0.0);
        assert!(summary.top_sources.is_empty());
    }

    #[tokio::test]
    async fn test_ping() {
        let repo = setup_repo().await;
        repo.ping().await.unwrap();
    }
}
