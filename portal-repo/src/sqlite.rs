//! SQLite repository adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::str::FromStr;

use portal_types::{
    AnalyticsFilter, AnalyticsSummary, Page, RepoError, Source, Transaction, TransactionFilter,
    TransactionId, TransactionRepository, WebhookLog, WebhookLogDraft,
};
use portal_types::query::TOP_SOURCES_LIMIT;

use crate::error::map_sqlx_error;
use crate::types::sqlite::{DbTransaction, DbWebhookLog, timestamp};
use crate::types::{DbSourceStats, DbStatusCount, DbTotals, into_aggregates};

const TRANSACTION_COLUMNS: &str =
    "id, source, merchant_id, amount, currency, status, payload, created_at, updated_at";

const WEBHOOK_LOG_COLUMNS: &str = "id, transaction_id, source, http_status, request_payload, \
     response_payload, error_message, processing_time_ms, created_at";

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if !is_in_memory(database_url) {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Every connection to `:memory:` is its own database; keep exactly one
        // alive for the lifetime of the pool.
        let pool = if is_in_memory(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        let repo = Self { pool };
        repo.create_schema().await?;
        Ok(repo)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (idempotent).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        let ddl = include_str!("../migrations/0001_create_transactions.sql");
        sqlx::query(ddl)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let ddl_logs = include_str!("../migrations/0002_create_webhook_logs.sql");
        sqlx::query(ddl_logs)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Statement helpers
// ─────────────────────────────────────────────────────────────────────────────

async fn insert_transaction(conn: &mut SqliteConnection, tx: &Transaction) -> Result<(), RepoError> {
    let external_id = tx
        .external_id()
        .ok_or_else(|| RepoError::Database("transaction payload has no transaction_id".into()))?;

    sqlx::query(
        r#"INSERT INTO transactions
               (id, source, merchant_id, amount, currency, status, external_id, payload, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(tx.id.to_string())
    .bind(tx.source.as_str())
    .bind(tx.merchant_id.to_string())
    .bind(tx.amount.value())
    .bind(tx.currency.as_str())
    .bind(tx.status.as_str())
    .bind(external_id)
    .bind(tx.payload.to_string())
    .bind(timestamp(&tx.created_at))
    .bind(timestamp(&tx.updated_at))
    .execute(conn)
    .await
    .map_err(map_sqlx_error)?;

    Ok(())
}

async fn insert_webhook_log(conn: &mut SqliteConnection, log: &WebhookLog) -> Result<(), RepoError> {
    sqlx::query(
        r#"INSERT INTO webhook_logs
               (id, transaction_id, source, http_status, request_payload, response_payload, error_message, processing_time_ms, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(log.id.to_string())
    .bind(log.transaction_id.map(|id| id.to_string()))
    .bind(log.source.as_str())
    .bind(i64::from(log.http_status))
    .bind(log.request_payload.to_string())
    .bind(log.response_payload.as_ref().map(|body| body.to_string()))
    .bind(log.error_message.as_deref())
    .bind(log.processing_time_ms)
    .bind(timestamp(&log.created_at))
    .execute(conn)
    .await
    .map_err(map_sqlx_error)?;

    Ok(())
}

fn push_transaction_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &TransactionFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(source) = &filter.source {
        qb.push(" AND source = ").push_bind(source.as_str().to_string());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(merchant_id) = filter.merchant_id {
        qb.push(" AND merchant_id = ").push_bind(merchant_id.to_string());
    }
    if let Some(from) = &filter.date_from {
        qb.push(" AND created_at >= ").push_bind(timestamp(from));
    }
    if let Some(to) = &filter.date_to {
        qb.push(" AND created_at <= ").push_bind(timestamp(to));
    }
}

fn push_analytics_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &AnalyticsFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(merchant_id) = filter.merchant_id {
        qb.push(" AND merchant_id = ").push_bind(merchant_id.to_string());
    }
    if let Some(from) = &filter.date_from {
        qb.push(" AND created_at >= ").push_bind(timestamp(from));
    }
    if let Some(to) = &filter.date_to {
        qb.push(" AND created_at <= ").push_bind(timestamp(to));
    }
    if let Some(currency) = &filter.currency {
        qb.push(" AND currency = ").push_bind(currency.as_str().to_string());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl TransactionRepository for SqliteRepo {
    async fn create_transaction_audited(
        &self,
        tx: &Transaction,
        log: WebhookLogDraft,
    ) -> Result<WebhookLog, RepoError> {
        let mut db_tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        insert_transaction(&mut *db_tx, tx).await?;

        let log = log.finish(Some(tx.id));
        insert_webhook_log(&mut *db_tx, &log).await?;

        db_tx.commit().await.map_err(map_sqlx_error)?;

        tracing::debug!(transaction_id = %tx.id, webhook_log_id = %log.id, "transaction stored");
        Ok(log)
    }

    async fn create_webhook_log(&self, log: WebhookLogDraft) -> Result<WebhookLog, RepoError> {
        let log = log.finish(None);
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        insert_webhook_log(&mut *conn, &log).await?;
        Ok(log)
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, RepoError> {
        let row: Option<DbTransaction> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE id = ?",
            TRANSACTION_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(DbTransaction::into_domain).transpose()
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Page<Transaction>, RepoError> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM transactions");
        push_transaction_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM transactions",
            TRANSACTION_COLUMNS
        ));
        push_transaction_filters(&mut qb, filter);
        qb.push(format!(
            " ORDER BY {} {}, id ASC",
            filter.sort_by.as_column(),
            filter.sort_order.as_sql()
        ));
        qb.push(" LIMIT ")
            .push_bind(i64::from(filter.pagination.limit))
            .push(" OFFSET ")
            .push_bind(filter.pagination.offset());

        let rows = qb
            .build_query_as::<DbTransaction>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let items = rows
            .into_iter()
            .map(DbTransaction::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            page: filter.pagination.page,
            limit: filter.pagination.limit,
            total,
        })
    }

    async fn analytics_summary(
        &self,
        filter: &AnalyticsFilter,
    ) -> Result<AnalyticsSummary, RepoError> {
        let mut totals_qb = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) AS total_transactions, \
             COALESCE(SUM(CASE WHEN status = 'completed' THEN amount ELSE 0.0 END), 0.0) AS total_volume, \
             COALESCE(AVG(CASE WHEN status = 'completed' THEN amount END), 0.0) AS average_completed_amount \
             FROM transactions",
        );
        push_analytics_filters(&mut totals_qb, filter);
        let totals = totals_qb
            .build_query_as::<DbTotals>()
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let mut status_qb =
            QueryBuilder::<Sqlite>::new("SELECT status, COUNT(*) AS count FROM transactions");
        push_analytics_filters(&mut status_qb, filter);
        status_qb.push(" GROUP BY status");
        let counts = status_qb
            .build_query_as::<DbStatusCount>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let mut sources_qb = QueryBuilder::<Sqlite>::new(
            "SELECT source, COUNT(*) AS count, \
             COALESCE(SUM(CASE WHEN status = 'completed' THEN amount ELSE 0.0 END), 0.0) AS volume \
             FROM transactions",
        );
        push_analytics_filters(&mut sources_qb, filter);
        sources_qb
            .push(" GROUP BY source ORDER BY count DESC, source ASC LIMIT ")
            .push_bind(TOP_SOURCES_LIMIT);
        let sources = sources_qb
            .build_query_as::<DbSourceStats>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        into_aggregates(totals, counts, sources).map(AnalyticsSummary::from)
    }

    async fn webhook_logs_for_source(&self, source: &Source) -> Result<Vec<WebhookLog>, RepoError> {
        let rows: Vec<DbWebhookLog> = sqlx::query_as(&format!(
            "SELECT {} FROM webhook_logs WHERE source = ? ORDER BY created_at ASC, rowid ASC",
            WEBHOOK_LOG_COLUMNS
        ))
        .bind(source.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(DbWebhookLog::into_domain).collect()
    }

    async fn ping(&self) -> Result<(), RepoError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
