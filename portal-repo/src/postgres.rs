//! PostgreSQL repository adapter.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use portal_types::query::TOP_SOURCES_LIMIT;
use portal_types::{
    AnalyticsFilter, AnalyticsSummary, Page, RepoError, Source, Transaction, TransactionFilter,
    TransactionId, TransactionRepository, WebhookLog, WebhookLogDraft,
};

use crate::error::map_sqlx_error;
use crate::types::postgres::{DbTransaction, DbWebhookLog};
use crate::types::{DbSourceStats, DbStatusCount, DbTotals, into_aggregates};

const TRANSACTION_COLUMNS: &str =
    "id, source, merchant_id, amount, currency, status, payload, created_at, updated_at";

const WEBHOOK_LOG_COLUMNS: &str = "id, transaction_id, source, http_status, request_payload, \
     response_payload, error_message, processing_time_ms, created_at";

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL repository. Idempotency rests on the `external_id` unique index.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_transactions_pg.sql"),
        "0001",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0002_create_webhook_logs_pg.sql"),
        "0002",
    )
    .await?;

    Ok(())
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        run_migrations(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Statement helpers
// ─────────────────────────────────────────────────────────────────────────────

async fn insert_transaction(conn: &mut PgConnection, tx: &Transaction) -> Result<(), RepoError> {
    let external_id = tx
        .external_id()
        .ok_or_else(|| RepoError::Database("transaction payload has no transaction_id".into()))?;

    sqlx::query(
        r#"INSERT INTO transactions
               (id, source, merchant_id, amount, currency, status, external_id, payload, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
    )
    .bind(tx.id.into_uuid())
    .bind(tx.source.as_str())
    .bind(tx.merchant_id.into_uuid())
    .bind(tx.amount.value())
    .bind(tx.currency.as_str())
    .bind(tx.status.as_str())
    .bind(external_id)
    .bind(&tx.payload)
    .bind(tx.created_at)
    .bind(tx.updated_at)
    .execute(conn)
    .await
    .map_err(map_sqlx_error)?;

    Ok(())
}

async fn insert_webhook_log(conn: &mut PgConnection, log: &WebhookLog) -> Result<(), RepoError> {
    sqlx::query(
        r#"INSERT INTO webhook_logs
               (id, transaction_id, source, http_status, request_payload, response_payload, error_message, processing_time_ms, created_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
    )
    .bind(log.id.into_uuid())
    .bind(log.transaction_id.map(TransactionId::into_uuid))
    .bind(log.source.as_str())
    .bind(i32::from(log.http_status))
    .bind(&log.request_payload)
    .bind(log.response_payload.as_ref())
    .bind(log.error_message.as_deref())
    .bind(log.processing_time_ms)
    .bind(log.created_at)
    .execute(conn)
    .await
    .map_err(map_sqlx_error)?;

    Ok(())
}

fn push_transaction_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &TransactionFilter) {
    qb.push(" WHERE TRUE");
    if let Some(source) = &filter.source {
        qb.push(" AND source = ").push_bind(source.as_str().to_string());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(merchant_id) = filter.merchant_id {
        qb.push(" AND merchant_id = ").push_bind(merchant_id.into_uuid());
    }
    if let Some(from) = filter.date_from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        qb.push(" AND created_at <= ").push_bind(to);
    }
}

fn push_analytics_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &AnalyticsFilter) {
    qb.push(" WHERE TRUE");
    if let Some(merchant_id) = filter.merchant_id {
        qb.push(" AND merchant_id = ").push_bind(merchant_id.into_uuid());
    }
    if let Some(from) = filter.date_from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        qb.push(" AND created_at <= ").push_bind(to);
    }
    if let Some(currency) = &filter.currency {
        qb.push(" AND currency = ").push_bind(currency.as_str().to_string());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl TransactionRepository for PostgresRepo {
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
            "SELECT {} FROM transactions WHERE id = $1",
            TRANSACTION_COLUMNS
        ))
        .bind(id.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(DbTransaction::into_domain).transpose()
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Page<Transaction>, RepoError> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM transactions");
        push_transaction_filters(&mut count_qb, filter);
        let total = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
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
        let mut totals_qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) AS total_transactions, \
             COALESCE(SUM(amount) FILTER (WHERE status = 'completed'), 0)::DOUBLE PRECISION AS total_volume, \
             COALESCE(AVG(amount) FILTER (WHERE status = 'completed'), 0)::DOUBLE PRECISION AS average_completed_amount \
             FROM transactions",
        );
        push_analytics_filters(&mut totals_qb, filter);
        let totals = totals_qb
            .build_query_as::<DbTotals>()
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let mut status_qb =
            QueryBuilder::<Postgres>::new("SELECT status, COUNT(*) AS count FROM transactions");
        push_analytics_filters(&mut status_qb, filter);
        status_qb.push(" GROUP BY status");
        let counts = status_qb
            .build_query_as::<DbStatusCount>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let mut sources_qb = QueryBuilder::<Postgres>::new(
            "SELECT source, COUNT(*) AS count, \
             COALESCE(SUM(amount) FILTER (WHERE status = 'completed'), 0)::DOUBLE PRECISION AS volume \
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
            "SELECT {} FROM webhook_logs WHERE source = $1 ORDER BY created_at ASC",
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
