//! Database row types for SQLite and PostgreSQL.
//!
//! SQLite has no native UUID, JSON or timestamp types, so its rows carry
//! text and are parsed on the way out. Timestamps are written as fixed-width
//! RFC 3339 UTC strings so that text comparison orders them correctly.

use sqlx::FromRow;

use portal_types::{
    AnalyticsAggregates, Amount, CurrencyCode, MerchantId, RepoError, Source, SourceStats,
    StatusCounts, Transaction, TransactionId, TransactionStatus, WebhookLog, WebhookLogId,
};

use crate::error::corrupt;

fn http_status(value: i64) -> Result<u16, RepoError> {
    u16::try_from(value).map_err(|e| corrupt("http_status", e))
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate rows (shared)
// ─────────────────────────────────────────────────────────────────────────────

/// Totals over the filtered transaction set.
#[derive(FromRow)]
pub struct DbTotals {
    pub total_transactions: i64,
    pub total_volume: f64,
    pub average_completed_amount: f64,
}

#[derive(FromRow)]
pub struct DbStatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(FromRow)]
pub struct DbSourceStats {
    pub source: String,
    pub count: i64,
    pub volume: f64,
}

impl From<DbSourceStats> for SourceStats {
    fn from(row: DbSourceStats) -> Self {
        SourceStats {
            source: row.source,
            count: row.count,
            volume: row.volume,
        }
    }
}

/// Folds the three analytics queries into one aggregate.
pub fn into_aggregates(
    totals: DbTotals,
    counts: Vec<DbStatusCount>,
    sources: Vec<DbSourceStats>,
) -> Result<AnalyticsAggregates, RepoError> {
    let mut count_by_status = StatusCounts::default();
    for row in counts {
        count_by_status.set(row.status.parse::<TransactionStatus>()?, row.count);
    }

    Ok(AnalyticsAggregates {
        total_volume: totals.total_volume,
        total_transactions: totals.total_transactions,
        average_completed_amount: totals.average_completed_amount,
        count_by_status,
        top_sources: sources.into_iter().map(SourceStats::from).collect(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite rows
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "sqlite")]
pub mod sqlite {
    use super::*;
    use chrono::{DateTime, SecondsFormat, Utc};
    use uuid::Uuid;

    /// Formats a timestamp the way SQLite rows store it.
    pub fn timestamp(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepoError> {
        DateTime::parse_from_rfc3339(value)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| corrupt(column, e))
    }

    fn parse_uuid(column: &str, value: &str) -> Result<Uuid, RepoError> {
        Uuid::parse_str(value).map_err(|e| corrupt(column, e))
    }

    fn parse_json(column: &str, value: &str) -> Result<serde_json::Value, RepoError> {
        serde_json::from_str(value).map_err(|e| corrupt(column, e))
    }

    /// Transaction row from SQLite.
    #[derive(FromRow)]
    pub struct DbTransaction {
        pub id: String,
        pub source: String,
        pub merchant_id: String,
        pub amount: f64,
        pub currency: String,
        pub status: String,
        pub payload: String,
        pub created_at: String,
        pub updated_at: String,
    }

    impl DbTransaction {
        pub fn into_domain(self) -> Result<Transaction, RepoError> {
            Ok(Transaction::from_parts(
                TransactionId::from_uuid(parse_uuid("id", &self.id)?),
                Source::parse(&self.source)?,
                MerchantId::from_uuid(parse_uuid("merchant_id", &self.merchant_id)?),
                Amount::new(self.amount)?,
                CurrencyCode::parse(&self.currency)?,
                self.status.parse::<TransactionStatus>()?,
                parse_json("payload", &self.payload)?,
                parse_timestamp("created_at", &self.created_at)?,
                parse_timestamp("updated_at", &self.updated_at)?,
            ))
        }
    }

    /// Webhook log row from SQLite.
    #[derive(FromRow)]
    pub struct DbWebhookLog {
        pub id: String,
        pub transaction_id: Option<String>,
        pub source: String,
        pub http_status: i64,
        pub request_payload: String,
        pub response_payload: Option<String>,
        pub error_message: Option<String>,
        pub processing_time_ms: i64,
        pub created_at: String,
    }

    impl DbWebhookLog {
        pub fn into_domain(self) -> Result<WebhookLog, RepoError> {
            let transaction_id = self
                .transaction_id
                .as_deref()
                .map(|id| parse_uuid("transaction_id", id).map(TransactionId::from_uuid))
                .transpose()?;
            let response_payload = self
                .response_payload
                .as_deref()
                .map(|body| parse_json("response_payload", body))
                .transpose()?;

            Ok(WebhookLog::from_parts(
                WebhookLogId::from_uuid(parse_uuid("id", &self.id)?),
                transaction_id,
                Source::parse(&self.source)?,
                http_status(self.http_status)?,
                parse_json("request_payload", &self.request_payload)?,
                response_payload,
                self.error_message,
                self.processing_time_ms,
                parse_timestamp("created_at", &self.created_at)?,
            ))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL rows
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "postgres")]
pub mod postgres {
    use super::*;
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    /// Transaction row from PostgreSQL.
    #[derive(FromRow)]
    pub struct DbTransaction {
        pub id: Uuid,
        pub source: String,
        pub merchant_id: Uuid,
        pub amount: f64,
        pub currency: String,
        pub status: String,
        pub payload: serde_json::Value,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl DbTransaction {
        pub fn into_domain(self) -> Result<Transaction, RepoError> {
            Ok(Transaction::from_parts(
                TransactionId::from_uuid(self.id),
                Source::parse(&self.source)?,
                MerchantId::from_uuid(self.merchant_id),
                Amount::new(self.amount)?,
                CurrencyCode::parse(&self.currency)?,
                self.status.parse::<TransactionStatus>()?,
                self.payload,
                self.created_at,
                self.updated_at,
            ))
        }
    }

    /// Webhook log row from PostgreSQL.
    #[derive(FromRow)]
    pub struct DbWebhookLog {
        pub id: Uuid,
        pub transaction_id: Option<Uuid>,
        pub source: String,
        pub http_status: i32,
        pub request_payload: serde_json::Value,
        pub response_payload: Option<serde_json::Value>,
        pub error_message: Option<String>,
        pub processing_time_ms: i64,
        pub created_at: DateTime<Utc>,
    }

    impl DbWebhookLog {
        pub fn into_domain(self) -> Result<WebhookLog, RepoError> {
            Ok(WebhookLog::from_parts(
                WebhookLogId::from_uuid(self.id),
                self.transaction_id.map(TransactionId::from_uuid),
                Source::parse(&self.source)?,
                http_status(i64::from(self.http_status))?,
                self.request_payload,
                self.response_payload,
                self.error_message,
                self.processing_time_ms,
                self.created_at,
            ))
        }
    }
}
