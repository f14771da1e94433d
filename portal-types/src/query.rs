//! Read-side inputs and outputs: transaction filters, pagination and
//! analytics aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{CurrencyCode, MerchantId, Source, TransactionStatus};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 50;
pub const MAX_LIMIT: u32 = 1000;

/// Number of sources reported in an analytics summary.
pub const TOP_SOURCES_LIMIT: i64 = 5;

/// Columns a transaction listing may be sorted by.
///
/// Only these map to SQL; caller text never reaches an `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    Amount,
    Status,
}

impl SortField {
    pub fn as_column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Amount => "amount",
            SortField::Status => "status",
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" => Ok(SortField::CreatedAt),
            "amount" => Ok(SortField::Amount),
            "status" => Ok(SortField::Status),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(()),
        }
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Rows to skip before this page.
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }
}

/// Filters for listing transactions. All present filters are AND-ed.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub source: Option<Source>,
    pub status: Option<TransactionStatus>,
    pub merchant_id: Option<MerchantId>,
    /// Inclusive lower bound on `created_at`
    pub date_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`
    pub date_to: Option<DateTime<Utc>>,
    pub pagination: Pagination,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

/// One page of results plus the total row count for the filter.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> i64 {
        let limit = i64::from(self.limit.max(1));
        (self.total + limit - 1) / limit
    }
}

/// Filters for the analytics summary.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsFilter {
    pub merchant_id: Option<MerchantId>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub currency: Option<CurrencyCode>,
}

/// Transaction counts keyed by status. Every status is always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusCounts {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
    pub refunded: i64,
    pub cancelled: i64,
}

impl StatusCounts {
    pub fn set(&mut self, status: TransactionStatus, count: i64) {
        match status {
            TransactionStatus::Pending => self.pending = count,
            TransactionStatus::Processing => self.processing = count,
            TransactionStatus::Completed => self.completed = count,
            TransactionStatus::Failed => self.failed = count,
            TransactionStatus::Refunded => self.refunded = count,
            TransactionStatus::Cancelled => self.cancelled = count,
        }
    }
}

/// Volume and count for one payment source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SourceStats {
    pub source: String,
    pub count: i64,
    /// Sum of completed amounts
    pub volume: f64,
}

/// Raw aggregates as computed by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsAggregates {
    /// Sum of completed amounts
    pub total_volume: f64,
    pub total_transactions: i64,
    /// Average of completed amounts, 0 when none
    pub average_completed_amount: f64,
    pub count_by_status: StatusCounts,
    pub top_sources: Vec<SourceStats>,
}

/// Analytics summary returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_volume: f64,
    pub total_transactions: i64,
    pub count_by_status: StatusCounts,
    pub top_sources: Vec<SourceStats>,
    pub average_transaction_amount: f64,
    /// Percentage of completed transactions, two decimals
    pub success_rate: f64,
}

impl From<AnalyticsAggregates> for AnalyticsSummary {
    fn from(agg: AnalyticsAggregates) -> Self {
        let success_rate = if agg.total_transactions > 0 {
            let ratio = agg.count_by_status.completed as f64 / agg.total_transactions as f64;
            (ratio * 100.0 * 100.0).round() / 100.0
        } else {
            0.0
        };

        Self {
            total_volume: agg.total_volume,
            total_transactions: agg.total_transactions,
            count_by_status: agg.count_by_status,
            top_sources: agg.top_sources,
            average_transaction_amount: agg.average_completed_amount,
            success_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_offset() {
        let p = Pagination { page: 3, limit: 50 };
        assert_eq!(p.offset(), 100);
        assert_eq!(Pagination::default().offset(), 0);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page: Page<()> = Page {
            items: vec![],
            page: 1,
            limit: 50,
            total: 101,
        };
        assert_eq!(page.total_pages(), 3);

        let empty: Page<()> = Page {
            items: vec![],
            page: 1,
            limit: 50,
            total: 0,
        };
        assert_eq!(empty.total_pages(), 0);
    }

    #[test]
    fn test_success_rate_is_rounded_percentage() {
        let mut counts = StatusCounts::default();
        counts.set(TransactionStatus::Completed, 2);
        counts.set(TransactionStatus::Failed, 1);

        let summary = AnalyticsSummary::from(AnalyticsAggregates {
            total_volume: 30.0,
            total_transactions: 3,
            average_completed_amount: 15.0,
            count_by_status: counts,
            top_sources: vec![],
        });

        assert_eq!(summary.success_rate, 66.67);
        assert_eq!(summary.count_by_status.completed, 2);
    }

    #[test]
    fn test_success_rate_zero_when_empty() {
        let summary = AnalyticsSummary::from(AnalyticsAggregates::default());
        assert_eq!(summary.success_rate, 0.0);
        assert_eq!(summary.total_transactions, 0);
    }

    #[test]
    fn test_sort_whitelist() {
        assert_eq!("amount".parse::<SortField>(), Ok(SortField::Amount));
        assert!("id; DROP TABLE transactions".parse::<SortField>().is_err());
        assert_eq!("asc".parse::<SortOrder>(), Ok(SortOrder::Asc));
        assert!("ASC".parse::<SortOrder>().is_err());
    }
}
