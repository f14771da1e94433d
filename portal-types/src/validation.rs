//! Validation gate for inbound requests.
//!
//! Validators collect *every* violated field instead of stopping at the
//! first one, so a caller fixing a payload sees all problems at once. They
//! are pure functions of their input and run before any persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{
    Amount, CurrencyCode, ExternalId, MerchantId, Source, TransactionStatus,
};
use crate::dto::{AnalyticsQueryParams, TransactionQueryParams};
use crate::query::{AnalyticsFilter, MAX_LIMIT, Pagination, TransactionFilter};

/// One violated field and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    #[schema(example = "amount")]
    pub field: String,
    #[schema(example = "Amount must be non-negative")]
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// All violations found in one input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|e| e.field.as_str())
    }

    pub fn into_inner(self) -> Vec<FieldError> {
        self.0
    }

    /// Records the error of a failed check and yields the value of a passed one.
    fn check<T, E: std::fmt::Display>(&mut self, field: &str, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.push(field, e.to_string());
                None
            }
        }
    }
}

/// A webhook payload that passed the gate, with typed fields.
#[derive(Debug, Clone)]
pub struct ValidatedWebhook {
    pub source: Source,
    pub merchant_id: MerchantId,
    pub amount: Amount,
    pub currency: CurrencyCode,
    pub status: TransactionStatus,
    /// External idempotency key
    pub transaction_id: ExternalId,
    pub metadata: Map<String, Value>,
    /// The inbound body exactly as received, for the audit trail
    pub request_payload: Value,
}

fn require_str<'a>(
    errors: &mut ValidationErrors,
    body: &'a Map<String, Value>,
    field: &str,
) -> Option<&'a str> {
    match body.get(field) {
        None | Some(Value::Null) => {
            errors.push(field, format!("{} is required", field));
            None
        }
        Some(Value::String(s)) => Some(s.as_str()),
        Some(_) => {
            errors.push(field, format!("{} must be a string", field));
            None
        }
    }
}

fn parse_uuid(value: &str) -> Option<Uuid> {
    // Hyphenated form only; the simple and braced forms are rejected.
    if value.len() != 36 {
        return None;
    }
    Uuid::parse_str(value).ok()
}

/// Validates a raw webhook body.
pub fn validate_webhook(body: &Value) -> Result<ValidatedWebhook, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let Some(obj) = body.as_object() else {
        errors.push("body", "Request body must be a JSON object");
        return Err(errors);
    };

    let source = require_str(&mut errors, obj, "source")
        .and_then(|s| errors.check("source", Source::parse(s)));

    let merchant_id = require_str(&mut errors, obj, "merchant_id").and_then(|s| {
        let parsed = parse_uuid(s).map(MerchantId::from_uuid);
        if parsed.is_none() {
            errors.push("merchant_id", "merchant_id must be a valid UUID");
        }
        parsed
    });

    let amount = match obj.get("amount") {
        None | Some(Value::Null) => {
            errors.push("amount", "amount is required");
            None
        }
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) => errors.check("amount", Amount::new(v)),
            None => {
                errors.push("amount", "amount must be a number");
                None
            }
        },
        Some(_) => {
            errors.push("amount", "amount must be a number");
            None
        }
    };

    let currency = require_str(&mut errors, obj, "currency")
        .and_then(|s| errors.check("currency", CurrencyCode::parse(s)));

    let status = require_str(&mut errors, obj, "status")
        .and_then(|s| errors.check("status", s.parse::<TransactionStatus>()));

    let transaction_id = require_str(&mut errors, obj, "transaction_id")
        .and_then(|s| errors.check("transaction_id", ExternalId::parse(s)));

    let metadata = match obj.get("metadata") {
        None | Some(Value::Null) => Some(Map::new()),
        Some(Value::Object(map)) => Some(map.clone()),
        Some(_) => {
            errors.push("metadata", "metadata must be an object");
            None
        }
    };

    match (
        source,
        merchant_id,
        amount,
        currency,
        status,
        transaction_id,
        metadata,
    ) {
        (
            Some(source),
            Some(merchant_id),
            Some(amount),
            Some(currency),
            Some(status),
            Some(transaction_id),
            Some(metadata),
        ) if errors.is_empty() => Ok(ValidatedWebhook {
            source,
            merchant_id,
            amount,
            currency,
            status,
            transaction_id,
            metadata,
            request_payload: body.clone(),
        }),
        _ => Err(errors),
    }
}

fn optional_timestamp(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
) -> Option<DateTime<Utc>> {
    let raw = value?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(_) => {
            errors.push(
                field,
                format!("{} must be an ISO 8601 datetime with offset", field),
            );
            None
        }
    }
}

fn optional_merchant(errors: &mut ValidationErrors, value: Option<&str>) -> Option<MerchantId> {
    let raw = value?;
    let parsed = parse_uuid(raw).map(MerchantId::from_uuid);
    if parsed.is_none() {
        errors.push("merchant_id", "merchant_id must be a valid UUID");
    }
    parsed
}

/// Validates `GET /transactions` query parameters into a filter.
pub fn validate_transaction_query(
    params: &TransactionQueryParams,
) -> Result<TransactionFilter, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let mut filter = TransactionFilter::default();

    if let Some(raw) = params.source.as_deref() {
        filter.source = errors.check("source", Source::parse(raw));
    }
    if let Some(raw) = params.status.as_deref() {
        filter.status = errors.check("status", raw.parse::<TransactionStatus>());
    }
    filter.merchant_id = optional_merchant(&mut errors, params.merchant_id.as_deref());
    filter.date_from = optional_timestamp(&mut errors, "date_from", params.date_from.as_deref());
    filter.date_to = optional_timestamp(&mut errors, "date_to", params.date_to.as_deref());

    let mut pagination = Pagination::default();
    if let Some(raw) = params.page.as_deref() {
        match raw.trim().parse::<u32>() {
            Ok(page) if page >= 1 => pagination.page = page,
            _ => errors.push("page", "page must be a positive integer"),
        }
    }
    if let Some(raw) = params.limit.as_deref() {
        match raw.trim().parse::<u32>() {
            Ok(limit) if (1..=MAX_LIMIT).contains(&limit) => pagination.limit = limit,
            _ => errors.push(
                "limit",
                format!("limit must be an integer between 1 and {}", MAX_LIMIT),
            ),
        }
    }
    filter.pagination = pagination;

    if let Some(raw) = params.sort_by.as_deref() {
        match raw.parse() {
            Ok(field) => filter.sort_by = field,
            Err(()) => errors.push("sort_by", "sort_by must be one of: created_at, amount, status"),
        }
    }
    if let Some(raw) = params.sort_order.as_deref() {
        match raw.parse() {
            Ok(order) => filter.sort_order = order,
            Err(()) => errors.push("sort_order", "sort_order must be one of: asc, desc"),
        }
    }

    if errors.is_empty() {
        Ok(filter)
    } else {
        Err(errors)
    }
}

/// Validates `GET /analytics/summary` query parameters into a filter.
pub fn validate_analytics_query(
    params: &AnalyticsQueryParams,
) -> Result<AnalyticsFilter, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let filter = AnalyticsFilter {
        merchant_id: optional_merchant(&mut errors, params.merchant_id.as_deref()),
        date_from: optional_timestamp(&mut errors, "date_from", params.date_from.as_deref()),
        date_to: optional_timestamp(&mut errors, "date_to", params.date_to.as_deref()),
        currency: params
            .currency
            .as_deref()
            .and_then(|raw| errors.check("currency", CurrencyCode::parse(raw))),
    };

    if errors.is_empty() {
        Ok(filter)
    } else {
        Err(errors)
    }
}
