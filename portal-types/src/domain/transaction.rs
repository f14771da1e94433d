//! Transaction domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::money::{Amount, CurrencyCode};
use crate::error::DomainError;

/// Maximum length of a payment source identifier.
pub const SOURCE_MAX_LEN: usize = 100;

/// Maximum length of an external idempotency key.
pub const EXTERNAL_ID_MAX_LEN: usize = 255;

/// Unique identifier for a Transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, format = Uuid)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Creates a new random TransactionId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a TransactionId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns the UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identifier of the merchant a transaction belongs to.
///
/// Merchants themselves are managed elsewhere; only the reference is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, format = Uuid)]
pub struct MerchantId(Uuid);

impl MerchantId {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for MerchantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MerchantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle status reported by the upstream payment source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
    Cancelled,
}

impl TransactionStatus {
    /// Every status, in the order they are reported by analytics.
    pub const ALL: [TransactionStatus; 6] = [
        TransactionStatus::Pending,
        TransactionStatus::Processing,
        TransactionStatus::Completed,
        TransactionStatus::Failed,
        TransactionStatus::Refunded,
        TransactionStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Processing => "processing",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Refunded => "refunded",
            TransactionStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = DomainError;

    /// Case-sensitive: `Completed` is not a status.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::InvalidStatus(s.to_string()))
    }
}

/// Identifier of the upstream payment origin, e.g. a PSP name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "stripe")]
pub struct Source(String);

impl Source {
    /// Parses a source: 1-100 chars of `[a-z0-9_-]`.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let len = value.chars().count();
        if len == 0 || len > SOURCE_MAX_LEN {
            return Err(DomainError::SourceLength);
        }
        let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_';
        if !value.chars().all(allowed) {
            return Err(DomainError::SourcePattern);
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Source {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Source> for String {
    fn from(source: Source) -> Self {
        source.0
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller-supplied idempotency key used to deduplicate webhook deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "txn_1")]
pub struct ExternalId(String);

impl ExternalId {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let len = value.chars().count();
        if len == 0 || len > EXTERNAL_ID_MAX_LEN {
            return Err(DomainError::ExternalIdLength);
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ExternalId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ExternalId> for String {
    fn from(id: ExternalId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ExternalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A payment transaction reported by an upstream source.
///
/// Transactions are write-once: the ingestion path creates them and nothing
/// in this service updates or deletes them.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Unique identifier
    pub id: TransactionId,
    /// Payment origin
    pub source: Source,
    pub merchant_id: MerchantId,
    pub amount: Amount,
    pub currency: CurrencyCode,
    pub status: TransactionStatus,
    /// Caller metadata merged with the external `transaction_id`
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Creates a new transaction from an inbound webhook.
    ///
    /// The stored payload is the caller's metadata with the external id
    /// written under `transaction_id`; the external id wins if the metadata
    /// carries a key of the same name.
    pub fn ingest(
        source: Source,
        merchant_id: MerchantId,
        amount: Amount,
        currency: CurrencyCode,
        status: TransactionStatus,
        external_id: &ExternalId,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        let mut payload = metadata;
        payload.insert(
            "transaction_id".to_string(),
            serde_json::Value::String(external_id.as_str().to_string()),
        );
        let now = Utc::now();

        Self {
            id: TransactionId::new(),
            source,
            merchant_id,
            amount,
            currency,
            status,
            payload: serde_json::Value::Object(payload),
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstructs a transaction from database fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: TransactionId,
        source: Source,
        merchant_id: MerchantId,
        amount: Amount,
        currency: CurrencyCode,
        status: TransactionStatus,
        payload: serde_json::Value,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            source,
            merchant_id,
            amount,
            currency,
            status,
            payload,
            created_at,
            updated_at,
        }
    }

    /// Returns the external idempotency key embedded in the payload.
    pub fn external_id(&self) -> Option<&str> {
        self.payload.get("transaction_id").and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(metadata: serde_json::Value) -> Transaction {
        let metadata = match metadata {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Transaction::ingest(
            Source::parse("stripe").unwrap(),
            MerchantId::from_uuid(Uuid::new_v4()),
            Amount::new(10.0).unwrap(),
            CurrencyCode::parse("USD").unwrap(),
            TransactionStatus::Completed,
            &ExternalId::parse("txn_1").unwrap(),
            metadata,
        )
    }

    #[test]
    fn test_ingest_merges_metadata_with_external_id() {
        let tx = sample(json!({"customer_email": "a@example.com", "tags": [1, 2]}));

        assert_eq!(tx.external_id(), Some("txn_1"));
        assert_eq!(tx.payload["customer_email"], "a@example.com");
        assert_eq!(tx.payload["tags"], json!([1, 2]));
        assert_eq!(tx.created_at, tx.updated_at);
    }

    #[test]
    fn test_external_id_overrides_metadata_key() {
        let tx = sample(json!({"transaction_id": "spoofed"}));
        assert_eq!(tx.external_id(), Some("txn_1"));
    }

    #[test]
    fn test_status_parsing_is_case_sensitive() {
        assert_eq!(
            "completed".parse::<TransactionStatus>().unwrap(),
            TransactionStatus::Completed
        );
        assert!("Completed".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn test_source_rules() {
        assert!(Source::parse("stripe-test_2").is_ok());
        assert!(matches!(Source::parse(""), Err(DomainError::SourceLength)));
        assert!(matches!(
            Source::parse(&"a".repeat(101)),
            Err(DomainError::SourceLength)
        ));
        assert!(matches!(
            Source::parse("Stripe"),
            Err(DomainError::SourcePattern)
        ));
        assert!(matches!(
            Source::parse("stripe test"),
            Err(DomainError::SourcePattern)
        ));
    }

    #[test]
    fn test_external_id_length() {
        assert!(ExternalId::parse(&"x".repeat(255)).is_ok());
        assert!(ExternalId::parse(&"x".repeat(256)).is_err());
        assert!(ExternalId::parse("").is_err());
    }
}
