//! Domain models for the merchant portal.

pub mod money;
pub mod transaction;
pub mod webhook;

pub use money::{Amount, CurrencyCode};
pub use transaction::{
    ExternalId, MerchantId, Source, Transaction, TransactionId, TransactionStatus,
};
pub use webhook::{WebhookLog, WebhookLogDraft, WebhookLogId};
