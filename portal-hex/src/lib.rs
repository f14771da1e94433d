//! # Portal Hex
//!
//! Application service layer and HTTP adapter for the merchant portal.
//!
//! ## Architecture
//!
//! - `service` - Application service (ingestion, queries, health)
//! - `inbound/` - HTTP adapter (Axum server, request context, error envelope)
//! - `openapi` - OpenAPI document served by Swagger UI
//!
//! The service is generic over `R: TransactionRepository`, allowing
//! different repository implementations to be injected.

pub mod inbound;
pub mod openapi;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use service::{IngestOutcome, PortalService};
