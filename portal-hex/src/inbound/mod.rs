//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the application layer.

mod context;
mod error;
mod handlers;
mod server;

pub use context::{REQUEST_ID_HEADER, RequestContext};
pub use error::ApiError;
pub use server::{Environment, HttpServer, ServerConfig};
