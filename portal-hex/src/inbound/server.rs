//! HTTP Server configuration and startup.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use portal_types::TransactionRepository;

use super::context::{REQUEST_ID_HEADER, request_context};
use super::handlers::{self, AppState};
use crate::PortalService;
use crate::openapi::ApiDoc;

/// Deployment environment; production hides internal error details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!(
                "unknown environment '{}', expected development or production",
                other
            )),
        }
    }
}

/// Settings of the HTTP adapter.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub environment: Environment,
    /// `*` or a comma-separated list of allowed origins
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            cors_origin: "*".to_string(),
        }
    }
}

impl ServerConfig {
    fn cors_layer(&self) -> CorsLayer {
        let origin = if self.cors_origin.trim() == "*" {
            AllowOrigin::from(Any)
        } else {
            let origins: Vec<HeaderValue> = self
                .cors_origin
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = o, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(origins)
        };

        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, REQUEST_ID_HEADER])
            .expose_headers([REQUEST_ID_HEADER])
    }
}

/// HTTP Server for the merchant portal API.
pub struct HttpServer<R: TransactionRepository> {
    state: Arc<AppState<R>>,
}

impl<R: TransactionRepository> HttpServer<R> {
    /// Creates a new HTTP server with default settings.
    pub fn new(service: PortalService<R>) -> Self {
        Self::with_config(service, ServerConfig::default())
    }

    /// Creates a new HTTP server with explicit settings.
    pub fn with_config(service: PortalService<R>, config: ServerConfig) -> Self {
        Self {
            state: Arc::new(AppState { service, config }),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();
        let config = self.state.config.clone();

        let api = Router::new()
            .route("/webhooks/ingest", post(handlers::ingest_webhook::<R>))
            .route("/transactions", get(handlers::list_transactions::<R>))
            .route("/transactions/{id}", get(handlers::get_transaction::<R>))
            .route("/analytics/summary", get(handlers::analytics_summary::<R>));

        Router::new()
            .route("/health", get(handlers::health::<R>))
            .nest("/api", api)
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .fallback(handlers::not_found)
            .layer(metrics)
            .layer(config.cors_layer())
            // Outside CORS so preflight answers carry the request id too
            .layer(middleware::from_fn_with_state(
                config.clone(),
                request_context,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
