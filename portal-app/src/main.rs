//! # Merchant Portal Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize logging and, when configured, OpenTelemetry export
//! - Initialize the repository adapter
//! - Create the portal service
//! - Start the HTTP server

mod config;

use std::env;

use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::{
    metrics::SdkMeterProvider, propagation::TraceContextPropagator, trace as sdktrace,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use portal_hex::{PortalService, inbound::HttpServer};
use portal_repo::build_repo;

const SERVICE_NAME: &str = "merchant-portal";

/// OpenTelemetry providers that must be flushed on exit.
struct Telemetry {
    tracer: sdktrace::Tracer,
    tracer_provider: sdktrace::SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

impl Telemetry {
    /// Installs OTLP exporters for traces and metrics.
    ///
    /// Endpoint and protocol come from the standard `OTEL_EXPORTER_OTLP_*`
    /// variables.
    fn init() -> anyhow::Result<Self> {
        global::set_text_map_propagator(TraceContextPropagator::new());

        // Use gRPC exporter with batch processing (non-blocking)
        let span_exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .build()?;
        let tracer_provider = sdktrace::SdkTracerProvider::builder()
            .with_batch_exporter(span_exporter)
            .build();
        global::set_tracer_provider(tracer_provider.clone());

        // The HTTP metrics layer records into the global meter provider
        let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
            .with_tonic()
            .build()?;
        let meter_provider = SdkMeterProvider::builder()
            .with_periodic_exporter(metric_exporter)
            .build();
        global::set_meter_provider(meter_provider.clone());

        Ok(Self {
            tracer: tracer_provider.tracer(SERVICE_NAME),
            tracer_provider,
            meter_provider,
        })
    }

    fn shutdown(self) {
        if let Err(e) = self.tracer_provider.shutdown() {
            tracing::warn!(error = %e, "failed to flush traces");
        }
        if let Err(e) = self.meter_provider.shutdown() {
            tracing::warn!(error = %e, "failed to flush metrics");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let telemetry = match env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Ok(_) => Some(Telemetry::init()?),
        Err(_) => None,
    };
    let json_logs = env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,portal_app=debug,portal_hex=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .with(
            telemetry
                .as_ref()
                .map(|t| tracing_opentelemetry::layer().with_tracer(t.tracer.clone())),
        )
        .init();

    // Load configuration
    let config = config::Config::from_env()?;

    tracing::info!(
        port = config.port,
        environment = config.environment.as_str(),
        otel = telemetry.is_some(),
        "Starting merchant portal server"
    );
    tracing::info!("Using database: {}", config.redacted_database_url());

    // Build repository (handles connection and migration)
    let repo = build_repo(&config.database_url).await?;
    tracing::info!(backend = repo.backend(), "Repository ready");

    // Create the portal service
    let service = PortalService::new(repo);

    // Create and run the HTTP server
    let server = HttpServer::with_config(service, config.server_config());
    let addr = format!("0.0.0.0:{}", config.port);

    let result = server.run(&addr).await;

    // Ensure traces and metrics are flushed before exit
    if let Some(telemetry) = telemetry {
        telemetry.shutdown();
    }
    result
}
