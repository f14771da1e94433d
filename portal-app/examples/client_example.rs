//! Client example walking through ingestion and queries against a running server.
//!
//! Run with: cargo run -p portal-app --example client_example --no-default-features --features sqlite

use portal_client::PortalClient;
use portal_hex::{PortalService, inbound::HttpServer};
use portal_repo::build_repo;
use portal_types::{
    AnalyticsQueryParams, TransactionQueryParams, TransactionStatus, WebhookIngestRequest,
};
use std::net::SocketAddr;
use tempfile::tempdir;
use tokio::net::TcpListener;

const MERCHANT: &str = "00000000-0000-0000-0000-000000000001";

fn webhook(
    source: &str,
    transaction_id: &str,
    amount: f64,
    status: TransactionStatus,
) -> WebhookIngestRequest {
    WebhookIngestRequest {
        source: source.to_string(),
        merchant_id: MERCHANT.to_string(),
        amount,
        currency: "USD".to_string(),
        status,
        transaction_id: transaction_id.to_string(),
        metadata: None,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt().with_env_filter("info").init();

    // Bind an available port and keep the listener for the server
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;

    // Use a temp file-backed SQLite DB
    let tmp = tempdir()?;
    let db_path = tmp.path().join("portal.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    println!("🚀 Starting server on {addr}...");
    println!("   Database: {db_url}");

    // Build repository (handles connection and migration)
    let repo = build_repo(&db_url).await?;

    // Start server in background
    let router = HttpServer::new(PortalService::new(repo)).router();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router.into_make_service()).await {
            eprintln!("server error: {e}");
        }
    });

    let client = PortalClient::new(format!("http://{addr}"));

    // ─────────────────────────────────────────────────────────────────────────
    // Demo: ingestion and queries
    // ─────────────────────────────────────────────────────────────────────────

    let health = client.health().await?;
    println!("✅ Server health: {} (db connected: {})", health.status, health.database.connected);

    let created = client
        .ingest(&webhook("stripe", "txn_1", 100.0, TransactionStatus::Completed))
        .await?;
    println!("✅ Ingested txn_1 (id={})", created.data.transaction_id);

    // Resubmitting the same key is rejected, not stored twice
    let duplicate = client
        .ingest(&webhook("stripe", "txn_1", 100.0, TransactionStatus::Completed))
        .await;
    match duplicate {
        Err(e) if e.is_duplicate() => println!("✅ Duplicate rejected: {e}"),
        other => anyhow::bail!("expected a duplicate rejection, got {other:?}"),
    }

    client
        .ingest(&webhook("adyen", "txn_2", 40.0, TransactionStatus::Completed))
        .await?;
    client
        .ingest(&webhook("adyen", "txn_3", 15.0, TransactionStatus::Failed))
        .await?;
    println!("✅ Ingested txn_2 and txn_3");

    let tx = client.get_transaction(created.data.transaction_id).await?;
    println!("   txn_1 payload: {}", tx.data.payload);

    let list = client
        .list_transactions(&TransactionQueryParams {
            sort_by: Some("amount".to_string()),
            sort_order: Some("desc".to_string()),
            ..Default::default()
        })
        .await?;
    println!("\n📋 Transactions ({} total):", list.pagination.total);
    for tx in list.data {
        println!(
            "   - {} {} {:.2} {} [{}]",
            tx.source, tx.status, tx.amount.value(), tx.currency, tx.id
        );
    }

    let summary = client
        .analytics_summary(&AnalyticsQueryParams::default())
        .await?;
    println!(
        "\n📊 Volume {:.2}, success rate {}%, {} transactions",
        summary.data.total_volume, summary.data.success_rate, summary.data.total_transactions
    );

    println!("\n🎉 Example completed successfully!");

    Ok(())
}
