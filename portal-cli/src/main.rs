//! Portal CLI
//!
//! Command-line interface for the merchant portal API.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use portal_client::PortalClient;
use portal_types::{
    AnalyticsQueryParams, TransactionId, TransactionQueryParams, TransactionStatus,
    WebhookIngestRequest,
};

#[derive(Parser)]
#[command(name = "portal")]
#[command(author, version, about = "Merchant portal API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the portal API
    #[arg(long, env = "PORTAL_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a payment webhook
    Ingest {
        #[arg(long)]
        source: String,
        #[arg(long)]
        merchant: String,
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value = "USD")]
        currency: String,
        #[arg(long, default_value = "completed")]
        status: String,
        /// External idempotency key
        #[arg(long)]
        transaction_id: String,
        /// Extra metadata as a JSON object
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Transaction queries
    Transaction {
        #[command(subcommand)]
        action: TransactionCommands,
    },
    /// Analytics summary
    Analytics {
        #[arg(long)]
        merchant: Option<String>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        currency: Option<String>,
    },
    /// Check API health
    Health,
}

#[derive(Subcommand)]
enum TransactionCommands {
    /// Get transaction details
    Get {
        /// Transaction ID (UUID)
        id: String,
    },
    /// List transactions
    List {
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        merchant: Option<String>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        /// created_at, amount or status
        #[arg(long)]
        sort_by: Option<String>,
        /// asc or desc
        #[arg(long)]
        sort_order: Option<String>,
    },
}

fn parse_status(s: &str) -> Result<TransactionStatus> {
    s.parse().map_err(|_| {
        anyhow::anyhow!(
            "Unknown status: {}. Supported: pending, processing, completed, failed, refunded, cancelled",
            s
        )
    })
}

fn parse_metadata(s: &str) -> Result<serde_json::Map<String, serde_json::Value>> {
    serde_json::from_str(s).context("metadata must be a JSON object")
}

fn parse_transaction_id(s: &str) -> Result<TransactionId> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("Invalid transaction ID: {}", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let client = PortalClient::new(&cli.api_url);

    match cli.command {
        Commands::Health => {
            let health = client.health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
            if !health.is_healthy() {
                std::process::exit(1);
            }
        }

        Commands::Ingest {
            source,
            merchant,
            amount,
            currency,
            status,
            transaction_id,
            metadata,
        } => {
            let webhook = WebhookIngestRequest {
                source,
                merchant_id: merchant,
                amount,
                currency,
                status: parse_status(&status)?,
                transaction_id,
                metadata: metadata.as_deref().map(parse_metadata).transpose()?,
            };
            let response = client.ingest(&webhook).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Commands::Transaction { action } => match action {
            TransactionCommands::Get { id } => {
                let transaction_id = parse_transaction_id(&id)?;
                let tx = client.get_transaction(transaction_id).await?;
                println!("{}", serde_json::to_string_pretty(&tx)?);
            }
            TransactionCommands::List {
                source,
                status,
                merchant,
                from,
                to,
                page,
                limit,
                sort_by,
                sort_order,
            } => {
                let query = TransactionQueryParams {
                    source,
                    status,
                    merchant_id: merchant,
                    date_from: from,
                    date_to: to,
                    page: page.map(|p| p.to_string()),
                    limit: limit.map(|l| l.to_string()),
                    sort_by,
                    sort_order,
                };
                let list = client.list_transactions(&query).await?;
                println!("{}", serde_json::to_string_pretty(&list)?);
            }
        },

        Commands::Analytics {
            merchant,
            from,
            to,
            currency,
        } => {
            let query = AnalyticsQueryParams {
                merchant_id: merchant,
                date_from: from,
                date_to: to,
                currency,
            };
            let summary = client.analytics_summary(&query).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("refunded").unwrap(), TransactionStatus::Refunded);
        assert!(parse_status("REFUNDED").is_err());
    }

    #[test]
    fn test_parse_metadata() {
        let map = parse_metadata(r#"{"order": 7}"#).unwrap();
        assert_eq!(map["order"], 7);
        assert!(parse_metadata("[1, 2]").is_err());
    }

    #[test]
    fn test_ingest_arguments() {
        let cli = Cli::try_parse_from([
            "portal",
            "--api-url",
            "http://portal:3000",
            "ingest",
            "--source",
            "stripe",
            "--merchant",
            "00000000-0000-0000-0000-000000000001",
            "--amount",
            "12.5",
            "--transaction-id",
            "txn_9",
        ])
        .unwrap();

        assert_eq!(cli.api_url, "http://portal:3000");
        match cli.command {
            Commands::Ingest {
                currency, status, ..
            } => {
                assert_eq!(currency, "USD");
                assert_eq!(status, "completed");
            }
            _ => panic!("expected ingest"),
        }
    }
}
