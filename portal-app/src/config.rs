//! Configuration loading from environment.

use std::env;

use portal_hex::inbound::{Environment, ServerConfig};

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub environment: Environment,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("PORT must be a valid port number: {}", e))?;

        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let environment = match lookup("APP_ENV") {
            Some(value) => value.parse().map_err(anyhow::Error::msg)?,
            None => Environment::Development,
        };

        let cors_origin = lookup("CORS_ORIGIN").unwrap_or_else(|| "*".to_string());

        Ok(Self {
            port,
            database_url,
            environment,
            cors_origin,
        })
    }

    /// Settings handed to the HTTP adapter.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            environment: self.environment,
            cors_origin: self.cors_origin.clone(),
        }
    }

    /// Database URL with any password masked, for logging.
    pub fn redacted_database_url(&self) -> String {
        let url = &self.database_url;
        let Some(scheme_end) = url.find("://") else {
            return url.clone();
        };
        let rest = &url[scheme_end + 3..];
        let Some(at) = rest.find('@') else {
            return url.clone();
        };
        match rest[..at].find(':') {
            Some(colon) => format!(
                "{}://{}:***{}",
                &url[..scheme_end],
                &rest[..colon],
                &rest[at..]
            ),
            None => url.clone(),
        }
    }
}
