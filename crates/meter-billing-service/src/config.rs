//! Service configuration.

use serde::Deserialize;
use std::path::Path;

use crate::reconcile::DEFAULT_SETTLEMENT_RETRIES;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:3001").
    pub listen_addr: String,

    /// PostgreSQL connection URL. When absent the service runs on the
    /// in-memory store.
    pub database_url: Option<String>,

    /// Size of the database connection pool (default: 5).
    pub database_max_connections: u32,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Re-reads allowed after a lost settlement race.
    pub settlement_max_retries: u32,
}

/// Database secrets file structure.
#[derive(Debug, Deserialize)]
struct DatabaseSecrets {
    url: String,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            database_url: var("DATABASE_URL").or_else(load_database_secrets),
            database_max_connections: parse_or(
                var("DATABASE_MAX_CONNECTIONS"),
                defaults.database_max_connections,
            ),
            cors_origins: var("CORS_ORIGINS").map_or(defaults.cors_origins, |origins| {
                origins.split(',').map(|s| s.trim().to_string()).collect()
            }),
            max_body_bytes: parse_or(var("MAX_BODY_BYTES"), defaults.max_body_bytes),
            request_timeout_seconds: parse_or(
                var("REQUEST_TIMEOUT_SECONDS"),
                defaults.request_timeout_seconds,
            ),
            settlement_max_retries: parse_or(
                var("SETTLEMENT_MAX_RETRIES"),
                defaults.settlement_max_retries,
            ),
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|s| s.parse().ok()).unwrap_or(default)
}

/// Load the database URL from a secrets file, if one exists.
fn load_database_secrets() -> Option<String> {
    let secret_paths = [
        ".secrets/database.json",
        "meter-billing/.secrets/database.json",
        "../.secrets/database.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<DatabaseSecrets>(path) {
            tracing::info!(path = %path, "Loaded database secrets from file");
            return Some(secrets.url);
        }
    }

    tracing::debug!("Database secrets file not found");
    None
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3001".into(),
            database_url: None,
            database_max_connections: 5,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            settlement_max_retries: DEFAULT_SETTLEMENT_RETRIES,
        }
    }
}
