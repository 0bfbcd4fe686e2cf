//! Environment configuration, loaded fail-fast at startup.

use std::env;

use thiserror::Error;
use wallog_core::{Owner, ShardSet};

/// Configuration errors that abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// How the store client authenticates.
#[derive(Debug, Clone)]
pub enum AuthConfig {
    /// OAuth2 client-credentials grant.
    ClientCredentials {
        token_url: String,
        client_id: String,
        client_secret: String,
        scope: Option<String>,
    },
    /// Fixed bearer token (development only).
    Static { token: String },
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Web API service root, e.g. `https://org.example.com/api/data/v9.2`.
    pub store_base_url: String,
    /// Per-request timeout in seconds.
    pub store_timeout_secs: u64,
    pub auth: AuthConfig,
    /// Shard set, from the `SHARDS` JSON array.
    pub shards: ShardSet,
    /// Owner routing table, from the `OWNERS` JSON array.
    pub owners: Vec<Owner>,
    /// Tracing filter directive.
    pub rust_log: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Required Variables
    ///
    /// - `STORE_BASE_URL` - Web API service root
    /// - `SHARDS` - JSON array of `{key, collection, id_field, select?}`
    /// - either `AUTH_STATIC_TOKEN`, or `AUTH_TOKEN_URL` +
    ///   `AUTH_CLIENT_ID` + `AUTH_CLIENT_SECRET`
    ///
    /// # Optional Variables
    ///
    /// - `AUTH_SCOPE` - OAuth2 scope
    /// - `OWNERS` - JSON array of owner routing rules (default: none)
    /// - `STORE_TIMEOUT_SECS` - request timeout (default: 30)
    /// - `RUST_LOG` - log filter (default: "info")
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env if present (development only).
        let _ = dotenvy::dotenv();

        let store_base_url = require("STORE_BASE_URL")?;

        let auth = match env::var("AUTH_STATIC_TOKEN") {
            Ok(token) if !token.is_empty() => AuthConfig::Static { token },
            _ => AuthConfig::ClientCredentials {
                token_url: require("AUTH_TOKEN_URL")?,
                client_id: require("AUTH_CLIENT_ID")?,
                client_secret: require("AUTH_CLIENT_SECRET")?,
                scope: env::var("AUTH_SCOPE").ok().filter(|s| !s.is_empty()),
            },
        };

        let shards: ShardSet = parse_json_var("SHARDS", &require("SHARDS")?)?;
        if shards.is_empty() {
            return Err(ConfigError::InvalidValue {
                var: "SHARDS".to_string(),
                message: "shard set must not be empty".to_string(),
            });
        }

        let owners: Vec<Owner> = match env::var("OWNERS") {
            Ok(raw) if !raw.is_empty() => parse_json_var("OWNERS", &raw)?,
            _ => Vec::new(),
        };

        let store_timeout_secs = env::var("STORE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30)
            .max(1);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            store_base_url,
            store_timeout_secs,
            auth,
            shards,
            owners,
            rust_log,
        })
    }
}

fn require(var: &str) -> Result<String, ConfigError> {
    env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingVar(var.to_string()))
}

fn parse_json_var<T: serde::de::DeserializeOwned>(
    var: &str,
    raw: &str,
) -> Result<T, ConfigError> {
    serde_json::from_str(raw).map_err(|e| ConfigError::InvalidValue {
        var: var.to_string(),
        message: format!("invalid JSON: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shards_parse_from_json() {
        let shards: ShardSet = parse_json_var(
            "SHARDS",
            r#"[{"key":"alpha","collection":"alphacases","id_field":"alphacaseid"}]"#,
        )
        .unwrap();
        assert_eq!(shards.keys(), vec!["alpha"]);
    }

    #[test]
    fn test_invalid_json_is_reported_with_var_name() {
        let err = parse_json_var::<ShardSet>("SHARDS", "{nope").unwrap_err();
        assert!(err.to_string().contains("SHARDS"));
    }
}
