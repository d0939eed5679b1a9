//! CLI/env configuration (spec.md §6.4). Grounded on `agent/src/main.rs`'s
//! `clap::Parser` derive with `env` fallbacks; the less-structured knobs
//! (hub endpoint list, target strategy) arrive as one JSON blob each rather
//! than a pile of individually-flagged scalars, matching how that shape is
//! already a JSON document in spec.md §6.4.

use std::time::Duration;

use clap::Parser;
use indexer_types::Fid;
use serde::Deserialize;
use url::Url;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// JSON array of hub base URLs, tried in order (spec.md §4.1).
    #[clap(long = "hubs-json", env = "HUBS_JSON")]
    pub hubs_json: String,

    /// JSON object: `{"rootTargets": [...], "targetClients": [...], "enableClientDiscovery": bool}`.
    #[clap(long = "strategy-json", env = "STRATEGY_JSON", default_value = "{}")]
    pub strategy_json: String,

    #[clap(long = "redis-host", env = "REDIS_HOST", default_value = "127.0.0.1")]
    pub redis_host: String,
    #[clap(long = "redis-port", env = "REDIS_PORT", default_value = "6379")]
    pub redis_port: u16,
    #[clap(long = "redis-password", env = "REDIS_PASSWORD")]
    pub redis_password: Option<String>,
    #[clap(long = "redis-db", env = "REDIS_DB")]
    pub redis_db: Option<u8>,

    #[clap(long = "postgres-connection-string", env = "POSTGRES_CONNECTION_STRING")]
    pub postgres_connection_string: String,

    #[clap(long = "db-environment", env = "DB_ENVIRONMENT", default_value = "dev")]
    pub db_environment: String,

    #[clap(long = "realtime-poll-interval-secs", env = "REALTIME_POLL_INTERVAL_SECS", default_value = "5")]
    pub realtime_poll_interval_secs: u64,

    /// Validated but never read past startup, per spec.md §6.4 — this
    /// indexer exposes no authenticated surface of its own.
    #[clap(long = "jwt-secret", env = "JWT_SECRET")]
    pub jwt_secret: String,
    #[clap(long = "admin-password", env = "ADMIN_PASSWORD")]
    pub admin_password: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid hubs-json: {0}")]
    HubsJson(#[source] serde_json::Error),
    #[error("invalid strategy-json: {0}")]
    StrategyJson(#[source] serde_json::Error),
    #[error("hubs-json must name at least one endpoint")]
    NoHubs,
    #[error("invalid hub url {0:?}: {1}")]
    HubUrl(String, #[source] url::ParseError),
    #[error("jwt-secret must be at least 32 characters")]
    JwtSecretTooShort,
    #[error("admin-password must be at least 8 characters")]
    AdminPasswordTooShort,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawStrategy {
    #[serde(default)]
    root_targets: Vec<Fid>,
    #[serde(default)]
    target_clients: Vec<Fid>,
    #[serde(default)]
    enable_client_discovery: bool,
}

pub struct Strategy {
    pub root_targets: Vec<Fid>,
    pub target_clients: Vec<Fid>,
    pub enable_client_discovery: bool,
}

/// Validated configuration derived from `Args`.
pub struct Settings {
    pub hub_endpoints: Vec<Url>,
    pub strategy: Strategy,
    pub redis_url: String,
    pub postgres_connection_string: String,
    pub db_environment: indexer_db::DbEnvironment,
    pub realtime_poll_interval: Duration,
}

impl Settings {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        if args.jwt_secret.len() < 32 {
            return Err(ConfigError::JwtSecretTooShort);
        }
        if args.admin_password.len() < 8 {
            return Err(ConfigError::AdminPasswordTooShort);
        }

        let hub_urls: Vec<String> = serde_json::from_str(&args.hubs_json).map_err(ConfigError::HubsJson)?;
        if hub_urls.is_empty() {
            return Err(ConfigError::NoHubs);
        }
        let hub_endpoints = hub_urls
            .into_iter()
            .map(|s| Url::parse(&s).map_err(|e| ConfigError::HubUrl(s, e)))
            .collect::<Result<Vec<_>, _>>()?;

        let raw_strategy: RawStrategy = serde_json::from_str(&args.strategy_json).map_err(ConfigError::StrategyJson)?;
        let strategy = Strategy {
            root_targets: raw_strategy.root_targets,
            target_clients: raw_strategy.target_clients,
            enable_client_discovery: raw_strategy.enable_client_discovery,
        };

        let redis_url = match (&args.redis_password, args.redis_db) {
            (Some(password), Some(db)) => format!("redis://:{password}@{}:{}/{db}", args.redis_host, args.redis_port),
            (Some(password), None) => format!("redis://:{password}@{}:{}", args.redis_host, args.redis_port),
            (None, Some(db)) => format!("redis://{}:{}/{db}", args.redis_host, args.redis_port),
            (None, None) => format!("redis://{}:{}", args.redis_host, args.redis_port),
        };

        let db_environment = match args.db_environment.as_str() {
            "prod" => indexer_db::DbEnvironment::Prod,
            "test" => indexer_db::DbEnvironment::Test,
            _ => indexer_db::DbEnvironment::Dev,
        };

        Ok(Self {
            hub_endpoints,
            strategy,
            redis_url,
            postgres_connection_string: args.postgres_connection_string.clone(),
            db_environment,
            realtime_poll_interval: Duration::from_secs(args.realtime_poll_interval_secs),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn base_args() -> Args {
        Args {
            hubs_json: r#"["https://hub1.example.com"]"#.into(),
            strategy_json: r#"{"rootTargets": [1, 2], "enableClientDiscovery": true}"#.into(),
            redis_host: "127.0.0.1".into(),
            redis_port: 6379,
            redis_password: None,
            redis_db: None,
            postgres_connection_string: "postgres://localhost/indexer".into(),
            db_environment: "dev".into(),
            realtime_poll_interval_secs: 5,
            jwt_secret: "a".repeat(32),
            admin_password: "password".into(),
        }
    }

    #[test]
    fn parses_valid_settings() {
        let settings = Settings::from_args(&base_args()).unwrap();
        assert_eq!(settings.hub_endpoints.len(), 1);
        assert_eq!(settings.strategy.root_targets, vec![Fid::new(1).unwrap(), Fid::new(2).unwrap()]);
        assert!(settings.strategy.enable_client_discovery);
    }

    #[test]
    fn rejects_empty_hub_list() {
        let mut args = base_args();
        args.hubs_json = "[]".into();
        assert!(matches!(Settings::from_args(&args), Err(ConfigError::NoHubs)));
    }

    #[test]
    fn rejects_short_jwt_secret() {
        let mut args = base_args();
        args.jwt_secret = "too-short".into();
        assert!(matches!(Settings::from_args(&args), Err(ConfigError::JwtSecretTooShort)));
    }

    #[test]
    fn rejects_short_admin_password() {
        let mut args = base_args();
        args.admin_password = "short".into();
        assert!(matches!(Settings::from_args(&args), Err(ConfigError::AdminPasswordTooShort)));
    }
}
