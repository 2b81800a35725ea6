//! Service configuration.
//!
//! Loaded once at startup from environment variables. Invalid values fail
//! startup; absent values take their defaults.

use std::time::Duration;

use inkless_ledger::LedgerConfig;
use url::Url;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Configuration for the API service.
///
/// Custom `Debug` implementation redacts the database URL, which may carry
/// credentials. The ledger signing key is redacted by [`LedgerConfig`].
#[derive(Clone)]
pub struct AppConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Postgres URL. `None` runs on the in-memory store.
    pub database_url: Option<String>,
    /// Ledger connection settings.
    pub ledger: LedgerConfig,
    /// Bound on each ledger submission or read.
    pub ledger_deadline: Duration,
    /// Maximum items in one offline sync batch.
    pub offline_batch_limit: usize,
    /// Offline items anchored concurrently per batch.
    pub reconcile_concurrency: usize,
    /// Log output format.
    pub log_format: LogFormat,
    /// Serve `/metrics` and record request metrics.
    pub metrics_enabled: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("ledger", &self.ledger)
            .field("ledger_deadline", &self.ledger_deadline)
            .field("offline_batch_limit", &self.offline_batch_limit)
            .field("reconcile_concurrency", &self.reconcile_concurrency)
            .field("log_format", &self.log_format)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `SERVER_HOST` (default: `0.0.0.0`)
    /// - `SERVER_PORT` (default: 8080)
    /// - `DATABASE_URL` (optional)
    /// - `LEDGER_RPC_URL` (default: `http://localhost:8545`)
    /// - `CONTRACT_ADDRESS` (empty selects fallback mode)
    /// - `SIGNER_PRIVATE_KEY`
    /// - `LEDGER_DEADLINE_SECS` (default: 30)
    /// - `OFFLINE_BATCH_LIMIT` (default: 100)
    /// - `RECONCILE_CONCURRENCY` (default: 4)
    /// - `LOG_FORMAT` (`text` or `json`, default: `text`)
    /// - `METRICS_ENABLED` (default: true; `false` disables)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let rpc_raw = var("LEDGER_RPC_URL").unwrap_or_else(|| "http://localhost:8545".to_string());
        let rpc_url = Url::parse(&rpc_raw)
            .map_err(|e| ConfigError::InvalidUrl("LEDGER_RPC_URL".to_string(), e.to_string()))?;

        let deadline_secs: u64 = parse_var(&var, "LEDGER_DEADLINE_SECS", 30)?;
        if deadline_secs == 0 {
            return Err(ConfigError::InvalidNumber(
                "LEDGER_DEADLINE_SECS".to_string(),
                "must be positive".to_string(),
            ));
        }

        let ledger = LedgerConfig::new(
            rpc_url,
            var("CONTRACT_ADDRESS").unwrap_or_default(),
            var("SIGNER_PRIVATE_KEY").unwrap_or_default(),
        )
        .with_timeout_secs(deadline_secs);

        let log_format = match var("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(ConfigError::InvalidLogFormat(other.to_string())),
        };

        Ok(Self {
            host: var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_var(&var, "SERVER_PORT", 8080)?,
            database_url: var("DATABASE_URL"),
            ledger,
            ledger_deadline: Duration::from_secs(deadline_secs),
            offline_batch_limit: parse_var(&var, "OFFLINE_BATCH_LIMIT", 100)?,
            reconcile_concurrency: parse_var(&var, "RECONCILE_CONCURRENCY", 4)?,
            log_format,
            metrics_enabled: var("METRICS_ENABLED")
                .map(|v| !v.trim().eq_ignore_ascii_case("false"))
                .unwrap_or(true),
        })
    }

    /// Socket address string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidNumber(key.to_string(), e.to_string())),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {0}: {1}")]
    InvalidNumber(String, String),
    #[error("LOG_FORMAT must be \"text\" or \"json\", got {0:?}")]
    InvalidLogFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_select_fallback_and_memory() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8080");
        assert!(cfg.database_url.is_none());
        assert!(!cfg.ledger.is_configured());
        assert_eq!(cfg.ledger.rpc_url.as_str(), "http://localhost:8545/");
        assert_eq!(cfg.ledger_deadline, Duration::from_secs(30));
        assert_eq!(cfg.offline_batch_limit, 100);
        assert_eq!(cfg.reconcile_concurrency, 4);
        assert_eq!(cfg.log_format, LogFormat::Text);
        assert!(cfg.metrics_enabled);
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = load(&[
            ("SERVER_PORT", "9090"),
            ("CONTRACT_ADDRESS", "0x5fbdb2315678afecb367f032d93f642f64180aa3"),
            ("LEDGER_DEADLINE_SECS", "5"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 9090);
        assert!(cfg.ledger.is_configured());
        assert_eq!(cfg.ledger.timeout_secs, 5);
        assert_eq!(cfg.ledger_deadline, Duration::from_secs(5));
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn metrics_are_disabled_only_by_false() {
        assert!(!load(&[("METRICS_ENABLED", "false")]).unwrap().metrics_enabled);
        assert!(!load(&[("METRICS_ENABLED", "FALSE")]).unwrap().metrics_enabled);
        assert!(load(&[("METRICS_ENABLED", "true")]).unwrap().metrics_enabled);
        assert!(load(&[("METRICS_ENABLED", "0")]).unwrap().metrics_enabled);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let cfg = load(&[("SERVER_PORT", "  "), ("DATABASE_URL", "")]).unwrap();
        assert_eq!(cfg.port, 8080);
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(matches!(
            load(&[("SERVER_PORT", "eighty")]),
            Err(ConfigError::InvalidNumber(k, _)) if k == "SERVER_PORT"
        ));
        assert!(matches!(
            load(&[("LEDGER_DEADLINE_SECS", "0")]),
            Err(ConfigError::InvalidNumber(..))
        ));
        assert!(matches!(
            load(&[("LEDGER_RPC_URL", "not a url")]),
            Err(ConfigError::InvalidUrl(..))
        ));
        assert!(matches!(
            load(&[("LOG_FORMAT", "xml")]),
            Err(ConfigError::InvalidLogFormat(_))
        ));
    }

    #[test]
    fn debug_redacts_secrets() {
        let cfg = load(&[
            ("DATABASE_URL", "postgres://inkless:hunter2@db/inkless"),
            ("SIGNER_PRIVATE_KEY", "deadbeef"),
        ])
        .unwrap();
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("deadbeef"));
        assert!(debug.contains("[REDACTED]"));
    }
}
