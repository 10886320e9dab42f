//! Process configuration (spec.md §6): `config.json` plus environment-sourced
//! exchange credentials.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEndpoints {
    pub api: String,
    pub feed: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    pub exchange: String,
    pub product_type: String,
    pub symbols: Vec<String>,
    pub execution: ExecutionEndpoints,
}

/// Per-instance quoting parameters an operator may pin in `config.json`,
/// overriding whatever defaults the quoting instance would otherwise start
/// with. Optional: most instances start from code defaults and are tuned
/// live via the control protocol (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotingOverride {
    pub symbol: String,
    pub bid_spread_bps: rust_decimal::Decimal,
    pub ask_spread_bps: rust_decimal::Decimal,
    pub skew_bps: rust_decimal::Decimal,
    pub size: rust_decimal::Decimal,
}

/// The deserialised shape of `config.json` (spec.md §6). `ConfigurationError`
/// on a missing file or a parse failure is fatal — the process exits at
/// startup rather than run with a guessed configuration (spec.md §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OmsConfig {
    pub oms_identifier: String,
    pub data_folder: String,
    pub subscriptions: Vec<SubscriptionConfig>,
    #[serde(default)]
    pub quoting_overrides: Vec<QuotingOverride>,
}

impl OmsConfig {
    pub fn from_str(contents: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(contents).map_err(|source| ConfigurationError::Parse {
            path: "<in-memory>".into(),
            source,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigurationError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn instruments_csv_path(&self) -> std::path::PathBuf {
        Path::new(&self.data_folder).join("instruments.csv")
    }
}

/// Looks up `<EXCHANGE>_<API>_API_KEY`/`_API_SECRET` from the process
/// environment (spec.md §6). A pure function over `std::env::var` so it can
/// be exercised in tests without mutating global state.
pub fn env_credentials(exchange: &str, api: &str) -> Option<(String, String)> {
    let prefix = format!("{}_{}", exchange.to_ascii_uppercase(), api.to_ascii_uppercase());
    let key = std::env::var(format!("{prefix}_API_KEY")).ok()?;
    let secret = std::env::var(format!("{prefix}_API_SECRET")).ok()?;
    Some((key, secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let json = r#"{
            "oms_identifier": "mm-1",
            "data_folder": "/var/oms/data",
            "subscriptions": [
                {
                    "exchange": "binance",
                    "product_type": "perpetual",
                    "symbols": ["BTCUSDT"],
                    "execution": {"api": "rest", "feed": "websocket"}
                }
            ]
        }"#;
        let config = OmsConfig::from_str(json).unwrap();
        assert_eq!(config.oms_identifier, "mm-1");
        assert_eq!(config.subscriptions.len(), 1);
        assert!(config.quoting_overrides.is_empty());
        assert_eq!(
            config.instruments_csv_path(),
            std::path::PathBuf::from("/var/oms/data/instruments.csv")
        );
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let err = OmsConfig::from_file("/nonexistent/path/config.json").unwrap_err();
        assert!(matches!(err, ConfigurationError::Read { .. }));
    }

    #[test]
    fn malformed_json_is_a_configuration_error() {
        let err = OmsConfig::from_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse { .. }));
    }

    #[test]
    fn env_credentials_reads_exchange_and_api_scoped_vars() {
        std::env::set_var("BINANCE_REST_API_KEY", "key123");
        std::env::set_var("BINANCE_REST_API_SECRET", "secret456");
        let creds = env_credentials("binance", "rest");
        assert_eq!(creds, Some(("key123".to_string(), "secret456".to_string())));
        std::env::remove_var("BINANCE_REST_API_KEY");
        std::env::remove_var("BINANCE_REST_API_SECRET");
    }

    #[test]
    fn env_credentials_is_none_when_unset() {
        assert_eq!(env_credentials("nonexistent_exchange", "rest"), None);
    }
}
