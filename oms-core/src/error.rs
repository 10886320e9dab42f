//! Central error type for the OMS process, aggregating every subsystem's
//! `thiserror` enum into one type the top-level engine loop can match on
//! (spec.md §7).

use oms_book::error::BookError;
use oms_execution::error::ExecutionError;
use oms_instrument::instrument::InstrumentRegistryError;
use oms_instrument::num::NumError;
use oms_integration::error::SocketError;
use oms_risk::check::RiskCheckError;
use thiserror::Error;

/// Fatal configuration problems: a missing key, an unreadable file, a
/// malformed `config.json`. Always a startup-time error (spec.md §7
/// `ConfigurationError`): the process exits rather than degrading.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing required environment variable: {0}")]
    MissingCredentials(String),
}

/// The top-level error type for the OMS process, mirroring the teacher's
/// `ToucanError` aggregation of subsystem errors via `#[from]`.
#[derive(Debug, Error)]
pub enum OmsError {
    #[error("order book error: {0}")]
    Book(#[from] BookError),

    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("risk check breached: {0}")]
    Risk(#[from] RiskCheckError),

    #[error("instrument registry error: {0}")]
    Instrument(#[from] InstrumentRegistryError),

    #[error("numeric conversion error: {0}")]
    Num(#[from] NumError),

    #[error("integration plumbing error: {0}")]
    Integration(#[from] SocketError),

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// An unhandled exception in a consumer thread/task (spec.md §7
    /// `Fatal`): logged at `ERROR`, triggers best-effort shutdown.
    #[error("fatal error: {0}")]
    Fatal(String),

    #[error("async task join error: {0}")]
    Join(String),
}

impl From<tokio::task::JoinError> for OmsError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Join(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_error_converts_via_from() {
        let err: OmsError = BookError::UnexpectedBestBookUpdateCount(3).into();
        assert!(matches!(err, OmsError::Book(_)));
    }
}
