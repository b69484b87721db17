use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PokedexError {
    #[error("request to {url} failed: {message}")]
    #[diagnostic(help("check your network connection and try again"))]
    Network { url: String, message: String },

    #[error("{url} returned status {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    #[error("unexpected response from {url}: {message}")]
    Parse { url: String, message: String },

    #[error("pokemon not found: {0}")]
    PokemonNotFound(String),

    #[error("invalid page size: {0} (must be greater than zero)")]
    InvalidPageSize(usize),

    #[error("catalog load cancelled")]
    Cancelled,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl PokedexError {
    pub fn is_network(&self) -> bool {
        matches!(self, PokedexError::Network { .. } | PokedexError::Status { .. })
    }

    /// Whether a failed catalog load is worth offering a retry for.
    pub fn is_retryable_load(&self) -> bool {
        self.is_network() || matches!(self, PokedexError::Parse { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_grouping() {
        let status = PokedexError::Status {
            url: "https://example.test".to_string(),
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(status.is_network());
        assert!(status.is_retryable_load());

        let parse = PokedexError::Parse {
            url: "https://example.test".to_string(),
            message: "missing field".to_string(),
        };
        assert!(!parse.is_network());
        assert!(parse.is_retryable_load());

        assert!(!PokedexError::Cancelled.is_retryable_load());
        assert!(!PokedexError::InvalidPageSize(0).is_retryable_load());
    }
}
