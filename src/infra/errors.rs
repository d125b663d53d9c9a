// src/infra/errors.rs — Error types for livetrack

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LiveTrackError {
    // Upstream errors (retriable)
    #[error("Transport error calling {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    #[error("Upstream '{endpoint}' returned result {code}: {body}")]
    UpstreamLogic {
        endpoint: String,
        code: i64,
        body: String,
    },

    #[error("Live listing did not terminate below page size {ceiling}")]
    PageSizeExceeded { ceiling: u64 },

    // Deterministic errors (never retried)
    #[error("Malformed response from {endpoint}: {message}")]
    Parse { endpoint: String, message: String },

    #[error("Expected exactly one numeric segment in '{url}', found {matches}")]
    Extraction { url: String, matches: usize },

    #[error("Cannot classify recording URLs: {primary} primary, {backup} backup")]
    Disambiguation { primary: usize, backup: usize },

    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<LiveTrackError>,
    },

    // Infra
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LiveTrackError {
    /// Transport hiccups and upstream-side refusals can clear up on their own;
    /// malformed payloads cannot.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            LiveTrackError::Transport { .. }
                | LiveTrackError::UpstreamLogic { .. }
                | LiveTrackError::PageSizeExceeded { .. }
        )
    }

    pub fn transport(endpoint: &str, err: reqwest::Error) -> Self {
        LiveTrackError::Transport {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        }
    }

    pub fn parse(endpoint: &str, message: impl std::fmt::Display) -> Self {
        LiveTrackError::Parse {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
        }
    }
}
