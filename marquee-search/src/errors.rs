//! Error types for upstream page and metadata retrieval.

use thiserror::Error;

/// Errors raised while talking to upstream sources.
///
/// These stay inside the crate's retrieval layer: public fetch, resolve and
/// classify operations log them and degrade to "no data".
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network communication failed or timed out.
    #[error("Network error: {reason}")]
    Network {
        /// The reason for the network error
        reason: String,
    },

    /// Upstream answered with a non-success status.
    #[error("Unexpected status {status} from {url}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code received
        status: u16,
    },

    /// Response body could not be interpreted.
    #[error("Parse error: {reason}")]
    Parse {
        /// The reason for the parse error
        reason: String,
    },

    /// Source could not be set up or is unusable.
    #[error("Provider error: {reason}")]
    Provider {
        /// The reason for the provider error
        reason: String,
    },
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => SourceError::Status {
                url: e.url().map(|url| url.to_string()).unwrap_or_default(),
                status: status.as_u16(),
            },
            None => SourceError::Network {
                reason: e.to_string(),
            },
        }
    }
}
