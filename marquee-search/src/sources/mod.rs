//! Raw page retrieval and extraction.
//!
//! A [`PageSource`] turns a URL into a body. [`FetchVariant`]s describe the
//! alternative ways one listing page can be reached, tried in order until one
//! yields ids.

pub(crate) mod consts;
pub mod extract;
pub mod variants;

use std::fmt::Debug;

use async_trait::async_trait;
use marquee_core::config::FetchConfig;

pub use extract::{PageExtract, decode_entities, extract_page, extract_title, extract_title_ids};
pub use variants::{FetchVariant, first_success, variants_from_config};

use crate::errors::SourceError;

/// Anything that can fetch a page body by URL.
#[async_trait]
pub trait PageSource: Send + Sync + Debug {
    /// Fetches `url` and returns its body.
    ///
    /// # Errors
    ///
    /// - `SourceError::Network` - Connection failure or timeout
    /// - `SourceError::Status` - Non-success HTTP status
    async fn fetch_text(&self, url: &str) -> Result<String, SourceError>;
}

/// [`PageSource`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: reqwest::Client,
}

impl HttpPageSource {
    /// Builds a client with the configured timeout and user agent.
    ///
    /// # Errors
    ///
    /// - `SourceError::Provider` - If the HTTP client cannot be constructed
    pub fn new(config: &FetchConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| SourceError::Provider {
                reason: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_text(&self, url: &str) -> Result<String, SourceError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.8")
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}
