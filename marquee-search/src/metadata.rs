//! Title metadata lookups against a Cinemeta-compatible service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use marquee_core::cache::{Clock, TtlCache, keys};
use marquee_core::config::{CacheConfig, MetadataConfig};
use marquee_core::{Bucket, MetaRecord, TitleId};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::SourceError;

/// Source of per-type title metadata.
#[async_trait]
pub trait MetadataSource: Send + Sync + std::fmt::Debug {
    /// Looks up `id` as `bucket`. `Ok(None)` means the service has no such
    /// record.
    ///
    /// # Errors
    ///
    /// - `SourceError::Network` - Connection failure or timeout
    /// - `SourceError::Status` - Non-success HTTP status other than 404
    /// - `SourceError::Parse` - Response body was not a metadata document
    async fn fetch_meta(
        &self,
        bucket: Bucket,
        id: &TitleId,
    ) -> Result<Option<MetaRecord>, SourceError>;
}

/// HTTP client for `GET {base}/meta/{type}/{id}.json`.
#[derive(Debug, Clone)]
pub struct CinemetaClient {
    client: reqwest::Client,
    base_url: String,
}

/// Response envelope: `{ "meta": { ... } }`.
#[derive(Debug, Deserialize)]
struct MetaEnvelope {
    meta: Option<CinemetaMeta>,
}

/// Upstream record. Scalar fields arrive as strings or numbers depending on
/// the title, so they are taken as raw JSON values.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CinemetaMeta {
    id: Option<String>,
    name: Option<String>,
    poster: Option<String>,
    background: Option<String>,
    logo: Option<String>,
    release_info: Option<Value>,
    year: Option<Value>,
    #[serde(default)]
    genres: Option<Vec<String>>,
    #[serde(default)]
    genre: Option<Vec<String>>,
    imdb_rating: Option<Value>,
    runtime: Option<Value>,
    description: Option<String>,
    #[serde(default)]
    cast: Option<Vec<String>>,
    #[serde(default)]
    director: Option<Value>,
}

impl CinemetaClient {
    /// Creates a client for the configured service.
    ///
    /// # Errors
    ///
    /// - `SourceError::Provider` - If the HTTP client cannot be constructed
    pub fn new(config: &MetadataConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SourceError::Provider {
                reason: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn meta_url(&self, bucket: Bucket, id: &TitleId) -> String {
        format!("{}/meta/{}/{}.json", self.base_url, bucket.as_str(), id)
    }
}

#[async_trait]
impl MetadataSource for CinemetaClient {
    async fn fetch_meta(
        &self,
        bucket: Bucket,
        id: &TitleId,
    ) -> Result<Option<MetaRecord>, SourceError> {
        let url = self.meta_url(bucket, id);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        parse_meta_document(&body, id)
    }
}

/// Parses a `{ "meta": ... }` document. A record without a name counts as
/// missing.
///
/// # Errors
///
/// - `SourceError::Parse` - If the body is not valid JSON of that shape
pub fn parse_meta_document(body: &str, id: &TitleId) -> Result<Option<MetaRecord>, SourceError> {
    let envelope: MetaEnvelope =
        serde_json::from_str(body).map_err(|e| SourceError::Parse {
            reason: format!("Invalid metadata for {id}: {e}"),
        })?;
    Ok(envelope.meta.and_then(|meta| normalize(meta, id)))
}

fn normalize(meta: CinemetaMeta, id: &TitleId) -> Option<MetaRecord> {
    let name = meta.name.map(|name| name.trim().to_string())?;
    if name.is_empty() {
        return None;
    }

    Some(MetaRecord {
        id: meta.id.unwrap_or_else(|| id.to_string()),
        name,
        poster: non_empty(meta.poster),
        background: non_empty(meta.background),
        logo: non_empty(meta.logo),
        release_info: meta
            .release_info
            .and_then(scalar_string)
            .or_else(|| meta.year.and_then(scalar_string)),
        genres: meta.genres.or(meta.genre).unwrap_or_default(),
        imdb_rating: meta.imdb_rating.and_then(scalar_string),
        runtime: meta.runtime.and_then(scalar_string),
        description: non_empty(meta.description),
        cast: meta.cast.unwrap_or_default(),
        director: meta.director.map(string_list).unwrap_or_default(),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty() && v != "N/A")
}

fn scalar_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(Some(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_list(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.into_iter().filter_map(scalar_string).collect(),
        other => scalar_string(other).into_iter().collect(),
    }
}

/// Cached metadata lookups.
///
/// Every (bucket, id) pair reaches the upstream at most once per cache
/// window. Missing records are cached too, for a shorter time.
#[derive(Debug)]
pub struct MetadataResolver {
    source: Arc<dyn MetadataSource>,
    cache: TtlCache<Option<MetaRecord>>,
    ttl: Duration,
    negative_ttl: Duration,
}

impl MetadataResolver {
    pub fn new(
        source: Arc<dyn MetadataSource>,
        config: &CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            cache: TtlCache::new(clock, config.sweep_threshold),
            ttl: config.meta_ttl,
            negative_ttl: config.negative_meta_ttl,
        }
    }

    /// Metadata for `id` as `bucket`, or `None`. Upstream failures are
    /// logged and reported as `None`; only definite answers are cached.
    pub async fn get_meta(&self, bucket: Bucket, id: &TitleId) -> Option<MetaRecord> {
        let key = keys::meta(bucket, id);
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        match self.source.fetch_meta(bucket, id).await {
            Ok(Some(record)) => {
                self.cache.set(key, Some(record.clone()), self.ttl);
                Some(record)
            }
            Ok(None) => {
                self.cache.set(key, None, self.negative_ttl);
                None
            }
            Err(e) => {
                tracing::debug!("Metadata lookup for {} {} failed: {}", bucket, id, e);
                None
            }
        }
    }

    /// Number of cached lookups, positive and negative.
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}
