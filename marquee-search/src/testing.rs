//! Scripted upstream sources for tests.
//!
//! Compiled for this crate's own tests and for dependents that enable the
//! `test-utils` feature.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use marquee_core::{Bucket, MetaRecord, TitleId};
use parking_lot::Mutex;

use crate::errors::SourceError;
use crate::metadata::MetadataSource;
use crate::sources::PageSource;

/// Page source answering from a fixed URL → body table.
///
/// Unknown URLs fail with a 404 status. Every request is recorded.
#[derive(Debug, Default)]
pub struct ScriptedPageSource {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedPageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl PageSource for ScriptedPageSource {
    async fn fetch_text(&self, url: &str) -> Result<String, SourceError> {
        self.requests.lock().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| SourceError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// Metadata source answering from a fixed table.
#[derive(Debug, Default)]
pub struct StaticMetadataSource {
    records: HashMap<(Bucket, TitleId), MetaRecord>,
    calls: AtomicUsize,
}

impl StaticMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a record named `name` with `genres`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a valid title id.
    pub fn with_meta(self, bucket: Bucket, id: &str, name: &str, genres: &[&str]) -> Self {
        let record = MetaRecord {
            id: id.to_string(),
            name: name.to_string(),
            genres: genres.iter().map(|genre| genre.to_string()).collect(),
            ..MetaRecord::default()
        };
        self.with_record(bucket, id, record)
    }

    /// Registers a full record.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a valid title id.
    pub fn with_record(mut self, bucket: Bucket, id: &str, record: MetaRecord) -> Self {
        self.records
            .insert((bucket, TitleId::parse(id).unwrap()), record);
        self
    }

    /// Number of upstream lookups served, hits and misses alike.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataSource for StaticMetadataSource {
    async fn fetch_meta(
        &self,
        bucket: Bucket,
        id: &TitleId,
    ) -> Result<Option<MetaRecord>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.get(&(bucket, id.clone())).cloned())
    }
}

/// Minimal listing page linking `ids` under an `<h1>` of `title`.
pub fn list_page_html(title: &str, ids: &[&str]) -> String {
    let links: String = ids
        .iter()
        .map(|id| format!(r#"<li><a href="/title/{id}/?ref_=ls">{id}</a></li>"#))
        .collect();
    format!(
        "<html><head><title>{title} - IMDb</title></head>\
         <body><h1>{title}</h1><ul>{links}</ul></body></html>"
    )
}

/// Title page carrying a linked-data block of `ld_type`, optionally part of
/// the series `parent`.
pub fn title_page_html(name: &str, ld_type: &str, parent: Option<&str>) -> String {
    let part_of = parent
        .map(|parent| {
            format!(r#","partOfSeries":{{"@type":"TVSeries","url":"https://www.imdb.com/title/{parent}/"}}"#)
        })
        .unwrap_or_default();
    format!(
        r#"<html><head>
        <meta property="og:title" content="{name} - IMDb">
        <script type="application/ld+json">{{"@type":"{ld_type}","name":"{name}"{part_of}}}</script>
        </head><body><h1>{name}</h1></body></html>"#
    )
}
