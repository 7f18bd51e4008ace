//! Shared upstream fixtures.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use marquee_core::cache::ManualClock;
use marquee_core::storage::SnapshotStore;
use marquee_core::{Bucket, MarqueeConfig, UserRegistry};
use marquee_search::CatalogService;
use marquee_search::testing::{
    ScriptedPageSource, StaticMetadataSource, list_page_html, title_page_html,
};
use serde_json::Value;
use tower::ServiceExt;

pub const LIST: &str = "ls4103816671";

/// tt1 movie only, tt2 series only, tt3 both, tt4 an episode of tt9.
pub fn scenario_pages() -> ScriptedPageSource {
    ScriptedPageSource::new()
        .with_page(
            format!("https://www.imdb.com/list/{LIST}/?page=1"),
            list_page_html(
                "Scenario",
                &["tt0000001", "tt0000002", "tt0000003", "tt0000004"],
            ),
        )
        .with_page(
            "https://www.imdb.com/title/tt0000004/",
            title_page_html("Pilot", "TVEpisode", Some("tt0000009")),
        )
}

pub fn scenario_meta() -> StaticMetadataSource {
    StaticMetadataSource::new()
        .with_meta(Bucket::Movie, "tt0000001", "Alpha", &["Comedy"])
        .with_meta(Bucket::Series, "tt0000002", "Beta", &["Sci-Fi & Fantasy"])
        .with_meta(Bucket::Movie, "tt0000003", "Gamma", &["Drama"])
        .with_meta(Bucket::Series, "tt0000003", "Gamma", &["Drama", "Comedy"])
        .with_meta(Bucket::Series, "tt0000009", "Parent Show", &["Comedy"])
}

pub fn test_config(data_dir: std::path::PathBuf) -> MarqueeConfig {
    let mut config = MarqueeConfig::for_testing(data_dir);
    config.fetch.relay_prefixes.clear();
    config
}

pub fn service(
    config: MarqueeConfig,
    pages: ScriptedPageSource,
    meta: StaticMetadataSource,
    registry: Arc<UserRegistry>,
    snapshots: Arc<dyn SnapshotStore>,
) -> CatalogService {
    CatalogService::new(
        config,
        Arc::new(pages),
        Arc::new(meta),
        registry,
        snapshots,
        Arc::new(ManualClock::new()),
    )
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

pub fn meta_ids(body: &Value) -> Vec<String> {
    body["metas"]
        .as_array()
        .unwrap()
        .iter()
        .map(|meta| meta["id"].as_str().unwrap().to_string())
        .collect()
}
