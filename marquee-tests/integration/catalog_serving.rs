//! Catalog requests through the HTTP router.

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use marquee_core::catalog::genres::explode;
use marquee_core::catalog::{ListPatch, SurfaceToggles, Visibility};
use marquee_core::storage::InMemorySnapshotStore;
use marquee_core::{ListId, UserRegistry};
use marquee_web::{AppState, build_router};

use crate::fixtures::{
    LIST, get_json, meta_ids, scenario_meta, scenario_pages, service, test_config,
};

const MOVIES: &str = "marquee-u1-ls4103816671-movies";
const SERIES: &str = "marquee-u1-ls4103816671-series";

async fn app(visibility: Option<Visibility>) -> Router {
    let service = service(
        test_config(std::env::temp_dir()),
        scenario_pages(),
        scenario_meta(),
        Arc::new(UserRegistry::in_memory()),
        Arc::new(InMemorySnapshotStore::new()),
    );
    service
        .add_list("u1", LIST, Some("Scenario".to_string()))
        .await
        .unwrap();
    if let Some(visibility) = visibility {
        let patch = ListPatch {
            visibility: Some(visibility),
            ..ListPatch::default()
        };
        service.patch_list("u1", LIST, patch).await.unwrap();
    }
    let list = ListId::parse_source(LIST).unwrap();
    service.refresh_list("u1", &list).await.unwrap();

    build_router(AppState::new(Arc::new(service)))
}

fn home_only() -> Visibility {
    let home = SurfaceToggles {
        discover: false,
        home: true,
    };
    Visibility {
        movie: home,
        series: home,
    }
}

#[tokio::test]
async fn test_home_only_catalog_ignores_genre_requests() {
    let app = app(Some(home_only())).await;

    let filtered = format!("/u1/catalog/series/{SERIES}/genre=Comedy.json");
    let (status, body) = get_json(&app, &filtered).await;
    assert_eq!(status, StatusCode::OK);
    assert!(meta_ids(&body).is_empty());

    let plain = format!("/u1/catalog/series/{SERIES}.json");
    let (_, body) = get_json(&app, &plain).await;
    assert_eq!(meta_ids(&body), vec!["tt0000002", "tt0000003", "tt0000009"]);
}

#[tokio::test]
async fn test_home_only_manifest_offers_top_only() {
    let app = app(Some(home_only())).await;
    let (_, manifest) = get_json(&app, "/u1/manifest.json").await;

    let series = manifest["catalogs"]
        .as_array()
        .unwrap()
        .iter()
        .find(|catalog| catalog["id"] == SERIES)
        .unwrap();
    let genre = series["extra"]
        .as_array()
        .unwrap()
        .iter()
        .find(|field| field["name"] == "genre")
        .unwrap();
    assert_eq!(genre["options"], serde_json::json!(["Top"]));
    assert_eq!(genre["isRequired"], false);
}

#[tokio::test]
async fn test_compound_genre_matches_constituent() {
    let expected: std::collections::BTreeSet<String> =
        ["Sci-Fi", "Fantasy"].iter().map(|g| g.to_string()).collect();
    assert_eq!(explode("Sci-Fi & Fantasy"), expected);

    let app = app(None).await;
    let uri = format!("/u1/catalog/series/{SERIES}/genre=Fantasy.json");
    let (_, body) = get_json(&app, &uri).await;
    assert_eq!(meta_ids(&body), vec!["tt0000002"]);
}

#[tokio::test]
async fn test_sorted_and_paged_catalog() {
    let app = app(None).await;

    let uri = format!("/u1/catalog/series/{SERIES}?sort=name&order=desc");
    let (_, body) = get_json(&app, &uri).await;
    assert_eq!(meta_ids(&body), vec!["tt0000009", "tt0000003", "tt0000002"]);

    let uri = format!("/u1/catalog/series/{SERIES}/skip=1.json?sort=added");
    let (_, body) = get_json(&app, &uri).await;
    assert_eq!(meta_ids(&body), vec!["tt0000003", "tt0000009"]);
}

#[tokio::test]
async fn test_movie_catalog_excludes_series_winners() {
    let app = app(None).await;
    let uri = format!("/u1/catalog/movie/{MOVIES}.json");
    let (_, body) = get_json(&app, &uri).await;
    assert_eq!(meta_ids(&body), vec!["tt0000001"]);
}
