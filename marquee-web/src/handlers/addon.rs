//! Addon protocol handlers: manifest and catalog pages.
//!
//! Catalog handlers always answer `200` with a `metas` array. Unknown ids,
//! type mismatches and gated requests yield an empty array so clients never
//! see an error page.

use std::collections::HashMap;

use axum::extract::{Path, Query, RawPathParams, State};
use axum::response::Json;
use marquee_core::catalog::{CatalogQuery, Manifest, parse_catalog_id};
use marquee_core::{Bucket, ClassifiedItem};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::extra::{parse_extra, strip_json};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub metas: Vec<ClassifiedItem>,
}

impl CatalogResponse {
    fn empty() -> Self {
        Self { metas: Vec::new() }
    }
}

/// Decoded catalog path. `uid` is absent on the shared routes.
#[derive(Debug, Deserialize)]
pub struct CatalogPath {
    pub uid: Option<String>,
    pub kind: String,
    pub id: String,
}

pub async fn manifest(State(state): State<AppState>, Path(uid): Path<String>) -> Json<Manifest> {
    Json(state.service.manifest(&uid).await)
}

pub async fn catalog(
    State(state): State<AppState>,
    Path(path): Path<CatalogPath>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<CatalogResponse> {
    Json(serve_catalog(&state, &path, HashMap::new(), query).await)
}

pub async fn catalog_with_extra(
    State(state): State<AppState>,
    Path(path): Path<CatalogPath>,
    raw: RawPathParams,
    Query(query): Query<HashMap<String, String>>,
) -> Json<CatalogResponse> {
    // The extra segment is parsed from its raw form so encoded separators
    // inside values are not split on.
    let extra = raw
        .iter()
        .find(|(name, _)| *name == "extra")
        .map(|(_, value)| parse_extra(value))
        .unwrap_or_default();
    Json(serve_catalog(&state, &path, extra, query).await)
}

async fn serve_catalog(
    state: &AppState,
    path: &CatalogPath,
    extra: HashMap<String, String>,
    query: HashMap<String, String>,
) -> CatalogResponse {
    let id = strip_json(&path.id);
    let prefix = &state.service.config().catalog.id_prefix;
    let Some(target) = parse_catalog_id(prefix, id) else {
        tracing::debug!("Unrecognized catalog id {:?}", id);
        return CatalogResponse::empty();
    };

    if path.uid.as_deref().is_some_and(|uid| uid != target.uid) {
        tracing::debug!("Catalog {} requested under foreign user path", id);
        return CatalogResponse::empty();
    }
    match path.kind.parse::<Bucket>() {
        Ok(bucket) if bucket == target.bucket => {}
        _ => {
            tracing::debug!("Catalog {} requested as type {:?}", id, path.kind);
            return CatalogResponse::empty();
        }
    }

    // Query string parameters override the extra segment.
    let mut params = extra;
    params.extend(query);
    let query = CatalogQuery::from_params(&params);

    let metas = state
        .service
        .query_catalog(&target.uid, &target.list, target.bucket, query)
        .await;
    CatalogResponse { metas }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use marquee_core::cache::ManualClock;
    use marquee_core::catalog::{ListPatch, SurfaceToggles, Visibility};
    use marquee_core::storage::InMemorySnapshotStore;
    use marquee_core::{Bucket, MarqueeConfig, UserRegistry};
    use marquee_search::CatalogService;
    use marquee_search::testing::{ScriptedPageSource, StaticMetadataSource, list_page_html};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::server::{AppState, build_router};

    const LIST: &str = "ls4103816671";
    const MOVIES: &str = "marquee-u1-ls4103816671-movies";

    async fn app(visibility: Option<Visibility>) -> Router {
        let mut config = MarqueeConfig::for_testing(std::env::temp_dir());
        config.fetch.relay_prefixes.clear();
        let pages = ScriptedPageSource::new().with_page(
            format!("https://www.imdb.com/list/{LIST}/?page=1"),
            list_page_html("Mixed Bag", &["tt0000001", "tt0000002", "tt0000003"]),
        );
        let meta = StaticMetadataSource::new()
            .with_meta(Bucket::Movie, "tt0000001", "Alpha", &["Comedy"])
            .with_meta(Bucket::Series, "tt0000002", "Beta", &["Sci-Fi & Fantasy"])
            .with_meta(Bucket::Movie, "tt0000003", "Gamma", &["Drama", "Comedy"]);
        let service = CatalogService::new(
            config,
            Arc::new(pages),
            Arc::new(meta),
            Arc::new(UserRegistry::in_memory()),
            Arc::new(InMemorySnapshotStore::new()),
            Arc::new(ManualClock::new()),
        );

        service
            .add_list("u1", LIST, Some("Mixed Bag".to_string()))
            .await
            .unwrap();
        if visibility.is_some() {
            let patch = ListPatch {
                visibility,
                ..ListPatch::default()
            };
            service.patch_list("u1", LIST, patch).await.unwrap();
        }

        build_router(AppState::new(Arc::new(service)))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn meta_names(body: &Value) -> Vec<String> {
        body["metas"]
            .as_array()
            .unwrap()
            .iter()
            .map(|meta| meta["name"].as_str().unwrap().to_string())
            .collect()
    }

    fn home_only_movies() -> Visibility {
        Visibility {
            movie: SurfaceToggles {
                discover: false,
                home: true,
            },
            series: SurfaceToggles::BOTH,
        }
    }

    #[tokio::test]
    async fn test_manifest_lists_both_catalogs() {
        let (status, body) = get_json(app(None).await, "/u1/manifest.json").await;
        assert_eq!(status, StatusCode::OK);

        let ids: Vec<&str> = body["catalogs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|catalog| catalog["id"].as_str().unwrap())
            .collect();
        assert!(ids.contains(&MOVIES));
        assert!(ids.contains(&"marquee-u1-ls4103816671-series"));
    }

    #[tokio::test]
    async fn test_unknown_user_manifest_has_no_catalogs() {
        let (status, body) = get_json(app(None).await, "/nobody/manifest.json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["catalogs"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_catalog_serves_movies_in_list_order() {
        let uri = format!("/u1/catalog/movie/{MOVIES}.json");
        let (status, body) = get_json(app(None).await, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(meta_names(&body), vec!["Alpha", "Gamma"]);
    }

    #[tokio::test]
    async fn test_shared_route_recovers_user_from_id() {
        let uri = format!("/catalog/movie/{MOVIES}/search=gam.json");
        let (_, body) = get_json(app(None).await, &uri).await;
        assert_eq!(meta_names(&body), vec!["Gamma"]);
    }

    #[tokio::test]
    async fn test_encoded_compound_genre_in_extra() {
        let uri = "/u1/catalog/series/marquee-u1-ls4103816671-series/genre=Sci-Fi%20%26%20Fantasy.json";
        let (_, body) = get_json(app(None).await, uri).await;
        assert_eq!(meta_names(&body), vec!["Beta"]);
    }

    #[tokio::test]
    async fn test_query_string_overrides_extra() {
        let uri = format!("/u1/catalog/movie/{MOVIES}/genre=Drama.json?genre=Comedy");
        let (_, body) = get_json(app(None).await, &uri).await;
        assert_eq!(meta_names(&body), vec!["Alpha", "Gamma"]);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_empty() {
        let uri = format!("/u1/catalog/series/{MOVIES}.json");
        let (status, body) = get_json(app(None).await, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert!(meta_names(&body).is_empty());
    }

    #[tokio::test]
    async fn test_foreign_user_path_is_empty() {
        let uri = format!("/u2/catalog/movie/{MOVIES}.json");
        let (_, body) = get_json(app(None).await, &uri).await;
        assert!(meta_names(&body).is_empty());
    }

    #[tokio::test]
    async fn test_malformed_catalog_id_is_empty() {
        let (status, body) = get_json(app(None).await, "/u1/catalog/movie/garbage.json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(meta_names(&body).is_empty());
    }

    #[tokio::test]
    async fn test_home_only_catalog_rejects_genre_filter() {
        let filtered = format!("/u1/catalog/movie/{MOVIES}/genre=Comedy.json");
        let (_, body) = get_json(app(Some(home_only_movies())).await, &filtered).await;
        assert!(meta_names(&body).is_empty());

        let top = format!("/u1/catalog/movie/{MOVIES}/genre=Top.json");
        let (_, body) = get_json(app(Some(home_only_movies())).await, &top).await;
        assert_eq!(meta_names(&body), vec!["Alpha", "Gamma"]);
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(app(None).await, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
