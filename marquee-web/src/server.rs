//! Addon HTTP server.
//!
//! All routes share one [`AppState`] holding the catalog service. Addon
//! routes never fail outward; the list API maps errors onto status codes.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use marquee_core::MarqueeConfig;
use marquee_search::CatalogService;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    add_list, catalog, catalog_with_extra, health, list_lists, manifest, patch_list, refresh_list,
    remove_list,
};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CatalogService>,
}

impl AppState {
    pub fn new(service: Arc<CatalogService>) -> Self {
        Self { service }
    }
}

/// Builds the full route table around `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Addon protocol
        .route("/{uid}/manifest.json", get(manifest))
        .route("/{uid}/catalog/{kind}/{id}", get(catalog))
        .route("/{uid}/catalog/{kind}/{id}/{extra}", get(catalog_with_extra))
        // Catalog ids carry the uid, so clients may omit the path prefix
        .route("/catalog/{kind}/{id}", get(catalog))
        .route("/catalog/{kind}/{id}/{extra}", get(catalog_with_extra))
        // List management API
        .route("/api/{uid}/lists", get(list_lists).post(add_list))
        .route(
            "/api/{uid}/lists/{list}",
            axum::routing::patch(patch_list).delete(remove_list),
        )
        .route("/api/{uid}/lists/{list}/refresh", post(refresh_list))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Opens the production pipeline and serves until the listener fails.
///
/// # Errors
///
/// - `MarqueeError` - If the user registry cannot be loaded
/// - `std::io::Error` - If the listen address cannot be bound
pub async fn run_server(config: MarqueeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let service = Arc::new(CatalogService::open(config).await?);

    let users = service.registry().users().await.len();
    tracing::info!("Loaded {} registered users", users);

    let app = build_router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Marquee addon running on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
