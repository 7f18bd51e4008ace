//! Durable state across service restarts.

use std::sync::Arc;

use marquee_core::catalog::CatalogQuery;
use marquee_core::storage::FileSnapshotStore;
use marquee_core::storage::test_fixtures::create_temp_data_dir;
use marquee_core::{Bucket, ListId, MarqueeConfig, UserRegistry};
use marquee_search::CatalogService;
use marquee_search::testing::{ScriptedPageSource, StaticMetadataSource};

use crate::fixtures::{LIST, scenario_meta, scenario_pages, service, test_config};

async fn open(
    config: &MarqueeConfig,
    pages: ScriptedPageSource,
    meta: StaticMetadataSource,
) -> CatalogService {
    let registry = UserRegistry::open(
        config.storage.users_path(),
        config.storage.temp_file_suffix,
    )
    .await
    .unwrap();
    let snapshots = FileSnapshotStore::new(
        config.storage.snapshots_dir(),
        config.storage.temp_file_suffix,
    );
    service(
        config.clone(),
        pages,
        meta,
        Arc::new(registry),
        Arc::new(snapshots),
    )
}

#[tokio::test]
async fn test_added_list_id_persists_exactly() {
    let (_temp_dir, data_dir) = create_temp_data_dir();
    let config = test_config(data_dir);

    let service = open(&config, scenario_pages(), scenario_meta()).await;
    let entry = service
        .add_list(
            "u1",
            "https://example.com/list/ls4103816671/?foo=bar",
            Some("Picks".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(entry.id.as_str(), LIST);
    drop(service);

    let raw = std::fs::read_to_string(config.storage.users_path()).unwrap();
    assert!(raw.contains("\"ls4103816671\""));

    let reopened = open(&config, ScriptedPageSource::new(), StaticMetadataSource::new()).await;
    let lists = reopened.lists("u1").await;
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].id.as_str(), LIST);
    assert_eq!(lists[0].name, "Picks");
}

#[tokio::test]
async fn test_snapshot_serves_catalog_after_restart() {
    let (_temp_dir, data_dir) = create_temp_data_dir();
    let config = test_config(data_dir);
    let list = ListId::parse_source(LIST).unwrap();

    let service = open(&config, scenario_pages(), scenario_meta()).await;
    service
        .add_list("u1", LIST, Some("Scenario".to_string()))
        .await
        .unwrap();
    service.refresh_list("u1", &list).await.unwrap();
    drop(service);

    // Upstream is gone; only the snapshot can answer.
    let reopened = open(&config, ScriptedPageSource::new(), StaticMetadataSource::new()).await;
    let movies = reopened
        .query_catalog("u1", &list, Bucket::Movie, CatalogQuery::default())
        .await;
    let ids: Vec<&str> = movies.iter().map(|item| item.id.as_str()).collect();
    assert_eq!(ids, vec!["tt0000001"]);

    let series = reopened
        .query_catalog("u1", &list, Bucket::Series, CatalogQuery::default())
        .await;
    assert_eq!(series.len(), 3);
}

#[tokio::test]
async fn test_refresh_against_dead_upstream_keeps_snapshots() {
    let (_temp_dir, data_dir) = create_temp_data_dir();
    let config = test_config(data_dir);
    let list = ListId::parse_source(LIST).unwrap();

    let service = open(&config, scenario_pages(), scenario_meta()).await;
    service
        .add_list("u1", LIST, Some("Scenario".to_string()))
        .await
        .unwrap();
    service.refresh_list("u1", &list).await.unwrap();
    drop(service);

    let reopened = open(&config, ScriptedPageSource::new(), StaticMetadataSource::new()).await;
    assert!(reopened.refresh_list("u1", &list).await.is_err());

    let series = reopened
        .query_catalog("u1", &list, Bucket::Series, CatalogQuery::default())
        .await;
    assert_eq!(series.len(), 3);
    assert!(reopened.has_type("u1", &list, Bucket::Movie).await);
}

#[tokio::test]
async fn test_removed_list_leaves_nothing_behind() {
    let (_temp_dir, data_dir) = create_temp_data_dir();
    let config = test_config(data_dir);
    let list = ListId::parse_source(LIST).unwrap();

    let service = open(&config, scenario_pages(), scenario_meta()).await;
    service
        .add_list("u1", LIST, Some("Scenario".to_string()))
        .await
        .unwrap();
    service.refresh_list("u1", &list).await.unwrap();
    service.remove_list("u1", LIST).await.unwrap();

    let list_dir = config.storage.snapshots_dir().join("u1").join(LIST);
    assert!(!list_dir.exists());

    let reopened = open(&config, ScriptedPageSource::new(), StaticMetadataSource::new()).await;
    assert!(reopened.lists("u1").await.is_empty());
}
