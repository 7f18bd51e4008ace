//! Classification of a mixed list into movie and series buckets.

use std::sync::Arc;

use marquee_core::storage::{InMemorySnapshotStore, SnapshotStore};
use marquee_core::{Bucket, ClassifiedItem, ListId, UserRegistry};

use crate::fixtures::{LIST, scenario_meta, scenario_pages, service, test_config};

fn ids(items: &[ClassifiedItem]) -> Vec<&str> {
    items.iter().map(|item| item.id.as_str()).collect()
}

#[tokio::test]
async fn test_mixed_list_classification() {
    let service = service(
        test_config(std::env::temp_dir()),
        scenario_pages(),
        scenario_meta(),
        Arc::new(UserRegistry::in_memory()),
        Arc::new(InMemorySnapshotStore::new()),
    );
    let list = ListId::parse_source(LIST).unwrap();

    let (fetched, outcome) = service.classify_list(&list).await;
    assert_eq!(fetched.title, "Scenario");
    assert_eq!(fetched.ids.len(), 4);

    assert_eq!(ids(&outcome.movies), vec!["tt0000001"]);
    assert_eq!(
        ids(&outcome.series),
        vec!["tt0000002", "tt0000003", "tt0000009"]
    );
    assert_eq!(outcome.episode_map.len(), 1);
    assert_eq!(outcome.episode_map[0].episode.as_str(), "tt0000004");
    assert_eq!(outcome.episode_map[0].parent.as_str(), "tt0000009");
    assert!(outcome.excluded.is_empty());

    let orders: Vec<usize> = outcome.series.iter().map(|item| item.added_order).collect();
    assert_eq!(orders, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_refresh_then_query_uses_snapshot() {
    let snapshots = Arc::new(InMemorySnapshotStore::new());
    let service = service(
        test_config(std::env::temp_dir()),
        scenario_pages(),
        scenario_meta(),
        Arc::new(UserRegistry::in_memory()),
        snapshots.clone(),
    );
    service
        .add_list("u1", LIST, Some("Scenario".to_string()))
        .await
        .unwrap();
    let list = ListId::parse_source(LIST).unwrap();

    let report = service.refresh_list("u1", &list).await.unwrap();
    assert_eq!(report.fetched, 4);
    assert_eq!(report.movies, 1);
    assert_eq!(report.series, 3);

    let stored = snapshots
        .load("u1", &list, Bucket::Series)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ids(&stored), vec!["tt0000002", "tt0000003", "tt0000009"]);
}
