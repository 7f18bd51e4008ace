//! Catalog orchestration.
//!
//! [`CatalogService`] owns every piece of shared state: the in-memory caches,
//! the user registry and the snapshot store. Handlers and the CLI reach the
//! pipeline only through it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use marquee_core::cache::{Clock, SystemClock, TtlCache, keys};
use marquee_core::catalog::{
    CatalogQuery, ListPatch, Manifest, ManifestList, TypeProbe, TypeStats, UserListEntry,
    build_manifest, genres, run_query,
};
use marquee_core::storage::{FileSnapshotStore, SnapshotStore};
use marquee_core::{
    Bucket, ClassifiedItem, ListError, ListId, MarqueeConfig, MarqueeError, Result, TitleId,
    UserRegistry,
};
use parking_lot::Mutex;
use serde::Serialize;

use crate::classifier::{ClassificationOutcome, EpisodeMapping, TypeClassifier};
use crate::fetcher::{FetchedList, ListFetcher};
use crate::inspector::TitleInspector;
use crate::metadata::{CinemetaClient, MetadataResolver, MetadataSource};
use crate::sources::{HttpPageSource, PageSource};

/// Summary of one full classification pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub list: ListId,
    pub title: String,
    pub fetched: usize,
    pub movies: usize,
    pub series: usize,
    pub excluded: Vec<TitleId>,
    pub episode_map: Vec<EpisodeMapping>,
    pub refreshed_at: DateTime<Utc>,
}

type RefreshLock = Arc<tokio::sync::Mutex<()>>;

/// The classification, caching and query-serving pipeline.
#[derive(Debug)]
pub struct CatalogService {
    config: MarqueeConfig,
    fetcher: ListFetcher,
    classifier: TypeClassifier,
    registry: Arc<UserRegistry>,
    snapshots: Arc<dyn SnapshotStore>,
    ids: TtlCache<FetchedList>,
    stats: TtlCache<TypeStats>,
    genres: TtlCache<Vec<String>>,
    refresh_locks: Mutex<HashMap<(String, ListId), RefreshLock>>,
}

impl CatalogService {
    /// Wires the pipeline from explicit collaborators.
    pub fn new(
        config: MarqueeConfig,
        pages: Arc<dyn PageSource>,
        metadata: Arc<dyn MetadataSource>,
        registry: Arc<UserRegistry>,
        snapshots: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let resolver = Arc::new(MetadataResolver::new(metadata, &config.cache, clock.clone()));
        let inspector = Arc::new(TitleInspector::new(
            pages.clone(),
            &config.fetch,
            &config.classify,
            clock.clone(),
        ));
        let classifier = TypeClassifier::new(resolver, inspector, &config.classify);
        let fetcher = ListFetcher::new(pages, &config.fetch);
        let threshold = config.cache.sweep_threshold;

        Self {
            fetcher,
            classifier,
            registry,
            snapshots,
            ids: TtlCache::new(clock.clone(), threshold),
            stats: TtlCache::new(clock.clone(), threshold),
            genres: TtlCache::new(clock, threshold),
            refresh_locks: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Builds the production pipeline: HTTP sources, file snapshots and the
    /// registry under the configured data directory.
    ///
    /// # Errors
    ///
    /// - `MarqueeError::Configuration` - If an HTTP client cannot be built
    /// - `MarqueeError::Storage` - If the user registry cannot be loaded
    pub async fn open(config: MarqueeConfig) -> Result<Self> {
        let pages = HttpPageSource::new(&config.fetch).map_err(|e| {
            MarqueeError::Configuration {
                reason: e.to_string(),
            }
        })?;
        let metadata = CinemetaClient::new(&config.metadata).map_err(|e| {
            MarqueeError::Configuration {
                reason: e.to_string(),
            }
        })?;
        let registry = UserRegistry::open(
            config.storage.users_path(),
            config.storage.temp_file_suffix,
        )
        .await?;
        let snapshots = FileSnapshotStore::new(
            config.storage.snapshots_dir(),
            config.storage.temp_file_suffix,
        );

        Ok(Self::new(
            config,
            Arc::new(pages),
            Arc::new(metadata),
            Arc::new(registry),
            Arc::new(snapshots),
            Arc::new(SystemClock),
        ))
    }

    pub fn config(&self) -> &MarqueeConfig {
        &self.config
    }

    pub fn registry(&self) -> &UserRegistry {
        &self.registry
    }

    /// Ids of `list`, served from the short-lived id cache when possible.
    /// Failed fetches are not cached.
    pub async fn list_ids(&self, list: &ListId) -> FetchedList {
        let key = keys::ids(list);
        if let Some(cached) = self.ids.get(&key) {
            return cached;
        }
        self.fetch_fresh(list).await
    }

    async fn fetch_fresh(&self, list: &ListId) -> FetchedList {
        let fetched = self.fetcher.fetch_list_ids(list).await;
        if !fetched.ids.is_empty() {
            self.ids
                .set(keys::ids(list), fetched.clone(), self.config.cache.ids_ttl);
        }
        fetched
    }

    /// Classifies a list without persisting anything.
    pub async fn classify_list(&self, list: &ListId) -> (FetchedList, ClassificationOutcome) {
        let fetched = self.list_ids(list).await;
        let outcome = self.classifier.classify_all(&fetched.ids).await;
        (fetched, outcome)
    }

    /// Runs a full pass for one user's list: fresh fetch, classification,
    /// and replacement of both bucket snapshots.
    ///
    /// Concurrent refreshes of the same (user, list) run one after another.
    /// A fetch that yields no ids leaves the stored snapshots and type
    /// statistics untouched.
    ///
    /// # Errors
    ///
    /// - `ListError::NotFound` - If the user has no such list
    /// - `ListError::Unavailable` - If the list fetch yielded no ids
    /// - `MarqueeError::Storage` - If a snapshot could not be written
    pub async fn refresh_list(&self, uid: &str, list: &ListId) -> Result<RefreshReport> {
        if self.registry.get(uid, list).await.is_none() {
            return Err(ListError::NotFound {
                list: list.to_string(),
            }
            .into());
        }

        let lock = self.refresh_lock(uid, list);
        let _guard = lock.lock().await;

        let fetched = self.fetch_fresh(list).await;
        if fetched.ids.is_empty() {
            tracing::warn!(
                "Fetch of {} for {} yielded no ids, keeping stored snapshots",
                list,
                uid
            );
            return Err(ListError::Unavailable {
                list: list.to_string(),
            }
            .into());
        }
        let outcome = self.classifier.classify_all(&fetched.ids).await;

        for bucket in Bucket::ALL {
            let items = outcome.bucket(bucket);
            self.snapshots.save(uid, list, bucket, items).await?;
            self.record_count(list, bucket, items.len());
        }
        self.genres.remove_prefix(&keys::genres_prefix(list));

        let report = RefreshReport {
            list: list.clone(),
            title: fetched.title,
            fetched: fetched.ids.len(),
            movies: outcome.movies.len(),
            series: outcome.series.len(),
            excluded: outcome.excluded,
            episode_map: outcome.episode_map,
            refreshed_at: Utc::now(),
        };
        tracing::info!(
            "Refreshed {} for {}: {} movies, {} series, {} excluded",
            list,
            uid,
            report.movies,
            report.series,
            report.excluded.len()
        );
        Ok(report)
    }

    fn refresh_lock(&self, uid: &str, list: &ListId) -> RefreshLock {
        self.refresh_locks
            .lock()
            .entry((uid.to_string(), list.clone()))
            .or_default()
            .clone()
    }

    /// Starts [`Self::refresh_list`] on the runtime and logs the outcome.
    pub fn spawn_refresh(self: &Arc<Self>, uid: String, list: ListId) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = service.refresh_list(&uid, &list).await {
                tracing::warn!("Background refresh of {} for {} failed: {}", list, uid, e);
            }
        });
    }

    /// All classified items of one bucket, snapshot first.
    ///
    /// Without a snapshot the raw ids are classified on demand and the result
    /// is returned without being stored.
    pub async fn catalog_items(
        &self,
        uid: &str,
        list: &ListId,
        bucket: Bucket,
    ) -> Vec<ClassifiedItem> {
        match self.snapshots.load(uid, list, bucket).await {
            Ok(Some(items)) => return items,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Snapshot {}/{}/{} unreadable: {}", uid, list, bucket, e);
            }
        }

        tracing::debug!("No snapshot for {}/{}/{}, classifying on demand", uid, list, bucket);
        let (_fetched, outcome) = self.classify_list(list).await;
        outcome.into_bucket(bucket)
    }

    /// Serves one catalog page. Never fails: unknown lists, gated requests
    /// and internal problems all produce an empty page.
    pub async fn query_catalog(
        &self,
        uid: &str,
        list: &ListId,
        bucket: Bucket,
        query: CatalogQuery,
    ) -> Vec<ClassifiedItem> {
        let Some(entry) = self.registry.get(uid, list).await else {
            tracing::debug!("Catalog request for unknown list {} of {}", list, uid);
            return Vec::new();
        };
        if !entry.admits(bucket, &query) {
            tracing::debug!("Request for {} {} rejected by visibility", list, bucket);
            return Vec::new();
        }

        let query = query.with_default_sort(entry.default_sort);
        let items = self.catalog_items(uid, list, bucket).await;
        let page = run_query(&items, &query, self.config.catalog.max_page_size);
        if !page.is_empty() {
            self.record_count(list, bucket, page.len());
        }
        page
    }

    fn record_count(&self, list: &ListId, bucket: Bucket, count: usize) -> TypeStats {
        self.stats
            .update(&keys::stats(list), self.config.cache.stats_ttl, |stats| {
                let mut stats = stats.unwrap_or_default();
                stats.bump(bucket, count);
                stats
            })
    }

    pub fn type_stats(&self, list: &ListId) -> TypeStats {
        self.stats.get(&keys::stats(list)).unwrap_or_default()
    }

    /// Whether `list` has any items of `bucket`.
    ///
    /// Consults type statistics, then the snapshot, then classifies a bounded
    /// prefix of the raw ids.
    pub async fn has_type(&self, uid: &str, list: &ListId, bucket: Bucket) -> bool {
        if let Some(known) = self.type_stats(list).has(bucket) {
            return known;
        }

        match self.snapshots.load(uid, list, bucket).await {
            Ok(Some(items)) => {
                self.record_count(list, bucket, items.len());
                return !items.is_empty();
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Snapshot {}/{}/{} unreadable: {}", uid, list, bucket, e),
        }

        let fetched = self.list_ids(list).await;
        let sample_len = fetched.ids.len().min(self.config.classify.probe_sample);
        let sample = &fetched.ids[..sample_len];
        if self.classifier.probe(sample, bucket).await {
            self.record_count(list, bucket, 1);
            return true;
        }
        // A miss only proves absence when the whole list was sampled.
        if sample_len == fetched.ids.len() && !fetched.ids.is_empty() {
            self.record_count(list, bucket, 0);
        }
        false
    }

    /// Canonical genres observed in one bucket, in taxonomy order.
    pub async fn genre_options(&self, uid: &str, list: &ListId, bucket: Bucket) -> Vec<String> {
        let key = keys::genres(list, bucket);
        if let Some(cached) = self.genres.get(&key) {
            return cached;
        }

        let items = self.catalog_items(uid, list, bucket).await;
        let options = genres::observed_facets(items.iter().map(|item| item.genres.as_slice()));
        if !items.is_empty() {
            self.genres
                .set(key, options.clone(), self.config.cache.genres_ttl);
        }
        options
    }

    /// Builds the discovery manifest for `uid`.
    pub async fn manifest(&self, uid: &str) -> Manifest {
        let mut lists = Vec::new();
        for entry in self.registry.lists(uid).await {
            let mut probes = Vec::new();
            for bucket in Bucket::ALL {
                let toggles = entry.toggles(bucket);
                if !toggles.any() {
                    continue;
                }
                let has_items = self.has_type(uid, &entry.id, bucket).await;
                let genres = if has_items && toggles.discover {
                    self.genre_options(uid, &entry.id, bucket).await
                } else {
                    Vec::new()
                };
                probes.push(TypeProbe {
                    bucket,
                    has_items,
                    genres,
                });
            }
            lists.push(ManifestList { entry, probes });
        }
        build_manifest(&self.config.catalog, uid, &lists)
    }

    pub async fn lists(&self, uid: &str) -> Vec<UserListEntry> {
        self.registry.lists(uid).await
    }

    /// Adds a list from a raw URL or bare id.
    ///
    /// Without an explicit name the list's own title is used.
    ///
    /// # Errors
    ///
    /// - `ListError::Malformed` - If `source` contains no list id
    /// - `ListError::Duplicate` - If the user already has the list
    /// - `MarqueeError::Storage` - If the registry could not be saved
    pub async fn add_list(
        &self,
        uid: &str,
        source: &str,
        name: Option<String>,
    ) -> Result<UserListEntry> {
        let list = parse_list(source)?;
        if self.registry.get(uid, &list).await.is_some() {
            return Err(ListError::Duplicate { list }.into());
        }

        let name = match name.map(|name| name.trim().to_string()) {
            Some(name) if !name.is_empty() => name,
            _ => self.list_ids(&list).await.title,
        };
        self.registry.add(uid, UserListEntry::new(list, name)).await
    }

    /// # Errors
    ///
    /// - `ListError::Malformed` - If `list` is not a list id
    /// - `ListError::NotFound` - If the user has no such list
    pub async fn patch_list(
        &self,
        uid: &str,
        list: &str,
        patch: ListPatch,
    ) -> Result<UserListEntry> {
        let list = parse_list(list)?;
        self.registry.patch(uid, &list, patch).await
    }

    /// Removes a list, its snapshots and its refresh lock.
    ///
    /// # Errors
    ///
    /// - `ListError::Malformed` - If `list` is not a list id
    /// - `ListError::NotFound` - If the user has no such list
    pub async fn remove_list(&self, uid: &str, list: &str) -> Result<UserListEntry> {
        let list = parse_list(list)?;
        let removed = self.registry.remove(uid, &list).await?;
        self.refresh_locks.lock().remove(&(uid.to_string(), list.clone()));
        if let Err(e) = self.snapshots.remove_list(uid, &list).await {
            tracing::warn!("Could not drop snapshots of {} for {}: {}", list, uid, e);
        }
        Ok(removed)
    }
}

/// Extracts a list id from user input.
///
/// # Errors
///
/// - `ListError::Malformed` - If no list id can be found
pub fn parse_list(source: &str) -> Result<ListId> {
    ListId::parse_source(source).map_err(|_| {
        ListError::Malformed {
            input: source.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use marquee_core::cache::ManualClock;
    use marquee_core::catalog::{SurfaceToggles, Visibility};
    use marquee_core::storage::InMemorySnapshotStore;
    use marquee_core::storage::test_fixtures::sample_item;

    use super::*;
    use crate::testing::{ScriptedPageSource, StaticMetadataSource, list_page_html};

    const LIST: &str = "ls4103816671";

    fn list() -> ListId {
        ListId::parse_source(LIST).unwrap()
    }

    fn service(pages: ScriptedPageSource, meta: StaticMetadataSource) -> CatalogService {
        let mut config = MarqueeConfig::for_testing(std::env::temp_dir());
        config.fetch.relay_prefixes.clear();
        CatalogService::new(
            config,
            Arc::new(pages),
            Arc::new(meta),
            Arc::new(UserRegistry::in_memory()),
            Arc::new(InMemorySnapshotStore::new()),
            Arc::new(ManualClock::new()),
        )
    }

    fn pages() -> ScriptedPageSource {
        ScriptedPageSource::new().with_page(
            format!("https://www.imdb.com/list/{LIST}/?page=1"),
            list_page_html("Mixed Bag", &["tt0000001", "tt0000002", "tt0000003"]),
        )
    }

    fn meta() -> StaticMetadataSource {
        StaticMetadataSource::new()
            .with_meta(Bucket::Movie, "tt0000001", "Alpha", &["Comedy"])
            .with_meta(Bucket::Series, "tt0000002", "Beta", &["Sci-Fi & Fantasy"])
            .with_meta(Bucket::Movie, "tt0000003", "Gamma", &["Drama", "Comedy"])
    }

    async fn snapshot_ids(service: &CatalogService, bucket: Bucket) -> Vec<String> {
        let items = service
            .snapshots
            .load("u1", &list(), bucket)
            .await
            .unwrap()
            .unwrap();
        items.iter().map(|item| item.id.to_string()).collect()
    }

    #[tokio::test]
    async fn test_add_list_extracts_id_and_title() {
        let service = service(pages(), meta());

        let entry = service
            .add_list("u1", "https://example.com/list/ls4103816671/?foo=bar", None)
            .await
            .unwrap();
        assert_eq!(entry.id.as_str(), LIST);
        assert_eq!(entry.name, "Mixed Bag");

        let duplicate = service.add_list("u1", LIST, None).await;
        assert!(matches!(
            duplicate,
            Err(MarqueeError::List(ListError::Duplicate { .. }))
        ));

        let malformed = service.add_list("u1", "https://example.com/nothing", None).await;
        assert!(matches!(
            malformed,
            Err(MarqueeError::List(ListError::Malformed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_refresh_writes_snapshots_and_report() {
        let service = service(pages(), meta());
        service.add_list("u1", LIST, Some("Mine".into())).await.unwrap();

        let report = service.refresh_list("u1", &list()).await.unwrap();
        assert_eq!(report.fetched, 3);
        assert_eq!(report.movies, 2);
        assert_eq!(report.series, 1);

        let movies = service.catalog_items("u1", &list(), Bucket::Movie).await;
        assert_eq!(movies.len(), 2);
        assert_eq!(service.type_stats(&list()).movie, Some(2));
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_stored_snapshots() {
        let service = service(ScriptedPageSource::new(), meta());
        service.add_list("u1", LIST, Some("Mine".into())).await.unwrap();
        let stored = vec![sample_item("tt0000001", Bucket::Movie, "Alpha", 0)];
        service
            .snapshots
            .save("u1", &list(), Bucket::Movie, &stored)
            .await
            .unwrap();

        let result = service.refresh_list("u1", &list()).await;
        assert!(matches!(
            result,
            Err(MarqueeError::List(ListError::Unavailable { .. }))
        ));

        let kept = service
            .snapshots
            .load("u1", &list(), Bucket::Movie)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(service.type_stats(&list()), TypeStats::default());
        assert!(service.has_type("u1", &list(), Bucket::Movie).await);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_leave_consistent_snapshots() {
        let service = service(pages(), meta());
        service.add_list("u1", LIST, None).await.unwrap();

        let (list_a, list_b, list_c) = (list(), list(), list());
        let (first, second, page) = tokio::join!(
            service.refresh_list("u1", &list_a),
            service.refresh_list("u1", &list_b),
            service.query_catalog("u1", &list_c, Bucket::Movie, CatalogQuery::default()),
        );
        assert_eq!(first.unwrap().movies, 2);
        assert_eq!(second.unwrap().movies, 2);
        assert_eq!(page.len(), 2);

        let movies = snapshot_ids(&service, Bucket::Movie).await;
        let series = snapshot_ids(&service, Bucket::Series).await;
        assert_eq!(movies, vec!["tt0000001", "tt0000003"]);
        assert_eq!(series, vec!["tt0000002"]);
        assert!(movies.iter().all(|id| !series.contains(id)));
    }

    #[tokio::test]
    async fn test_refresh_unknown_list_fails() {
        let service = service(pages(), meta());
        let result = service.refresh_list("u1", &list()).await;
        assert!(matches!(
            result,
            Err(MarqueeError::List(ListError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_query_without_snapshot_classifies_on_demand() {
        let service = service(pages(), meta());
        service.add_list("u1", LIST, None).await.unwrap();

        let params = HashMap::from([("genre".to_string(), "Comedy".to_string())]);
        let page = service
            .query_catalog("u1", &list(), Bucket::Movie, CatalogQuery::from_params(&params))
            .await;
        let names: Vec<&str> = page.iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Gamma"]);
        assert_eq!(service.type_stats(&list()).movie, Some(2));
    }

    #[tokio::test]
    async fn test_home_only_rejects_filtered_queries() {
        let service = service(pages(), meta());
        service.add_list("u1", LIST, None).await.unwrap();
        let home_only = SurfaceToggles {
            discover: false,
            home: true,
        };
        let patch = ListPatch {
            visibility: Some(Visibility {
                movie: home_only,
                series: home_only,
            }),
            ..ListPatch::default()
        };
        service.patch_list("u1", LIST, patch).await.unwrap();

        let filtered = HashMap::from([("genre".to_string(), "Comedy".to_string())]);
        assert!(
            service
                .query_catalog("u1", &list(), Bucket::Movie, CatalogQuery::from_params(&filtered))
                .await
                .is_empty()
        );

        let top = HashMap::from([("genre".to_string(), "Top".to_string())]);
        let page = service
            .query_catalog("u1", &list(), Bucket::Movie, CatalogQuery::from_params(&top))
            .await;
        assert_eq!(page.len(), 2);
    }

    #[tokio::test]
    async fn test_manifest_probes_types_and_genres() {
        let service = service(pages(), meta());
        service.add_list("u1", LIST, None).await.unwrap();
        service.refresh_list("u1", &list()).await.unwrap();

        let manifest = service.manifest("u1").await;
        assert_eq!(manifest.catalogs.len(), 2);

        let series = &manifest.catalogs[1];
        assert_eq!(series.bucket, Bucket::Series);
        let genre = series.extra_field("genre").unwrap();
        assert_eq!(
            genre.options.as_deref().unwrap(),
            &["Top".to_string(), "Fantasy".to_string(), "Sci-Fi".to_string()]
        );
    }

    #[tokio::test]
    async fn test_has_type_probe_records_absence_for_small_list() {
        let pages = ScriptedPageSource::new().with_page(
            format!("https://www.imdb.com/list/{LIST}/?page=1"),
            list_page_html("Movies", &["tt0000001"]),
        );
        let service = service(pages, meta());

        assert!(service.has_type("u1", &list(), Bucket::Movie).await);
        assert!(!service.has_type("u1", &list(), Bucket::Series).await);
        assert_eq!(service.type_stats(&list()).has(Bucket::Series), Some(false));
    }

    #[tokio::test]
    async fn test_remove_list_drops_snapshots() {
        let service = service(pages(), meta());
        service.add_list("u1", LIST, None).await.unwrap();
        service.refresh_list("u1", &list()).await.unwrap();

        assert_eq!(service.refresh_locks.lock().len(), 1);

        service.remove_list("u1", LIST).await.unwrap();
        assert!(service.lists("u1").await.is_empty());
        assert!(service.refresh_locks.lock().is_empty());
        assert!(
            !service
                .snapshots
                .exists("u1", &list(), Bucket::Movie)
                .await
                .unwrap()
        );
    }
}
