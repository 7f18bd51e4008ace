//! Movie / series / exclude classification of list entries.
//!
//! Each id walks a fixed ladder and stops at the first rung that decides:
//!
//! 1. metadata: series metadata wins over movie metadata
//! 2. episode up-mapping: a parent found on the title page whose series
//!    metadata resolves commits the parent
//! 3. the page's own type label
//! 4. otherwise the id is excluded
//!
//! A pool of workers pulls ids from a shared cursor and the results are
//! compacted back into source order.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::join_all;
use marquee_core::config::ClassifyConfig;
use marquee_core::{Bucket, ClassifiedItem, TitleId};
use serde::Serialize;

use crate::inspector::{TitleInspector, TitlePageFacts};
use crate::metadata::MetadataResolver;

/// What a page type label means for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Movie,
    Series,
    Episode,
    Exclude,
    Unknown,
}

/// Maps a raw type label to a [`LabelKind`].
///
/// Labels are compared with case and punctuation removed, so `"TV Series"`,
/// `"TVSeries"` and `"video.tv_show"` style spellings all land in the table.
pub fn label_kind(label: &str, music_video_as_movie: bool) -> LabelKind {
    let key: String = label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    match key.as_str() {
        "movie" | "film" | "videomovie" | "tvmovie" | "video" | "short" | "tvshort"
        | "tvspecial" => LabelKind::Movie,
        "tvseries" | "tvminiseries" | "videotvshow" | "tvshow" | "series" | "miniseries" => {
            LabelKind::Series
        }
        "tvepisode" | "episode" | "videoepisode" => LabelKind::Episode,
        "videogame" | "podcastseries" | "podcastepisode" | "podcast" => LabelKind::Exclude,
        "musicvideo" | "musicvideoobject" => {
            if music_video_as_movie {
                LabelKind::Movie
            } else {
                LabelKind::Exclude
            }
        }
        _ => LabelKind::Unknown,
    }
}

/// Decision for one id.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Movie(ClassifiedItem),
    /// `episode` is set when the item is the parent series of that episode.
    Series {
        item: ClassifiedItem,
        episode: Option<TitleId>,
    },
    Excluded,
}

impl Verdict {
    pub fn bucket(&self) -> Option<Bucket> {
        match self {
            Verdict::Movie(_) => Some(Bucket::Movie),
            Verdict::Series { .. } => Some(Bucket::Series),
            Verdict::Excluded => None,
        }
    }
}

/// One episode → parent series substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpisodeMapping {
    pub episode: TitleId,
    pub parent: TitleId,
}

/// Result of classifying one list's ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationOutcome {
    pub movies: Vec<ClassifiedItem>,
    pub series: Vec<ClassifiedItem>,
    pub episode_map: Vec<EpisodeMapping>,
    pub excluded: Vec<TitleId>,
}

impl ClassificationOutcome {
    pub fn bucket(&self, bucket: Bucket) -> &[ClassifiedItem] {
        match bucket {
            Bucket::Movie => &self.movies,
            Bucket::Series => &self.series,
        }
    }

    pub fn into_bucket(self, bucket: Bucket) -> Vec<ClassifiedItem> {
        match bucket {
            Bucket::Movie => self.movies,
            Bucket::Series => self.series,
        }
    }
}

/// Classifies ids with metadata and title-page lookups.
#[derive(Debug, Clone)]
pub struct TypeClassifier {
    metadata: Arc<MetadataResolver>,
    inspector: Arc<TitleInspector>,
    workers: usize,
    music_video_as_movie: bool,
}

impl TypeClassifier {
    pub fn new(
        metadata: Arc<MetadataResolver>,
        inspector: Arc<TitleInspector>,
        config: &ClassifyConfig,
    ) -> Self {
        Self {
            metadata,
            inspector,
            workers: config.worker_count(),
            music_video_as_movie: config.music_video_as_movie,
        }
    }

    /// Classifies a single id.
    pub async fn classify_one(&self, id: &TitleId) -> Verdict {
        let (movie, series) = tokio::join!(
            self.metadata.get_meta(Bucket::Movie, id),
            self.metadata.get_meta(Bucket::Series, id),
        );
        if let Some(series) = series {
            return Verdict::Series {
                item: ClassifiedItem::from_meta(id.clone(), Bucket::Series, series),
                episode: None,
            };
        }
        if let Some(movie) = movie {
            return Verdict::Movie(ClassifiedItem::from_meta(id.clone(), Bucket::Movie, movie));
        }

        let Some(facts) = self.inspector.inspect(id).await else {
            tracing::debug!("Excluding {}: no metadata and no title page", id);
            return Verdict::Excluded;
        };

        if let Some(verdict) = self.up_map_episode(id, &facts).await {
            return verdict;
        }

        let kind = facts
            .label
            .as_deref()
            .map_or(LabelKind::Unknown, |label| {
                label_kind(label, self.music_video_as_movie)
            });
        match kind {
            LabelKind::Movie => Verdict::Movie(page_item(id, Bucket::Movie, facts)),
            LabelKind::Series => Verdict::Series {
                item: page_item(id, Bucket::Series, facts),
                episode: None,
            },
            // The episode rung already ran on these facts and found no
            // resolvable parent.
            LabelKind::Episode | LabelKind::Exclude | LabelKind::Unknown => {
                tracing::debug!("Excluding {} (label {:?})", id, facts.label);
                Verdict::Excluded
            }
        }
    }

    async fn up_map_episode(&self, id: &TitleId, facts: &TitlePageFacts) -> Option<Verdict> {
        let parent = facts.parent.as_ref()?;
        let meta = self.metadata.get_meta(Bucket::Series, parent).await?;
        tracing::debug!("Mapped episode {} to series {}", id, parent);
        Some(Verdict::Series {
            item: ClassifiedItem::from_meta(parent.clone(), Bucket::Series, meta),
            episode: Some(id.clone()),
        })
    }

    /// Classifies `ids` with the worker pool and compacts the verdicts.
    pub async fn classify_all(&self, ids: &[TitleId]) -> ClassificationOutcome {
        let cursor = &AtomicUsize::new(0);
        let workers = self.workers.min(ids.len()).max(1);

        let batches = join_all((0..workers).map(move |_| async move {
            let mut done = Vec::new();
            loop {
                let index = cursor.fetch_add(1, Ordering::Relaxed);
                let Some(id) = ids.get(index) else {
                    break;
                };
                done.push((index, self.classify_one(id).await));
            }
            done
        }))
        .await;

        let mut slots: Vec<Option<Verdict>> = vec![None; ids.len()];
        for (index, verdict) in batches.into_iter().flatten() {
            slots[index] = Some(verdict);
        }

        let outcome = compact(ids, slots);
        tracing::info!(
            "Classified {} ids: {} movies, {} series, {} excluded, {} episodes mapped",
            ids.len(),
            outcome.movies.len(),
            outcome.series.len(),
            outcome.excluded.len(),
            outcome.episode_map.len()
        );
        outcome
    }

    /// Classifies ids one at a time until one lands in `bucket`.
    pub async fn probe(&self, ids: &[TitleId], bucket: Bucket) -> bool {
        for id in ids {
            if self.classify_one(id).await.bucket() == Some(bucket) {
                return true;
            }
        }
        false
    }
}

fn page_item(id: &TitleId, bucket: Bucket, facts: TitlePageFacts) -> ClassifiedItem {
    let name = facts.title.unwrap_or_else(|| id.to_string());
    let mut item = ClassifiedItem::bare(id.clone(), bucket, name);
    item.poster = facts.poster;
    item.release_info = facts.year;
    item
}

/// Folds verdicts in source order into per-bucket lists.
///
/// The first occurrence of an id in a bucket wins, and an id present in
/// series is dropped from movies. `added_order` is the final position.
fn compact(ids: &[TitleId], slots: Vec<Option<Verdict>>) -> ClassificationOutcome {
    let mut outcome = ClassificationOutcome::default();
    let mut seen_movies = HashSet::new();
    let mut seen_series = HashSet::new();

    for (id, slot) in ids.iter().zip(slots) {
        match slot.unwrap_or(Verdict::Excluded) {
            Verdict::Movie(item) => {
                if seen_movies.insert(item.id.clone()) {
                    outcome.movies.push(item);
                }
            }
            Verdict::Series { item, episode } => {
                if let Some(episode) = episode {
                    outcome.episode_map.push(EpisodeMapping {
                        episode,
                        parent: item.id.clone(),
                    });
                }
                if seen_series.insert(item.id.clone()) {
                    outcome.series.push(item);
                }
            }
            Verdict::Excluded => outcome.excluded.push(id.clone()),
        }
    }

    outcome.movies.retain(|item| !seen_series.contains(&item.id));
    for (position, item) in outcome.movies.iter_mut().enumerate() {
        item.added_order = position;
    }
    for (position, item) in outcome.series.iter_mut().enumerate() {
        item.added_order = position;
    }
    outcome
}

#[cfg(test)]
mod tests {
    use marquee_core::cache::ManualClock;
    use marquee_core::config::{CacheConfig, FetchConfig};

    use super::*;
    use crate::testing::{ScriptedPageSource, StaticMetadataSource, title_page_html};

    fn id(raw: &str) -> TitleId {
        TitleId::parse(raw).unwrap()
    }

    fn ids(raw: &[&str]) -> Vec<TitleId> {
        raw.iter().map(|r| id(r)).collect()
    }

    fn classifier(
        meta: StaticMetadataSource,
        pages: ScriptedPageSource,
        music_video_as_movie: bool,
    ) -> TypeClassifier {
        let clock = Arc::new(ManualClock::new());
        let config = ClassifyConfig {
            workers: 3,
            music_video_as_movie,
            ..ClassifyConfig::default()
        };
        let metadata = Arc::new(MetadataResolver::new(
            Arc::new(meta),
            &CacheConfig::default(),
            clock.clone(),
        ));
        let inspector = Arc::new(TitleInspector::new(
            Arc::new(pages),
            &FetchConfig::default(),
            &config,
            clock,
        ));
        TypeClassifier::new(metadata, inspector, &config)
    }

    fn page_url(id: &str) -> String {
        format!("https://www.imdb.com/title/{id}/")
    }

    fn names(items: &[ClassifiedItem]) -> Vec<&str> {
        items.iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn test_label_table() {
        assert_eq!(label_kind("TVSeries", false), LabelKind::Series);
        assert_eq!(label_kind("TV Mini Series", false), LabelKind::Series);
        assert_eq!(label_kind("video.tv_show", false), LabelKind::Series);
        assert_eq!(label_kind("Movie", false), LabelKind::Movie);
        assert_eq!(label_kind("TV Episode", false), LabelKind::Episode);
        assert_eq!(label_kind("Video Game", true), LabelKind::Exclude);
        assert_eq!(label_kind("PodcastSeries", true), LabelKind::Exclude);
        assert_eq!(label_kind("Music Video", false), LabelKind::Exclude);
        assert_eq!(label_kind("Music Video", true), LabelKind::Movie);
        assert_eq!(label_kind("Something", false), LabelKind::Unknown);
    }

    #[tokio::test]
    async fn test_series_metadata_suppresses_movie() {
        let meta = StaticMetadataSource::new()
            .with_meta(Bucket::Movie, "tt0000001", "Only Movie", &[])
            .with_meta(Bucket::Series, "tt0000002", "Only Series", &[])
            .with_meta(Bucket::Movie, "tt0000003", "Both Movie", &[])
            .with_meta(Bucket::Series, "tt0000003", "Both Series", &[]);
        let classifier = classifier(meta, ScriptedPageSource::new(), false);

        let outcome = classifier
            .classify_all(&ids(&["tt0000001", "tt0000002", "tt0000003"]))
            .await;
        assert_eq!(names(&outcome.movies), vec!["tt0000001"]);
        assert_eq!(names(&outcome.series), vec!["tt0000002", "tt0000003"]);
        assert_eq!(outcome.series[1].name, "Both Series");
        assert!(outcome.excluded.is_empty());
    }

    #[tokio::test]
    async fn test_episode_maps_to_parent_series() {
        let meta = StaticMetadataSource::new().with_meta(
            Bucket::Series,
            "tt0411008",
            "Lost",
            &["Drama"],
        );
        let pages = ScriptedPageSource::new()
            .with_page(
                page_url("tt0636289"),
                title_page_html("Pilot", "TVEpisode", Some("tt0411008")),
            )
            .with_page(
                page_url("tt0636290"),
                title_page_html("Pilot 2", "TVEpisode", Some("tt0411008")),
            );
        let classifier = classifier(meta, pages, false);

        let outcome = classifier
            .classify_all(&ids(&["tt0636289", "tt0636290"]))
            .await;
        assert_eq!(names(&outcome.series), vec!["tt0411008"]);
        assert_eq!(outcome.series[0].name, "Lost");
        assert_eq!(
            outcome.episode_map,
            vec![
                EpisodeMapping {
                    episode: id("tt0636289"),
                    parent: id("tt0411008")
                },
                EpisodeMapping {
                    episode: id("tt0636290"),
                    parent: id("tt0411008")
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_movie_linking_a_series_stays_a_movie() {
        let meta = StaticMetadataSource::new().with_meta(
            Bucket::Series,
            "tt0306414",
            "The Wire",
            &["Crime"],
        );
        let body = r#"<html><head>
            <meta property="og:title" content="Heat (1995) - IMDb">
            <script type="application/ld+json">{"@type":"Movie","name":"Heat"}</script>
        </head><body>
            <a href="/title/tt0306414/?ref_=tt_sims_tt">More like this</a>
        </body></html>"#;
        let pages = ScriptedPageSource::new().with_page(page_url("tt0113277"), body);
        let classifier = classifier(meta, pages, false);

        let outcome = classifier.classify_all(&ids(&["tt0113277"])).await;
        assert_eq!(names(&outcome.movies), vec!["tt0113277"]);
        assert!(outcome.series.is_empty());
        assert!(outcome.episode_map.is_empty());
    }

    #[tokio::test]
    async fn test_label_rules() {
        let pages = ScriptedPageSource::new()
            .with_page(page_url("tt0000010"), title_page_html("Game", "VideoGame", None))
            .with_page(page_url("tt0000011"), title_page_html("Clip", "MusicVideoObject", None))
            .with_page(page_url("tt0000012"), title_page_html("Doc", "Movie", None))
            .with_page(page_url("tt0000013"), title_page_html("Orphan", "TVEpisode", None));
        let input = ids(&["tt0000010", "tt0000011", "tt0000012", "tt0000013", "tt0000014"]);

        let strict = classifier(StaticMetadataSource::new(), pages, false);
        let outcome = strict.classify_all(&input).await;
        assert_eq!(names(&outcome.movies), vec!["tt0000012"]);
        assert_eq!(outcome.movies[0].name, "Doc");
        assert_eq!(
            outcome.excluded,
            ids(&["tt0000010", "tt0000011", "tt0000013", "tt0000014"])
        );
    }

    #[tokio::test]
    async fn test_music_video_as_movie() {
        let pages = ScriptedPageSource::new()
            .with_page(page_url("tt0000011"), title_page_html("Clip", "MusicVideoObject", None));
        let lenient = classifier(StaticMetadataSource::new(), pages, true);

        let outcome = lenient.classify_all(&ids(&["tt0000011"])).await;
        assert_eq!(names(&outcome.movies), vec!["tt0000011"]);
    }

    #[tokio::test]
    async fn test_order_preserved_and_added_order_compacted() {
        let mut meta = StaticMetadataSource::new();
        let raw: Vec<String> = (1..=20).map(|n| format!("tt{n:07}")).collect();
        for (n, id) in raw.iter().enumerate() {
            let bucket = if n % 3 == 0 { Bucket::Series } else { Bucket::Movie };
            meta = meta.with_meta(bucket, id, id, &[]);
        }
        let classifier = classifier(meta, ScriptedPageSource::new(), false);
        let input: Vec<TitleId> = raw.iter().map(|r| id(r)).collect();

        let outcome = classifier.classify_all(&input).await;
        let mut merged: Vec<&ClassifiedItem> =
            outcome.movies.iter().chain(outcome.series.iter()).collect();
        merged.sort_by_key(|item| input.iter().position(|i| *i == item.id));
        assert_eq!(merged.len(), 20);
        for (position, item) in outcome.movies.iter().enumerate() {
            assert_eq!(item.added_order, position);
        }
        assert!(
            outcome
                .movies
                .windows(2)
                .all(|w| w[0].id.as_str() < w[1].id.as_str())
        );
    }

    #[tokio::test]
    async fn test_probe_stops_at_first_hit() {
        let meta = StaticMetadataSource::new()
            .with_meta(Bucket::Movie, "tt0000001", "A", &[])
            .with_meta(Bucket::Series, "tt0000002", "B", &[]);
        let classifier = classifier(meta, ScriptedPageSource::new(), false);

        assert!(classifier.probe(&ids(&["tt0000001", "tt0000002"]), Bucket::Series).await);
        assert!(!classifier.probe(&ids(&["tt0000001"]), Bucket::Series).await);
        assert!(!classifier.probe(&[], Bucket::Movie).await);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let classifier = classifier(StaticMetadataSource::new(), ScriptedPageSource::new(), false);
        assert_eq!(classifier.classify_all(&[]).await, ClassificationOutcome::default());
    }
}
