//! Walks the pages of one list and collects its title ids.

use std::collections::HashSet;
use std::sync::Arc;

use marquee_core::config::FetchConfig;
use marquee_core::{ListId, TitleId};
use serde::{Deserialize, Serialize};

use crate::sources::{FetchVariant, PageSource, first_success, variants_from_config};

/// Ids and display title of a list, in source ("added") order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedList {
    pub title: String,
    pub ids: Vec<TitleId>,
}

impl FetchedList {
    /// The result reported when no page could be retrieved.
    pub fn unavailable(list: &ListId) -> Self {
        Self {
            title: fallback_title(list),
            ids: Vec::new(),
        }
    }
}

fn fallback_title(list: &ListId) -> String {
    format!("List {list}")
}

/// Paginating list fetcher with per-page variant fallback.
#[derive(Debug, Clone)]
pub struct ListFetcher {
    source: Arc<dyn PageSource>,
    variants: Vec<FetchVariant>,
    page_cap: u32,
    full_page_threshold: usize,
}

impl ListFetcher {
    pub fn new(source: Arc<dyn PageSource>, config: &FetchConfig) -> Self {
        Self {
            source,
            variants: variants_from_config(config),
            page_cap: config.page_cap,
            full_page_threshold: config.full_page_threshold,
        }
    }

    /// Fetches every id of `list`. Never fails: total failure yields an
    /// empty id list and a synthesized title.
    pub async fn fetch_list_ids(&self, list: &ListId) -> FetchedList {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        let mut title = None;

        for page in 1..=self.page_cap.max(1) {
            let Some((_variant, extract)) =
                first_success(self.source.as_ref(), &self.variants, list, page).await
            else {
                if page == 1 {
                    tracing::warn!("No variant returned ids for {}", list);
                }
                break;
            };

            if title.is_none() {
                title = extract.title;
            }

            let page_len = extract.ids.len();
            let before = ids.len();
            ids.extend(extract.ids.into_iter().filter(|id| seen.insert(id.clone())));
            let fresh = ids.len() - before;

            if fresh == 0 || page_len < self.full_page_threshold {
                break;
            }
        }

        tracing::info!("Fetched {} ids for {}", ids.len(), list);
        FetchedList {
            title: title.unwrap_or_else(|| fallback_title(list)),
            ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedPageSource, list_page_html};

    fn list() -> ListId {
        ListId::parse_source("ls4103816671").unwrap()
    }

    fn config(threshold: usize) -> FetchConfig {
        FetchConfig {
            relay_prefixes: vec!["https://relay.test/".to_string()],
            full_page_threshold: threshold,
            page_cap: 5,
            ..FetchConfig::default()
        }
    }

    fn page_url(page: u32) -> String {
        format!("https://www.imdb.com/list/ls4103816671/?page={page}")
    }

    #[tokio::test]
    async fn test_paginates_and_dedupes_across_pages() {
        let source = ScriptedPageSource::new()
            .with_page(page_url(1), list_page_html("Faves", &["tt0000001", "tt0000002"]))
            .with_page(page_url(2), list_page_html("Faves", &["tt0000002", "tt0000003"]))
            .with_page(page_url(3), list_page_html("Faves", &["tt0000004"]));
        let fetcher = ListFetcher::new(Arc::new(source), &config(2));

        let fetched = fetcher.fetch_list_ids(&list()).await;
        let ids: Vec<&str> = fetched.ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["tt0000001", "tt0000002", "tt0000003", "tt0000004"]);
        assert_eq!(fetched.title, "Faves");
    }

    #[tokio::test]
    async fn test_stops_on_short_page() {
        let source = Arc::new(
            ScriptedPageSource::new()
                .with_page(page_url(1), list_page_html("Short", &["tt0000001"]))
                .with_page(page_url(2), list_page_html("Short", &["tt0000009"])),
        );
        let fetcher = ListFetcher::new(source.clone(), &config(25));

        let fetched = fetcher.fetch_list_ids(&list()).await;
        assert_eq!(fetched.ids.len(), 1);
        assert!(!source.requests().contains(&page_url(2)));
    }

    #[tokio::test]
    async fn test_stops_when_page_adds_nothing_new() {
        let source = Arc::new(
            ScriptedPageSource::new()
                .with_page(page_url(1), list_page_html("Loop", &["tt0000001", "tt0000002"]))
                .with_page(page_url(2), list_page_html("Loop", &["tt0000001", "tt0000002"]))
                .with_page(page_url(3), list_page_html("Loop", &["tt0000003", "tt0000004"])),
        );
        let fetcher = ListFetcher::new(source.clone(), &config(2));

        let fetched = fetcher.fetch_list_ids(&list()).await;
        assert_eq!(fetched.ids.len(), 2);
        assert!(!source.requests().contains(&page_url(3)));
    }

    #[tokio::test]
    async fn test_falls_back_to_mobile_variant() {
        let source = ScriptedPageSource::new()
            .with_page(page_url(1), "<html><body>captcha</body></html>")
            .with_page(
                "https://m.imdb.com/list/ls4103816671/?page=1",
                list_page_html("Mobile", &["tt0000007"]),
            );
        let fetcher = ListFetcher::new(Arc::new(source), &config(25));

        let fetched = fetcher.fetch_list_ids(&list()).await;
        assert_eq!(fetched.ids[0].as_str(), "tt0000007");
        assert_eq!(fetched.title, "Mobile");
    }

    #[tokio::test]
    async fn test_total_failure_synthesizes_title() {
        let fetcher = ListFetcher::new(Arc::new(ScriptedPageSource::new()), &config(25));

        let fetched = fetcher.fetch_list_ids(&list()).await;
        assert!(fetched.ids.is_empty());
        assert_eq!(fetched.title, "List ls4103816671");
        assert_eq!(fetched, FetchedList::unavailable(&list()));
    }
}
