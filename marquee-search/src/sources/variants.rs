//! Alternative routes to one listing page.

use std::fmt;

use marquee_core::ListId;
use marquee_core::config::FetchConfig;
use url::Url;

use super::extract::{PageExtract, extract_page};
use super::PageSource;

/// One way of reaching a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchVariant {
    /// The main site
    Primary { base: String },
    /// The mobile site
    Mobile { base: String },
    /// A relay service that fetches the primary URL on our behalf
    Relay { prefix: String, base: String },
}

impl FetchVariant {
    /// URL of page `page` (1-based) of `list` through this variant.
    pub fn page_url(&self, list: &ListId, page: u32) -> String {
        match self {
            FetchVariant::Primary { base } | FetchVariant::Mobile { base } => {
                list_page_url(base, list, page)
            }
            FetchVariant::Relay { prefix, base } => {
                format!("{prefix}{}", list_page_url(base, list, page))
            }
        }
    }
}

impl fmt::Display for FetchVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchVariant::Primary { .. } => write!(f, "primary"),
            FetchVariant::Mobile { .. } => write!(f, "mobile"),
            FetchVariant::Relay { prefix, .. } => write!(f, "relay {prefix}"),
        }
    }
}

fn list_page_url(base: &str, list: &ListId, page: u32) -> String {
    let raw = format!("{}/list/{list}/", base.trim_end_matches('/'));
    match Url::parse(&raw) {
        Ok(mut url) => {
            url.query_pairs_mut()
                .append_pair("page", &page.to_string());
            url.to_string()
        }
        Err(_) => format!("{raw}?page={page}"),
    }
}

/// Variants in priority order: primary, mobile, then each relay.
pub fn variants_from_config(config: &FetchConfig) -> Vec<FetchVariant> {
    let mut variants = vec![
        FetchVariant::Primary {
            base: config.primary_base_url.clone(),
        },
        FetchVariant::Mobile {
            base: config.mobile_base_url.clone(),
        },
    ];
    variants.extend(config.relay_prefixes.iter().map(|prefix| FetchVariant::Relay {
        prefix: prefix.clone(),
        base: config.primary_base_url.clone(),
    }));
    variants
}

/// Tries each variant in order and returns the first page with ids.
///
/// Failed requests and empty pages both move on to the next variant.
pub async fn first_success(
    source: &dyn PageSource,
    variants: &[FetchVariant],
    list: &ListId,
    page: u32,
) -> Option<(FetchVariant, PageExtract)> {
    for variant in variants {
        let url = variant.page_url(list, page);
        match source.fetch_text(&url).await {
            Ok(body) => {
                let extract = extract_page(&body);
                if !extract.ids.is_empty() {
                    tracing::debug!(
                        "Page {} of {} via {}: {} ids",
                        page,
                        list,
                        variant,
                        extract.ids.len()
                    );
                    return Some((variant.clone(), extract));
                }
                tracing::debug!("Page {} of {} via {} had no ids", page, list, variant);
            }
            Err(e) => {
                tracing::debug!("Page {} of {} via {} failed: {}", page, list, variant, e);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedPageSource;

    fn list() -> ListId {
        ListId::parse_source("ls1234567").unwrap()
    }

    fn config() -> FetchConfig {
        FetchConfig {
            relay_prefixes: vec!["https://relay.test/".to_string()],
            ..FetchConfig::default()
        }
    }

    #[test]
    fn test_variant_order_and_urls() {
        let variants = variants_from_config(&config());
        let urls: Vec<String> = variants.iter().map(|v| v.page_url(&list(), 2)).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.imdb.com/list/ls1234567/?page=2",
                "https://m.imdb.com/list/ls1234567/?page=2",
                "https://relay.test/https://www.imdb.com/list/ls1234567/?page=2",
            ]
        );
    }

    #[tokio::test]
    async fn test_first_success_skips_empty_and_failed_variants() {
        let variants = variants_from_config(&config());
        let source = ScriptedPageSource::new()
            .with_page(
                "https://www.imdb.com/list/ls1234567/?page=1",
                "<html><body>blocked</body></html>",
            )
            .with_page(
                "https://relay.test/https://www.imdb.com/list/ls1234567/?page=1",
                "Title: Relayed\n[x](https://www.imdb.com/title/tt0000001/)",
            );

        let (variant, extract) = first_success(&source, &variants, &list(), 1)
            .await
            .unwrap();
        assert!(matches!(variant, FetchVariant::Relay { .. }));
        assert_eq!(extract.ids.len(), 1);
        assert_eq!(source.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_first_success_none_when_all_fail() {
        let variants = variants_from_config(&config());
        let source = ScriptedPageSource::new();
        assert!(first_success(&source, &variants, &list(), 1).await.is_none());
    }
}
