//! Title detail page inspection.
//!
//! Pulls the facts classification needs when the metadata service knows
//! nothing about an id: the parent series of an episode, the page's own type
//! label, and enough display data to build an item.

use std::sync::Arc;

use marquee_core::TitleId;
use marquee_core::cache::{Clock, ExpiringLru};
use marquee_core::config::{ClassifyConfig, FetchConfig};
use scraper::Html;
use serde_json::Value;

use crate::classifier::{LabelKind, label_kind};
use crate::sources::PageSource;
use crate::sources::consts::{
    ANCHOR_SELECTOR, H1_SELECTOR, LD_JSON_SELECTOR, OG_IMAGE_SELECTOR, OG_TITLE_SELECTOR,
    OG_TYPE_SELECTOR, PAREN_LABEL_REGEX, PARENT_ATTR_SELECTOR, PARENT_LINK_SELECTOR,
    TITLE_ID_REGEX, YEAR_REGEX,
};
use crate::sources::decode_entities;

/// What a title's detail page says about it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitlePageFacts {
    /// Parent series, for episodes
    pub parent: Option<TitleId>,
    /// Raw type label (`TVSeries`, `TV Episode`, `video.movie`, ...)
    pub label: Option<String>,
    pub title: Option<String>,
    pub poster: Option<String>,
    pub year: Option<String>,
}

/// Fetches and caches [`TitlePageFacts`].
#[derive(Debug)]
pub struct TitleInspector {
    source: Arc<dyn PageSource>,
    base_url: String,
    cache: ExpiringLru<TitleId, TitlePageFacts>,
}

impl TitleInspector {
    pub fn new(
        source: Arc<dyn PageSource>,
        fetch: &FetchConfig,
        classify: &ClassifyConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            base_url: fetch.primary_base_url.trim_end_matches('/').to_string(),
            cache: ExpiringLru::new(classify.page_cache_capacity, classify.page_cache_ttl, clock),
        }
    }

    /// Facts for `id`, or `None` when the page could not be retrieved.
    /// Only successful inspections are cached.
    pub async fn inspect(&self, id: &TitleId) -> Option<TitlePageFacts> {
        if let Some(facts) = self.cache.get(id) {
            return Some(facts);
        }

        let url = format!("{}/title/{}/", self.base_url, id);
        match self.source.fetch_text(&url).await {
            Ok(body) => {
                let facts = parse_title_page(id, &body);
                tracing::trace!("Inspected {}: {:?}", id, facts);
                self.cache.put(id.clone(), facts.clone());
                Some(facts)
            }
            Err(e) => {
                tracing::debug!("Title page for {} unavailable: {}", id, e);
                None
            }
        }
    }
}

/// Extracts facts from a title page body.
pub fn parse_title_page(id: &TitleId, body: &str) -> TitlePageFacts {
    let document = Html::parse_document(body);
    let linked_data = linked_data_nodes(&document);
    let og_title = meta_content(&document, &OG_TITLE_SELECTOR);

    let label = linked_data
        .iter()
        .find_map(ld_type)
        .or_else(|| og_title.as_deref().and_then(parenthesized_label))
        .or_else(|| meta_content(&document, &OG_TYPE_SELECTOR));

    // Pages that name themselves a movie, series or excluded type link to
    // plenty of unrelated titles, none of which is a parent.
    let may_have_parent = label.as_deref().is_none_or(|label| {
        matches!(
            label_kind(label, false),
            LabelKind::Episode | LabelKind::Unknown
        )
    });
    let parent = may_have_parent
        .then(|| {
            linked_data
                .iter()
                .find_map(ld_parent)
                .or_else(|| explicit_parent(&document))
                .or_else(|| linked_title(&document, id))
        })
        .flatten()
        .filter(|parent| parent != id);

    let title = og_title
        .as_deref()
        .and_then(strip_title_decorations)
        .or_else(|| {
            document
                .select(&H1_SELECTOR)
                .map(|element| element.text().collect::<String>().trim().to_string())
                .find(|text| !text.is_empty())
        })
        .or_else(|| linked_data.iter().find_map(|node| ld_string(node, "name")));

    let poster = meta_content(&document, &OG_IMAGE_SELECTOR)
        .or_else(|| linked_data.iter().find_map(ld_image));

    let year = linked_data
        .iter()
        .find_map(|node| ld_string(node, "datePublished"))
        .or_else(|| og_title.clone())
        .and_then(|text| {
            YEAR_REGEX
                .captures(&text)
                .map(|captures| captures[1].to_string())
        });

    TitlePageFacts {
        parent,
        label,
        title,
        poster,
        year,
    }
}

fn linked_data_nodes(document: &Html) -> Vec<Value> {
    let mut nodes = Vec::new();
    for script in document.select(&LD_JSON_SELECTOR) {
        let text = script.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        collect_nodes(value, &mut nodes);
    }
    nodes
}

fn collect_nodes(value: Value, nodes: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items
            .into_iter()
            .for_each(|item| collect_nodes(item, nodes)),
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                collect_nodes(graph, nodes);
            }
            nodes.push(Value::Object(map));
        }
        _ => {}
    }
}

fn ld_parent(node: &Value) -> Option<TitleId> {
    ["partOfSeries", "partOfTVSeries"]
        .iter()
        .filter_map(|key| node.get(*key))
        .find_map(id_in_value)
}

fn id_in_value(value: &Value) -> Option<TitleId> {
    match value {
        Value::String(s) => first_title_id(s),
        Value::Object(map) => ["url", "@id", "sameAs"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(id_in_value),
        Value::Array(items) => items.iter().find_map(id_in_value),
        _ => None,
    }
}

fn ld_type(node: &Value) -> Option<String> {
    match node.get("@type")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(|item| item.as_str().map(String::from)),
        _ => None,
    }
}

fn ld_string(node: &Value, key: &str) -> Option<String> {
    node.get(key)
        .and_then(Value::as_str)
        .map(|s| decode_entities(s.trim()))
        .filter(|s| !s.is_empty())
}

fn ld_image(node: &Value) -> Option<String> {
    match node.get("image")? {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("url").and_then(Value::as_str).map(String::from),
        _ => None,
    }
}

fn explicit_parent(document: &Html) -> Option<TitleId> {
    let from_attr = document.select(&PARENT_ATTR_SELECTOR).find_map(|element| {
        ["data-parent-id", "data-parent-tconst"]
            .iter()
            .filter_map(|attr| element.value().attr(attr))
            .find_map(first_title_id)
    });
    from_attr.or_else(|| {
        document
            .select(&PARENT_LINK_SELECTOR)
            .filter_map(|element| element.value().attr("href"))
            .find_map(first_title_id)
    })
}

fn linked_title(document: &Html, own: &TitleId) -> Option<TitleId> {
    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|element| element.value().attr("href"))
        .filter(|href| href.contains("/title/"))
        .filter_map(first_title_id)
        .find(|id| id != own)
}

fn first_title_id(text: &str) -> Option<TitleId> {
    TITLE_ID_REGEX
        .captures(text)
        .and_then(|captures| TitleId::parse(&captures[1]).ok())
}

fn meta_content(document: &Html, selector: &scraper::Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|element| element.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(String::from)
}

/// `"Lost (TV Series 2004–2010) - IMDb"` → `"TV Series"`. Year-only
/// parentheses carry no label.
fn parenthesized_label(og_title: &str) -> Option<String> {
    let inner = PAREN_LABEL_REGEX.captures(og_title)?.get(1)?.as_str();
    let label: String = inner
        .split_whitespace()
        .take_while(|word| !word.starts_with(|c: char| c.is_ascii_digit()))
        .collect::<Vec<_>>()
        .join(" ");
    (!label.is_empty()).then_some(label)
}

/// `"Lost (TV Series 2004–2010) - IMDb"` → `"Lost"`.
fn strip_title_decorations(og_title: &str) -> Option<String> {
    let without_suffix = match PAREN_LABEL_REGEX.find(og_title) {
        Some(found) => &og_title[..found.start()],
        None => og_title.trim_end().trim_end_matches("- IMDb"),
    };
    let title = without_suffix.trim();
    (!title.is_empty()).then(|| title.to_string())
}
