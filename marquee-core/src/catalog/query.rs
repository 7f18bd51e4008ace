//! Catalog query engine.
//!
//! Runs search, genre filter, sort and pagination, in that order, over an
//! already classified item set. Results are fully deterministic: every sort
//! key falls back to name and then id on ties.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::genres;
use super::model::ClassifiedItem;

static NUMERIC_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid numeric regex"));

const LEADING_ARTICLES: [&str; 3] = ["the ", "a ", "an "];

/// Sort keys accepted by catalog requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Added,
    Name,
    Year,
    Rating,
    Runtime,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::Added,
        SortKey::Name,
        SortKey::Year,
        SortKey::Rating,
        SortKey::Runtime,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Added => "added",
            SortKey::Name => "name",
            SortKey::Year => "year",
            SortKey::Rating => "rating",
            SortKey::Runtime => "runtime",
        }
    }

    /// Order used when a request names a key but no order.
    pub fn default_order(self) -> SortOrder {
        match self {
            SortKey::Added | SortKey::Name => SortOrder::Asc,
            SortKey::Year | SortKey::Rating | SortKey::Runtime => SortOrder::Desc,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "added" => Ok(SortKey::Added),
            "name" => Ok(SortKey::Name),
            "year" => Ok(SortKey::Year),
            "rating" => Ok(SortKey::Rating),
            "runtime" => Ok(SortKey::Runtime),
            other => Err(format!("Unknown sort key: {other}")),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub const ALL: [SortOrder; 2] = [SortOrder::Asc, SortOrder::Desc];

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            other => Err(format!("Unknown sort order: {other}")),
        }
    }
}

/// Per-list default sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultSort {
    pub key: SortKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
}

/// Parameters of one catalog request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub genre: Option<String>,
    pub sort: Option<SortKey>,
    pub order: Option<SortOrder>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl CatalogQuery {
    /// Builds a query from merged request parameters.
    ///
    /// Unparseable values fall back to defaults instead of failing the request.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let non_empty = |key: &str| {
            params
                .get(key)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(String::from)
        };

        Self {
            search: non_empty("search"),
            genre: non_empty("genre"),
            sort: params.get("sort").and_then(|value| value.parse().ok()),
            order: params.get("order").and_then(|value| value.parse().ok()),
            skip: params
                .get("skip")
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(0),
            limit: params.get("limit").and_then(|value| value.trim().parse().ok()),
        }
    }

    /// True for requests only the filterable discovery surface may serve.
    pub fn is_discover_request(&self) -> bool {
        let searching = self
            .search
            .as_deref()
            .is_some_and(|term| !term.trim().is_empty());
        searching || !genres::is_unfiltered(self.genre.as_deref())
    }

    /// Fills in sort and order from a list default when the request left them out.
    pub fn with_default_sort(mut self, default: Option<DefaultSort>) -> Self {
        if self.sort.is_none() {
            if let Some(default) = default {
                self.sort = Some(default.key);
                if self.order.is_none() {
                    self.order = default.order;
                }
            }
        }
        self
    }

    /// Sort key and direction after defaults are applied.
    pub fn resolved_sort(&self) -> (SortKey, SortOrder) {
        let key = self.sort.unwrap_or_default();
        (key, self.order.unwrap_or_else(|| key.default_order()))
    }
}

/// Runs the full query pipeline and returns one page.
pub fn run_query(
    items: &[ClassifiedItem],
    query: &CatalogQuery,
    max_page_size: usize,
) -> Vec<ClassifiedItem> {
    let needle = query
        .search
        .as_deref()
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty());

    let mut matched: Vec<&ClassifiedItem> = items
        .iter()
        .filter(|item| match &needle {
            Some(term) => item.name.to_lowercase().contains(term),
            None => true,
        })
        .filter(|item| genres::matches(&item.genres, query.genre.as_deref()))
        .collect();

    let (key, order) = query.resolved_sort();
    matched.sort_by(|a, b| compare_items(a, b, key, order));

    let limit = query.limit.unwrap_or(max_page_size).min(max_page_size);
    matched
        .into_iter()
        .skip(query.skip)
        .take(limit)
        .cloned()
        .collect()
}

/// Orders two items by `key`; only the primary comparison follows `order`.
pub fn compare_items(
    a: &ClassifiedItem,
    b: &ClassifiedItem,
    key: SortKey,
    order: SortOrder,
) -> Ordering {
    let primary = match key {
        SortKey::Added => a.added_order.cmp(&b.added_order),
        SortKey::Name => sort_name(&a.name).cmp(&sort_name(&b.name)),
        SortKey::Year => numeric_value(a.release_info.as_deref())
            .total_cmp(&numeric_value(b.release_info.as_deref())),
        SortKey::Rating => numeric_value(a.imdb_rating.as_deref())
            .total_cmp(&numeric_value(b.imdb_rating.as_deref())),
        SortKey::Runtime => {
            numeric_value(a.runtime.as_deref()).total_cmp(&numeric_value(b.runtime.as_deref()))
        }
    };
    let primary = match order {
        SortOrder::Asc => primary,
        SortOrder::Desc => primary.reverse(),
    };

    primary.then_with(|| tie_break(a, b, key))
}

fn tie_break(a: &ClassifiedItem, b: &ClassifiedItem, key: SortKey) -> Ordering {
    let by_name = if key == SortKey::Name {
        Ordering::Equal
    } else {
        sort_name(&a.name).cmp(&sort_name(&b.name))
    };
    by_name
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

/// Lowercased name with one leading article removed, for comparison only.
pub fn sort_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    for article in LEADING_ARTICLES {
        if let Some(rest) = lowered.strip_prefix(article) {
            let rest = rest.trim_start();
            if !rest.is_empty() {
                return rest.to_string();
            }
        }
    }
    lowered
}

/// First numeric token of a value such as `"101 min"`; 0 when absent.
pub fn numeric_value(raw: Option<&str>) -> f64 {
    raw.and_then(|value| NUMERIC_TOKEN.find(value))
        .and_then(|token| token.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}
