//! Id and title extraction from listing pages.
//!
//! Works on full HTML documents as well as the plain-text renderings that
//! relay services return.

use std::collections::HashSet;

use marquee_core::TitleId;
use scraper::Html;

use super::consts::{
    BARE_TITLE_ID_REGEX, H1_SELECTOR, OG_TITLE_SELECTOR, RELAY_TITLE_REGEX, TITLE_LINK_REGEX,
    TITLE_SELECTOR,
};

const SITE_SUFFIX: &str = " - imdb";

/// What one listing page yielded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageExtract {
    /// Title ids in page order, deduplicated, lowercase
    pub ids: Vec<TitleId>,
    /// Display title of the list, if the page carried one
    pub title: Option<String>,
}

pub fn extract_page(body: &str) -> PageExtract {
    PageExtract {
        ids: extract_title_ids(body),
        title: extract_title(body),
    }
}

/// Collects title ids in first-seen order.
///
/// Title links are preferred; bare `tt` tokens are only used when the page
/// has no title links at all.
pub fn extract_title_ids(body: &str) -> Vec<TitleId> {
    let linked = collect_ids(body, &TITLE_LINK_REGEX);
    if !linked.is_empty() {
        return linked;
    }
    collect_ids(body, &BARE_TITLE_ID_REGEX)
}

fn collect_ids(body: &str, pattern: &regex::Regex) -> Vec<TitleId> {
    let mut seen = HashSet::new();
    pattern
        .captures_iter(body)
        .filter_map(|captures| TitleId::parse(&captures[1]).ok())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Picks the list title from the first structured signal present.
pub fn extract_title(body: &str) -> Option<String> {
    let document = Html::parse_document(body);

    let heading = document
        .select(&H1_SELECTOR)
        .map(|element| element.text().collect::<String>())
        .find_map(|text| clean_title(&text));
    if heading.is_some() {
        return heading;
    }

    let og_title = document
        .select(&OG_TITLE_SELECTOR)
        .filter_map(|element| element.value().attr("content"))
        .find_map(clean_title);
    if og_title.is_some() {
        return og_title;
    }

    let title = document
        .select(&TITLE_SELECTOR)
        .map(|element| element.text().collect::<String>())
        .find_map(|text| clean_title(&text));
    if title.is_some() {
        return title;
    }

    RELAY_TITLE_REGEX
        .captures(body)
        .and_then(|captures| clean_title(&decode_entities(&captures[1])))
}

/// Decodes HTML character references in plain text.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    Html::parse_fragment(text)
        .root_element()
        .text()
        .collect::<String>()
}

fn clean_title(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let cut = collapsed.len().saturating_sub(SITE_SUFFIX.len());
    let stripped = match collapsed.get(cut..) {
        Some(tail) if tail.eq_ignore_ascii_case(SITE_SUFFIX) => &collapsed[..cut],
        _ => collapsed.as_str(),
    };
    let title = stripped.trim();
    (!title.is_empty()).then(|| title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<TitleId> {
        raw.iter().map(|id| TitleId::parse(id).unwrap()).collect()
    }

    #[test]
    fn test_ids_deduplicated_in_page_order() {
        let body = r#"
            <a href="/title/tt0000003/">C</a>
            <a href="/title/TT0000001/?ref_=x">A</a>
            <a href="/title/tt0000003/">C again</a>
            <a href="/title/tt0000002/">B</a>
        "#;
        assert_eq!(
            extract_title_ids(body),
            ids(&["tt0000003", "tt0000001", "tt0000002"])
        );
    }

    #[test]
    fn test_bare_ids_used_without_links() {
        let body = r#"{"items":["tt1234567","tt7654321","tt1234567"]}"#;
        assert_eq!(extract_title_ids(body), ids(&["tt1234567", "tt7654321"]));
    }

    #[test]
    fn test_title_prefers_heading() {
        let body = r#"<html><head>
            <meta property="og:title" content="Other">
            <title>Fallback - IMDb</title>
            </head><body><h1>  Best   of &amp; Rest </h1></body></html>"#;
        assert_eq!(extract_title(body).as_deref(), Some("Best of & Rest"));
    }

    #[test]
    fn test_title_falls_back_to_og_then_title() {
        let og = r#"<html><head><meta property="og:title" content="Noir Picks - IMDb"></head></html>"#;
        assert_eq!(extract_title(og).as_deref(), Some("Noir Picks"));

        let title = r#"<html><head><title>Late Night - IMDb</title></head></html>"#;
        assert_eq!(extract_title(title).as_deref(), Some("Late Night"));
    }

    #[test]
    fn test_relay_title_line() {
        let body = "Title: Tom &amp; Jerry Shorts - IMDb\n\nURL Source: https://www.imdb.com/list/ls1234567/\n";
        assert_eq!(extract_title(body).as_deref(), Some("Tom & Jerry Shorts"));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Fast &amp; Furious"), "Fast & Furious");
        assert_eq!(decode_entities("Am&eacute;lie"), "Amélie");
        assert_eq!(decode_entities("plain"), "plain");
    }
}
