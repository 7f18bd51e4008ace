//! Addon path helpers.

use std::collections::HashMap;

/// Drops the `.json` suffix clients append to the last path segment.
pub fn strip_json(segment: &str) -> &str {
    segment.strip_suffix(".json").unwrap_or(segment)
}

/// Parses a raw extra segment (`genre=Sci-Fi%20%26%20Fantasy&skip=20`).
///
/// Expects the segment still percent-encoded so encoded `&` and `=` inside
/// values survive. Pairs without `=` or with undecodable text are dropped;
/// a repeated key keeps its last value.
pub fn parse_extra(raw: &str) -> HashMap<String, String> {
    strip_json(raw)
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = urlencoding::decode(key).ok()?;
            let value = urlencoding::decode(value).ok()?;
            if key.is_empty() {
                return None;
            }
            Some((key.into_owned(), value.into_owned()))
        })
        .collect()
}
