//! Genre canonicalization.
//!
//! Free-text genre labels from the metadata service are folded into a fixed
//! taxonomy. Compound labels such as "Action & Adventure" are kept as display
//! labels but always exploded into their constituents for filtering and
//! faceting.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;

/// Sentinel genre option meaning "no genre filter".
pub const TOP_GENRE: &str = "Top";

/// Fixed taxonomy, in facet display order.
pub const TAXONOMY: &[&str] = &[
    "Action",
    "Adventure",
    "Animation",
    "Biography",
    "Comedy",
    "Crime",
    "Documentary",
    "Drama",
    "Family",
    "Fantasy",
    "Film-Noir",
    "Game-Show",
    "History",
    "Horror",
    "Music",
    "Musical",
    "Mystery",
    "News",
    "Reality-TV",
    "Romance",
    "Sci-Fi",
    "Short",
    "Sport",
    "Talk-Show",
    "Thriller",
    "War",
    "Western",
];

/// Compound labels and the canonical genres they stand for.
const COMPOUNDS: &[(&str, &[&str])] = &[
    ("Action & Adventure", &["Action", "Adventure"]),
    ("Sci-Fi & Fantasy", &["Sci-Fi", "Fantasy"]),
];

/// Variant spellings, keyed by normalized form.
const ALIASES: &[(&str, &str)] = &[
    ("sci fi", "Sci-Fi"),
    ("scifi", "Sci-Fi"),
    ("science fiction", "Sci-Fi"),
    ("doc", "Documentary"),
    ("docs", "Documentary"),
    ("documentaries", "Documentary"),
    ("docuseries", "Documentary"),
    ("biopic", "Biography"),
    ("sports", "Sport"),
    ("animated", "Animation"),
    ("romantic", "Romance"),
    ("kids", "Family"),
    ("children", "Family"),
    ("noir", "Film-Noir"),
    ("reality", "Reality-TV"),
    ("historical", "History"),
    ("suspense", "Thriller"),
    ("thrillers", "Thriller"),
    ("comedies", "Comedy"),
    ("dramas", "Drama"),
    ("musicals", "Musical"),
    ("westerns", "Western"),
    ("action adventure", "Action & Adventure"),
    ("sci fi fantasy", "Sci-Fi & Fantasy"),
    ("science fiction fantasy", "Sci-Fi & Fantasy"),
];

static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid separator regex"));

static FIELD_SPLIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(?:,|&|/|\band\b)\s*").expect("valid genre split regex")
});

static LOOKUP: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    let mut table = HashMap::new();
    for genre in TAXONOMY {
        table.insert(normalize(genre), *genre);
    }
    for (compound, _) in COMPOUNDS {
        table.insert(normalize(compound), *compound);
    }
    for (alias, canonical) in ALIASES {
        table.insert((*alias).to_string(), *canonical);
    }
    table
});

/// Lowercases, collapses whitespace and punctuation runs to one space, trims.
pub fn normalize(label: &str) -> String {
    SEPARATOR_RUN
        .replace_all(&label.to_lowercase(), " ")
        .trim()
        .to_string()
}

/// Maps a label to its canonical genre.
///
/// Unknown labels are title-cased word by word; only blank input yields `None`.
pub fn canonicalize(label: &str) -> Option<String> {
    let key = normalize(label);
    if key.is_empty() {
        return None;
    }
    if let Some(canonical) = LOOKUP.get(&key) {
        return Some((*canonical).to_string());
    }
    Some(title_case(&key))
}

/// Constituents of a compound label, if it is one.
pub fn compound_parts(canonical: &str) -> Option<&'static [&'static str]> {
    COMPOUNDS
        .iter()
        .find(|(compound, _)| *compound == canonical)
        .map(|(_, parts)| *parts)
}

/// Splits a raw genre field into canonical genres, expanding compounds.
///
/// The result never contains a compound label.
pub fn explode(raw: &str) -> BTreeSet<String> {
    let mut genres = BTreeSet::new();

    // A whole-field compound ("Action and Adventure") must win over splitting.
    if let Some(parts) = canonicalize(raw).as_deref().and_then(compound_parts) {
        genres.extend(parts.iter().map(|part| (*part).to_string()));
        return genres;
    }

    for piece in FIELD_SPLIT.split(raw) {
        let Some(canonical) = canonicalize(piece) else {
            continue;
        };
        match compound_parts(&canonical) {
            Some(parts) => genres.extend(parts.iter().map(|part| (*part).to_string())),
            None => {
                genres.insert(canonical);
            }
        }
    }
    genres
}

/// Union of [`explode`] over every label of an item.
pub fn explode_all<S: AsRef<str>>(labels: &[S]) -> BTreeSet<String> {
    labels
        .iter()
        .flat_map(|label| explode(label.as_ref()))
        .collect()
}

/// True when the requested genre means "no filter".
pub fn is_unfiltered(requested: Option<&str>) -> bool {
    match requested.map(str::trim) {
        None => true,
        Some(genre) => genre.is_empty() || genre.eq_ignore_ascii_case(TOP_GENRE),
    }
}

/// Whether an item tagged with `labels` satisfies a genre request.
pub fn matches<S: AsRef<str>>(labels: &[S], requested: Option<&str>) -> bool {
    if is_unfiltered(requested) {
        return true;
    }
    let wanted = explode(requested.unwrap_or_default());
    if wanted.is_empty() {
        return true;
    }
    let have = explode_all(labels);
    !wanted.is_disjoint(&have)
}

/// Taxonomy genres present across `label_sets`, in taxonomy order.
pub fn observed_facets<'a, I, S>(label_sets: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a [S]>,
    S: AsRef<str> + 'a,
{
    let seen: BTreeSet<String> = label_sets
        .into_iter()
        .flat_map(|labels| explode_all(labels))
        .collect();
    TAXONOMY
        .iter()
        .filter(|genre| seen.contains(**genre))
        .map(|genre| (*genre).to_string())
        .collect()
}

fn title_case(normalized: &str) -> String {
    normalized
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(genres: &[&str]) -> BTreeSet<String> {
        genres.iter().map(|genre| genre.to_string()).collect()
    }

    #[test]
    fn test_normalize_collapses_separators() {
        assert_eq!(normalize("  Sci-Fi  "), "sci fi");
        assert_eq!(normalize("Action   &  Adventure"), "action adventure");
        assert_eq!(normalize("Reality-TV"), "reality tv");
    }

    #[test]
    fn test_canonicalize_aliases() {
        assert_eq!(canonicalize("sci fi").as_deref(), Some("Sci-Fi"));
        assert_eq!(canonicalize("SciFi").as_deref(), Some("Sci-Fi"));
        assert_eq!(canonicalize("docs").as_deref(), Some("Documentary"));
        assert_eq!(canonicalize("Documentaries").as_deref(), Some("Documentary"));
        assert_eq!(canonicalize("film noir").as_deref(), Some("Film-Noir"));
    }

    #[test]
    fn test_canonicalize_unmapped_title_cases() {
        assert_eq!(canonicalize("martial ARTS").as_deref(), Some("Martial Arts"));
        assert_eq!(canonicalize("   "), None);
    }

    #[test]
    fn test_explode_is_idempotent_on_canonical() {
        for genre in TAXONOMY {
            assert_eq!(explode(genre), set(&[*genre]), "genre {genre}");
        }
    }

    #[test]
    fn test_explode_compounds() {
        assert_eq!(explode("Action & Adventure"), set(&["Action", "Adventure"]));
        assert_eq!(explode("Sci-Fi & Fantasy"), set(&["Sci-Fi", "Fantasy"]));
        assert_eq!(explode("Action and Adventure"), set(&["Action", "Adventure"]));
    }

    #[test]
    fn test_explode_delimited_field() {
        assert_eq!(
            explode("Drama, Crime/Thriller and Comedy"),
            set(&["Comedy", "Crime", "Drama", "Thriller"])
        );
        assert_eq!(explode(", ,"), BTreeSet::new());
    }

    #[test]
    fn test_matches_compound_both_directions() {
        let compound_only = vec!["Sci-Fi & Fantasy".to_string()];
        assert!(matches(&compound_only, Some("Fantasy")));
        assert!(!matches(&compound_only, Some("Comedy")));

        let action_only = vec!["Action".to_string()];
        assert!(matches(&action_only, Some("Action & Adventure")));
    }

    #[test]
    fn test_top_is_unfiltered() {
        let none: Vec<String> = Vec::new();
        assert!(matches(&none, Some("Top")));
        assert!(matches(&none, None));
        assert!(matches(&none, Some("")));
        assert!(!matches(&none, Some("Drama")));
    }

    #[test]
    fn test_observed_facets_taxonomy_order() {
        let a = vec!["Thriller".to_string(), "Martial Arts".to_string()];
        let b = vec!["Action & Adventure".to_string()];
        let facets = observed_facets([a.as_slice(), b.as_slice()]);
        assert_eq!(facets, vec!["Action", "Adventure", "Thriller"]);
    }
}
