//! Catalog data model: buckets, metadata records and classified items.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ids::TitleId;

/// Coarse classification of a title for catalog partitioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Movie,
    Series,
}

impl Bucket {
    pub const ALL: [Bucket; 2] = [Bucket::Movie, Bucket::Series];

    /// Protocol type name (`movie` / `series`).
    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::Movie => "movie",
            Bucket::Series => "series",
        }
    }

    /// Suffix used in catalog ids (`movies` / `series`).
    pub fn catalog_suffix(self) -> &'static str {
        match self {
            Bucket::Movie => "movies",
            Bucket::Series => "series",
        }
    }

    /// Human label used in catalog names.
    pub fn display_label(self) -> &'static str {
        match self {
            Bucket::Movie => "Movies",
            Bucket::Series => "Series",
        }
    }

    /// Parses a catalog id suffix back into a bucket.
    pub fn from_catalog_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "movies" => Some(Bucket::Movie),
            "series" => Some(Bucket::Series),
            _ => None,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "movie" => Ok(Bucket::Movie),
            "series" => Ok(Bucket::Series),
            other => Err(format!("Unknown catalog type: {other}")),
        }
    }
}

/// Normalized record returned by the metadata service for one title.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaRecord {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_info: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub cast: Vec<String>,
    #[serde(default)]
    pub director: Vec<String>,
}

/// A title committed to exactly one bucket of one list.
///
/// Serialized with the client protocol's meta field names; `addedOrder`
/// rides along so snapshots keep source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedItem {
    pub id: TitleId,
    #[serde(rename = "type")]
    pub bucket: Bucket,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_info: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cast: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub director: Vec<String>,
    #[serde(default)]
    pub added_order: usize,
}

impl ClassifiedItem {
    /// Builds an item from a metadata record. The record's own id is ignored
    /// in favour of `id`, which is the id committed by classification.
    pub fn from_meta(id: TitleId, bucket: Bucket, meta: MetaRecord) -> Self {
        Self {
            id,
            bucket,
            name: meta.name,
            poster: meta.poster,
            background: meta.background,
            logo: meta.logo,
            release_info: meta.release_info,
            genres: meta.genres,
            imdb_rating: meta.imdb_rating,
            runtime: meta.runtime,
            description: meta.description,
            cast: meta.cast,
            director: meta.director,
            added_order: 0,
        }
    }

    /// Minimal item for a title known only from its page.
    pub fn bare(id: TitleId, bucket: Bucket, name: String) -> Self {
        Self {
            id,
            bucket,
            name,
            poster: None,
            background: None,
            logo: None,
            release_info: None,
            genres: Vec::new(),
            imdb_rating: None,
            runtime: None,
            description: None,
            cast: Vec::new(),
            director: Vec::new(),
            added_order: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_round_trips_catalog_suffix() {
        for bucket in Bucket::ALL {
            assert_eq!(
                Bucket::from_catalog_suffix(bucket.catalog_suffix()),
                Some(bucket)
            );
        }
        assert_eq!(Bucket::from_catalog_suffix("shows"), None);
        assert_eq!("Series".parse::<Bucket>(), Ok(Bucket::Series));
    }

    #[test]
    fn test_item_serializes_protocol_fields() {
        let meta = MetaRecord {
            id: "tt0000001".to_string(),
            name: "Example".to_string(),
            release_info: Some("1999".to_string()),
            imdb_rating: Some("7.1".to_string()),
            genres: vec!["Drama".to_string()],
            ..MetaRecord::default()
        };
        let item =
            ClassifiedItem::from_meta(TitleId::parse("tt0000001").unwrap(), Bucket::Movie, meta);
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["type"], "movie");
        assert_eq!(json["releaseInfo"], "1999");
        assert_eq!(json["imdbRating"], "7.1");
        assert_eq!(json["addedOrder"], 0);
        assert!(json.get("cast").is_none());
    }
}
