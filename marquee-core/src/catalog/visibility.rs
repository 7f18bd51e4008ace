//! Per-list surface visibility and user list entries.

use serde::{Deserialize, Serialize};

use super::ids::ListId;
use super::model::Bucket;
use super::query::{CatalogQuery, DefaultSort};

/// Which client surfaces show one catalog type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceToggles {
    pub discover: bool,
    pub home: bool,
}

impl SurfaceToggles {
    pub const BOTH: SurfaceToggles = SurfaceToggles {
        discover: true,
        home: true,
    };

    pub fn any(self) -> bool {
        self.discover || self.home
    }

    /// Shown on home only, never on the filterable discover surface.
    pub fn is_home_only(self) -> bool {
        self.home && !self.discover
    }
}

impl Default for SurfaceToggles {
    fn default() -> Self {
        Self::BOTH
    }
}

/// Surface toggles for both catalog types of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Visibility {
    #[serde(default)]
    pub movie: SurfaceToggles,
    #[serde(default)]
    pub series: SurfaceToggles,
}

impl Visibility {
    pub fn for_bucket(&self, bucket: Bucket) -> SurfaceToggles {
        match bucket {
            Bucket::Movie => self.movie,
            Bucket::Series => self.series,
        }
    }

    fn uniform(toggles: SurfaceToggles) -> Self {
        Self {
            movie: toggles,
            series: toggles,
        }
    }
}

/// Legacy single-valued placement, applied to both types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowIn {
    Discover,
    Home,
    Both,
}

impl ShowIn {
    fn toggles(self) -> SurfaceToggles {
        match self {
            ShowIn::Discover => SurfaceToggles {
                discover: true,
                home: false,
            },
            ShowIn::Home => SurfaceToggles {
                discover: false,
                home: true,
            },
            ShowIn::Both => SurfaceToggles::BOTH,
        }
    }
}

/// One list in a user's collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListEntry {
    pub id: ListId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_in: Option<ShowIn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sort: Option<DefaultSort>,
}

impl UserListEntry {
    pub fn new(id: ListId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            visibility: Some(Visibility::default()),
            show_in: None,
            default_sort: None,
        }
    }

    /// Visibility after the legacy fallback: `visibility` wins over `showIn`.
    pub fn effective_visibility(&self) -> Visibility {
        match (self.visibility, self.show_in) {
            (Some(visibility), _) => visibility,
            (None, Some(show_in)) => Visibility::uniform(show_in.toggles()),
            (None, None) => Visibility::default(),
        }
    }

    pub fn toggles(&self, bucket: Bucket) -> SurfaceToggles {
        self.effective_visibility().for_bucket(bucket)
    }

    /// Whether a catalog request may be served for this list and type.
    ///
    /// Home-only catalogs serve the unfiltered view only.
    pub fn admits(&self, bucket: Bucket, query: &CatalogQuery) -> bool {
        let toggles = self.toggles(bucket);
        if !toggles.any() {
            return false;
        }
        !(toggles.is_home_only() && query.is_discover_request())
    }
}

/// A persisted list reference: a bare id string or a full entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListReference {
    Bare(String),
    Entry(UserListEntry),
}

impl ListReference {
    /// Normalizes the reference into an entry; `None` for unusable bare strings.
    pub fn into_entry(self) -> Option<UserListEntry> {
        match self {
            ListReference::Entry(entry) => Some(entry),
            ListReference::Bare(raw) => {
                let id = ListId::parse_source(&raw).ok()?;
                let name = id.to_string();
                Some(UserListEntry {
                    id,
                    name,
                    visibility: None,
                    show_in: None,
                    default_sort: None,
                })
            }
        }
    }
}

/// Partial update of a list entry; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPatch {
    pub name: Option<String>,
    pub visibility: Option<Visibility>,
    pub default_sort: Option<DefaultSort>,
}

impl ListPatch {
    pub fn apply(self, entry: &mut UserListEntry) {
        if let Some(name) = self.name.map(|name| name.trim().to_string()) {
            if !name.is_empty() {
                entry.name = name;
            }
        }
        if let Some(visibility) = self.visibility {
            entry.visibility = Some(visibility);
        }
        if let Some(default_sort) = self.default_sort {
            entry.default_sort = Some(default_sort);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_from(json: &str) -> UserListEntry {
        serde_json::from_str::<ListReference>(json)
            .unwrap()
            .into_entry()
            .unwrap()
    }

    #[test]
    fn test_legacy_show_in_fallback() {
        let entry = entry_from(r#"{"id":"ls123456","name":"Old","showIn":"home"}"#);
        assert!(entry.toggles(Bucket::Movie).is_home_only());
        assert!(entry.toggles(Bucket::Series).is_home_only());
    }

    #[test]
    fn test_visibility_wins_over_show_in() {
        let entry = entry_from(
            r#"{"id":"ls123456","name":"Both","showIn":"home",
                "visibility":{"movie":{"discover":true,"home":false},
                              "series":{"discover":false,"home":false}}}"#,
        );
        assert_eq!(
            entry.toggles(Bucket::Movie),
            SurfaceToggles {
                discover: true,
                home: false
            }
        );
        assert!(!entry.toggles(Bucket::Series).any());
    }

    #[test]
    fn test_bare_reference_normalizes() {
        let entry = entry_from(r#""https://example.com/list/ls777777/""#);
        assert_eq!(entry.id.as_str(), "ls777777");
        assert_eq!(entry.name, "ls777777");
        assert_eq!(entry.effective_visibility(), Visibility::default());

        let junk: ListReference = serde_json::from_str(r#""not a list""#).unwrap();
        assert!(junk.into_entry().is_none());
    }

    #[test]
    fn test_home_only_admits_unfiltered_only() {
        let mut entry = UserListEntry::new(ListId::parse_source("ls100000").unwrap(), "Home");
        entry.visibility = Some(Visibility {
            movie: SurfaceToggles {
                discover: false,
                home: true,
            },
            series: SurfaceToggles::BOTH,
        });

        let top = CatalogQuery::default();
        let comedy = CatalogQuery {
            genre: Some("Comedy".to_string()),
            ..CatalogQuery::default()
        };
        let search = CatalogQuery {
            search: Some("star".to_string()),
            ..CatalogQuery::default()
        };

        assert!(entry.admits(Bucket::Movie, &top));
        assert!(!entry.admits(Bucket::Movie, &comedy));
        assert!(!entry.admits(Bucket::Movie, &search));
        assert!(entry.admits(Bucket::Series, &comedy));
    }

    #[test]
    fn test_patch_keeps_absent_fields() {
        let mut entry = UserListEntry::new(ListId::parse_source("ls100000").unwrap(), "Name");
        let patch: ListPatch = serde_json::from_str(r#"{"defaultSort":{"key":"rating"}}"#).unwrap();
        patch.apply(&mut entry);

        assert_eq!(entry.name, "Name");
        assert_eq!(
            entry.default_sort.map(|sort| sort.key),
            Some(crate::catalog::query::SortKey::Rating)
        );
    }
}
