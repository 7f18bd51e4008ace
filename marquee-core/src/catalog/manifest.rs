//! Discovery manifest construction.
//!
//! The manifest lists one catalog per (list, type) pair that has items and
//! at least one enabled surface. Extra parameters advertise what the catalog
//! endpoint accepts for that pair.

use serde::Serialize;

use super::genres::TOP_GENRE;
use super::ids::ListId;
use super::model::Bucket;
use super::query::{SortKey, SortOrder};
use super::visibility::{SurfaceToggles, UserListEntry};
use crate::config::CatalogConfig;

/// The discovery document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: String,
    pub version: String,
    pub name: String,
    pub description: String,
    pub resources: Vec<String>,
    pub types: Vec<String>,
    pub id_prefixes: Vec<String>,
    pub catalogs: Vec<CatalogDescriptor>,
    pub behavior_hints: BehaviorHints,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehaviorHints {
    pub configurable: bool,
}

/// One catalog entry in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogDescriptor {
    #[serde(rename = "type")]
    pub bucket: Bucket,
    pub id: String,
    pub name: String,
    pub extra: Vec<ExtraField>,
}

impl CatalogDescriptor {
    pub fn extra_field(&self, name: &str) -> Option<&ExtraField> {
        self.extra.iter().find(|field| field.name == name)
    }
}

/// One accepted extra parameter of a catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraField {
    pub name: String,
    pub is_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl ExtraField {
    fn plain(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_required: false,
            options: None,
        }
    }

    fn with_options(name: &str, options: Vec<String>, is_required: bool) -> Self {
        Self {
            name: name.to_string(),
            is_required,
            options: Some(options),
        }
    }
}

/// Probe results for one type of one list.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeProbe {
    pub bucket: Bucket,
    pub has_items: bool,
    pub genres: Vec<String>,
}

/// A user list with its probe results, ready for manifest building.
#[derive(Debug, Clone)]
pub struct ManifestList {
    pub entry: UserListEntry,
    pub probes: Vec<TypeProbe>,
}

/// The (uid, list, type) triple a catalog id encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRef {
    pub uid: String,
    pub list: ListId,
    pub bucket: Bucket,
}

/// Catalog id of the form `<prefix>-<uid>-<listId>-<movies|series>`.
pub fn catalog_id(prefix: &str, uid: &str, list: &ListId, bucket: Bucket) -> String {
    format!("{prefix}-{uid}-{list}-{}", bucket.catalog_suffix())
}

/// Inverse of [`catalog_id`]. The uid may itself contain dashes.
pub fn parse_catalog_id(prefix: &str, raw: &str) -> Option<CatalogRef> {
    let rest = raw.strip_prefix(prefix)?.strip_prefix('-')?;
    let (rest, suffix) = rest.rsplit_once('-')?;
    let bucket = Bucket::from_catalog_suffix(suffix)?;
    let (uid, list) = rest.rsplit_once('-')?;
    if uid.is_empty() || !list.starts_with("ls") {
        return None;
    }
    let list = ListId::parse_source(list).ok()?;
    Some(CatalogRef {
        uid: uid.to_string(),
        list,
        bucket,
    })
}

/// Builds the manifest for one user.
pub fn build_manifest(config: &CatalogConfig, uid: &str, lists: &[ManifestList]) -> Manifest {
    let catalogs = lists
        .iter()
        .flat_map(|list| {
            list.probes
                .iter()
                .filter_map(move |probe| describe_catalog(config, uid, &list.entry, probe))
        })
        .collect();

    Manifest {
        id: config.addon_id.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        name: config.addon_name.clone(),
        description: "Public title lists as filterable movie and series catalogs".to_string(),
        resources: vec!["catalog".to_string()],
        types: Bucket::ALL.iter().map(|bucket| bucket.to_string()).collect(),
        id_prefixes: vec!["tt".to_string()],
        catalogs,
        behavior_hints: BehaviorHints { configurable: true },
    }
}

fn describe_catalog(
    config: &CatalogConfig,
    uid: &str,
    entry: &UserListEntry,
    probe: &TypeProbe,
) -> Option<CatalogDescriptor> {
    let toggles = entry.toggles(probe.bucket);
    if !probe.has_items || !toggles.any() {
        return None;
    }

    Some(CatalogDescriptor {
        bucket: probe.bucket,
        id: catalog_id(&config.id_prefix, uid, &entry.id, probe.bucket),
        name: format!("{} ({})", entry.name, probe.bucket.display_label()),
        extra: extra_fields(toggles, &probe.genres),
    })
}

fn extra_fields(toggles: SurfaceToggles, genres: &[String]) -> Vec<ExtraField> {
    let mut extra = Vec::new();

    if toggles.is_home_only() {
        extra.push(ExtraField::with_options(
            "genre",
            vec![TOP_GENRE.to_string()],
            false,
        ));
    } else {
        extra.push(ExtraField::plain("search"));
        let mut options = vec![TOP_GENRE.to_string()];
        options.extend(genres.iter().cloned());
        // A required extra keeps a discover-only catalog off the home board.
        extra.push(ExtraField::with_options("genre", options, !toggles.home));
    }

    extra.push(ExtraField::plain("skip"));
    extra.push(ExtraField::plain("limit"));
    extra.push(ExtraField::with_options(
        "sort",
        SortKey::ALL.iter().map(|key| key.to_string()).collect(),
        false,
    ));
    extra.push(ExtraField::with_options(
        "order",
        SortOrder::ALL
            .iter()
            .map(|order| order.as_str().to_string())
            .collect(),
        false,
    ));
    extra
}
