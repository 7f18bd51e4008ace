//! Catalog domain: identifiers, classified items, genres, querying,
//! visibility and the discovery manifest.

pub mod genres;
pub mod ids;
pub mod manifest;
pub mod model;
pub mod query;
pub mod stats;
pub mod visibility;

pub use ids::{InvalidIdentifier, ListId, TitleId};
pub use manifest::{
    CatalogDescriptor, CatalogRef, ExtraField, Manifest, ManifestList, TypeProbe, build_manifest,
    catalog_id, parse_catalog_id,
};
pub use model::{Bucket, ClassifiedItem, MetaRecord};
pub use query::{CatalogQuery, DefaultSort, SortKey, SortOrder, run_query};
pub use stats::TypeStats;
pub use visibility::{ListPatch, ListReference, ShowIn, SurfaceToggles, UserListEntry, Visibility};
