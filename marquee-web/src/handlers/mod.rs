//! HTTP request handlers organized by functionality

pub mod addon;
pub mod extra;
pub mod lists;

// Re-export handler functions
pub use addon::{CatalogPath, CatalogResponse, catalog, catalog_with_extra, health, manifest};
pub use extra::{parse_extra, strip_json};
pub use lists::{
    AddListRequest, ApiError, add_list, list_lists, patch_list, refresh_list, remove_list,
};
