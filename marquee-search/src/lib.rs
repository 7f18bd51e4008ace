//! Marquee Search - list scraping, metadata and classification
//!
//! Turns a public list of titles into classified movie and series catalogs:
//! page retrieval with ordered fallbacks, cached metadata lookups, title page
//! inspection for episodes, the type classifier, and the [`CatalogService`]
//! that serves manifests and catalog pages from cached state.

pub mod classifier;
pub mod errors;
pub mod fetcher;
pub mod inspector;
pub mod metadata;
pub mod service;
pub mod sources;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export main types
pub use classifier::{ClassificationOutcome, EpisodeMapping, LabelKind, TypeClassifier, Verdict};
pub use errors::SourceError;
pub use fetcher::{FetchedList, ListFetcher};
pub use inspector::{TitleInspector, TitlePageFacts};
pub use metadata::{CinemetaClient, MetadataResolver, MetadataSource};
pub use service::{CatalogService, RefreshReport};
pub use sources::{FetchVariant, HttpPageSource, PageSource};
