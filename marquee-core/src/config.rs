//! Centralized configuration for Marquee.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::path::PathBuf;
use std::time::Duration;

/// Central configuration for all Marquee components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct MarqueeConfig {
    pub fetch: FetchConfig,
    pub metadata: MetadataConfig,
    pub classify: ClassifyConfig,
    pub cache: CacheConfig,
    pub catalog: CatalogConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
}

/// List page retrieval configuration.
///
/// Controls which site variants are tried for each page, in what order,
/// and when pagination stops.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Primary site origin
    pub primary_base_url: String,
    /// Mobile site origin, tried after the primary site
    pub mobile_base_url: String,
    /// Proxy relay prefixes, tried in order after the mobile site
    pub relay_prefixes: Vec<String>,
    /// Maximum number of list pages to walk
    pub page_cap: u32,
    /// A page with fewer ids than this is treated as the last page
    pub full_page_threshold: usize,
    /// HTTP request timeout for page retrieval
    pub request_timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            primary_base_url: "https://www.imdb.com".to_string(),
            mobile_base_url: "https://m.imdb.com".to_string(),
            relay_prefixes: vec!["https://r.jina.ai/".to_string()],
            page_cap: 20,
            full_page_threshold: 25,
            request_timeout: Duration::from_secs(15),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) marquee/0.1.0".to_string(),
        }
    }
}

/// External metadata service configuration.
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    /// Base URL of the Cinemeta-compatible metadata service
    pub base_url: String,
    /// HTTP request timeout for metadata lookups
    pub request_timeout: Duration,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            base_url: "https://v3-cinemeta.strem.io".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Type classification configuration.
#[derive(Debug, Clone)]
pub struct ClassifyConfig {
    /// Concurrent classification workers per list
    pub workers: usize,
    /// Map "Music Video" page labels to the movie bucket instead of excluding
    pub music_video_as_movie: bool,
    /// Capacity of the title page facts LRU (episode parent lookups)
    pub page_cache_capacity: usize,
    /// Lifetime of a cached title page lookup
    pub page_cache_ttl: Duration,
    /// Raw ids sampled by a has-type probe before giving up
    pub probe_sample: usize,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            workers: 6,
            music_video_as_movie: false,
            page_cache_capacity: 5000,
            page_cache_ttl: Duration::from_secs(7 * 24 * 3600),
            probe_sample: 12,
        }
    }
}

impl ClassifyConfig {
    /// Worker count clamped to the supported pool size.
    pub fn worker_count(&self) -> usize {
        self.workers.clamp(1, 16)
    }
}

/// In-memory cache tier configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime of a resolved metadata record
    pub meta_ttl: Duration,
    /// Lifetime of a cached metadata miss
    pub negative_meta_ttl: Duration,
    /// Lifetime of per-list type statistics
    pub stats_ttl: Duration,
    /// Lifetime of computed genre facets
    pub genres_ttl: Duration,
    /// Lifetime of a fetched list id set
    pub ids_ttl: Duration,
    /// Entry count above which expired entries are swept on insert
    pub sweep_threshold: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            meta_ttl: Duration::from_secs(24 * 3600),
            negative_meta_ttl: Duration::from_secs(3600),
            stats_ttl: Duration::from_secs(7 * 24 * 3600),
            genres_ttl: Duration::from_secs(6 * 3600),
            ids_ttl: Duration::from_secs(30 * 60),
            sweep_threshold: 10_000,
        }
    }
}

/// Catalog serving configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Largest page a single catalog request may return
    pub max_page_size: usize,
    /// Prefix of every catalog id in the manifest
    pub id_prefix: String,
    /// Addon id announced in the manifest
    pub addon_id: String,
    /// Addon display name announced in the manifest
    pub addon_name: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_page_size: 80,
            id_prefix: "marquee".to_string(),
            addon_id: "org.marquee.lists".to_string(),
            addon_name: "Marquee Lists".to_string(),
        }
    }
}

/// Durable storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for the user registry and snapshots
    pub data_dir: PathBuf,
    /// Temporary file suffix used by write-then-rename
    pub temp_file_suffix: &'static str,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            temp_file_suffix: ".tmp",
        }
    }
}

impl StorageConfig {
    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.data_dir.join("snapshots")
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7000,
        }
    }
}

impl MarqueeConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("MARQUEE_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }

        if let Ok(url) = std::env::var("MARQUEE_METADATA_URL") {
            config.metadata.base_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(relays) = std::env::var("MARQUEE_RELAYS") {
            config.fetch.relay_prefixes = relays
                .split(',')
                .map(str::trim)
                .filter(|relay| !relay.is_empty())
                .map(String::from)
                .collect();
        }

        if let Ok(pages) = std::env::var("MARQUEE_PAGE_CAP") {
            if let Ok(count) = pages.parse::<u32>() {
                config.fetch.page_cap = count;
            }
        }

        if let Ok(workers) = std::env::var("MARQUEE_WORKERS") {
            if let Ok(count) = workers.parse::<usize>() {
                config.classify.workers = count;
            }
        }

        if let Ok(flag) = std::env::var("MARQUEE_MUSIC_VIDEO_AS_MOVIE") {
            config.classify.music_video_as_movie = flag.parse().unwrap_or(false);
        }

        if let Ok(limit) = std::env::var("MARQUEE_MAX_PAGE_SIZE") {
            if let Ok(size) = limit.parse::<usize>() {
                config.catalog.max_page_size = size.max(1);
            }
        }

        if let Ok(host) = std::env::var("MARQUEE_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = std::env::var("MARQUEE_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                config.server.port = port;
            }
        }

        config
    }

    /// Creates a configuration for tests: small pools, data under `data_dir`.
    pub fn for_testing(data_dir: PathBuf) -> Self {
        let mut config = Self::default();
        config.storage.data_dir = data_dir;
        config.classify.workers = 4;
        config.fetch.relay_prefixes = vec!["https://relay.test/".to_string()];
        config
    }
}
