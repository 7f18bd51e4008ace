//! In-memory cache tier.
//!
//! Holds expensive upstream lookups only: metadata records, list id sets,
//! type statistics, genre facets and title page facts. Classified item lists
//! live in the durable snapshot store instead.

pub mod clock;
pub mod expiring_lru;
pub mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use expiring_lru::ExpiringLru;
pub use ttl::{CacheEntry, TtlCache};

use crate::catalog::{Bucket, ListId, TitleId};

/// Composite cache keys.
pub mod keys {
    use super::*;

    pub fn meta(bucket: Bucket, id: &TitleId) -> String {
        format!("meta:{bucket}:{id}")
    }

    pub fn stats(list: &ListId) -> String {
        format!("stats:{list}")
    }

    pub fn genres(list: &ListId, bucket: Bucket) -> String {
        format!("genres:{list}:{bucket}")
    }

    /// Prefix matching every genre entry of `list`.
    pub fn genres_prefix(list: &ListId) -> String {
        format!("genres:{list}:")
    }

    pub fn ids(list: &ListId) -> String {
        format!("ids:{list}")
    }
}
