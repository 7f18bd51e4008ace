//! Per-list type presence statistics.

use serde::{Deserialize, Serialize};

use super::model::Bucket;

/// How many items of each type a list is known to hold.
///
/// `None` means not yet known. Counts only ever grow: [`TypeStats::bump`]
/// keeps the larger of the stored and observed values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeStats {
    pub movie: Option<usize>,
    pub series: Option<usize>,
}

impl TypeStats {
    pub fn get(&self, bucket: Bucket) -> Option<usize> {
        match bucket {
            Bucket::Movie => self.movie,
            Bucket::Series => self.series,
        }
    }

    /// Known presence of a type, if any observation exists.
    pub fn has(&self, bucket: Bucket) -> Option<bool> {
        self.get(bucket).map(|count| count > 0)
    }

    /// Records an observation of `count` items.
    pub fn bump(&mut self, bucket: Bucket, count: usize) {
        let slot = match bucket {
            Bucket::Movie => &mut self.movie,
            Bucket::Series => &mut self.series,
        };
        *slot = Some(slot.map_or(count, |previous| previous.max(count)));
    }
}
