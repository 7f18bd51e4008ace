//! Test fixtures for storage testing.
//!
//! Provides temporary data directories and ready-made catalog items for
//! storage, service and integration tests.

use std::path::PathBuf;

use crate::catalog::{Bucket, ClassifiedItem, TitleId};

/// Creates a temporary data directory.
///
/// # Panics
///
/// Panics if the temporary directory cannot be created. Failures here point
/// at the test environment, not the code under test.
pub fn create_temp_data_dir() -> (tempfile::TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().unwrap();
    let data_dir = temp_dir.path().join("data");
    std::fs::create_dir_all(&data_dir).unwrap();
    (temp_dir, data_dir)
}

/// Builds a bare classified item.
///
/// # Panics
///
/// Panics if `id` is not a valid title id.
pub fn sample_item(id: &str, bucket: Bucket, name: &str, added_order: usize) -> ClassifiedItem {
    let mut item = ClassifiedItem::bare(TitleId::parse(id).unwrap(), bucket, name.to_string());
    item.added_order = added_order;
    item
}
