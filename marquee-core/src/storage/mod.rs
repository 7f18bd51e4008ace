//! Durable storage for classified snapshots and the user registry.
//!
//! Both documents are plain JSON files under the configured data directory,
//! always written to a temporary sibling first and then renamed into place.

pub mod registry;
pub mod snapshot;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;

pub use registry::UserRegistry;
pub use snapshot::{FileSnapshotStore, InMemorySnapshotStore, SnapshotStore};

/// Longest accepted user id.
pub const MAX_UID_LEN: usize = 64;

/// Errors that occur while reading or writing persisted documents.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Requested document does not exist
    #[error("Document not found: {path}")]
    NotFound {
        /// Location that was looked up
        path: PathBuf,
    },

    /// User id cannot be used as a storage namespace
    #[error("Invalid user id: {uid:?}")]
    InvalidUid {
        /// Rejected user id
        uid: String,
    },

    /// Document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Standard I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Checks that `uid` is safe to use as a single path segment.
///
/// # Errors
///
/// - `StorageError::InvalidUid` - If empty, too long, or not `[A-Za-z0-9_-]`
pub fn validate_uid(uid: &str) -> Result<(), StorageError> {
    let valid = !uid.is_empty()
        && uid.len() <= MAX_UID_LEN
        && uid
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidUid {
            uid: uid.to_string(),
        })
    }
}

/// Serializes `value` to `path` through a temporary file and a rename.
///
/// # Errors
///
/// - `StorageError::Serde` - If `value` cannot be encoded
/// - `StorageError::Io` - If the directory, temp file or rename fails
pub async fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    temp_suffix: &str,
) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(temp_suffix);
    let temp_path = PathBuf::from(temp_name);

    fs::write(&temp_path, &bytes).await?;
    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    Ok(())
}
