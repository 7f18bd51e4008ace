//! Per-(user, list, bucket) snapshots of classified items.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::fs;

use super::{StorageError, validate_uid, write_json_atomic};
use crate::catalog::{Bucket, ClassifiedItem, ListId};

/// Durable home of classified catalogs.
///
/// A snapshot is always replaced whole after a complete classification pass,
/// never patched in place.
#[async_trait]
pub trait SnapshotStore: Send + Sync + std::fmt::Debug {
    /// Loads the snapshot, or `None` when none has been written.
    ///
    /// # Errors
    ///
    /// - `StorageError::InvalidUid` - If `uid` is not a safe namespace
    /// - `StorageError::Serde` - If the stored document is corrupt
    /// - `StorageError::Io` - If file system operation failed
    async fn load(
        &self,
        uid: &str,
        list: &ListId,
        bucket: Bucket,
    ) -> Result<Option<Vec<ClassifiedItem>>, StorageError>;

    /// Replaces the snapshot with `items`.
    ///
    /// # Errors
    ///
    /// - `StorageError::InvalidUid` - If `uid` is not a safe namespace
    /// - `StorageError::Io` - If file system operation failed
    async fn save(
        &self,
        uid: &str,
        list: &ListId,
        bucket: Bucket,
        items: &[ClassifiedItem],
    ) -> Result<(), StorageError>;

    /// Checks whether a snapshot has been written.
    ///
    /// # Errors
    ///
    /// - `StorageError::InvalidUid` - If `uid` is not a safe namespace
    async fn exists(&self, uid: &str, list: &ListId, bucket: Bucket) -> Result<bool, StorageError>;

    /// Drops every bucket snapshot of `list`.
    ///
    /// # Errors
    ///
    /// - `StorageError::Io` - If file system operation failed
    async fn remove_list(&self, uid: &str, list: &ListId) -> Result<(), StorageError>;
}

/// Snapshot store laid out as `<root>/<uid>/<list>/<bucket>.json`.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    root: PathBuf,
    temp_suffix: String,
}

impl FileSnapshotStore {
    pub fn new(root: PathBuf, temp_suffix: impl Into<String>) -> Self {
        Self {
            root,
            temp_suffix: temp_suffix.into(),
        }
    }

    fn list_dir(&self, uid: &str, list: &ListId) -> Result<PathBuf, StorageError> {
        validate_uid(uid)?;
        Ok(self.root.join(uid).join(list.as_str()))
    }

    fn snapshot_path(
        &self,
        uid: &str,
        list: &ListId,
        bucket: Bucket,
    ) -> Result<PathBuf, StorageError> {
        Ok(self
            .list_dir(uid, list)?
            .join(format!("{}.json", bucket.as_str())))
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(
        &self,
        uid: &str,
        list: &ListId,
        bucket: Bucket,
    ) -> Result<Option<Vec<ClassifiedItem>>, StorageError> {
        let path = self.snapshot_path(uid, list, bucket)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save(
        &self,
        uid: &str,
        list: &ListId,
        bucket: Bucket,
        items: &[ClassifiedItem],
    ) -> Result<(), StorageError> {
        let path = self.snapshot_path(uid, list, bucket)?;
        write_json_atomic(&path, items, &self.temp_suffix).await?;
        tracing::debug!(
            "Saved {} snapshot for {}/{} ({} items)",
            bucket,
            uid,
            list,
            items.len()
        );
        Ok(())
    }

    async fn exists(&self, uid: &str, list: &ListId, bucket: Bucket) -> Result<bool, StorageError> {
        let path = self.snapshot_path(uid, list, bucket)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn remove_list(&self, uid: &str, list: &ListId) -> Result<(), StorageError> {
        let dir = self.list_dir(uid, list)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

type SnapshotKey = (String, ListId, Bucket);

/// Volatile snapshot store for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshots: Mutex<HashMap<SnapshotKey, Vec<ClassifiedItem>>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load(
        &self,
        uid: &str,
        list: &ListId,
        bucket: Bucket,
    ) -> Result<Option<Vec<ClassifiedItem>>, StorageError> {
        let key = (uid.to_string(), list.clone(), bucket);
        Ok(self.snapshots.lock().get(&key).cloned())
    }

    async fn save(
        &self,
        uid: &str,
        list: &ListId,
        bucket: Bucket,
        items: &[ClassifiedItem],
    ) -> Result<(), StorageError> {
        validate_uid(uid)?;
        let key = (uid.to_string(), list.clone(), bucket);
        self.snapshots.lock().insert(key, items.to_vec());
        Ok(())
    }

    async fn exists(&self, uid: &str, list: &ListId, bucket: Bucket) -> Result<bool, StorageError> {
        let key = (uid.to_string(), list.clone(), bucket);
        Ok(self.snapshots.lock().contains_key(&key))
    }

    async fn remove_list(&self, uid: &str, list: &ListId) -> Result<(), StorageError> {
        self.snapshots
            .lock()
            .retain(|(owner, id, _), _| !(owner == uid && id == list));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_fixtures::{create_temp_data_dir, sample_item};

    fn list() -> ListId {
        ListId::parse_source("ls4103816671").unwrap()
    }

    #[tokio::test]
    async fn test_snapshot_survives_reopen() {
        let (_temp_dir, data_dir) = create_temp_data_dir();
        let root = data_dir.join("snapshots");
        let items = vec![
            sample_item("tt0000001", Bucket::Movie, "Alpha", 0),
            sample_item("tt0000002", Bucket::Movie, "Beta", 1),
        ];

        let store = FileSnapshotStore::new(root.clone(), ".tmp");
        store.save("user-1", &list(), Bucket::Movie, &items).await.unwrap();
        drop(store);

        let reopened = FileSnapshotStore::new(root.clone(), ".tmp");
        let loaded = reopened
            .load("user-1", &list(), Bucket::Movie)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, items);
        assert!(root.join("user-1/ls4103816671/movie.json").exists());
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_none() {
        let (_temp_dir, data_dir) = create_temp_data_dir();
        let store = FileSnapshotStore::new(data_dir, ".tmp");

        assert!(store.load("u", &list(), Bucket::Series).await.unwrap().is_none());
        assert!(!store.exists("u", &list(), Bucket::Series).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_list_drops_all_buckets() {
        let (_temp_dir, data_dir) = create_temp_data_dir();
        let store = FileSnapshotStore::new(data_dir, ".tmp");
        let movie = vec![sample_item("tt0000001", Bucket::Movie, "Alpha", 0)];
        let series = vec![sample_item("tt0000002", Bucket::Series, "Beta", 0)];
        store.save("u", &list(), Bucket::Movie, &movie).await.unwrap();
        store.save("u", &list(), Bucket::Series, &series).await.unwrap();

        store.remove_list("u", &list()).await.unwrap();
        assert!(!store.exists("u", &list(), Bucket::Movie).await.unwrap());
        assert!(!store.exists("u", &list(), Bucket::Series).await.unwrap());

        // Removing again is not an error.
        store.remove_list("u", &list()).await.unwrap();
    }

    #[tokio::test]
    async fn test_traversal_uid_rejected() {
        let (_temp_dir, data_dir) = create_temp_data_dir();
        let store = FileSnapshotStore::new(data_dir, ".tmp");

        let result = store.save("../escape", &list(), Bucket::Movie, &[]).await;
        assert!(matches!(result, Err(StorageError::InvalidUid { .. })));
    }

    #[tokio::test]
    async fn test_in_memory_store_scoped_by_user() {
        let store = InMemorySnapshotStore::new();
        let items = vec![sample_item("tt0000001", Bucket::Movie, "Alpha", 0)];
        store.save("a", &list(), Bucket::Movie, &items).await.unwrap();

        assert!(store.exists("a", &list(), Bucket::Movie).await.unwrap());
        assert!(!store.exists("b", &list(), Bucket::Movie).await.unwrap());

        store.remove_list("a", &list()).await.unwrap();
        assert!(store.load("a", &list(), Bucket::Movie).await.unwrap().is_none());
    }
}
