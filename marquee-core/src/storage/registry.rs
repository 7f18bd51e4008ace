//! Per-user list collections persisted as a single `users.json` document.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tokio::fs;
use tokio::sync::RwLock;

use super::{StorageError, validate_uid, write_json_atomic};
use crate::catalog::{ListId, ListPatch, ListReference, UserListEntry};
use crate::{ListError, Result};

type UserMap = BTreeMap<String, Vec<UserListEntry>>;

/// Registry of every user's lists.
///
/// Mutations are applied to a copy, persisted, and only then committed, so
/// a failed write leaves the in-memory state untouched.
#[derive(Debug)]
pub struct UserRegistry {
    path: Option<PathBuf>,
    temp_suffix: String,
    users: RwLock<UserMap>,
}

impl UserRegistry {
    /// Opens the registry at `path`, starting empty when the file is absent.
    ///
    /// Legacy bare-string references are normalized into full entries here;
    /// unusable references and repeated list ids are dropped.
    ///
    /// # Errors
    ///
    /// - `StorageError::Serde` - If the document is corrupt
    /// - `StorageError::Io` - If the file exists but cannot be read
    pub async fn open(path: PathBuf, temp_suffix: impl Into<String>) -> Result<Self> {
        let users = match fs::read(&path).await {
            Ok(bytes) => {
                let raw: BTreeMap<String, Vec<ListReference>> =
                    serde_json::from_slice(&bytes).map_err(StorageError::from)?;
                normalize(raw)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => UserMap::new(),
            Err(e) => return Err(StorageError::from(e).into()),
        };

        tracing::info!(
            "Loaded user registry from {} ({} users)",
            path.display(),
            users.len()
        );

        Ok(Self {
            path: Some(path),
            temp_suffix: temp_suffix.into(),
            users: RwLock::new(users),
        })
    }

    /// Registry that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            temp_suffix: String::new(),
            users: RwLock::new(UserMap::new()),
        }
    }

    pub async fn users(&self) -> Vec<String> {
        self.users.read().await.keys().cloned().collect()
    }

    /// Lists of `uid` in insertion order; empty for unknown users.
    pub async fn lists(&self, uid: &str) -> Vec<UserListEntry> {
        self.users.read().await.get(uid).cloned().unwrap_or_default()
    }

    pub async fn get(&self, uid: &str, list: &ListId) -> Option<UserListEntry> {
        self.users
            .read()
            .await
            .get(uid)
            .and_then(|lists| lists.iter().find(|entry| &entry.id == list).cloned())
    }

    /// Appends `entry` to the user's lists.
    ///
    /// # Errors
    ///
    /// - `StorageError::InvalidUid` - If `uid` is not a safe namespace
    /// - `ListError::Duplicate` - If the list is already present
    /// - `StorageError::Io` - If persisting failed
    pub async fn add(&self, uid: &str, entry: UserListEntry) -> Result<UserListEntry> {
        validate_uid(uid)?;
        let mut users = self.users.write().await;
        if users
            .get(uid)
            .is_some_and(|lists| lists.iter().any(|existing| existing.id == entry.id))
        {
            return Err(ListError::Duplicate { list: entry.id }.into());
        }

        let mut next = users.clone();
        next.entry(uid.to_string()).or_default().push(entry.clone());
        self.persist(&next).await?;
        *users = next;

        tracing::info!("User {} added list {}", uid, entry.id);
        Ok(entry)
    }

    /// Applies a partial update to one list.
    ///
    /// # Errors
    ///
    /// - `ListError::NotFound` - If the user has no such list
    /// - `StorageError::Io` - If persisting failed
    pub async fn patch(&self, uid: &str, list: &ListId, patch: ListPatch) -> Result<UserListEntry> {
        let mut users = self.users.write().await;
        let mut next = users.clone();
        let entry = next
            .get_mut(uid)
            .and_then(|lists| lists.iter_mut().find(|entry| &entry.id == list))
            .ok_or_else(|| ListError::NotFound {
                list: list.to_string(),
            })?;
        patch.apply(entry);
        let updated = entry.clone();

        self.persist(&next).await?;
        *users = next;
        Ok(updated)
    }

    /// Removes one list from the user's collection.
    ///
    /// # Errors
    ///
    /// - `ListError::NotFound` - If the user has no such list
    /// - `StorageError::Io` - If persisting failed
    pub async fn remove(&self, uid: &str, list: &ListId) -> Result<UserListEntry> {
        let mut users = self.users.write().await;
        let mut next = users.clone();
        let lists = next.get_mut(uid).ok_or_else(|| ListError::NotFound {
            list: list.to_string(),
        })?;
        let position = lists
            .iter()
            .position(|entry| &entry.id == list)
            .ok_or_else(|| ListError::NotFound {
                list: list.to_string(),
            })?;
        let removed = lists.remove(position);
        if lists.is_empty() {
            next.remove(uid);
        }

        self.persist(&next).await?;
        *users = next;

        tracing::info!("User {} removed list {}", uid, list);
        Ok(removed)
    }

    async fn persist(&self, users: &UserMap) -> std::result::Result<(), StorageError> {
        match &self.path {
            Some(path) => write_json_atomic(path, users, &self.temp_suffix).await,
            None => Ok(()),
        }
    }
}

fn normalize(raw: BTreeMap<String, Vec<ListReference>>) -> UserMap {
    raw.into_iter()
        .filter_map(|(uid, references)| {
            let mut lists: Vec<UserListEntry> = Vec::with_capacity(references.len());
            for entry in references.into_iter().filter_map(ListReference::into_entry) {
                if !lists.iter().any(|existing| existing.id == entry.id) {
                    lists.push(entry);
                }
            }
            (!lists.is_empty()).then_some((uid, lists))
        })
        .collect()
}
