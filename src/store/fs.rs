use std::path::{Component, Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::write_private_file;
use crate::error::VaultError;
use crate::record::{DocumentId, DocumentRecord, UserId, UserRecord};
use crate::store::{BlobStore, MetadataStore};

/// On-disk shape of `vault.json`.
#[derive(Serialize, Deserialize, Debug, Default)]
struct VaultData {
    #[serde(default)]
    users: Vec<UserRecord>,
    #[serde(default)]
    documents: Vec<DocumentRecord>,
}

/// All metadata in one JSON file, rewritten atomically on every change.
///
/// The mutex serialises read-modify-write cycles within a process. Separate
/// processes sharing one data directory are not coordinated.
pub struct JsonMetadataStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonMetadataStore {
    pub fn new(path: PathBuf) -> Self {
        JsonMetadataStore {
            path,
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<VaultData, VaultError> {
        if !self.path.exists() {
            return Ok(VaultData::default());
        }
        let raw = std::fs::read(&self.path)
            .map_err(|e| VaultError::storage(format!("failed to read {}", self.path.display()), e))?;
        serde_json::from_slice(&raw)
            .map_err(|e| VaultError::Corrupt(format!("{}: {}", self.path.display(), e)))
    }

    fn save(&self, data: &VaultData) -> Result<(), VaultError> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| VaultError::Configuration("metadata path has no parent".to_string()))?;
        std::fs::create_dir_all(parent)
            .map_err(|e| VaultError::storage(format!("failed to create {}", parent.display()), e))?;

        let json = serde_json::to_vec_pretty(data)
            .map_err(|e| VaultError::Corrupt(format!("failed to serialize metadata: {}", e)))?;

        let tmp = parent.join(".vault.json.tmp");
        write_private_file(&tmp, &json)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(VaultError::storage(
                format!("failed to replace {}", self.path.display()),
                e,
            ));
        }
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&VaultData) -> T) -> Result<T, VaultError> {
        let _guard = self.lock.lock();
        let data = self.load()?;
        Ok(f(&data))
    }

    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut VaultData) -> Result<T, VaultError>,
    ) -> Result<T, VaultError> {
        let _guard = self.lock.lock();
        let mut data = self.load()?;
        let out = f(&mut data)?;
        self.save(&data)?;
        Ok(out)
    }
}

impl MetadataStore for JsonMetadataStore {
    fn insert_user(&self, user: &UserRecord) -> Result<(), VaultError> {
        self.mutate(|data| {
            if data
                .users
                .iter()
                .any(|u| u.username.eq_ignore_ascii_case(&user.username))
            {
                return Err(VaultError::UsernameTaken);
            }
            data.users.push(user.clone());
            Ok(())
        })
    }

    fn update_user(&self, user: &UserRecord) -> Result<(), VaultError> {
        self.mutate(|data| {
            let slot = data
                .users
                .iter_mut()
                .find(|u| u.id == user.id)
                .ok_or_else(|| VaultError::Corrupt(format!("user {} does not exist", user.id)))?;
            *slot = user.clone();
            Ok(())
        })
    }

    fn user(&self, id: UserId) -> Result<Option<UserRecord>, VaultError> {
        self.read(|data| data.users.iter().find(|u| u.id == id).cloned())
    }

    fn user_by_name(&self, username: &str) -> Result<Option<UserRecord>, VaultError> {
        self.read(|data| {
            data.users
                .iter()
                .find(|u| u.username.eq_ignore_ascii_case(username))
                .cloned()
        })
    }

    fn insert_document(&self, document: &DocumentRecord) -> Result<(), VaultError> {
        self.mutate(|data| {
            data.documents.push(document.clone());
            Ok(())
        })
    }

    fn document(&self, id: DocumentId) -> Result<Option<DocumentRecord>, VaultError> {
        self.read(|data| data.documents.iter().find(|d| d.id == id).cloned())
    }

    fn documents_owned_by(&self, owner: UserId) -> Result<Vec<DocumentRecord>, VaultError> {
        self.read(|data| {
            data.documents
                .iter()
                .filter(|d| d.owner_id == owner)
                .cloned()
                .collect()
        })
    }

    fn remove_document(&self, id: DocumentId) -> Result<Option<DocumentRecord>, VaultError> {
        self.mutate(|data| {
            let removed = data
                .documents
                .iter()
                .position(|d| d.id == id)
                .map(|idx| data.documents.remove(idx));
            Ok(removed)
        })
    }
}

/// Blobs as individual files under a root directory, named by random UUID.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: PathBuf) -> Self {
        FsBlobStore { root }
    }

    /// Resolve a stored relative path, refusing anything that could escape the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, VaultError> {
        let mut components = Path::new(path).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Ok(self.root.join(name)),
            _ => Err(VaultError::Corrupt(format!("invalid blob path '{}'", path))),
        }
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, bytes: &[u8]) -> Result<String, VaultError> {
        std::fs::create_dir_all(&self.root)
            .map_err(|e| VaultError::storage(format!("failed to create {}", self.root.display()), e))?;
        let name = format!("{}.bin", uuid::Uuid::new_v4());
        write_private_file(&self.root.join(&name), bytes)?;
        Ok(name)
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, VaultError> {
        let full = self.resolve(path)?;
        std::fs::read(&full)
            .map_err(|e| VaultError::storage(format!("failed to read blob {}", full.display()), e))
    }

    fn delete(&self, path: &str) -> Result<(), VaultError> {
        let full = self.resolve(path)?;
        match std::fs::remove_file(&full) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VaultError::storage(
                format!("failed to delete blob {}", full.display()),
                e,
            )),
        }
    }
}
