//! Persistence seams: document/user metadata and encrypted blobs.
//!
//! The vault only talks to these traits. The file-backed implementations in [`fs`]
//! are what the CLI uses; anything that can store a few JSON-shaped records and
//! opaque byte strings can stand in.

pub mod fs;

pub use fs::{FsBlobStore, JsonMetadataStore};

use crate::error::VaultError;
use crate::record::{DocumentId, DocumentRecord, UserId, UserRecord};

/// Users and document records, keyed by id.
pub trait MetadataStore {
    /// Insert a new user; `UsernameTaken` if the username exists (case-insensitive).
    fn insert_user(&self, user: &UserRecord) -> Result<(), VaultError>;

    /// Replace an existing user record.
    fn update_user(&self, user: &UserRecord) -> Result<(), VaultError>;

    fn user(&self, id: UserId) -> Result<Option<UserRecord>, VaultError>;

    fn user_by_name(&self, username: &str) -> Result<Option<UserRecord>, VaultError>;

    fn insert_document(&self, document: &DocumentRecord) -> Result<(), VaultError>;

    fn document(&self, id: DocumentId) -> Result<Option<DocumentRecord>, VaultError>;

    /// All documents owned by `owner`, in no particular order.
    fn documents_owned_by(&self, owner: UserId) -> Result<Vec<DocumentRecord>, VaultError>;

    /// Remove a document record, returning it if it existed.
    fn remove_document(&self, id: DocumentId) -> Result<Option<DocumentRecord>, VaultError>;
}

/// Opaque ciphertext storage addressed by relative path.
pub trait BlobStore {
    /// Store bytes under a new path and return that path.
    fn put(&self, bytes: &[u8]) -> Result<String, VaultError>;

    fn get(&self, path: &str) -> Result<Vec<u8>, VaultError>;

    /// Delete a blob. Deleting a missing blob is not an error.
    fn delete(&self, path: &str) -> Result<(), VaultError>;
}
