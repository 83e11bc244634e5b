//! Vault service: accounts plus the upload and download flows.
//!
//! Upload: policy check → PIN validation → encrypt → blob write → record insert.
//! Download: record lookup → guard → blob read → decrypt. A denied download never
//! touches the blob store.

use tracing::{debug, info, warn};

use crate::config::VaultConfig;
use crate::crypto::EnvelopeEngine;
use crate::error::VaultError;
use crate::guard::{self, Denial};
use crate::pin::{hash_secret, validate_pin, verify_dummy, verify_secret};
use crate::record::{now_secs, DocumentId, DocumentRecord, UserId, UserRecord};
use crate::store::{BlobStore, FsBlobStore, JsonMetadataStore, MetadataStore};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const PASSWORD_MIN: usize = 8;

/// One upload as received from the transport layer.
#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    pub file_name: &'a str,
    pub bytes: &'a [u8],
    /// Per-file PIN. Supplying one implies `requires_pin`.
    pub pin: Option<&'a str>,
    pub requires_pin: bool,
}

/// A successfully authorized and decrypted document.
#[derive(Debug, Clone)]
pub struct DownloadedDocument {
    pub record: DocumentRecord,
    pub bytes: Vec<u8>,
}

pub struct Vault<M, B> {
    engine: EnvelopeEngine,
    metadata: M,
    blobs: B,
    config: VaultConfig,
}

impl Vault<JsonMetadataStore, FsBlobStore> {
    /// Open the file-backed vault described by `config`.
    pub fn open(config: VaultConfig, engine: EnvelopeEngine) -> Self {
        let metadata = JsonMetadataStore::new(config.metadata_path());
        let blobs = FsBlobStore::new(config.blob_dir());
        Vault::new(config, engine, metadata, blobs)
    }
}

impl<M: MetadataStore, B: BlobStore> Vault<M, B> {
    pub fn new(config: VaultConfig, engine: EnvelopeEngine, metadata: M, blobs: B) -> Self {
        Vault {
            engine,
            metadata,
            blobs,
            config,
        }
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    // ── Accounts ────────────────────────────────────────────────────────────

    pub fn register(&self, username: &str, password: &str) -> Result<UserRecord, VaultError> {
        validate_username(username)?;
        if password.chars().count() < PASSWORD_MIN {
            return Err(VaultError::InvalidInput(format!(
                "password must be at least {} characters",
                PASSWORD_MIN
            )));
        }

        let user = UserRecord {
            id: UserId::new(),
            username: username.to_string(),
            password_hash: hash_secret(password)?,
            pin_hash: None,
            created_at: now_secs(),
        };
        self.metadata.insert_user(&user)?;
        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Verify credentials and return the caller's identity.
    ///
    /// Unknown users and wrong passwords produce the same error and both pay for one
    /// Argon2 verification.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<UserId, VaultError> {
        let Some(user) = self.metadata.user_by_name(username)? else {
            verify_dummy(password);
            warn!(username = %username, "login for unknown user");
            return Err(VaultError::InvalidCredentials);
        };
        if !verify_secret(&user.password_hash, password)? {
            warn!(user_id = %user.id, "login with wrong password");
            return Err(VaultError::InvalidCredentials);
        }
        debug!(user_id = %user.id, "user authenticated");
        Ok(user.id)
    }

    pub fn user(&self, user_id: UserId) -> Result<UserRecord, VaultError> {
        self.metadata
            .user(user_id)?
            .ok_or_else(|| VaultError::Corrupt(format!("no user record for id {}", user_id)))
    }

    /// Set (or replace) the account-level PIN used by documents without their own.
    pub fn set_account_pin(&self, user_id: UserId, pin: &str) -> Result<(), VaultError> {
        validate_pin(pin)?;
        let mut user = self.user(user_id)?;
        user.pin_hash = Some(hash_secret(pin)?);
        self.metadata.update_user(&user)?;
        info!(user_id = %user_id, "account PIN set");
        Ok(())
    }

    /// Remove the account-level PIN. Documents relying on it become inaccessible
    /// until a new one is set.
    pub fn clear_account_pin(&self, user_id: UserId) -> Result<(), VaultError> {
        let mut user = self.user(user_id)?;
        user.pin_hash = None;
        self.metadata.update_user(&user)?;
        info!(user_id = %user_id, "account PIN cleared");
        Ok(())
    }

    // ── Documents ───────────────────────────────────────────────────────────

    pub fn upload(
        &self,
        owner: UserId,
        request: UploadRequest<'_>,
    ) -> Result<DocumentRecord, VaultError> {
        let content_type = self
            .config
            .check_upload(request.file_name, request.bytes.len() as u64)?;

        let user = self.user(owner)?;
        if let Some(pin) = request.pin {
            validate_pin(pin)?;
        }
        let requires_pin = request.requires_pin || request.pin.is_some();
        if requires_pin && request.pin.is_none() && user.pin_hash.is_none() {
            return Err(VaultError::InvalidPin(
                "a PIN is required but neither a file PIN nor an account PIN is set".to_string(),
            ));
        }

        let encrypted = self.engine.encrypt(request.bytes)?;
        let pin_hash = request.pin.map(hash_secret).transpose()?;

        let blob_path = self.blobs.put(&encrypted.ciphertext)?;
        let record = DocumentRecord {
            id: DocumentId::new(),
            owner_id: owner,
            original_name: request.file_name.to_string(),
            content_type,
            size_bytes: request.bytes.len() as u64,
            blob_path,
            wrapped_key: encrypted.wrapped_key_b64(),
            wrapped_iv: encrypted.wrapped_iv_b64(),
            requires_pin,
            pin_hash,
            uploaded_at: now_secs(),
        };

        if let Err(e) = self.metadata.insert_document(&record) {
            if let Err(cleanup) = self.blobs.delete(&record.blob_path) {
                warn!(blob = %record.blob_path, error = %cleanup, "failed to remove blob of rejected upload");
            }
            return Err(e);
        }

        info!(
            user_id = %owner,
            document_id = %record.id,
            document = %record.original_name,
            size = record.size_bytes,
            requires_pin,
            per_file_pin = record.pin_hash.is_some(),
            "document uploaded"
        );
        Ok(record)
    }

    /// Authorize and decrypt a document for `requester`.
    pub fn download(
        &self,
        requester: UserId,
        id: DocumentId,
        pin: Option<&str>,
    ) -> Result<DownloadedDocument, VaultError> {
        let Some(record) = self.metadata.document(id)? else {
            warn!(user_id = %requester, document_id = %id, outcome = "not_found", "document access denied");
            return Err(Denial::NotFound.into());
        };

        // The account PIN is only consulted once ownership holds, so read the requester's.
        let account_pin_hash = if record.owner_id == requester && record.requires_pin {
            self.metadata.user(requester)?.and_then(|u| u.pin_hash)
        } else {
            None
        };
        guard::authorize(requester, &record, pin, account_pin_hash.as_deref())?;

        let ciphertext = self.blobs.get(&record.blob_path)?;
        let bytes = self
            .engine
            .decrypt_stored(&ciphertext, &record.wrapped_key, &record.wrapped_iv)
            .inspect_err(|e| {
                warn!(document_id = %record.id, error = %e, "stored document failed to decrypt");
            })?;

        Ok(DownloadedDocument { record, bytes })
    }

    /// The requester's documents, newest first.
    pub fn documents(&self, owner: UserId) -> Result<Vec<DocumentRecord>, VaultError> {
        let mut documents = self.metadata.documents_owned_by(owner)?;
        documents.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(documents)
    }

    /// Delete a document and its blob. Non-owners get `NotFound`.
    ///
    /// Succeeds once the record is removed; a blob that cannot be deleted is logged.
    pub fn delete(&self, requester: UserId, id: DocumentId) -> Result<DocumentRecord, VaultError> {
        let record = self
            .metadata
            .document(id)?
            .ok_or(VaultError::Denied(Denial::NotFound))?;
        guard::ensure_owner(requester, &record)?;

        self.metadata.remove_document(id)?;
        // The record is gone, so the document is deleted even if its blob lingers
        if let Err(e) = self.blobs.delete(&record.blob_path) {
            warn!(document_id = %id, blob = %record.blob_path, error = %e, "failed to remove blob of deleted document");
        }
        info!(user_id = %requester, document_id = %id, document = %record.original_name, "document deleted");
        Ok(record)
    }
}

fn validate_username(username: &str) -> Result<(), VaultError> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(VaultError::InvalidInput(format!(
            "username must be {} to {} characters",
            USERNAME_MIN, USERNAME_MAX
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(VaultError::InvalidInput(
            "username may only contain letters, digits, '_', '.' and '-'".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::MasterKey;
    use crate::pin::VERIFY_CALLS;

    fn temp_vault(dir: &tempfile::TempDir) -> Vault<JsonMetadataStore, FsBlobStore> {
        Vault::open(
            VaultConfig::new(dir.path().to_path_buf()),
            EnvelopeEngine::new(MasterKey::from_bytes([3u8; 32])),
        )
    }

    fn verify_calls() -> usize {
        VERIFY_CALLS.with(|calls| calls.get())
    }

    #[test]
    fn test_unknown_user_login_costs_a_verification() {
        let dir = tempfile::tempdir().unwrap();
        let vault = temp_vault(&dir);
        vault.register("alice", "correct horse battery").unwrap();

        let before = verify_calls();
        assert!(matches!(
            vault.authenticate("nobody", "wrongpass1"),
            Err(VaultError::InvalidCredentials)
        ));
        assert_eq!(verify_calls() - before, 1, "unknown user skipped the hash check");

        let before = verify_calls();
        assert!(matches!(
            vault.authenticate("alice", "wrongpass1"),
            Err(VaultError::InvalidCredentials)
        ));
        assert_eq!(verify_calls() - before, 1);
    }

    #[test]
    fn test_missing_user_record_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let vault = temp_vault(&dir);
        let err = vault.user(UserId::new()).unwrap_err();
        assert!(matches!(err, VaultError::Corrupt(_)), "got {:?}", err);
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("a.b-c_d").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"x".repeat(33)).is_err());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("../etc").is_err());
    }
}
