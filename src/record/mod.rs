//! Record module: the persisted shapes of users and documents.
//!
//! A `DocumentRecord` carries everything needed to decrypt its blob given only the
//! master key: the base64 wrapped FEK and IV plus the blob location. PIN hashes are
//! Argon2id PHC strings; no plaintext PIN is ever stored.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Authenticated identity of a vault user.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    pub fn new() -> Self {
        UserId(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a stored document.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        DocumentId(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(DocumentId)
    }
}

/// A registered account.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    /// Argon2id PHC hash of the account password.
    pub password_hash: String,
    /// Account-level PIN hash, used for documents that have no per-file PIN.
    #[serde(default)]
    pub pin_hash: Option<String>,
    /// Unix timestamp (seconds) of registration.
    pub created_at: u64,
}

/// Metadata for one encrypted document.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub owner_id: UserId,
    /// File name as uploaded; used for display and as the default download name.
    pub original_name: String,
    pub content_type: String,
    /// Plaintext size in bytes.
    pub size_bytes: u64,
    /// Location of the ciphertext, relative to the blob store root.
    pub blob_path: String,
    /// Base64 FEK wrapped under the master key.
    pub wrapped_key: String,
    /// Base64 file IV wrapped under the master key.
    pub wrapped_iv: String,
    #[serde(default)]
    pub requires_pin: bool,
    /// Per-file PIN hash; takes precedence over the owner's account PIN.
    #[serde(default)]
    pub pin_hash: Option<String>,
    /// Unix timestamp (seconds) of upload.
    pub uploaded_at: u64,
}

/// Current time as unix seconds; 0 if the clock is before the epoch.
pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
