use thiserror::Error;

use crate::guard::Denial;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Master key configuration error: {0}")]
    Configuration(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error(transparent)]
    Denied(#[from] Denial),

    #[error("Invalid PIN: {0}")]
    InvalidPin(String),

    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    #[error("Username is already registered")]
    UsernameTaken,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("{0}")]
    InvalidInput(String),

    #[error("Secret hashing failed: {0}")]
    PinHash(String),

    #[error("Storage I/O failed: {context}")]
    Storage {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored vault data is corrupt: {0}")]
    Corrupt(String),
}

impl VaultError {
    pub(crate) fn storage(context: impl Into<String>, source: std::io::Error) -> Self {
        VaultError::Storage {
            context: context.into(),
            source,
        }
    }

    /// Transport status for this failure: 404/403 for denials, 400 for
    /// rejected input, 500 for everything on the server side.
    pub fn status_code(&self) -> u16 {
        match self {
            VaultError::Denied(denial) => denial.status_code(),
            VaultError::InvalidCredentials => 401,
            VaultError::UsernameTaken => 409,
            VaultError::InvalidPin(_) | VaultError::UploadRejected(_) | VaultError::InvalidInput(_) => 400,
            VaultError::Configuration(_)
            | VaultError::Encryption(_)
            | VaultError::Decryption(_)
            | VaultError::PinHash(_)
            | VaultError::Storage { .. }
            | VaultError::Corrupt(_) => 500,
        }
    }
}
