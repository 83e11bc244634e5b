//! PIN and password handling: format validation and Argon2id PHC hashing.
//!
//! Stored hashes are self-describing PHC strings (`$argon2id$v=19$...`), so the
//! salt and cost parameters travel with the hash and verification needs nothing else.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use std::sync::LazyLock;

use crate::error::VaultError;

pub const PIN_MIN_DIGITS: usize = 4;
pub const PIN_MAX_DIGITS: usize = 6;

/// Check that a PIN is 4–6 ASCII digits.
///
/// The empty string gets its own message so a blank form field reads differently
/// from a malformed PIN.
pub fn validate_pin(pin: &str) -> Result<(), VaultError> {
    if pin.is_empty() {
        return Err(VaultError::InvalidPin("PIN cannot be empty".to_string()));
    }
    if !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VaultError::InvalidPin("PIN must contain digits only".to_string()));
    }
    if !(PIN_MIN_DIGITS..=PIN_MAX_DIGITS).contains(&pin.len()) {
        return Err(VaultError::InvalidPin(format!(
            "PIN must be {} to {} digits",
            PIN_MIN_DIGITS, PIN_MAX_DIGITS
        )));
    }
    Ok(())
}

/// Hash a PIN or password with Argon2id and a fresh random salt.
pub fn hash_secret(secret: &str) -> Result<String, VaultError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| VaultError::PinHash(e.to_string()))
}

/// Verify a PIN or password against a stored PHC hash.
///
/// `Ok(false)` means the secret does not match. An unparsable stored hash is an
/// error so callers can fail closed on it.
pub fn verify_secret(stored_hash: &str, secret: &str) -> Result<bool, VaultError> {
    #[cfg(test)]
    VERIFY_CALLS.with(|calls| calls.set(calls.get() + 1));

    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| VaultError::PinHash(format!("stored hash is malformed: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok())
}

/// Hash used to burn one verification when there is no real hash to check against.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_secret("docvault-unknown-account").ok());

/// Run one Argon2 verification against a fixed hash and discard the result.
///
/// Login calls this for unknown usernames so they cost the same as a wrong password.
pub fn verify_dummy(secret: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_secret(hash, secret);
    }
}

#[cfg(test)]
thread_local! {
    /// Per-thread count of `verify_secret` calls.
    pub(crate) static VERIFY_CALLS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}
