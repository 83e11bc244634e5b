//! Access guard: decides whether a requester may receive a document's plaintext.
//!
//! The checks run in a fixed order and stop at the first denial:
//!
//! ```text
//! ownership ──no──▶ NotFound (404)
//!     │
//! requires_pin ──no──▶ granted
//!     │
//! PIN supplied ──no──▶ PinRequired (403)   ("" ──▶ EmptyPin)
//!     │
//! PinSource: PerFile ▸ AccountFallback ▸ Unconfigured (403, fail closed)
//!     │
//! verify ──mismatch──▶ InvalidPin (403)
//!     │
//! granted
//! ```
//!
//! A document owned by someone else is reported exactly like a missing one, whatever
//! its PIN state. Every decision emits a `tracing` event with the requester id, the
//! document id and name, and an outcome label. PINs and hashes are never logged.

use thiserror::Error;
use tracing::{error, info, warn};

use crate::pin::verify_secret;
use crate::record::{DocumentRecord, UserId};

/// Why a request was refused. Each variant has a stable, user-facing message.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    #[error("Document not found")]
    NotFound,

    #[error("PIN required to access this document")]
    PinRequired,

    #[error("PIN cannot be empty")]
    EmptyPin,

    #[error("Invalid PIN")]
    InvalidPin,

    #[error("Document requires a PIN but none is configured")]
    PinNotConfigured,
}

impl Denial {
    /// 404 for not-found/not-owned, 403 for every PIN-related denial.
    pub fn status_code(&self) -> u16 {
        match self {
            Denial::NotFound => 404,
            Denial::PinRequired | Denial::EmptyPin | Denial::InvalidPin | Denial::PinNotConfigured => 403,
        }
    }
}

/// Where the PIN hash for a document comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinSource<'a> {
    /// The document carries its own PIN hash.
    PerFile(&'a str),
    /// No per-file hash; the owner's account PIN applies.
    AccountFallback(&'a str),
    /// Neither exists.
    Unconfigured,
}

impl<'a> PinSource<'a> {
    pub fn resolve(document: &'a DocumentRecord, account_pin_hash: Option<&'a str>) -> Self {
        match (document.pin_hash.as_deref(), account_pin_hash) {
            (Some(hash), _) => PinSource::PerFile(hash),
            (None, Some(hash)) => PinSource::AccountFallback(hash),
            (None, None) => PinSource::Unconfigured,
        }
    }
}

/// How access was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    NoPinRequired,
    PerFilePin,
    AccountPin,
}

/// Decision label carried on every guard log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NotOwner,
    PinNotRequired,
    AttemptedWithoutPin,
    EmptyPin,
    InvalidPin,
    CorrectPin,
    PinNotConfigured,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::NotOwner => "not_owner",
            Outcome::PinNotRequired => "pin_not_required",
            Outcome::AttemptedWithoutPin => "attempted_without_pin",
            Outcome::EmptyPin => "empty_pin",
            Outcome::InvalidPin => "invalid_pin",
            Outcome::CorrectPin => "correct_pin",
            Outcome::PinNotConfigured => "pin_not_configured",
        }
    }
}

fn log_decision(requester: UserId, document: &DocumentRecord, outcome: Outcome) {
    match outcome {
        Outcome::PinNotRequired | Outcome::CorrectPin => info!(
            user_id = %requester,
            document_id = %document.id,
            document = %document.original_name,
            outcome = outcome.as_str(),
            "document access granted"
        ),
        _ => warn!(
            user_id = %requester,
            document_id = %document.id,
            document = %document.original_name,
            outcome = outcome.as_str(),
            "document access denied"
        ),
    }
}

/// Ownership check alone; used for operations that never involve a PIN (e.g. delete).
pub fn ensure_owner(requester: UserId, document: &DocumentRecord) -> Result<(), Denial> {
    if document.owner_id != requester {
        log_decision(requester, document, Outcome::NotOwner);
        return Err(Denial::NotFound);
    }
    Ok(())
}

/// Run the full download/preview decision for one request.
///
/// `account_pin_hash` is the owner's account-level PIN hash. It is only consulted
/// after ownership is established, so it is always the requester's own.
pub fn authorize(
    requester: UserId,
    document: &DocumentRecord,
    supplied_pin: Option<&str>,
    account_pin_hash: Option<&str>,
) -> Result<Grant, Denial> {
    ensure_owner(requester, document)?;

    if !document.requires_pin {
        log_decision(requester, document, Outcome::PinNotRequired);
        return Ok(Grant::NoPinRequired);
    }

    let pin = match supplied_pin {
        None => {
            log_decision(requester, document, Outcome::AttemptedWithoutPin);
            return Err(Denial::PinRequired);
        }
        Some("") => {
            log_decision(requester, document, Outcome::EmptyPin);
            return Err(Denial::EmptyPin);
        }
        Some(pin) => pin,
    };

    let (hash, grant) = match PinSource::resolve(document, account_pin_hash) {
        PinSource::PerFile(hash) => (hash, Grant::PerFilePin),
        PinSource::AccountFallback(hash) => (hash, Grant::AccountPin),
        PinSource::Unconfigured => {
            log_decision(requester, document, Outcome::PinNotConfigured);
            return Err(Denial::PinNotConfigured);
        }
    };

    match verify_secret(hash, pin) {
        Ok(true) => {
            log_decision(requester, document, Outcome::CorrectPin);
            Ok(grant)
        }
        Ok(false) => {
            log_decision(requester, document, Outcome::InvalidPin);
            Err(Denial::InvalidPin)
        }
        Err(e) => {
            error!(
                user_id = %requester,
                document_id = %document.id,
                error = %e,
                "stored PIN hash is unusable"
            );
            log_decision(requester, document, Outcome::PinNotConfigured);
            Err(Denial::PinNotConfigured)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::hash_secret;
    use crate::record::DocumentId;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    fn document(owner: UserId, requires_pin: bool, pin_hash: Option<String>) -> DocumentRecord {
        DocumentRecord {
            id: DocumentId::new(),
            owner_id: owner,
            original_name: "tax-return.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size_bytes: 10,
            blob_path: "blob.bin".to_string(),
            wrapped_key: String::new(),
            wrapped_iv: String::new(),
            requires_pin,
            pin_hash,
            uploaded_at: 0,
        }
    }

    #[test]
    fn test_owner_without_pin_requirement_is_granted() {
        let owner = UserId::new();
        let doc = document(owner, false, None);
        assert_eq!(authorize(owner, &doc, None, None), Ok(Grant::NoPinRequired));
    }

    #[test]
    fn test_non_owner_denied_as_not_found_even_with_correct_pin() {
        let owner = UserId::new();
        let intruder = UserId::new();
        let hash = hash_secret("1234").unwrap();
        let doc = document(owner, true, Some(hash.clone()));

        assert_eq!(
            authorize(intruder, &doc, Some("1234"), Some(&hash)),
            Err(Denial::NotFound)
        );
        assert_eq!(authorize(intruder, &doc, None, None), Err(Denial::NotFound));

        let open_doc = document(owner, false, None);
        assert_eq!(authorize(intruder, &open_doc, None, None), Err(Denial::NotFound));
    }

    #[test]
    fn test_missing_and_empty_pin_are_distinct() {
        let owner = UserId::new();
        let doc = document(owner, true, Some(hash_secret("1234").unwrap()));
        assert_eq!(authorize(owner, &doc, None, None), Err(Denial::PinRequired));
        assert_eq!(authorize(owner, &doc, Some(""), None), Err(Denial::EmptyPin));
        assert_ne!(Denial::PinRequired.to_string(), Denial::EmptyPin.to_string());
        assert_ne!(Denial::PinRequired.to_string(), Denial::InvalidPin.to_string());
    }

    #[test]
    fn test_per_file_pin_takes_precedence_over_account_pin() {
        let owner = UserId::new();
        let file_hash = hash_secret("1111").unwrap();
        let account_hash = hash_secret("2222").unwrap();
        let doc = document(owner, true, Some(file_hash));

        assert_eq!(
            authorize(owner, &doc, Some("1111"), Some(&account_hash)),
            Ok(Grant::PerFilePin)
        );
        assert_eq!(
            authorize(owner, &doc, Some("2222"), Some(&account_hash)),
            Err(Denial::InvalidPin)
        );
    }

    #[test]
    fn test_account_pin_fallback_without_per_file_hash() {
        let owner = UserId::new();
        let account_hash = hash_secret("5555").unwrap();
        let doc = document(owner, true, None);

        assert_eq!(
            authorize(owner, &doc, Some("5555"), Some(&account_hash)),
            Ok(Grant::AccountPin)
        );
        assert_eq!(
            authorize(owner, &doc, Some("5556"), Some(&account_hash)),
            Err(Denial::InvalidPin)
        );
    }

    #[test]
    fn test_requires_pin_without_any_hash_fails_closed() {
        let owner = UserId::new();
        let doc = document(owner, true, None);
        assert_eq!(
            authorize(owner, &doc, Some("1234"), None),
            Err(Denial::PinNotConfigured)
        );
    }

    #[test]
    fn test_malformed_stored_hash_fails_closed() {
        let owner = UserId::new();
        let doc = document(owner, true, Some("garbage".to_string()));
        assert_eq!(
            authorize(owner, &doc, Some("1234"), None),
            Err(Denial::PinNotConfigured)
        );
    }

    #[test]
    fn test_pin_source_resolution() {
        let owner = UserId::new();
        let with_file = document(owner, true, Some("file".to_string()));
        let without_file = document(owner, true, None);

        assert_eq!(PinSource::resolve(&with_file, Some("acct")), PinSource::PerFile("file"));
        assert_eq!(
            PinSource::resolve(&without_file, Some("acct")),
            PinSource::AccountFallback("acct")
        );
        assert_eq!(PinSource::resolve(&without_file, None), PinSource::Unconfigured);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Denial::NotFound.status_code(), 404);
        assert_eq!(Denial::PinRequired.status_code(), 403);
        assert_eq!(Denial::EmptyPin.status_code(), 403);
        assert_eq!(Denial::InvalidPin.status_code(), 403);
        assert_eq!(Denial::PinNotConfigured.status_code(), 403);
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_decisions_are_logged_without_pin_material() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .without_time()
            .finish();

        let owner = UserId::new();
        let hash = hash_secret("918273").unwrap();
        let doc = document(owner, true, Some(hash.clone()));

        tracing::subscriber::with_default(subscriber, || {
            let _ = authorize(owner, &doc, None, None);
            let _ = authorize(owner, &doc, Some("564738"), None);
            let _ = authorize(owner, &doc, Some("918273"), None);
        });

        let logs = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("attempted_without_pin"), "logs: {}", logs);
        assert!(logs.contains("invalid_pin"), "logs: {}", logs);
        assert!(logs.contains("correct_pin"), "logs: {}", logs);
        assert!(logs.contains(&owner.to_string()));
        assert!(logs.contains("tax-return.pdf"));
        assert!(!logs.contains("918273"), "correct PIN leaked into logs");
        assert!(!logs.contains("564738"), "wrong PIN leaked into logs");
        assert!(!logs.contains(&hash), "PIN hash leaked into logs");
    }
}
