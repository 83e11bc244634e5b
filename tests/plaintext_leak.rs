/// Plaintext leak detection tests.
///
/// Verify that nothing the vault persists (ciphertext blob, base64 wrapped key and IV,
/// metadata JSON, PIN hashes) contains the original document bytes or the PIN in any
/// readable form.
///
/// These tests guard against a refactor that accidentally stores plaintext next to
/// the ciphertext.
use base64::Engine;

use docvault::config::VaultConfig;
use docvault::crypto::{EnvelopeEngine, MasterKey};
use docvault::vault::{UploadRequest, Vault};

const KNOWN_CONTENT: &str = "KNOWN-DOCUMENT-CONTENT-abc123-MUST-NOT-APPEAR";

fn engine() -> EnvelopeEngine {
    EnvelopeEngine::new(MasterKey::from_bytes([42u8; 32]))
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

// ── Test 1: ciphertext contains no plaintext ───────────────────────────────

#[test]
fn test_ciphertext_contains_no_plaintext() {
    let sealed = engine().encrypt(KNOWN_CONTENT.as_bytes()).expect("encrypt should succeed");

    let ct_lossy = String::from_utf8_lossy(&sealed.ciphertext);
    assert!(
        !ct_lossy.contains(KNOWN_CONTENT),
        "ciphertext (UTF-8 lossy) must not contain the plaintext"
    );
    assert!(
        !contains_bytes(&sealed.ciphertext, KNOWN_CONTENT.as_bytes()),
        "ciphertext bytes must not contain the plaintext byte sequence"
    );
}

// ── Test 2: base64 wrapped material contains no plaintext ──────────────────

#[test]
fn test_base64_wrapped_fields_contain_no_plaintext() {
    let sealed = engine().encrypt(KNOWN_CONTENT.as_bytes()).expect("encrypt should succeed");
    let blob_b64 = base64::engine::general_purpose::STANDARD.encode(&sealed.ciphertext);

    for field in [blob_b64, sealed.wrapped_key_b64(), sealed.wrapped_iv_b64()] {
        assert!(
            !field.contains(KNOWN_CONTENT),
            "base64 field must not contain the plaintext string"
        );
    }
}

// ── Test 3: everything on disk after an upload ─────────────────────────────

#[test]
fn test_vault_files_contain_no_plaintext_or_pin() {
    let dir = tempfile::tempdir().unwrap();
    let vault = Vault::open(VaultConfig::new(dir.path().to_path_buf()), engine());
    let user = vault.register("leakcheck", "long enough password").unwrap();

    vault
        .upload(
            user.id,
            UploadRequest {
                file_name: "secret.txt",
                bytes: KNOWN_CONTENT.as_bytes(),
                pin: Some("730194"),
                requires_pin: true,
            },
        )
        .unwrap();

    let mut checked = 0;
    let mut pending = vec![dir.path().to_path_buf()];
    while let Some(path) = pending.pop() {
        if path.is_dir() {
            for entry in std::fs::read_dir(&path).unwrap() {
                pending.push(entry.unwrap().path());
            }
            continue;
        }
        let bytes = std::fs::read(&path).unwrap();
        assert!(
            !contains_bytes(&bytes, KNOWN_CONTENT.as_bytes()),
            "{} contains the plaintext document",
            path.display()
        );
        assert!(
            !contains_bytes(&bytes, b"730194"),
            "{} contains the plaintext PIN",
            path.display()
        );
        checked += 1;
    }
    assert!(checked >= 2, "expected metadata and blob files, checked {}", checked);
}
