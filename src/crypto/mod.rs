//! Crypto module: per-file envelope encryption under a process-wide master key.
//!
//! Every uploaded file gets a fresh 32-byte file encryption key (FEK) and a fresh
//! 16-byte IV. The file is encrypted with AES-256-CBC (PKCS#7) under that pair, then
//! the FEK and the IV are each wrapped with AES-256-CBC under the master key. The
//! wrapping IVs are not stored: they are re-derived on demand as
//! `SHA-256(master_key || label)[..16]`, so the master key alone is enough to unwrap.
//!
//! Stored data depends on two properties of this layout. The wrapping IVs are
//! deterministic, where a random IV stored next to each wrapped key is the usual
//! layout. CBC also carries no authentication tag, so tampering is only caught when
//! it happens to break the padding.

use aes::Aes256;
use base64::Engine;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::Rng;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::VaultError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Length of the master key and of every file encryption key.
pub const KEY_LEN: usize = 32;

/// AES block size; also the length of file IVs and wrapping IVs.
pub const IV_LEN: usize = 16;

/// Domain-separation label for the IV that wraps file keys.
const KEY_WRAP_LABEL: &[u8] = b"key-encryption-iv";

/// Domain-separation label for the IV that wraps file IVs.
const IV_WRAP_LABEL: &[u8] = b"iv-encryption-iv";

/// The process-wide 256-bit master key. Zeroed on drop, redacted in `Debug`.
#[derive(Clone)]
pub struct MasterKey(Zeroizing<[u8; KEY_LEN]>);

impl MasterKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        MasterKey(Zeroizing::new(bytes))
    }

    /// Build a master key from an operator-supplied secret.
    ///
    /// Exactly 64 hex characters are decoded as the raw 32-byte key. Any other
    /// non-empty string is treated as a passphrase and hashed with SHA-256.
    pub fn from_secret(secret: &str) -> Result<Self, VaultError> {
        if secret.is_empty() {
            return Err(VaultError::Configuration(
                "master key secret is empty".to_string(),
            ));
        }

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        if secret.len() == KEY_LEN * 2 && secret.bytes().all(|b| b.is_ascii_hexdigit()) {
            hex::decode_to_slice(secret, &mut key[..])
                .map_err(|e| VaultError::Configuration(format!("invalid hex master key: {}", e)))?;
        } else {
            let digest = Sha256::digest(secret.as_bytes());
            key.copy_from_slice(&digest);
        }
        Ok(MasterKey(key))
    }

    /// Generate a random master key (used by `docvault init`).
    pub fn generate() -> Self {
        let bytes: [u8; KEY_LEN] = rand::thread_rng().gen();
        MasterKey::from_bytes(bytes)
    }

    /// Hex encoding suitable for `from_secret`; the string is zeroed on drop.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(&self.0[..]))
    }

    fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Derive the two wrapping IVs. Pure function of the key bytes and fixed labels.
    pub fn wrap_ivs(&self) -> WrapIvs {
        WrapIvs {
            key: derive_wrap_iv(self.as_bytes(), KEY_WRAP_LABEL),
            iv: derive_wrap_iv(self.as_bytes(), IV_WRAP_LABEL),
        }
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}

/// The deterministic IVs used when wrapping a file's key and IV under the master key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WrapIvs {
    /// IV for wrapping the file encryption key.
    pub key: [u8; IV_LEN],
    /// IV for wrapping the file IV.
    pub iv: [u8; IV_LEN],
}

fn derive_wrap_iv(master_key: &[u8; KEY_LEN], label: &[u8]) -> [u8; IV_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(master_key);
    hasher.update(label);
    let digest = hasher.finalize();

    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&digest[..IV_LEN]);
    iv
}

/// Output of [`EnvelopeEngine::encrypt`]: everything the caller must persist.
#[derive(Clone, Debug)]
pub struct EncryptedFile {
    /// AES-256-CBC ciphertext of the file, destined for the blob store.
    pub ciphertext: Vec<u8>,
    /// FEK wrapped under the master key (48 bytes).
    pub wrapped_key: Vec<u8>,
    /// File IV wrapped under the master key (32 bytes).
    pub wrapped_iv: Vec<u8>,
}

impl EncryptedFile {
    pub fn wrapped_key_b64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.wrapped_key)
    }

    pub fn wrapped_iv_b64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.wrapped_iv)
    }
}

/// Envelope encryption engine. Holds only the master key; safe to share across threads.
#[derive(Clone, Debug)]
pub struct EnvelopeEngine {
    master_key: MasterKey,
}

impl EnvelopeEngine {
    pub fn new(master_key: MasterKey) -> Self {
        EnvelopeEngine { master_key }
    }

    /// Encrypt a file with a fresh FEK and IV, and wrap both under the master key.
    ///
    /// No I/O happens here; the caller persists the returned ciphertext and wrapped
    /// material. The cleartext FEK and IV are zeroed before this returns.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedFile, VaultError> {
        let mut rng = rand::thread_rng();
        let fek: Zeroizing<[u8; KEY_LEN]> = Zeroizing::new(rng.gen());
        let iv: Zeroizing<[u8; IV_LEN]> = Zeroizing::new(rng.gen());
        self.seal(plaintext, &fek, &iv)
    }

    fn seal(
        &self,
        plaintext: &[u8],
        fek: &[u8; KEY_LEN],
        iv: &[u8; IV_LEN],
    ) -> Result<EncryptedFile, VaultError> {
        let ciphertext = cbc_encrypt(fek, iv, plaintext)?;

        let wrap_ivs = self.master_key.wrap_ivs();
        let wrapped_key = cbc_encrypt(self.master_key.as_bytes(), &wrap_ivs.key, fek)?;
        let wrapped_iv = cbc_encrypt(self.master_key.as_bytes(), &wrap_ivs.iv, iv)?;

        Ok(EncryptedFile {
            ciphertext,
            wrapped_key,
            wrapped_iv,
        })
    }

    /// Unwrap the FEK and IV with the master key and decrypt the file.
    ///
    /// All-or-nothing: any padding failure or a recovered key/IV of the wrong length
    /// is a `Decryption` error and no plaintext is returned.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        wrapped_key: &[u8],
        wrapped_iv: &[u8],
    ) -> Result<Vec<u8>, VaultError> {
        let wrap_ivs = self.master_key.wrap_ivs();

        let fek = Zeroizing::new(cbc_decrypt(
            self.master_key.as_bytes(),
            &wrap_ivs.key,
            wrapped_key,
        )?);
        if fek.len() != KEY_LEN {
            return Err(VaultError::Decryption(format!(
                "unwrapped file key has {} bytes (expected {})",
                fek.len(),
                KEY_LEN
            )));
        }

        let iv = Zeroizing::new(cbc_decrypt(
            self.master_key.as_bytes(),
            &wrap_ivs.iv,
            wrapped_iv,
        )?);
        if iv.len() != IV_LEN {
            return Err(VaultError::Decryption(format!(
                "unwrapped file IV has {} bytes (expected {})",
                iv.len(),
                IV_LEN
            )));
        }

        cbc_decrypt(&fek, &iv, ciphertext)
    }

    /// Decrypt using the base64 wrapped material as it is stored on a document record.
    pub fn decrypt_stored(
        &self,
        ciphertext: &[u8],
        wrapped_key_b64: &str,
        wrapped_iv_b64: &str,
    ) -> Result<Vec<u8>, VaultError> {
        let engine = base64::engine::general_purpose::STANDARD;
        let wrapped_key = engine
            .decode(wrapped_key_b64)
            .map_err(|e| VaultError::Decryption(format!("invalid base64 wrapped key: {}", e)))?;
        let wrapped_iv = engine
            .decode(wrapped_iv_b64)
            .map_err(|e| VaultError::Decryption(format!("invalid base64 wrapped IV: {}", e)))?;
        self.decrypt(ciphertext, &wrapped_key, &wrapped_iv)
    }
}

fn cbc_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
    let cipher = Aes256CbcEnc::new_from_slices(key, iv)
        .map_err(|e| VaultError::Encryption(format!("cipher rejected key or IV: {}", e)))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

fn cbc_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, VaultError> {
    if ciphertext.is_empty() || ciphertext.len() % IV_LEN != 0 {
        return Err(VaultError::Decryption(format!(
            "ciphertext length {} is not a positive multiple of the block size",
            ciphertext.len()
        )));
    }
    let cipher = Aes256CbcDec::new_from_slices(key, iv)
        .map_err(|e| VaultError::Decryption(format!("cipher rejected key or IV: {}", e)))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| VaultError::Decryption("padding check failed".to_string()))
}
