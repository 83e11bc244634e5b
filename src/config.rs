//! Vault configuration: data directory layout, upload policy and master key loading.

use std::path::{Path, PathBuf};

use crate::crypto::MasterKey;
use crate::error::VaultError;

/// Environment variable holding the master key secret (hex key or passphrase).
pub const MASTER_KEY_ENV: &str = "DOCVAULT_MASTER_KEY";

/// Default upload ceiling: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Accepted file extensions and the content type recorded for each.
const CONTENT_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("txt", "text/plain"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
];

#[derive(Clone, Debug)]
pub struct VaultConfig {
    /// Root directory for metadata, blobs and the master key file.
    pub data_dir: PathBuf,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: u64,
    /// Lower-case extensions accepted on upload.
    pub allowed_extensions: Vec<String>,
}

impl VaultConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        VaultConfig {
            data_dir,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_extensions: CONTENT_TYPES.iter().map(|(ext, _)| ext.to_string()).collect(),
        }
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join("vault.json")
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.data_dir.join("blobs")
    }

    pub fn master_key_path(&self) -> PathBuf {
        self.data_dir.join("master.key")
    }

    /// Apply the upload policy to a file name and size, returning its content type.
    pub fn check_upload(&self, file_name: &str, size: u64) -> Result<String, VaultError> {
        if file_name.trim().is_empty() {
            return Err(VaultError::UploadRejected("file name is empty".to_string()));
        }
        if size > self.max_upload_bytes {
            return Err(VaultError::UploadRejected(format!(
                "file is {} bytes, limit is {} bytes",
                size, self.max_upload_bytes
            )));
        }

        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .ok_or_else(|| VaultError::UploadRejected(format!("'{}' has no file extension", file_name)))?;

        if !self.allowed_extensions.iter().any(|allowed| *allowed == ext) {
            return Err(VaultError::UploadRejected(format!(
                "file type '.{}' is not allowed",
                ext
            )));
        }

        Ok(content_type_for(&ext).to_string())
    }
}

/// Content type for an extension; unknown extensions map to `application/octet-stream`.
pub fn content_type_for(ext: &str) -> &'static str {
    CONTENT_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, content_type)| *content_type)
        .unwrap_or("application/octet-stream")
}

/// `~/.docvault`, used when no data directory is configured.
pub fn default_data_dir() -> Result<PathBuf, VaultError> {
    let home = dirs::home_dir()
        .ok_or_else(|| VaultError::Configuration("cannot determine home directory".to_string()))?;
    Ok(home.join(".docvault"))
}

/// Load the master key once at startup.
///
/// A secret from the environment wins; otherwise the key file under the data
/// directory is read after its permissions are checked. Neither present is fatal.
/// Surrounding whitespace is trimmed from either source.
pub fn load_master_key(
    config: &VaultConfig,
    env_secret: Option<&str>,
) -> Result<MasterKey, VaultError> {
    if let Some(secret) = env_secret {
        return MasterKey::from_secret(secret.trim());
    }

    let path = config.master_key_path();
    if !path.exists() {
        return Err(VaultError::Configuration(format!(
            "no master key: set {} or run `docvault init`",
            MASTER_KEY_ENV
        )));
    }
    check_key_permissions(&path)?;
    let content = zeroize::Zeroizing::new(
        std::fs::read_to_string(&path)
            .map_err(|e| VaultError::storage(format!("failed to read {}", path.display()), e))?,
    );
    MasterKey::from_secret(content.trim())
}

/// Write a master key file atomically (temp file then rename) with 0600 permissions.
pub fn write_master_key_file(key: &MasterKey, dest: &Path) -> Result<(), VaultError> {
    let parent = dest
        .parent()
        .ok_or_else(|| VaultError::Configuration("key path has no parent directory".to_string()))?;
    let tmp = parent.join(".master.key.tmp");

    write_private_file(&tmp, key.to_hex().as_bytes())?;

    if let Err(e) = std::fs::rename(&tmp, dest) {
        let _ = std::fs::remove_file(&tmp);
        return Err(VaultError::storage(
            format!("failed to move key into {}", dest.display()),
            e,
        ));
    }
    Ok(())
}

/// Create (or truncate) a file readable only by its owner and write `bytes` to it.
pub(crate) fn write_private_file(path: &Path, bytes: &[u8]) -> Result<(), VaultError> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .map_err(|e| VaultError::storage(format!("failed to create {}", path.display()), e))?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| VaultError::storage(format!("failed to write {}", path.display()), e))?;

    // mode() only applies on creation; enforce it for pre-existing files too
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(|e| {
            VaultError::storage(format!("failed to set 0600 permissions on {}", path.display()), e)
        })?;
    }
    Ok(())
}

/// Reject a key file readable by group or others (Unix only).
#[cfg(unix)]
pub fn check_key_permissions(path: &Path) -> Result<(), VaultError> {
    use std::os::unix::fs::PermissionsExt;
    let metadata = std::fs::metadata(path)
        .map_err(|e| VaultError::storage(format!("failed to read metadata for {}", path.display()), e))?;
    let mode = metadata.permissions().mode() & 0o777;
    if mode != 0o600 {
        return Err(VaultError::Configuration(format!(
            "key file {} has insecure permissions {:04o} (expected 0600). Fix with: chmod 600 {}",
            path.display(),
            mode,
            path.display()
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn check_key_permissions(_path: &Path) -> Result<(), VaultError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> VaultConfig {
        VaultConfig::new(dir.to_path_buf())
    }

    #[test]
    fn test_check_upload_accepts_allowed_types_case_insensitively() {
        let config = config_in(Path::new("/tmp/unused"));
        assert_eq!(config.check_upload("doc.pdf", 10).unwrap(), "application/pdf");
        assert_eq!(config.check_upload("SCAN.JPG", 10).unwrap(), "image/jpeg");
    }

    #[test]
    fn test_check_upload_rejects_disallowed_type() {
        let config = config_in(Path::new("/tmp/unused"));
        for name in ["payload.exe", "archive.tar.gz", "README"] {
            assert!(
                matches!(config.check_upload(name, 10), Err(VaultError::UploadRejected(_))),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_check_upload_enforces_size_ceiling() {
        let mut config = config_in(Path::new("/tmp/unused"));
        config.max_upload_bytes = 100;
        assert!(config.check_upload("a.txt", 100).is_ok());
        assert!(matches!(
            config.check_upload("a.txt", 101),
            Err(VaultError::UploadRejected(_))
        ));
    }

    #[test]
    fn test_env_secret_takes_precedence_over_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        assert!(load_master_key(&config, Some("a passphrase")).is_ok());
    }

    #[test]
    fn test_env_hex_secret_with_trailing_newline_is_still_hex() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let key = MasterKey::generate();
        let padded = format!("  {}\n", key.to_hex().as_str());

        let from_env = load_master_key(&config, Some(&padded)).unwrap();
        assert_eq!(*from_env.to_hex(), *key.to_hex());

        write_master_key_file(&key, &config.master_key_path()).unwrap();
        let from_file = load_master_key(&config, None).unwrap();
        assert_eq!(from_env.wrap_ivs(), from_file.wrap_ivs());
    }

    #[test]
    fn test_whitespace_only_env_secret_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let err = load_master_key(&config, Some(" \n")).unwrap_err();
        assert!(matches!(err, VaultError::Configuration(_)));
    }

    #[test]
    fn test_missing_master_key_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let err = load_master_key(&config, None).unwrap_err();
        assert!(matches!(err, VaultError::Configuration(_)));
        assert!(err.to_string().contains(MASTER_KEY_ENV));
    }

    #[test]
    fn test_master_key_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let key = MasterKey::generate();
        write_master_key_file(&key, &config.master_key_path()).unwrap();

        let loaded = load_master_key(&config, None).unwrap();
        assert_eq!(*loaded.to_hex(), *key.to_hex());
    }

    #[cfg(unix)]
    #[test]
    fn test_master_key_file_is_0600() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.key");
        write_master_key_file(&MasterKey::generate(), &path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "expected 0600, got {:04o}", mode);
    }

    #[cfg(unix)]
    #[test]
    fn test_load_rejects_world_readable_key_file() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let path = config.master_key_path();
        write_master_key_file(&MasterKey::generate(), &path).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let err = load_master_key(&config, None).unwrap_err().to_string();
        assert!(err.contains("permissions"), "got: {}", err);
    }
}
