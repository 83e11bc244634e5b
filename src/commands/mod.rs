pub mod delete;
pub mod download;
pub mod init;
pub mod list;
pub mod pin;
pub mod register;
pub mod upload;
pub mod whoami;

use std::io::IsTerminal;

use anyhow::Context;
use owo_colors::{OwoColorize, Stream::Stderr};
use zeroize::Zeroizing;

use docvault::config::{self, VaultConfig, MASTER_KEY_ENV};
use docvault::crypto::EnvelopeEngine;
use docvault::error::VaultError;
use docvault::record::{DocumentId, UserId};
use docvault::store::{FsBlobStore, JsonMetadataStore};
use docvault::vault::Vault;

use crate::cli::Cli;

/// Non-interactive password source.
pub const PASSWORD_ENV: &str = "DOCVAULT_PASSWORD";

/// Non-interactive PIN source for `set-pin`.
pub const PIN_ENV: &str = "DOCVAULT_PIN";

pub type FileVault = Vault<JsonMetadataStore, FsBlobStore>;

pub fn load_config(cli: &Cli) -> anyhow::Result<VaultConfig> {
    let data_dir = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => config::default_data_dir()?,
    };
    let mut config = VaultConfig::new(data_dir);
    if let Some(limit) = cli.max_upload_bytes {
        config.max_upload_bytes = limit;
    }
    Ok(config)
}

/// Load the master key and open the file-backed vault.
pub fn open_vault(cli: &Cli) -> anyhow::Result<FileVault> {
    let config = load_config(cli)?;
    let env_secret = std::env::var(MASTER_KEY_ENV).ok().map(Zeroizing::new);
    let master_key = config::load_master_key(&config, env_secret.as_deref().map(|s| s.as_str()))?;
    Ok(Vault::open(config, EnvelopeEngine::new(master_key)))
}

/// Username from `--user`/`DOCVAULT_USER`, or an interactive prompt.
pub fn resolve_username(cli: &Cli) -> anyhow::Result<String> {
    if let Some(user) = &cli.user {
        return Ok(user.clone());
    }
    if !std::io::stdin().is_terminal() {
        anyhow::bail!("No user given. Pass --user or set DOCVAULT_USER.");
    }
    dialoguer::Input::<String>::new()
        .with_prompt("Username")
        .interact_text()
        .map_err(|e| anyhow::anyhow!("username prompt failed: {}", e))
}

/// Password from `DOCVAULT_PASSWORD`, or an interactive prompt.
pub fn read_password(confirm: bool) -> anyhow::Result<Zeroizing<String>> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(Zeroizing::new(password));
    }
    if !std::io::stdin().is_terminal() {
        anyhow::bail!("Password prompt requires a terminal. Set {} instead.", PASSWORD_ENV);
    }
    let mut prompt = dialoguer::Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords don't match");
    }
    let password = prompt
        .interact()
        .map_err(|e| anyhow::anyhow!("password prompt failed: {}", e))?;
    Ok(Zeroizing::new(password))
}

/// Open the vault and authenticate the configured user.
pub fn login(cli: &Cli) -> anyhow::Result<(FileVault, UserId)> {
    let vault = open_vault(cli)?;
    let username = resolve_username(cli)?;
    let password = read_password(false)?;
    let user_id = vault.authenticate(&username, &password)?;
    Ok((vault, user_id))
}

pub fn parse_document_id(raw: &str) -> anyhow::Result<DocumentId> {
    raw.trim()
        .parse()
        .with_context(|| format!("'{}' is not a valid document ID", raw))
}

/// Print a red error line for vault failures, including the transport status code.
pub fn report(err: &anyhow::Error) {
    match err.downcast_ref::<VaultError>() {
        Some(VaultError::Denied(denial)) => eprintln!(
            "{} {} ({})",
            "Denied:".if_supports_color(Stderr, |t| t.red()),
            denial,
            denial.status_code()
        ),
        Some(vault_err) => eprintln!(
            "{} {} ({})",
            "Error:".if_supports_color(Stderr, |t| t.red()),
            vault_err,
            vault_err.status_code()
        ),
        None => eprintln!(
            "{} {:#}",
            "Error:".if_supports_color(Stderr, |t| t.red()),
            err
        ),
    }
}
