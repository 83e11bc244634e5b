use std::io::IsTerminal;

use anyhow::Context;
use owo_colors::{OwoColorize, Stream::Stdout};

use docvault::config::{self, MASTER_KEY_ENV};
use docvault::crypto::MasterKey;

use crate::cli::{Cli, InitArgs};

pub fn run_init(cli: &Cli, args: &InitArgs) -> anyhow::Result<()> {
    let config = super::load_config(cli)?;

    // Step 1: Ensure the data directory exists, owner-only on Unix
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&config.data_dir, std::fs::Permissions::from_mode(0o700))
            .with_context(|| format!("Failed to set 0700 permissions on {}", config.data_dir.display()))?;
    }

    // Step 2: Overwrite guard. A new key orphans every stored document.
    let key_path = config.master_key_path();
    if key_path.exists() && !args.force {
        if !std::io::stdin().is_terminal() {
            anyhow::bail!(
                "Master key already exists at {}. Pass --force to replace it.",
                key_path.display()
            );
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Master key exists at {}. Replacing it makes existing documents unreadable. Continue?",
                key_path.display()
            ))
            .default(false)
            .interact()
            .map_err(|e| anyhow::anyhow!("prompt failed: {}", e))?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    // Step 3: Generate and write the key
    let key = MasterKey::generate();
    config::write_master_key_file(&key, &key_path)?;
    tracing::info!(path = %key_path.display(), "master key written");

    println!(
        "{}",
        "Vault initialized.".if_supports_color(Stdout, |t| t.green())
    );
    println!("Data dir:    {}", config.data_dir.display());
    println!("Master key:  {}", key_path.display());
    println!();
    println!(
        "{}",
        "Back up the master key. Without it no document can be decrypted."
            .if_supports_color(Stdout, |t| t.yellow())
    );
    if std::env::var_os(MASTER_KEY_ENV).is_some() {
        println!(
            "{}",
            format!("Note: {} is set and takes precedence over the key file.", MASTER_KEY_ENV)
                .if_supports_color(Stdout, |t| t.yellow())
        );
    }

    Ok(())
}
