use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use owo_colors::{OwoColorize, Stream::Stderr};

use docvault::util::human_size;

use crate::cli::{Cli, DownloadArgs};

/// Default output path: the stored file name, stripped of any directory parts.
fn default_output(original_name: &str) -> PathBuf {
    Path::new(original_name)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("document.bin"))
}

pub fn run_download(cli: &Cli, args: &DownloadArgs) -> anyhow::Result<()> {
    let id = super::parse_document_id(&args.id)?;
    let (vault, user_id) = super::login(cli)?;

    let document = vault.download(user_id, id, args.pin.as_deref())?;

    let to_stdout = args.output.as_deref() == Some(Path::new("-"));
    if to_stdout {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(&document.bytes)
            .and_then(|_| stdout.flush())
            .context("Failed to write document to stdout")?;
        return Ok(());
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&document.record.original_name));
    if output.exists() && !args.force {
        anyhow::bail!(
            "{} already exists. Pass --force to overwrite or -o to choose another path.",
            output.display()
        );
    }
    std::fs::write(&output, &document.bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    // Status goes to stderr so stdout stays reserved for document bytes
    eprintln!(
        "{} {} -> {} ({})",
        "Decrypted".if_supports_color(Stderr, |t| t.green()),
        document.record.original_name,
        output.display(),
        human_size(document.record.size_bytes)
    );
    Ok(())
}
