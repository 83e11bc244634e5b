use anyhow::Context;
use owo_colors::{OwoColorize, Stream::Stdout};

use docvault::util::human_size;
use docvault::vault::UploadRequest;

use crate::cli::{Cli, UploadArgs};

pub fn run_upload(cli: &Cli, args: &UploadArgs) -> anyhow::Result<()> {
    let file_name = args
        .file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("'{}' has no usable file name", args.file.display()))?
        .to_string();

    // Check the size before reading the whole file into memory
    let config = super::load_config(cli)?;
    let metadata = std::fs::metadata(&args.file)
        .with_context(|| format!("Failed to stat {}", args.file.display()))?;
    config.check_upload(&file_name, metadata.len())?;

    let (vault, user_id) = super::login(cli)?;
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let record = vault.upload(
        user_id,
        UploadRequest {
            file_name: &file_name,
            bytes: &bytes,
            pin: args.pin.as_deref(),
            requires_pin: args.require_pin,
        },
    )?;

    println!(
        "{} {} ({})",
        "Uploaded".if_supports_color(Stdout, |t| t.green()),
        record.original_name.if_supports_color(Stdout, |t| t.cyan()),
        human_size(record.size_bytes)
    );
    println!("  ID: {}", record.id);
    if record.requires_pin {
        let source = if record.pin_hash.is_some() {
            "file PIN"
        } else {
            "account PIN"
        };
        println!(
            "{}",
            format!("  PIN-protected ({}): pass --pin to download.", source)
                .if_supports_color(Stdout, |t| t.yellow())
        );
    }
    Ok(())
}
