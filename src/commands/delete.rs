/// Delete command: removes a document record and its encrypted blob.
use std::io::IsTerminal;

use owo_colors::{OwoColorize, Stream::Stdout};

use crate::cli::{Cli, DeleteArgs};

pub fn run_delete(cli: &Cli, args: &DeleteArgs) -> anyhow::Result<()> {
    let id = super::parse_document_id(&args.id)?;
    let (vault, user_id) = super::login(cli)?;

    let skip_confirm = args.yes || !std::io::stdin().is_terminal();
    if !skip_confirm {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!("Delete document {}? This cannot be undone.", id))
            .default(false)
            .interact()
            .map_err(|e| anyhow::anyhow!("prompt failed: {}", e))?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let record = vault.delete(user_id, id)?;
    println!(
        "{} ({})",
        "Deleted.".if_supports_color(Stdout, |t| t.green()),
        record.original_name
    );
    Ok(())
}
