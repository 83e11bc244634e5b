/// List command: renders the caller's documents as a table.
use owo_colors::{OwoColorize, Stream::Stdout};

use docvault::record::now_secs;
use docvault::util::{human_duration, human_size};

use crate::cli::Cli;

pub fn run_list(cli: &Cli) -> anyhow::Result<()> {
    use comfy_table::{Cell, Color, Table};

    let (vault, user_id) = super::login(cli)?;
    let documents = vault.documents(user_id)?;

    if documents.is_empty() {
        println!(
            "{}",
            "No documents yet. Upload one with `docvault upload <FILE>`."
                .if_supports_color(Stdout, |t| t.yellow())
        );
        return Ok(());
    }

    let now = now_secs();
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Size", "PIN", "Uploaded"]);

    for doc in &documents {
        let pin_cell = match (doc.requires_pin, doc.pin_hash.is_some()) {
            (false, _) => Cell::new(""),
            (true, true) => Cell::new("file").fg(Color::Yellow),
            (true, false) => Cell::new("account").fg(Color::Yellow),
        };
        table.add_row(vec![
            Cell::new(doc.id),
            Cell::new(&doc.original_name),
            Cell::new(human_size(doc.size_bytes)),
            pin_cell,
            Cell::new(format!(
                "{} ago",
                human_duration(now.saturating_sub(doc.uploaded_at))
            )),
        ]);
    }

    println!("{table}");
    Ok(())
}
