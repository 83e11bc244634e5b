use owo_colors::{OwoColorize, Stream::Stdout};

use crate::cli::Cli;

pub fn run_register(cli: &Cli) -> anyhow::Result<()> {
    let vault = super::open_vault(cli)?;
    let username = super::resolve_username(cli)?;
    let password = super::read_password(true)?;

    let user = vault.register(&username, &password)?;

    println!(
        "{} {}",
        "Registered".if_supports_color(Stdout, |t| t.green()),
        user.username.if_supports_color(Stdout, |t| t.cyan())
    );
    println!("User ID: {}", user.id);
    println!("Set an account PIN with: docvault --user {} set-pin", user.username);
    Ok(())
}
