use std::io::IsTerminal;

use owo_colors::{OwoColorize, Stream::Stdout};
use zeroize::Zeroizing;

use crate::cli::Cli;

fn read_new_pin() -> anyhow::Result<Zeroizing<String>> {
    if let Ok(pin) = std::env::var(super::PIN_ENV) {
        return Ok(Zeroizing::new(pin));
    }
    if !std::io::stdin().is_terminal() {
        anyhow::bail!("PIN prompt requires a terminal. Set {} instead.", super::PIN_ENV);
    }
    let pin = dialoguer::Password::new()
        .with_prompt("New account PIN (4-6 digits)")
        .with_confirmation("Confirm PIN", "PINs don't match")
        .interact()
        .map_err(|e| anyhow::anyhow!("PIN prompt failed: {}", e))?;
    Ok(Zeroizing::new(pin))
}

pub fn run_set_pin(cli: &Cli) -> anyhow::Result<()> {
    let (vault, user_id) = super::login(cli)?;
    let pin = read_new_pin()?;
    vault.set_account_pin(user_id, &pin)?;

    println!(
        "{}",
        "Account PIN set.".if_supports_color(Stdout, |t| t.green())
    );
    println!("Documents uploaded with --require-pin and no file PIN now use it.");
    Ok(())
}

pub fn run_clear_pin(cli: &Cli) -> anyhow::Result<()> {
    let (vault, user_id) = super::login(cli)?;
    vault.clear_account_pin(user_id)?;

    println!("Account PIN removed.");
    println!(
        "{}",
        "Documents relying on the account PIN stay locked until a new one is set."
            .if_supports_color(Stdout, |t| t.yellow())
    );
    Ok(())
}
