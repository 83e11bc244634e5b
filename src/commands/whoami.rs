use crate::cli::Cli;

pub fn run_whoami(cli: &Cli) -> anyhow::Result<()> {
    let (vault, user_id) = super::login(cli)?;
    let user = vault.user(user_id)?;
    let documents = vault.documents(user_id)?;

    println!("Username:    {}", user.username);
    println!("User ID:     {}", user.id);
    println!(
        "Account PIN: {}",
        if user.pin_hash.is_some() { "set" } else { "not set" }
    );
    println!("Documents:   {}", documents.len());
    println!("Data dir:    {}", vault.config().data_dir.display());
    Ok(())
}
