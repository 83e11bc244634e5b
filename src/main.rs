mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("DOCVAULT_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Init(args) => commands::init::run_init(cli, args),
        Commands::Register => commands::register::run_register(cli),
        Commands::Whoami => commands::whoami::run_whoami(cli),
        Commands::SetPin => commands::pin::run_set_pin(cli),
        Commands::ClearPin => commands::pin::run_clear_pin(cli),
        Commands::Upload(args) => commands::upload::run_upload(cli, args),
        Commands::Download(args) => commands::download::run_download(cli, args),
        Commands::List => commands::list::run_list(cli),
        Commands::Delete(args) => commands::delete::run_delete(cli, args),
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        commands::report(&err);
        std::process::exit(1);
    }
}
