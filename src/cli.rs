use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "docvault", version, about = "Store documents encrypted at rest, optionally behind a PIN")]
pub struct Cli {
    /// Vault data directory (default: ~/.docvault)
    #[arg(long, global = true, env = "DOCVAULT_DATA_DIR", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Account to act as
    #[arg(long, short = 'u', global = true, env = "DOCVAULT_USER", value_name = "USERNAME")]
    pub user: Option<String>,

    /// Largest accepted upload in bytes
    #[arg(long, global = true, env = "DOCVAULT_MAX_UPLOAD_BYTES", value_name = "BYTES")]
    pub max_upload_bytes: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory and generate a master key file
    Init(InitArgs),
    /// Create a new account
    Register,
    /// Show the authenticated account
    Whoami,
    /// Set the account-level PIN used by documents without their own PIN
    SetPin,
    /// Remove the account-level PIN
    ClearPin,
    /// Encrypt and store a file
    Upload(UploadArgs),
    /// Decrypt and retrieve a stored file
    Download(DownloadArgs),
    /// List your documents
    List,
    /// Delete a document and its encrypted blob
    Delete(DeleteArgs),
}

#[derive(Parser)]
pub struct InitArgs {
    /// Replace an existing master key file (existing documents become unreadable)
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser)]
pub struct UploadArgs {
    /// File to upload
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Per-file PIN (4-6 digits); implies --require-pin
    #[arg(long, value_name = "PIN")]
    pub pin: Option<String>,

    /// Require a PIN on download; falls back to the account PIN when no --pin is given
    #[arg(long)]
    pub require_pin: bool,
}

#[derive(Parser)]
pub struct DownloadArgs {
    /// Document ID (see `docvault list`)
    #[arg(value_name = "ID")]
    pub id: String,

    /// PIN for PIN-protected documents
    #[arg(long, value_name = "PIN")]
    pub pin: Option<String>,

    /// Output path; `-` writes to stdout (default: original file name)
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Overwrite an existing output file
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser)]
pub struct DeleteArgs {
    /// Document ID (see `docvault list`)
    #[arg(value_name = "ID")]
    pub id: String,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}
