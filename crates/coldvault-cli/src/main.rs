use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use coldvault_core::{ColdVaultError, Operation, OperationDispatcher, ServiceContext, Settings};
use tokio::sync::watch;
use tracing::{error, info, warn};

mod logger;

/// Archive files into cold-storage vaults and list vault inventories.
#[derive(Debug, Parser)]
#[command(name = "coldvault", version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long = "conf-file", alias = "conf_file")]
    conf_file: PathBuf,

    /// Operation: create | put | listVault | deleteVault | getFile | deleteFile
    #[arg(long = "op-name", alias = "op_name")]
    op_name: String,

    /// Vault the operation works on
    #[arg(long = "vault-name", alias = "vault_name")]
    vault_name: String,

    /// File to upload (put) or archive id (getFile, deleteFile)
    #[arg(long = "file-name", alias = "file_name")]
    file_name: Option<String>,
}

const EXIT_USAGE: u8 = 1;
const EXIT_FAILURE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    logger::init();

    let operation = Operation::parse(&cli.op_name);
    if operation.needs_file() && cli.file_name.as_deref().is_none_or(str::is_empty) {
        error!(operation = %operation, "{}", ColdVaultError::Usage("--file-name is required".into()));
        return ExitCode::from(EXIT_USAGE);
    }

    info!(path = %cli.conf_file.display(), "Loading configuration");
    let settings = match Settings::load(&cli.conf_file) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    info!(
        region = %settings.region,
        endpoint = %settings.endpoint("glacier"),
        storage_root = %settings.storage_root.display(),
        "Using local backend"
    );
    let ctx = ServiceContext::local(settings);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, abandoning the wait");
            let _ = cancel_tx.send(true);
        }
    });

    let outcome = OperationDispatcher::new(&ctx, cancel_rx)
        .dispatch(&operation, &cli.vault_name, cli.file_name.as_deref())
        .await;

    ExitCode::from(outcome.exit_code() as u8)
}
