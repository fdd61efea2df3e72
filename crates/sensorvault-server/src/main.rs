use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sensorvault_config::{RuntimeConfig, StorageBackend};
use std::path::PathBuf;

/// Periodic sensor archive service
#[derive(Parser)]
#[command(name = "sensorvault")]
#[command(version)]
#[command(about = "Archives time-series sensor readings to object storage", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// HTTP listen address (overrides config file)
    #[arg(short, long, value_name = "ADDR", global = true)]
    listen: Option<String>,

    /// Root directory for archives (filesystem backend only)
    #[arg(short, long, value_name = "DIR", global = true)]
    output: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the archive loop and HTTP surface (default)
    Serve,
    /// Archive the trailing hours once and exit
    Archive {
        /// Hours before now to include in the window
        #[arg(long, value_name = "N", default_value_t = 1)]
        hours_back: i64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let mut config = if let Some(config_path) = &cli.config {
        RuntimeConfig::load_from_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        RuntimeConfig::load_or_default().context("Failed to load configuration")?
    };

    apply_cli_overrides(&mut config, &cli)?;
    config.validate().context("Invalid configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => sensorvault_server::run_with_config(config).await,
        Command::Archive { hours_back } => {
            let result = sensorvault_server::run_once(config, hours_back).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

fn apply_cli_overrides(config: &mut RuntimeConfig, cli: &Cli) -> Result<()> {
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen.clone();
    }

    if let Some(output) = &cli.output {
        anyhow::ensure!(
            config.storage.backend == StorageBackend::Fs,
            "--output sets the archive root for the 'fs' storage backend; configured backend is '{}'",
            config.storage.backend
        );
        config
            .storage
            .fs
            .get_or_insert_with(Default::default)
            .path = output.to_string_lossy().into_owned();
    }

    if let Some(level) = &cli.log_level {
        config.server.log_level = level.clone();
    }

    Ok(())
}
