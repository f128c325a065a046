//! AppGet CLI - fetch and verify installer artifacts.

mod commands;
mod error;
mod progress;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use commands::cache::CacheAction;
use commands::fetch::FetchArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "appget")]
#[command(version, about = "Fetch, verify and cache installer artifacts", long_about = None)]
struct Cli {
    /// Path to a configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the cache directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download an artifact into the cache and print its path
    Fetch(FetchArgs),

    /// Print the content of a text artifact without caching it
    Read {
        /// Source address
        source: String,
    },

    /// Inspect or clear the artifact cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let _log_guard = appget::logging::init_logging(cli.verbose, cli.log_file.as_deref())?;
    let config = commands::common::load_config(cli.config.as_deref(), cli.cache_dir)?;

    match cli.command {
        Commands::Fetch(args) => commands::fetch::run(&config, args).await,
        Commands::Read { source } => commands::read::run(&config, &source).await,
        Commands::Cache { action } => commands::cache::run(&config, action),
    }
}
