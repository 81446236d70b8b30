//! tierbox - cached development containers for AI coding agents
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tierbox::cli::{Cli, Commands, LogFormat};
use tierbox::config::ConfigManager;
use tierbox::error::{TierboxError, TierboxResult};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        // The agent already reported its own failure
        Err(e @ TierboxError::ContainerExited { .. }) => ExitCode::from(e.exit_code()),
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> TierboxResult<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = warn (spinners only), 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("tierbox=warn"),
        1 => EnvFilter::new("tierbox=info"),
        _ => EnvFilter::new("tierbox=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Text => subscriber.without_time().init(),
        LogFormat::Json => subscriber.json().init(),
    }

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    debug!("Global config: {}", config_manager.path().display());

    let command = cli.command();

    // Init only writes files, no global config needed up front
    if let Commands::Init(args) = command {
        return tierbox::cli::commands::init(args, &config_manager).await;
    }

    let global = config_manager.load_global().await?;

    match command {
        Commands::Init(_) => unreachable!("Init handled above"),
        Commands::Run(args) => tierbox::cli::commands::run(args.args, &global).await,
        Commands::Shell => tierbox::cli::commands::shell(&global).await,
        Commands::Clean(args) => tierbox::cli::commands::clean(args, &global).await,
    }
}
