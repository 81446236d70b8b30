//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// tierbox - cached development containers for AI coding agents
///
/// Builds a shared per-language base image and a per-project image on top
/// of it, rebuilding only when tierbox.toml changes, then starts the agent
/// inside a rootless Podman container.
#[derive(Parser, Debug)]
#[command(name = "tierbox")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Subcommand to execute (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Arguments for the agent when no subcommand is given
    #[command(flatten)]
    pub run: RunArgs,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = LogFormat::Text,
        env = "TIERBOX_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Global configuration file path
    #[arg(long, global = true, env = "TIERBOX_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// The command to execute; without a subcommand every argument goes to
    /// the agent
    pub fn command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(self.run.clone()))
    }
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build (if needed) and start the agent, forwarding ARGS to it
    Run(RunArgs),

    /// Create tierbox.toml in the current directory
    Init(InitArgs),

    /// Build (if needed) and open a bash shell instead of the agent
    Shell,

    /// Remove this project's images, build context and state
    Clean(CleanArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Clone, Default)]
pub struct RunArgs {
    /// Arguments appended to the agent command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Arguments for the init command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Overwrite existing tierbox.toml
    #[arg(short, long)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(short, long)]
    pub path: Option<PathBuf>,
}

/// Arguments for the clean command
#[derive(Parser, Debug, Clone)]
pub struct CleanArgs {
    /// Also remove the shared base images
    #[arg(long)]
    pub base: bool,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}
