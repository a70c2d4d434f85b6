//! Command line interface

use std::path::PathBuf;

use clap::Parser;

pub mod commands;
pub mod output;

pub use commands::Commands;

#[derive(Parser, Debug)]
#[command(
    name = "robot-rag",
    author,
    version,
    about = "Hybrid retrieval and answer assembly over robot documentation",
    long_about = None
)]
pub struct Cli {
    /// Service configuration file (TOML); skips the global and project files
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Retrieval policy file (YAML)
    #[arg(long, global = true)]
    pub policy: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress log output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Machine-readable JSON output
    #[arg(long, global = true)]
    pub robot: bool,

    #[command(subcommand)]
    pub command: Commands,
}
