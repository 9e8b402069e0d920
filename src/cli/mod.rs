// ABOUTME: CLI argument parsing and command routing for siteup
//
// Provides command-line interface for:
// - Starting the background site server (start)
// - Stopping it (stop)
// - Inspecting its recorded state (status)

pub mod start;
pub mod status;
pub mod stop;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::server::{ServerEnvironment, SiteLayout};

/// Manage the background site server
#[derive(Parser)]
#[command(name = "siteup")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

/// Output format for commands
#[derive(Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the site server (or reuse a compatible running one)
    Start(StartArgs),

    /// Stop the running site server
    Stop,

    /// Show the recorded server state
    Status,
}

/// Arguments for the start command
#[derive(clap::Args)]
pub struct StartArgs {
    /// Environment to run the server in
    #[arg(long, value_enum, default_value_t = ServerEnvironment::Development)]
    pub env: ServerEnvironment,

    /// Site layout the server should serve
    #[arg(long, value_enum, default_value_t = SiteLayout::Fullstack)]
    pub layout: SiteLayout,

    /// Fail instead of reusing an already-running compatible server
    #[arg(long)]
    pub no_reuse: bool,

    /// Project root the server runs in (defaults to the current directory)
    #[arg(long)]
    pub path: Option<PathBuf>,
}
