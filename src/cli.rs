use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// File-backed team task CLI.
/// Storage defaults to the most recent team under ~/.tt, or a path passed via --db.
#[derive(Parser)]
#[command(name = "tt", version, about = "Team task assignment and review CLI")]
pub struct Cli {
    /// Path to the workspace JSON file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Team name under the data directory.
    #[arg(long, short = 't', global = true)]
    pub team: Option<String>,

    /// Act as this member (id or name).
    #[arg(long, short = 'u', global = true)]
    pub user: Option<String>,

    /// Project to work in (id or name).
    #[arg(long, short = 'p', global = true)]
    pub project: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}
