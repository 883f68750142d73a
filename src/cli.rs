use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments for ghbin
#[derive(Parser, Debug, Clone)]
#[command(name = "ghbin")]
#[command(version, about = "Install CLI programs from their latest GitHub release")]
pub struct Args {
    /// Catalog of installable programs
    #[arg(default_value = "catalog.toml")]
    pub catalog: PathBuf,

    /// Log resolved versions, download URLs and retries
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Path to configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Install every program in the catalog without asking
    #[arg(long, conflicts_with = "only")]
    pub all: bool,

    /// Install only the named programs without asking
    #[arg(long, num_args = 1..)]
    pub only: Vec<String>,

    /// Never prompt; programs without declared binaries are installed unlinked
    #[arg(long)]
    pub no_interaction: bool,

    /// Programs allowed mid-install at once (overrides config)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Install root (overrides config)
    #[arg(long)]
    pub share_dir: Option<PathBuf>,

    /// Link directory (overrides config)
    #[arg(long)]
    pub bin_dir: Option<PathBuf>,
}
