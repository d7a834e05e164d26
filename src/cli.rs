// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: A single optional overlay path; everything else comes from the environment.

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "preflight")]
#[command(about = "Check, and if needed start, backing services, then launch the application")]
pub struct Cli {
    /// Overlay file of KEY=VALUE lines (default: .env next to the scripts directory)
    #[arg(short = 'e', long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,
}
