use std::path::PathBuf;

use clap::Parser;
use rollup_runtime::{default_index_path, default_socket_path};

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    // Path to the record store
    pub index_path: PathBuf,
    // Unix domain socket path
    pub socket_path: PathBuf,
}

#[derive(Debug, Parser)]
#[command(
    name = "rollup-daemon",
    about = "Keep a record store open and serve usage reports"
)]
pub struct Cli {
    /// Path to index file (optional override)
    #[arg(long)]
    pub index_path: Option<PathBuf>,

    /// Path to Unix domain socket (optional override)
    #[arg(long)]
    pub socket_path: Option<PathBuf>,
}

impl DaemonConfig {
    pub fn from_args(args: &Cli) -> Self {
        Self {
            index_path: args.index_path.clone().unwrap_or_else(default_index_path),
            socket_path: args.socket_path.clone().unwrap_or_else(default_socket_path),
        }
    }

    pub fn from_env() -> Self {
        Self::from_args(&Cli::parse())
    }
}
