pub mod info;
pub mod report;

use clap::{Parser, Subcommand};
pub use info::InfoArgs;
pub use report::ReportArgs;

#[derive(Parser, Debug)]
#[command(
    name = "rollup",
    version,
    about = "Rollup - directory usage reports from a record store",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Aggregate the record store into a per-directory usage report.
    ///
    /// Example:
    ///   rollup report --top-dir /scratch --max-depth 2 -H
    ///   rollup report --metrics size --per-owner --older-than 2023-01-01
    Report(ReportArgs),

    /// Describe the record store.
    Info(InfoArgs),
}
