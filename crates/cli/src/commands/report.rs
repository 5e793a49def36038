use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::Args;
use log::{debug, warn};
use rollup_engine::{
    ConfigError, FormatOptions, Report, ReportConfig, TimeFilter, UnitBase, parse_metric_list,
    parse_sort_keys, parse_timestamp, parse_timestamp_kind, run_report, run_report_timed,
};
use rollup_protocol::codec::{read_message, write_message};
use rollup_protocol::{DaemonRequest, DaemonResponse, ReportMetrics, ReportRequest};
use rollup_runtime::{default_index_path, default_socket_path};
use rollup_store::RecordStore;

use crate::printer::{OutputFormat, PrinterConfig, make_printer, print_report};

#[derive(Debug, Args)]
pub struct OutputOptions {
    /// Output rows as NDJSON (one JSON object per line)
    #[arg(long)]
    pub json: bool,

    /// Suppress timing statistics
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Record store to read [default: $ROLLUP_INDEX or the user cache dir]
    #[arg(long, value_name = "PATH")]
    pub index: Option<PathBuf>,

    /// Depth-0 directory [default: the root the store was built from]
    #[arg(long, value_name = "DIR")]
    pub top_dir: Option<String>,

    /// Shallowest depth to report
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub min_depth: usize,

    /// Deepest depth to report
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub max_depth: usize,

    /// Comma-separated metrics, in column order
    #[arg(long, value_name = "LIST", default_value = "size,inodes")]
    pub metrics: String,

    /// Break every directory down by owner
    #[arg(long)]
    pub per_owner: bool,

    /// Scale values to powers of 1024 with one decimal
    #[arg(long, short = 'H')]
    pub human_readable: bool,

    /// Like --human-readable, in powers of 1000
    #[arg(long)]
    pub si: bool,

    /// Only count records whose timestamp is before DATE
    #[arg(long, value_name = "DATE")]
    pub older_than: Option<String>,

    /// Only count records whose timestamp is at or after DATE
    #[arg(long, value_name = "DATE")]
    pub newer_than: Option<String>,

    /// Timestamp the date bounds apply to: atime, mtime or ctime
    #[arg(long, value_name = "KIND", default_value = "atime")]
    pub timestamp: String,

    /// Comma-separated sort keys, most significant first
    #[arg(long, value_name = "LIST", default_value = "depth,size")]
    pub sort: String,

    /// Scan threads [default: available cores, at most 4]
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Output formatting options
    #[command(flatten)]
    pub output: OutputOptions,

    /// Ask the background daemon instead of opening the store directly
    #[arg(long)]
    pub daemon: bool,
}

impl ReportArgs {
    /// Parse every option into a validated config. Nothing is opened yet.
    pub fn to_config(&self) -> Result<ReportConfig, ConfigError> {
        let defaults = ReportConfig::default();

        let config = ReportConfig {
            top_directory: self.top_dir.clone(),
            min_depth: self.min_depth,
            max_depth: self.max_depth,
            metrics: parse_metric_list(&self.metrics)?,
            per_owner: self.per_owner,
            time: TimeFilter {
                kind: parse_timestamp_kind(&self.timestamp)?,
                newer_than: self.newer_than.as_deref().map(parse_timestamp).transpose()?,
                older_than: self.older_than.as_deref().map(parse_timestamp).transpose()?,
            },
            sort_keys: parse_sort_keys(&self.sort)?,
            workers: self.workers.unwrap_or(defaults.workers),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn printer_config(&self) -> PrinterConfig {
        let options = if self.si {
            FormatOptions::human(UnitBase::Si)
        } else if self.human_readable {
            FormatOptions::human(UnitBase::Binary)
        } else {
            FormatOptions::raw()
        };

        PrinterConfig {
            format: if self.output.json {
                OutputFormat::Json
            } else {
                OutputFormat::Human
            },
            options,
            show_timing: !self.output.quiet,
        }
    }
}

pub fn run(args: ReportArgs) -> ExitCode {
    match execute(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[error] {e:#}");
            ExitCode::from(2)
        }
    }
}

fn execute(args: &ReportArgs) -> Result<ExitCode> {
    let config = args.to_config()?;
    let printer_cfg = args.printer_config();

    let (report, timing) = if args.daemon {
        if args.index.is_some() {
            warn!("--index is ignored with --daemon; the daemon reports from its own store");
        }
        report_via_daemon(&default_socket_path(), &config, printer_cfg.show_timing)?
    } else {
        let index_path = args.index.clone().unwrap_or_else(default_index_path);
        report_local(&index_path, &config, printer_cfg.show_timing)?
    };

    let mut printer = make_printer(printer_cfg);
    print_report(printer.as_mut(), &report, timing.as_ref())?;

    Ok(ExitCode::SUCCESS)
}

/// Open the store and run the pipeline in-process.
fn report_local(
    index_path: &Path,
    config: &ReportConfig,
    timed: bool,
) -> Result<(Report, Option<ReportMetrics>)> {
    let store = RecordStore::open(index_path)
        .with_context(|| format!("failed to open record store at {}", index_path.display()))?;

    debug!("running report with {} workers", config.workers);

    if timed {
        let (report, metrics) = run_report_timed(&store, config)?;
        Ok((report, Some(ReportMetrics::from(&metrics))))
    } else {
        Ok((run_report(&store, config)?, None))
    }
}

/// Daemon mode: send the config over the Unix socket and return its report.
fn report_via_daemon(
    socket_path: &Path,
    config: &ReportConfig,
    timed: bool,
) -> Result<(Report, Option<ReportMetrics>)> {
    let mut stream = UnixStream::connect(socket_path).with_context(|| {
        format!(
            "failed to connect to rollup daemon at {}",
            socket_path.display()
        )
    })?;

    let req = DaemonRequest::Report(ReportRequest {
        config: config.clone(),
        timed,
    });

    write_message(&mut stream, &req)?;
    let resp: DaemonResponse = read_message(&mut stream)?;

    match resp {
        DaemonResponse::ReportResult(r) => Ok((r.report, r.metrics)),
        DaemonResponse::Error(msg) => Err(anyhow!("daemon error: {msg}")),
        other => Err(anyhow!("unexpected daemon response: {other:?}")),
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
