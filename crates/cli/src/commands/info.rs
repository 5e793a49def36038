use std::fs;
use std::io::{self, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use clap::Args;
use rollup_protocol::codec::{read_message, write_message};
use rollup_protocol::{DaemonRequest, DaemonResponse, StoreStatus};
use rollup_runtime::{default_index_path, default_socket_path};
use rollup_store::{RecordSource, RecordStore};

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Record store to describe [default: $ROLLUP_INDEX or the user cache dir]
    #[arg(long, value_name = "PATH")]
    pub index: Option<PathBuf>,

    /// Describe the store the background daemon has open
    #[arg(long)]
    pub daemon: bool,
}

/// What `rollup info` prints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSummary {
    pub location: String,
    pub root: Option<String>,
    pub records: u64,
    pub owners: u64,
    pub created_at: Option<DateTime<Utc>>,
    /// Only known when the file was opened locally.
    pub file_size: Option<u64>,
    /// Only known when asking the daemon.
    pub reports_served: Option<u64>,
}

impl StoreSummary {
    pub fn from_store(path: &Path) -> Result<Self> {
        let store = RecordStore::open(path)
            .with_context(|| format!("failed to open record store at {}", path.display()))?;
        let meta = fs::metadata(path)
            .with_context(|| format!("failed to stat {}", path.display()))?;

        Ok(Self {
            location: path.display().to_string(),
            root: store.root_path().map(str::to_owned),
            records: store.record_count() as u64,
            owners: store.owner_count() as u64,
            created_at: store.created_at(),
            file_size: Some(meta.len()),
            reports_served: None,
        })
    }

    pub fn from_status(status: StoreStatus) -> Self {
        Self {
            location: status.index_path,
            root: status.root,
            records: status.records,
            owners: status.owners,
            created_at: status
                .created_secs
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            file_size: None,
            reports_served: Some(status.reports_served),
        }
    }

    pub fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "[info] location: {}", self.location)?;
        writeln!(
            out,
            "[info] root:     {}",
            self.root.as_deref().unwrap_or("<unknown>")
        )?;
        writeln!(out, "[info] records:  {}", self.records)?;
        writeln!(out, "[info] owners:   {}", self.owners)?;
        match self.created_at {
            Some(t) => writeln!(
                out,
                "[info] snapshot: {}",
                t.format("%Y-%m-%d %H:%M:%S UTC")
            )?,
            None => writeln!(out, "[info] snapshot: <unknown>")?,
        }
        if let Some(size) = self.file_size {
            writeln!(out, "[info] size:     {size} bytes")?;
        }
        if let Some(served) = self.reports_served {
            writeln!(out, "[info] served:   {served} reports")?;
        }
        Ok(())
    }
}

pub fn run(args: InfoArgs) -> ExitCode {
    match execute(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[error] {e:#}");
            ExitCode::from(2)
        }
    }
}

fn execute(args: &InfoArgs) -> Result<ExitCode> {
    let summary = if args.daemon {
        status_via_daemon(&default_socket_path())?
    } else {
        let index_path = args.index.clone().unwrap_or_else(default_index_path);
        if !index_path.exists() {
            eprintln!("[info] no record store found at {}", index_path.display());
            // Absence is a soft failure.
            return Ok(ExitCode::from(1));
        }
        StoreSummary::from_store(&index_path)?
    };

    summary.write(&mut io::stdout().lock())?;
    Ok(ExitCode::SUCCESS)
}

fn status_via_daemon(socket_path: &Path) -> Result<StoreSummary> {
    let mut stream = UnixStream::connect(socket_path).with_context(|| {
        format!(
            "failed to connect to rollup daemon at {}",
            socket_path.display()
        )
    })?;

    write_message(&mut stream, &DaemonRequest::Status)?;
    let resp: DaemonResponse = read_message(&mut stream)?;

    match resp {
        DaemonResponse::Status(status) => Ok(StoreSummary::from_status(status)),
        DaemonResponse::Error(msg) => Err(anyhow!("daemon error: {msg}")),
        other => Err(anyhow!("unexpected daemon response: {other:?}")),
    }
}

#[cfg(test)]
#[path = "info_tests.rs"]
mod tests;
