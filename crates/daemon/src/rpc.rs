use std::fs;
use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use log::{debug, error, info};
use rollup_protocol::codec::{read_message, write_message};
use rollup_protocol::{DaemonRequest, DaemonResponse};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;

use crate::report::execute_report;
use crate::state::DaemonState;

/// How long the accept loop sleeps when no client is waiting.
const ACCEPT_POLL: Duration = Duration::from_millis(50);

/// RAII guard that ensures the Unix socket file is removed on shutdown,
/// even if we return early or panic.
struct SocketGuard<'a> {
    path: &'a Path,
}

impl Drop for SocketGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(self.path)
            && err.kind() != io::ErrorKind::NotFound
        {
            error!(
                "Failed to remove Unix socket at {} on shutdown: {err}",
                self.path.display()
            );
        }
    }
}

pub fn run_rpc_server(state: Arc<DaemonState>) -> anyhow::Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));

    // Register signal handlers. They only set the atomic flag
    for sig in [SIGINT, SIGTERM] {
        flag::register(sig, Arc::clone(&shutdown))
            .with_context(|| format!("Failed to register signal handler for {sig}"))?;
    }

    serve(state, &shutdown)
}

/// Accept clients until `shutdown` is set.
pub fn serve(state: Arc<DaemonState>, shutdown: &AtomicBool) -> anyhow::Result<()> {
    let socket_path = &state.config.socket_path;

    // Clean up stale socket if it exists.
    if socket_path.exists() {
        fs::remove_file(socket_path).with_context(|| {
            format!(
                "Failed to remove existing socket at {}",
                socket_path.display()
            )
        })?;
    }

    if let Some(parent) = socket_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let listener = UnixListener::bind(socket_path)
        .with_context(|| format!("Failed to bind Unix socket at {}", socket_path.display()))?;
    // Non-blocking so the loop notices the shutdown flag without a client.
    listener
        .set_nonblocking(true)
        .context("Failed to make the listener non-blocking")?;

    // Ensure socket is cleaned up on any exit path.
    let _socket_guard = SocketGuard {
        path: socket_path.as_path(),
    };

    info!("rollup daemon listening on {}", socket_path.display());

    while !shutdown.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, _addr)) => {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    if let Err(err) = handle_client(stream, &state) {
                        error!("Error while handling client: {err:#}");
                    }
                });
            }
            Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL);
            }
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                error!("Accept error: {err}");
                thread::sleep(ACCEPT_POLL);
            }
        }
    }

    info!("Shutdown signal observed; RPC server stopped.");
    Ok(())
}

fn handle_client(mut stream: UnixStream, state: &DaemonState) -> anyhow::Result<()> {
    stream
        .set_nonblocking(false)
        .context("Failed to make client stream blocking")?;

    let request: DaemonRequest =
        read_message(&mut stream).context("Failed to read DaemonRequest")?;

    debug!("Received request: {:?}", request);

    let response = respond(state, request);

    write_message(&mut stream, &response).context("Failed to write DaemonResponse")
}

pub fn respond(state: &DaemonState, request: DaemonRequest) -> DaemonResponse {
    match request {
        DaemonRequest::Ping => DaemonResponse::Pong,
        DaemonRequest::Status => DaemonResponse::Status(state.status()),
        DaemonRequest::Report(req) => match execute_report(state, &req) {
            Ok(resp) => DaemonResponse::ReportResult(resp),
            Err(e) => DaemonResponse::Error(format!("Report failed: {e:#}")),
        },
    }
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
