use std::{path::PathBuf, thread};

pub const PROGRAM_NAME: &str = "rollup";
pub const PROGRAM_LOG_LEVEL: &str = "ROLLUP_LOG_LEVEL";
/// Overrides the default index location for every binary in the workspace.
pub const PROGRAM_INDEX_PATH: &str = "ROLLUP_INDEX";
pub const INDEX_FILE_NAME: &str = "records.rlp";
pub const SOCKET_FILE_NAME: &str = "daemon.sock";

/// Upper bound for the default worker count.
/// Scans are memory-bound well before they are CPU-bound.
pub const DEFAULT_WORKER_CAP: usize = 4;

pub fn rollup_dir() -> PathBuf {
    dirs::cache_dir()
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".cache")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PROGRAM_NAME)
}

/// Default index file path. `ROLLUP_INDEX` wins when set and non-empty.
pub fn default_index_path() -> PathBuf {
    match std::env::var_os(PROGRAM_INDEX_PATH) {
        Some(p) if !p.is_empty() => PathBuf::from(p),
        _ => rollup_dir().join(INDEX_FILE_NAME),
    }
}

/// Unix socket the daemon listens on.
pub fn default_socket_path() -> PathBuf {
    rollup_dir().join(SOCKET_FILE_NAME)
}

/// Worker count used when the caller gives no hint.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, DEFAULT_WORKER_CAP)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
