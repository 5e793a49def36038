mod config;
pub mod logging;

pub use config::{
    DEFAULT_WORKER_CAP, INDEX_FILE_NAME, PROGRAM_INDEX_PATH, PROGRAM_LOG_LEVEL, PROGRAM_NAME,
    SOCKET_FILE_NAME, default_index_path, default_socket_path, default_workers, rollup_dir,
};

pub use logging::init;
