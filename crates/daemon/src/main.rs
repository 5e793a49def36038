use std::sync::Arc;

mod config;
mod report;
mod rpc;
mod state;

use config::DaemonConfig;
use log::info;
use rollup_runtime::logging;
use state::DaemonState;

fn main() -> anyhow::Result<()> {
    logging::init().ok();

    let config = DaemonConfig::from_env();

    info!(
        "Starting rollup daemon: index={}, socket={}",
        config.index_path.display(),
        config.socket_path.display(),
    );

    let state = Arc::new(DaemonState::new(config)?);
    rpc::run_rpc_server(state)
}
