use anyhow::Result;
use log::debug;
use rollup_engine::{run_report, run_report_timed};
use rollup_protocol::{ReportMetrics, ReportRequest, ReportResponse};

use crate::state::DaemonState;

/// Run one report against the daemon's store. Reports never overlap.
pub fn execute_report(state: &DaemonState, req: &ReportRequest) -> Result<ReportResponse> {
    let (_guard, store) = state.lock_store();

    let response = if req.timed {
        let (report, metrics) = run_report_timed(store, &req.config)?;
        debug!("report took {:?}", metrics.total());
        ReportResponse {
            report,
            metrics: Some(ReportMetrics::from(&metrics)),
        }
    } else {
        ReportResponse {
            report: run_report(store, &req.config)?,
            metrics: None,
        }
    };

    state.note_report();
    Ok(response)
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
