pub mod codec;

use rollup_engine::{PipelineMetrics, Report, ReportConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    pub config: ReportConfig,
    /// Ask the daemon to time each stage.
    pub timed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportMetrics {
    /// Total end-to-end time in milliseconds
    pub total_ms: f64,
    /// Store scan and aggregation
    pub scan_ms: f64,
    pub window_ms: f64,
    pub sort_ms: f64,
    /// Directory groups built before windowing
    pub groups: u64,
}

impl From<&PipelineMetrics> for ReportMetrics {
    fn from(m: &PipelineMetrics) -> Self {
        let ms = |d: Option<std::time::Duration>| d.unwrap_or_default().as_secs_f64() * 1000.0;
        Self {
            total_ms: m.total().as_secs_f64() * 1000.0,
            scan_ms: ms(m.scan_time),
            window_ms: ms(m.window_time),
            sort_ms: ms(m.sort_time),
            groups: m.groups as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResponse {
    pub report: Report,
    pub metrics: Option<ReportMetrics>,
}

/// What the daemon has open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStatus {
    pub index_path: String,
    pub root: Option<String>,
    pub records: u64,
    pub owners: u64,
    /// Snapshot time, seconds since the Unix epoch
    pub created_secs: Option<i64>,
    pub reports_served: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum DaemonRequest {
    Report(ReportRequest),
    Ping,
    Status,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum DaemonResponse {
    ReportResult(ReportResponse),
    Pong,
    Status(StoreStatus),
    Error(String),
}
