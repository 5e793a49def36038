use super::*;
use crate::config::DaemonConfig;
use rollup_engine::{Metric, MetricValue, ReportConfig};
use rollup_store::{ObjectRecord, RecordStore, StoreBuilder, write_store_atomic};
use tempfile::TempDir;

fn state(dir: &TempDir) -> DaemonState {
    let index_path = dir.path().join("records.rlp");
    let mut builder = StoreBuilder::new().with_root("/srv");
    builder.add_batch(&[
        ObjectRecord::dir("/srv", "root"),
        ObjectRecord::file("/srv/a/x", 300, "alice"),
        ObjectRecord::file("/srv/b/y", 200, "bob"),
    ]);
    write_store_atomic(&index_path, &builder.finish()).unwrap();

    let store = RecordStore::open(&index_path).unwrap();
    let config = DaemonConfig {
        index_path,
        socket_path: dir.path().join("daemon.sock"),
    };
    DaemonState::with_store(config, store)
}

fn request(timed: bool) -> ReportRequest {
    ReportRequest {
        config: ReportConfig {
            workers: 1,
            ..ReportConfig::default()
        },
        timed,
    }
}

#[test]
fn untimed_report_has_no_metrics() {
    let dir = TempDir::new().unwrap();
    let state = state(&dir);

    let resp = execute_report(&state, &request(false)).unwrap();
    assert!(resp.metrics.is_none());
    assert_eq!(
        resp.report.value("", Metric::Size),
        Some(MetricValue::Value(500))
    );
    assert_eq!(resp.report.rows.len(), 3);
}

#[test]
fn timed_report_carries_stage_timings() {
    let dir = TempDir::new().unwrap();
    let state = state(&dir);

    let resp = execute_report(&state, &request(true)).unwrap();
    let metrics = resp.metrics.unwrap();
    assert_eq!(metrics.groups, 3);
    assert!(metrics.total_ms >= metrics.scan_ms);
}

#[test]
fn reports_are_counted() {
    let dir = TempDir::new().unwrap();
    let state = state(&dir);

    for _ in 0..3 {
        execute_report(&state, &request(false)).unwrap();
    }
    let status = state.status();
    assert_eq!(status.reports_served, 3);
    assert_eq!(status.records, 3);
    assert_eq!(status.owners, 3);
    assert_eq!(status.root.as_deref(), Some("/srv"));
}

#[test]
fn bad_config_is_an_error_not_a_count() {
    let dir = TempDir::new().unwrap();
    let state = state(&dir);

    let mut req = request(false);
    req.config.workers = 0;
    assert!(execute_report(&state, &req).is_err());
    assert_eq!(state.status().reports_served, 0);
}
