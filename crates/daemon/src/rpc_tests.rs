use super::*;
use crate::config::DaemonConfig;
use rollup_engine::{Metric, MetricValue, ReportConfig};
use rollup_protocol::ReportRequest;
use rollup_store::{ObjectRecord, RecordStore, StoreBuilder, write_store_atomic};
use tempfile::TempDir;

fn state(dir: &TempDir) -> Arc<DaemonState> {
    let index_path = dir.path().join("records.rlp");
    let mut builder = StoreBuilder::new().with_root("/home");
    builder.add_batch(&[
        ObjectRecord::dir("/home/ann", "ann"),
        ObjectRecord::file("/home/ann/notes", 42, "ann"),
    ]);
    write_store_atomic(&index_path, &builder.finish()).unwrap();

    let store = RecordStore::open(&index_path).unwrap();
    let config = DaemonConfig {
        index_path,
        socket_path: dir.path().join("run").join("daemon.sock"),
    };
    Arc::new(DaemonState::with_store(config, store))
}

fn call(path: &Path, request: &DaemonRequest) -> DaemonResponse {
    let mut stream = UnixStream::connect(path).unwrap();
    write_message(&mut stream, request).unwrap();
    read_message(&mut stream).unwrap()
}

fn wait_for_socket(path: &Path) {
    for _ in 0..200 {
        if path.exists() {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("daemon never bound {}", path.display());
}

#[test]
fn respond_answers_ping_and_status() {
    let dir = TempDir::new().unwrap();
    let state = state(&dir);

    assert!(matches!(
        respond(&state, DaemonRequest::Ping),
        DaemonResponse::Pong
    ));
    match respond(&state, DaemonRequest::Status) {
        DaemonResponse::Status(status) => {
            assert_eq!(status.records, 2);
            assert_eq!(status.root.as_deref(), Some("/home"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn respond_turns_config_errors_into_error_responses() {
    let dir = TempDir::new().unwrap();
    let state = state(&dir);
    let req = ReportRequest {
        config: ReportConfig {
            metrics: vec![],
            ..ReportConfig::default()
        },
        timed: false,
    };

    match respond(&state, DaemonRequest::Report(req)) {
        DaemonResponse::Error(msg) => assert!(msg.contains("metric"), "{msg}"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn serves_reports_over_the_socket_until_shutdown() {
    let dir = TempDir::new().unwrap();
    let state = state(&dir);
    let socket = state.config.socket_path.clone();
    let shutdown = Arc::new(AtomicBool::new(false));

    let server = {
        let state = Arc::clone(&state);
        let shutdown = Arc::clone(&shutdown);
        thread::spawn(move || serve(state, &shutdown))
    };
    wait_for_socket(&socket);

    assert!(matches!(
        call(&socket, &DaemonRequest::Ping),
        DaemonResponse::Pong
    ));

    let req = ReportRequest {
        config: ReportConfig {
            workers: 1,
            ..ReportConfig::default()
        },
        timed: false,
    };
    match call(&socket, &DaemonRequest::Report(req)) {
        DaemonResponse::ReportResult(resp) => {
            assert_eq!(
                resp.report.value("ann", Metric::Size),
                Some(MetricValue::Value(42))
            );
        }
        other => panic!("unexpected {other:?}"),
    }

    shutdown.store(true, Ordering::Relaxed);
    server.join().unwrap().unwrap();
    assert!(!socket.exists(), "socket should be removed on shutdown");
}
