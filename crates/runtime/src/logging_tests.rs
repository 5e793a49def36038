use super::*;
use log::{Level, Metadata, Record};
use serial_test::serial;

#[test]
fn parse_level_cases() {
    let cases: &[(Option<&str>, Level)] = &[
        (None, Level::Warn),
        (Some("debug"), Level::Debug),
        (Some("DEBUG"), Level::Debug),
        (Some(" info "), Level::Info),
        (Some("warn"), Level::Warn),
        (Some("error"), Level::Error),
        (Some("trace"), Level::Trace),
        (Some("garbage"), Level::Warn),
        (Some("off"), Level::Warn),
        (Some(""), Level::Warn),
    ];

    for (value, expected) in cases {
        assert_eq!(parse_level(*value), *expected, "input {:?}", value);
    }
}

#[test]
#[serial]
fn get_level_from_env_reads_program_variable() {
    unsafe { std::env::set_var(PROGRAM_LOG_LEVEL, "debug") };
    assert_eq!(get_level_from_env(), Level::Debug);

    unsafe { std::env::remove_var(PROGRAM_LOG_LEVEL) };
    assert_eq!(get_level_from_env(), Level::Warn);
}

#[test]
fn enabled_respects_level_threshold() {
    let levels = [
        Level::Error,
        Level::Warn,
        Level::Info,
        Level::Debug,
        Level::Trace,
    ];

    for logger_level in levels {
        let logger = Logger {
            level: logger_level,
        };

        for record_level in levels {
            let meta = Metadata::builder()
                .level(record_level)
                .target("rollup_engine")
                .build();

            assert_eq!(
                logger.enabled(&meta),
                record_level <= logger_level,
                "logger level {:?}, record level {:?}",
                logger_level,
                record_level
            );
        }
    }
}

#[test]
fn format_line_shortens_workspace_targets() {
    let logger = Logger { level: Level::Info };
    let args = format_args!("built {} groups", 3);
    let record = Record::builder()
        .level(Level::Info)
        .target("rollup_engine::aggregate")
        .args(args)
        .build();

    let line = logger.format_line(&record);
    assert!(line.ends_with("INFO  [engine::aggregate] built 3 groups"), "{line}");
}

#[test]
fn short_target_leaves_foreign_targets_alone() {
    assert_eq!(short_target("rollup_store::reader"), "store::reader");
    assert_eq!(short_target("memmap2"), "memmap2");
}
