use thiserror::Error;

/// A report configuration that cannot be run.
///
/// Always raised before the record store is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown metric `{0}` (expected size or inodes)")]
    UnknownMetric(String),

    #[error("unknown sort key `{0}` (expected depth, size or inodes)")]
    UnknownSortKey(String),

    #[error("unknown timestamp kind `{0}` (expected atime, mtime or ctime)")]
    UnknownTimestampKind(String),

    #[error("cannot parse `{0}` as a date (use YYYY-MM-DD, \"YYYY-MM-DD HH:MM:SS\" or RFC 3339)")]
    MalformedDate(String),

    #[error("at least one metric is required")]
    NoMetrics,

    #[error("metric `{0}` requested more than once")]
    DuplicateMetric(String),

    #[error("worker count must be at least 1")]
    ZeroWorkers,
}
