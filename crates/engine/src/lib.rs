mod aggregate;
mod config;
mod decompose;
mod error;
mod filter;
mod format;
mod pipeline;
mod report;
mod sort;
mod window;

pub use aggregate::{Aggregator, Groups};
pub use config::{
    Aggregation, Metric, MetricPlan, ReportConfig, SortKey, TimeFilter, parse_metric_list,
    parse_sort_keys, parse_timestamp, parse_timestamp_kind,
};
pub use decompose::{Prefixes, TopDirectory, decompose, record_depth};
pub use error::ConfigError;
pub use filter::{Disposition, FilterStage, ScopePredicate};
pub use format::{
    FormatOptions, NumberStyle, ReportLayout, UnitBase, format_magnitude, format_value,
    render_report, scale_magnitude,
};
pub use pipeline::{
    AggregatedState, InitialState, MetricsTimer, NoopTimer, PipelineMetrics, ReportPipeline,
    SortedState, Stage, Timer, WindowedState, run_report, run_report_timed,
};
pub use report::{DirRow, MetricValue, OwnerRow, Report};
pub use sort::{RowOrder, sort_rows};
pub use window::DepthWindow;

pub use rollup_store::TimestampKind;
