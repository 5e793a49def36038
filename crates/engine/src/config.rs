use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rollup_store::{RecordView, TimestampKind};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::ConfigError;

/// A quantity aggregated per directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Bytes held by files
    Size,
    /// Number of objects, files and directories alike
    Inodes,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Size, Metric::Inodes];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Size => "size",
            Metric::Inodes => "inodes",
        }
    }

    pub fn aggregation(self) -> Aggregation {
        match self {
            Metric::Size => Aggregation::Sum,
            Metric::Inodes => Aggregation::Count,
        }
    }

    /// Suffix appended after the unit in human-readable output.
    pub fn suffix(self) -> &'static str {
        match self {
            Metric::Size => "B",
            Metric::Inodes => "",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "size" => Ok(Metric::Size),
            "inodes" => Ok(Metric::Inodes),
            _ => Err(ConfigError::UnknownMetric(s.trim().to_owned())),
        }
    }
}

/// How one record feeds a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregation {
    /// Sum of file sizes. Directories add nothing.
    Sum,
    /// One per record.
    Count,
}

impl Aggregation {
    #[inline]
    pub fn contribution(self, record: &RecordView<'_>) -> u64 {
        match self {
            Aggregation::Sum if record.is_dir() => 0,
            Aggregation::Sum => record.size,
            Aggregation::Count => 1,
        }
    }
}

/// One key of the within-depth ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortKey {
    /// Rows are always grouped by depth, so inside a group this is a no-op.
    Depth,
    /// Descending by metric value, rows without data last.
    Metric(Metric),
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Depth => f.write_str("depth"),
            SortKey::Metric(m) => m.fmt(f),
        }
    }
}

impl FromStr for SortKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        if key.eq_ignore_ascii_case("depth") {
            return Ok(SortKey::Depth);
        }
        key.parse::<Metric>()
            .map(SortKey::Metric)
            .map_err(|_| ConfigError::UnknownSortKey(key.to_owned()))
    }
}

/// Half-open `[newer_than, older_than)` window over one timestamp column.
/// A missing bound is unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFilter {
    pub kind: TimestampKind,
    pub newer_than: Option<DateTime<Utc>>,
    pub older_than: Option<DateTime<Utc>>,
}

impl TimeFilter {
    pub fn is_unbounded(&self) -> bool {
        self.newer_than.is_none() && self.older_than.is_none()
    }
}

/// Everything a single report needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Depth-0 directory. `None` uses the root the store was built from.
    pub top_directory: Option<String>,
    pub min_depth: usize,
    pub max_depth: usize,
    /// Displayed metrics, in column order.
    pub metrics: Vec<Metric>,
    pub per_owner: bool,
    pub time: TimeFilter,
    pub sort_keys: Vec<SortKey>,
    pub workers: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_directory: None,
            min_depth: 0,
            max_depth: 1,
            metrics: Metric::ALL.to_vec(),
            per_owner: false,
            time: TimeFilter::default(),
            sort_keys: vec![SortKey::Depth, SortKey::Metric(Metric::Size)],
            workers: rollup_runtime::default_workers(),
        }
    }
}

impl ReportConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metrics.is_empty() {
            return Err(ConfigError::NoMetrics);
        }
        for (i, metric) in self.metrics.iter().enumerate() {
            if self.metrics[..i].contains(metric) {
                return Err(ConfigError::DuplicateMetric(metric.name().to_owned()));
            }
        }
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(())
    }

    pub fn plan(&self) -> MetricPlan {
        MetricPlan::new(&self.metrics, &self.sort_keys)
    }
}

/// Metrics resolved to their aggregations, once per report.
///
/// Slots hold the displayed metrics first, in display order, followed by any
/// metric only a sort key mentions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricPlan {
    slots: SmallVec<[(Metric, Aggregation); 4]>,
    displayed: usize,
}

impl MetricPlan {
    pub fn new(metrics: &[Metric], sort_keys: &[SortKey]) -> Self {
        let mut plan = Self {
            slots: SmallVec::new(),
            displayed: 0,
        };

        for &metric in metrics {
            plan.track(metric);
        }
        plan.displayed = plan.slots.len();

        for key in sort_keys {
            if let SortKey::Metric(metric) = key {
                plan.track(*metric);
            }
        }

        plan
    }

    fn track(&mut self, metric: Metric) {
        if self.slot(metric).is_none() {
            self.slots.push((metric, metric.aggregation()));
        }
    }

    /// Number of tracked metrics, displayed or not.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn slot(&self, metric: Metric) -> Option<usize> {
        self.slots.iter().position(|(m, _)| *m == metric)
    }

    #[inline]
    pub fn aggregations(&self) -> impl Iterator<Item = Aggregation> + '_ {
        self.slots.iter().map(|(_, agg)| *agg)
    }

    pub fn displayed_count(&self) -> usize {
        self.displayed
    }

    pub fn displayed(&self) -> Vec<Metric> {
        self.slots[..self.displayed].iter().map(|(m, _)| *m).collect()
    }
}

/// Parse a comma-separated metric list such as `size,inodes`.
pub fn parse_metric_list(s: &str) -> Result<Vec<Metric>, ConfigError> {
    let mut metrics = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let metric: Metric = part.parse()?;
        if metrics.contains(&metric) {
            return Err(ConfigError::DuplicateMetric(metric.name().to_owned()));
        }
        metrics.push(metric);
    }
    if metrics.is_empty() {
        return Err(ConfigError::NoMetrics);
    }
    Ok(metrics)
}

/// Parse a comma-separated sort key list such as `depth,size`.
pub fn parse_sort_keys(s: &str) -> Result<Vec<SortKey>, ConfigError> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::parse)
        .collect()
}

pub fn parse_timestamp_kind(s: &str) -> Result<TimestampKind, ConfigError> {
    s.parse()
        .map_err(|_| ConfigError::UnknownTimestampKind(s.trim().to_owned()))
}

/// Parse a date bound. Accepts `YYYY-MM-DD` (UTC midnight),
/// `YYYY-MM-DD HH:MM:SS` (UTC) and RFC 3339.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, ConfigError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        && let Some(midnight) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(midnight.and_utc());
    }

    Err(ConfigError::MalformedDate(s.to_owned()))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
