use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Metric;

/// One aggregated metric.
///
/// `NoData` means no record contributed, which is not the same as a sum of
/// zero. The derived ordering puts `NoData` below every value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetricValue {
    NoData,
    Value(u64),
}

impl MetricValue {
    #[inline]
    pub fn value(self) -> Option<u64> {
        match self {
            MetricValue::NoData => None,
            MetricValue::Value(v) => Some(v),
        }
    }

    #[inline]
    pub fn is_no_data(self) -> bool {
        matches!(self, MetricValue::NoData)
    }
}

impl From<Option<u64>> for MetricValue {
    fn from(value: Option<u64>) -> Self {
        value.map_or(MetricValue::NoData, MetricValue::Value)
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::NoData => f.write_str("-"),
            MetricValue::Value(v) => write!(f, "{v}"),
        }
    }
}

/// Totals of one owner under one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRow {
    pub owner: String,
    pub values: Vec<MetricValue>,
}

/// Totals of one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirRow {
    /// Path relative to the top directory, `""` for the top directory.
    pub prefix: String,
    pub depth: usize,
    pub values: Vec<MetricValue>,
    /// Empty unless the report was built per owner.
    pub owners: Vec<OwnerRow>,
}

impl DirRow {
    #[inline]
    pub fn value(&self, slot: usize) -> MetricValue {
        self.values.get(slot).copied().unwrap_or(MetricValue::NoData)
    }
}

/// A finished report. `values` of every row line up with `metrics`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub top_directory: String,
    pub metrics: Vec<Metric>,
    pub rows: Vec<DirRow>,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, prefix: &str) -> Option<&DirRow> {
        self.rows.iter().find(|r| r.prefix == prefix)
    }

    /// Value of `metric` on the row at `prefix`.
    pub fn value(&self, prefix: &str, metric: Metric) -> Option<MetricValue> {
        let slot = self.metrics.iter().position(|m| *m == metric)?;
        Some(self.row(prefix)?.value(slot))
    }
}
