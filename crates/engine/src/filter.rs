use rollup_store::{RecordPredicate, RecordView};

use crate::{config::TimeFilter, decompose::TopDirectory};

/// What a scoped record does to the rows it reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Adds to every metric of its rows.
    Contributes,
    /// Filtered out by time: its rows exist but it adds nothing to them.
    StructureOnly,
}

impl TimeFilter {
    /// Whether `record`'s timestamp lies in `[newer_than, older_than)`.
    pub fn admits(&self, record: &RecordView<'_>) -> bool {
        let ts = record.timestamp(self.kind);
        self.newer_than.is_none_or(|t| ts >= t.timestamp())
            && self.older_than.is_none_or(|t| ts < t.timestamp())
    }
}

/// Scope check pushed down into the store scan.
#[derive(Debug, Clone, Copy)]
pub struct ScopePredicate<'a> {
    top: &'a TopDirectory,
}

impl RecordPredicate for ScopePredicate<'_> {
    #[inline]
    fn matches(&self, record: &RecordView<'_>) -> bool {
        self.top.contains(record.path)
    }
}

/// Scope and time predicates combined.
#[derive(Debug, Clone)]
pub struct FilterStage<'a> {
    top: &'a TopDirectory,
    time: &'a TimeFilter,
}

impl<'a> FilterStage<'a> {
    pub fn new(top: &'a TopDirectory, time: &'a TimeFilter) -> Self {
        Self { top, time }
    }

    pub fn top(&self) -> &'a TopDirectory {
        self.top
    }

    pub fn scope(&self) -> ScopePredicate<'a> {
        ScopePredicate { top: self.top }
    }

    /// `None` for records outside the top directory.
    #[inline]
    pub fn classify(&self, record: &RecordView<'_>) -> Option<Disposition> {
        if !self.top.contains(record.path) {
            return None;
        }
        Some(if self.time.admits(record) {
            Disposition::Contributes
        } else {
            Disposition::StructureOnly
        })
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
