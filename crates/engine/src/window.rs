use log::debug;

use crate::report::DirRow;

/// Inclusive `[min, max]` range of depths kept in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthWindow {
    pub min: usize,
    pub max: usize,
}

impl Default for DepthWindow {
    fn default() -> Self {
        Self { min: 0, max: 1 }
    }
}

impl DepthWindow {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// `min > max` selects nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    #[inline]
    pub fn contains(&self, depth: usize) -> bool {
        (self.min..=self.max).contains(&depth)
    }

    pub fn apply(&self, mut rows: Vec<DirRow>) -> Vec<DirRow> {
        let before = rows.len();
        rows.retain(|row| self.contains(row.depth));
        debug!(
            "depth window {}..={} kept {} of {} rows",
            self.min,
            self.max,
            rows.len(),
            before
        );
        rows
    }
}

#[cfg(test)]
#[path = "window_tests.rs"]
mod tests;
