use std::cmp::Ordering;

use smallvec::SmallVec;

use crate::{
    config::{MetricPlan, SortKey},
    report::{DirRow, MetricValue},
};

/// Sort keys resolved to value slots of a [MetricPlan].
#[derive(Debug, Clone)]
pub struct RowOrder {
    slots: SmallVec<[usize; 4]>,
}

impl RowOrder {
    /// Keys naming a metric the plan does not track are dropped. `depth`
    /// needs no slot since rows are always grouped by depth first.
    pub fn new(keys: &[SortKey], plan: &MetricPlan) -> Self {
        let slots = keys
            .iter()
            .filter_map(|key| match key {
                SortKey::Depth => None,
                SortKey::Metric(metric) => plan.slot(*metric),
            })
            .collect();
        Self { slots }
    }

    /// Descending on every slot in turn. `NoData` sorts last.
    #[inline]
    fn compare_values(&self, a: &[MetricValue], b: &[MetricValue]) -> Ordering {
        let get = |values: &[MetricValue], slot: usize| {
            values.get(slot).copied().unwrap_or(MetricValue::NoData)
        };
        self.slots
            .iter()
            .map(|&slot| get(b, slot).cmp(&get(a, slot)))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Order rows by depth, then by the keys, then by prefix. Owner sub-rows
    /// use the same keys and fall back to the owner name.
    pub fn sort(&self, rows: &mut [DirRow]) {
        rows.sort_unstable_by(|a, b| {
            a.depth
                .cmp(&b.depth)
                .then_with(|| self.compare_values(&a.values, &b.values))
                .then_with(|| a.prefix.cmp(&b.prefix))
        });

        for row in rows.iter_mut() {
            row.owners.sort_unstable_by(|a, b| {
                self.compare_values(&a.values, &b.values)
                    .then_with(|| a.owner.cmp(&b.owner))
            });
        }
    }
}

pub fn sort_rows(rows: &mut [DirRow], keys: &[SortKey], plan: &MetricPlan) {
    RowOrder::new(keys, plan).sort(rows);
}

#[cfg(test)]
#[path = "sort_tests.rs"]
mod tests;
