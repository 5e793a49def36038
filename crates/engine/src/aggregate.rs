use hashbrown::{HashMap, hash_map::Entry};
use log::debug;
use rollup_store::{RecordSource, RecordView};
use smallvec::{SmallVec, smallvec};

use crate::{
    config::MetricPlan,
    decompose::decompose,
    filter::{Disposition, FilterStage},
    report::{DirRow, MetricValue, OwnerRow},
};

/// Running totals for one group, one slot per planned metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Accumulator {
    contributors: u64,
    values: SmallVec<[u64; 4]>,
}

impl Accumulator {
    fn new(slots: usize) -> Self {
        Self {
            contributors: 0,
            values: smallvec![0; slots],
        }
    }

    #[inline]
    fn add(&mut self, record: &RecordView<'_>, plan: &MetricPlan) {
        self.contributors += 1;
        for (value, aggregation) in self.values.iter_mut().zip(plan.aggregations()) {
            *value += aggregation.contribution(record);
        }
    }

    fn merge(&mut self, other: &Accumulator) {
        self.contributors += other.contributors;
        for (value, o) in self.values.iter_mut().zip(&other.values) {
            *value += o;
        }
    }

    fn finish(&self) -> Vec<MetricValue> {
        if self.contributors == 0 {
            return vec![MetricValue::NoData; self.values.len()];
        }
        self.values.iter().map(|v| MetricValue::Value(*v)).collect()
    }
}

#[derive(Debug)]
struct DirGroup<'s> {
    depth: usize,
    total: Accumulator,
    owners: HashMap<&'s str, Accumulator>,
}

/// Partial aggregation state for one slice of the store.
///
/// Keys borrow from the store; nothing is copied until [Groups::into_rows].
#[derive(Debug, Default)]
pub struct Groups<'s> {
    map: HashMap<&'s str, DirGroup<'s>>,
}

impl<'s> Groups<'s> {
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Fold `other` into `self`. Totals are sums, so order does not matter.
    pub fn merge(mut self, other: Groups<'s>) -> Self {
        for (prefix, theirs) in other.map {
            match self.map.entry(prefix) {
                Entry::Vacant(slot) => {
                    slot.insert(theirs);
                }
                Entry::Occupied(mut slot) => {
                    let ours = slot.get_mut();
                    ours.total.merge(&theirs.total);
                    for (owner, acc) in theirs.owners {
                        match ours.owners.entry(owner) {
                            Entry::Vacant(s) => {
                                s.insert(acc);
                            }
                            Entry::Occupied(mut s) => s.get_mut().merge(&acc),
                        }
                    }
                }
            }
        }
        self
    }

    /// Finalize every group into an owned, unsorted row.
    pub fn into_rows(self) -> Vec<DirRow> {
        self.map
            .into_iter()
            .map(|(prefix, group)| DirRow {
                prefix: prefix.to_owned(),
                depth: group.depth,
                values: group.total.finish(),
                owners: group
                    .owners
                    .into_iter()
                    .map(|(owner, acc)| OwnerRow {
                        owner: owner.to_owned(),
                        values: acc.finish(),
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Rolls scoped records up into every directory prefix above them.
#[derive(Debug, Clone)]
pub struct Aggregator<'c> {
    plan: &'c MetricPlan,
    filter: &'c FilterStage<'c>,
    per_owner: bool,
    depth_cap: Option<usize>,
}

impl<'c> Aggregator<'c> {
    pub fn new(plan: &'c MetricPlan, filter: &'c FilterStage<'c>) -> Self {
        Self {
            plan,
            filter,
            per_owner: false,
            depth_cap: None,
        }
    }

    /// Also keep one group per owner under every directory.
    pub fn per_owner(mut self, per_owner: bool) -> Self {
        self.per_owner = per_owner;
        self
    }

    /// Skip prefixes deeper than `max_depth`. Shallower totals still count
    /// every record below them.
    pub fn depth_cap(mut self, max_depth: Option<usize>) -> Self {
        self.depth_cap = max_depth;
        self
    }

    /// Add one record to `groups`.
    ///
    /// Records filtered out by time still create their directory and owner
    /// groups so those rows can show "no data".
    pub fn ingest<'s>(&self, groups: &mut Groups<'s>, record: RecordView<'s>) {
        let Some(disposition) = self.filter.classify(&record) else {
            return;
        };
        let Some(prefixes) = decompose(
            record.path,
            record.is_dir(),
            self.filter.top(),
            self.depth_cap,
        ) else {
            return;
        };

        let contributes = disposition == Disposition::Contributes;
        let slots = self.plan.len();

        for (prefix, depth) in prefixes {
            let group = groups.map.entry(prefix).or_insert_with(|| DirGroup {
                depth,
                total: Accumulator::new(slots),
                owners: HashMap::new(),
            });

            if contributes {
                group.total.add(&record, self.plan);
            }

            if self.per_owner {
                let acc = group
                    .owners
                    .entry(record.owner)
                    .or_insert_with(|| Accumulator::new(slots));
                if contributes {
                    acc.add(&record, self.plan);
                }
            }
        }
    }

    /// Aggregate every scoped record of `source` over `workers` threads.
    pub fn aggregate<S: RecordSource>(&self, source: &S, workers: usize) -> Vec<DirRow> {
        let scope = self.filter.scope();

        let groups = source.fold(
            &scope,
            workers,
            Groups::default,
            |groups, record| self.ingest(groups, record),
            Groups::merge,
        );

        debug!(
            "aggregated {} directory groups from {} records",
            groups.len(),
            source.record_count()
        );

        groups.into_rows()
    }
}

#[cfg(test)]
#[path = "aggregate_tests.rs"]
mod tests;
