use std::{ops::Range, thread};

use chrono::{DateTime, Utc};
use crossbeam::channel;
use log::debug;

use crate::record::{RecordId, RecordView};

/// Smallest id range worth handing to its own worker thread.
pub(crate) const MIN_RECORDS_PER_WORKER: usize = 1024;

/// A filter evaluated inside the scan, before a record reaches the caller.
pub trait RecordPredicate: Sync {
    fn matches(&self, record: &RecordView<'_>) -> bool;
}

impl<F> RecordPredicate for F
where
    F: Fn(&RecordView<'_>) -> bool + Sync,
{
    #[inline]
    fn matches(&self, record: &RecordView<'_>) -> bool {
        self(record)
    }
}

/// Predicate that lets every record through.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl RecordPredicate for AcceptAll {
    #[inline]
    fn matches(&self, _record: &RecordView<'_>) -> bool {
        true
    }
}

/// Read access to a set of object records.
///
/// Implementors only provide random access by id; scanning with predicate
/// pushdown and the parallel fold are built on top of that.
pub trait RecordSource: Sync {
    fn record_count(&self) -> usize;

    /// Record `id`, or `None` when `id` is out of range.
    fn get(&self, id: RecordId) -> Option<RecordView<'_>>;

    /// Directory the snapshot was taken from, if the builder recorded one.
    fn root_path(&self) -> Option<&str> {
        None
    }

    /// When the snapshot was taken.
    fn created_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Iterate, in id order, over the records accepted by `predicate`.
    fn scan<'s, P>(&'s self, predicate: &'s P) -> Scan<'s, Self, P>
    where
        Self: Sized,
        P: RecordPredicate,
    {
        Scan {
            source: self,
            predicate,
            ids: 0..self.record_count(),
        }
    }

    /// Fold every record accepted by `predicate` into an accumulator.
    ///
    /// The id range is split into at most `workers` contiguous chunks, each
    /// folded on its own scoped thread starting from `init()`. Partials are
    /// merged in chunk order, so for an associative `merge` the result is the
    /// same as a sequential fold whatever the worker count. Records borrow
    /// from the source, so accumulators may keep `&'s str` keys.
    fn fold<'s, P, A, I, F, M>(
        &'s self,
        predicate: &'s P,
        workers: usize,
        init: I,
        fold: F,
        merge: M,
    ) -> A
    where
        Self: Sized,
        P: RecordPredicate,
        A: Send,
        I: Fn() -> A + Sync,
        F: Fn(&mut A, RecordView<'s>) + Sync,
        M: FnMut(A, A) -> A,
    {
        let chunks = chunk_ranges(self.record_count(), workers, MIN_RECORDS_PER_WORKER);

        if chunks.len() <= 1 {
            let mut acc = init();
            for record in self.scan(predicate) {
                fold(&mut acc, record);
            }
            return acc;
        }

        debug!(
            "folding {} records over {} workers",
            self.record_count(),
            chunks.len()
        );

        let (tx, rx) = channel::bounded::<(usize, A)>(chunks.len());

        thread::scope(|s| {
            for (chunk_idx, ids) in chunks.iter().cloned().enumerate() {
                let tx = tx.clone();
                let init = &init;
                let fold = &fold;

                s.spawn(move || {
                    let mut acc = init();
                    let chunk = Scan {
                        source: self,
                        predicate,
                        ids,
                    };
                    for record in chunk {
                        fold(&mut acc, record);
                    }
                    // The receiver outlives the scope, so this cannot fail.
                    let _ = tx.send((chunk_idx, acc));
                });
            }
        });
        drop(tx);

        let mut partials: Vec<Option<A>> = (0..chunks.len()).map(|_| None).collect();
        for (chunk_idx, acc) in rx.iter() {
            partials[chunk_idx] = Some(acc);
        }

        partials.into_iter().flatten().reduce(merge).unwrap_or_else(init)
    }
}

/// Iterator returned by [RecordSource::scan].
pub struct Scan<'s, S, P> {
    source: &'s S,
    predicate: &'s P,
    ids: Range<RecordId>,
}

impl<'s, S, P> Iterator for Scan<'s, S, P>
where
    S: RecordSource,
    P: RecordPredicate,
{
    type Item = RecordView<'s>;

    fn next(&mut self) -> Option<Self::Item> {
        for id in self.ids.by_ref() {
            if let Some(record) = self.source.get(id)
                && self.predicate.matches(&record)
            {
                return Some(record);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.ids.len()))
    }
}

/// Split `0..total` into at most `workers` contiguous, near-equal ranges of
/// at least `min_chunk` ids each (the last one may be shorter).
pub(crate) fn chunk_ranges(total: usize, workers: usize, min_chunk: usize) -> Vec<Range<usize>> {
    if total == 0 {
        return Vec::new();
    }

    let by_size = total.div_ceil(min_chunk.max(1));
    let workers = workers.clamp(1, by_size.max(1));
    let chunk = total.div_ceil(workers);

    (0..total)
        .step_by(chunk)
        .map(|start| start..(start + chunk).min(total))
        .collect()
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
