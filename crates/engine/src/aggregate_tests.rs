use super::*;
use crate::{
    config::{Metric, SortKey, TimeFilter, parse_timestamp},
    decompose::TopDirectory,
};
use rollup_store::{MemoryStore, ObjectRecord, TimestampKind};

const Y2022: i64 = 1_650_000_000;
const Y2024: i64 = 1_710_000_000;

fn tree() -> MemoryStore {
    MemoryStore::new(vec![
        ObjectRecord::dir("/data", "root"),
        ObjectRecord::dir("/data/a", "alice"),
        ObjectRecord::file("/data/a/one", 100, "alice").with_times(Y2022, Y2022, Y2022),
        ObjectRecord::file("/data/a/two", 50, "bob").with_times(Y2024, Y2024, Y2024),
        ObjectRecord::dir("/data/a/deep", "alice"),
        ObjectRecord::file("/data/a/deep/three", 7, "alice").with_times(Y2022, Y2022, Y2022),
        ObjectRecord::dir("/data/b", "bob"),
        ObjectRecord::file("/data/b/empty", 0, "bob").with_times(Y2022, Y2022, Y2022),
        ObjectRecord::file("/data/top.txt", 1000, "root").with_times(Y2024, Y2024, Y2024),
        ObjectRecord::file("/other/ignored", 999_999, "eve"),
    ])
}

fn plan() -> MetricPlan {
    MetricPlan::new(&Metric::ALL, &[SortKey::Depth])
}

fn run(
    store: &MemoryStore,
    top: &TopDirectory,
    time: &TimeFilter,
    per_owner: bool,
    cap: Option<usize>,
    workers: usize,
) -> Vec<DirRow> {
    let plan = plan();
    let filter = FilterStage::new(top, time);
    let mut rows = Aggregator::new(&plan, &filter)
        .per_owner(per_owner)
        .depth_cap(cap)
        .aggregate(store, workers);
    rows.sort_by(|a, b| a.prefix.cmp(&b.prefix));
    for row in &mut rows {
        row.owners.sort_by(|a, b| a.owner.cmp(&b.owner));
    }
    rows
}

fn find<'r>(rows: &'r [DirRow], prefix: &str) -> &'r DirRow {
    rows.iter()
        .find(|r| r.prefix == prefix)
        .unwrap_or_else(|| panic!("no row for {prefix:?}"))
}

fn v(n: u64) -> MetricValue {
    MetricValue::Value(n)
}

#[test]
fn totals_roll_up_every_level() {
    let rows = run(
        &tree(),
        &TopDirectory::new("/data"),
        &TimeFilter::default(),
        false,
        None,
        1,
    );

    let prefixes: Vec<&str> = rows.iter().map(|r| r.prefix.as_str()).collect();
    assert_eq!(prefixes, vec!["", "a", "a/deep", "b"]);

    // size, inodes
    assert_eq!(find(&rows, "").values, vec![v(1157), v(9)]);
    assert_eq!(find(&rows, "a").values, vec![v(157), v(5)]);
    assert_eq!(find(&rows, "a/deep").values, vec![v(7), v(2)]);
    assert_eq!(find(&rows, "b").values, vec![v(0), v(2)]);
    assert_eq!(find(&rows, "a/deep").depth, 2);
}

#[test]
fn depth_zero_total_ignores_depth_cap() {
    let top = TopDirectory::new("/data");
    let time = TimeFilter::default();
    let full = run(&tree(), &top, &time, false, None, 1);
    let capped = run(&tree(), &top, &time, false, Some(0), 1);

    assert_eq!(capped.len(), 1);
    assert_eq!(find(&capped, "").values, find(&full, "").values);
}

#[test]
fn directories_add_inodes_but_no_bytes() {
    let store = MemoryStore::new(vec![
        ObjectRecord {
            size_bytes: 4096,
            ..ObjectRecord::dir("/d", "u")
        },
        ObjectRecord::dir("/d/sub", "u"),
    ]);
    let rows = run(
        &store,
        &TopDirectory::new("/d"),
        &TimeFilter::default(),
        false,
        None,
        1,
    );
    assert_eq!(find(&rows, "").values, vec![v(0), v(2)]);
    assert_eq!(find(&rows, "sub").values, vec![v(0), v(1)]);
}

#[test]
fn time_filtered_directory_has_no_data() {
    let time = TimeFilter {
        kind: TimestampKind::Atime,
        newer_than: None,
        older_than: Some(parse_timestamp("2023-01-01").unwrap()),
    };
    let store = MemoryStore::new(vec![
        ObjectRecord::dir("/t", "u").with_times(Y2022, 0, 0),
        ObjectRecord::dir("/t/fresh", "u").with_times(Y2024, 0, 0),
        ObjectRecord::file("/t/fresh/new.log", 10, "u").with_times(Y2024, 0, 0),
        ObjectRecord::file("/t/old.log", 5, "u").with_times(Y2022, 0, 0),
    ]);
    let rows = run(&store, &TopDirectory::new("/t"), &time, false, None, 1);

    assert_eq!(
        find(&rows, "fresh").values,
        vec![MetricValue::NoData, MetricValue::NoData]
    );
    assert_eq!(find(&rows, "").values, vec![v(5), v(2)]);
}

#[test]
fn zero_bytes_with_contributors_is_not_no_data() {
    let rows = run(
        &tree(),
        &TopDirectory::new("/data"),
        &TimeFilter::default(),
        false,
        None,
        1,
    );
    let b = find(&rows, "b");
    assert_eq!(b.values[0], v(0));
    assert!(!b.values[0].is_no_data());
}

#[test]
fn owner_rows_partition_the_total() {
    let rows = run(
        &tree(),
        &TopDirectory::new("/data"),
        &TimeFilter::default(),
        true,
        None,
        1,
    );

    for row in &rows {
        for slot in 0..2 {
            let sum: u64 = row
                .owners
                .iter()
                .filter_map(|o| o.values[slot].value())
                .sum();
            assert_eq!(Some(sum), row.values[slot].value(), "{:?}", row.prefix);
        }
    }

    let a = find(&rows, "a");
    let owners: Vec<&str> = a.owners.iter().map(|o| o.owner.as_str()).collect();
    assert_eq!(owners, vec!["alice", "bob"]);
    assert_eq!(a.owners[0].values, vec![v(107), v(4)]);
    assert_eq!(a.owners[1].values, vec![v(50), v(1)]);
}

#[test]
fn filtered_owner_still_gets_a_row() {
    let time = TimeFilter {
        kind: TimestampKind::Mtime,
        newer_than: None,
        older_than: Some(parse_timestamp("2023-01-01").unwrap()),
    };
    let rows = run(&tree(), &TopDirectory::new("/data"), &time, true, Some(1), 1);

    // bob's only record under `a` is from 2024.
    let a = find(&rows, "a");
    let bob = a.owners.iter().find(|o| o.owner == "bob").unwrap();
    assert_eq!(bob.values, vec![MetricValue::NoData, MetricValue::NoData]);
}

#[test]
fn out_of_scope_records_are_ignored() {
    let rows = run(
        &tree(),
        &TopDirectory::root(),
        &TimeFilter::default(),
        false,
        Some(1),
        1,
    );
    let prefixes: Vec<&str> = rows.iter().map(|r| r.prefix.as_str()).collect();
    assert_eq!(prefixes, vec!["", "data", "other"]);

    let scoped = run(
        &tree(),
        &TopDirectory::new("/data"),
        &TimeFilter::default(),
        false,
        Some(1),
        1,
    );
    assert!(scoped.iter().all(|r| r.values[0] != v(999_999)));
}

#[test]
fn worker_count_does_not_change_results() {
    let records: Vec<ObjectRecord> = (0..6000u64)
        .map(|i| {
            let owner = ["ann", "ben", "cat"][(i % 3) as usize];
            ObjectRecord::file(format!("/big/d{}/s{}/f{i}", i % 11, i % 5), i, owner)
                .with_times(Y2022 + i as i64, 0, 0)
        })
        .collect();
    let store = MemoryStore::new(records);
    let top = TopDirectory::new("/big");
    let time = TimeFilter {
        kind: TimestampKind::Atime,
        newer_than: Some(chrono::DateTime::from_timestamp(Y2022 + 1000, 0).unwrap()),
        older_than: None,
    };

    let sequential = run(&store, &top, &time, true, None, 1);
    for workers in [2, 3, 4, 8] {
        assert_eq!(run(&store, &top, &time, true, None, workers), sequential);
    }
}
