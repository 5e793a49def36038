use super::*;
use crate::report::MetricValue;

fn row(prefix: &str, depth: usize) -> DirRow {
    DirRow {
        prefix: prefix.into(),
        depth,
        values: vec![MetricValue::Value(1)],
        owners: vec![],
    }
}

fn rows() -> Vec<DirRow> {
    vec![row("", 0), row("a", 1), row("b", 1), row("a/x", 2), row("a/x/y", 3)]
}

fn prefixes(rows: &[DirRow]) -> Vec<&str> {
    rows.iter().map(|r| r.prefix.as_str()).collect()
}

#[test]
fn default_keeps_top_and_children() {
    let kept = DepthWindow::default().apply(rows());
    assert_eq!(prefixes(&kept), vec!["", "a", "b"]);
}

#[test]
fn bounds_are_inclusive() {
    let kept = DepthWindow::new(1, 2).apply(rows());
    assert_eq!(prefixes(&kept), vec!["a", "b", "a/x"]);

    let kept = DepthWindow::new(3, 3).apply(rows());
    assert_eq!(prefixes(&kept), vec!["a/x/y"]);
}

#[test]
fn inverted_window_is_empty_not_an_error() {
    let window = DepthWindow::new(2, 1);
    assert!(window.is_empty());
    assert!(window.apply(rows()).is_empty());
}

#[test]
fn window_past_the_deepest_row_is_empty() {
    assert!(DepthWindow::new(10, 20).apply(rows()).is_empty());
}
