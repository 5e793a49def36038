use super::*;
use crate::report::OwnerRow;

use MetricValue::{NoData, Value};

const GIB: u64 = 1 << 30;

fn human(value: u64, metric: Metric) -> String {
    format_value(Value(value), metric, NumberStyle::Human(UnitBase::Binary))
}

fn si(value: u64, metric: Metric) -> String {
    format_value(Value(value), metric, NumberStyle::Human(UnitBase::Si))
}

fn render(report: &Report, options: FormatOptions) -> String {
    let mut out = Vec::new();
    render_report(report, &options, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

fn dir(prefix: &str, depth: usize, values: Vec<MetricValue>) -> DirRow {
    DirRow {
        prefix: prefix.into(),
        depth,
        values,
        owners: vec![],
    }
}

fn gib_report() -> Report {
    Report {
        top_directory: "/data".into(),
        metrics: Metric::ALL.to_vec(),
        rows: vec![
            dir("", 0, vec![Value(GIB), Value(3)]),
            dir("subdir", 1, vec![Value(GIB), Value(1)]),
            dir("empty", 1, vec![NoData, NoData]),
        ],
    }
}

#[test]
fn one_gibibyte_file() {
    assert_eq!(human(1_073_741_824, Metric::Size), "1.0GiB");
}

#[test]
fn binary_units_climb_by_1024() {
    assert_eq!(human(0, Metric::Size), "0.0B");
    assert_eq!(human(512, Metric::Size), "512.0B");
    assert_eq!(human(1023, Metric::Size), "1023.0B");
    assert_eq!(human(1024, Metric::Size), "1.0KiB");
    assert_eq!(human(5 * 1024 * 1024 + 512 * 1024, Metric::Size), "5.5MiB");
    assert_eq!(human(3 << 40, Metric::Size), "3.0TiB");
    assert_eq!(human(1 << 50, Metric::Size), "1.0PiB");
}

#[test]
fn peta_is_the_last_unit() {
    assert_eq!(human(1 << 60, Metric::Size), "1024.0PiB");
    assert_eq!(si(5_000_000_000_000_000_000, Metric::Size), "5000.0PB");
}

#[test]
fn si_units_climb_by_1000() {
    assert_eq!(si(999, Metric::Size), "999.0B");
    assert_eq!(si(1000, Metric::Size), "1.0KB");
    assert_eq!(si(1_500_000, Metric::Size), "1.5MB");
    assert_eq!(si(2_000_000_000, Metric::Inodes), "2.0G");
}

#[test]
fn inodes_have_no_byte_suffix() {
    assert_eq!(human(1536, Metric::Inodes), "1.5Ki");
    assert_eq!(human(7, Metric::Inodes), "7.0");
}

#[test]
fn raw_and_no_data() {
    assert_eq!(
        format_value(Value(123_456_789), Metric::Size, NumberStyle::Raw),
        "123456789"
    );
    assert_eq!(format_value(Value(0), Metric::Inodes, NumberStyle::Raw), "0");
    for style in [NumberStyle::Raw, NumberStyle::Human(UnitBase::Si)] {
        assert_eq!(format_value(NoData, Metric::Size, style), "-");
    }
}

#[test]
fn scaled_numbers_parse_back_within_a_twentieth() {
    let samples = [
        1u64,
        999,
        1_000,
        1_023,
        1_025,
        65_535,
        1_234_567,
        987_654_321,
        GIB + 1,
        7 << 45,
        u64::MAX / 3,
    ];
    for base in [UnitBase::Binary, UnitBase::Si] {
        for value in samples {
            let (_, unit) = scale_magnitude(value, base);
            let text = format_magnitude(value, base, "");
            let number: f64 = text.strip_suffix(unit).unwrap_or(&text).parse().unwrap();
            let exponent = base.units().iter().position(|u| *u == unit).unwrap();
            let implied = value as f64 / base.factor().powi(exponent as i32);
            assert!(
                (number - implied).abs() <= 0.05,
                "{value} -> {text} ({number} vs {implied})"
            );
        }
    }
}

#[test]
fn human_report_layout() {
    let text = render(&gib_report(), FormatOptions::human(UnitBase::Binary));
    let expected = concat!(
        "directory                                   size          inodes\n",
        "================================================================\n",
        "                                          1.0GiB             3.0\n",
        "subdir                                    1.0GiB             1.0\n",
        "empty                                          -               -\n",
    );
    assert_eq!(text, expected);
}

#[test]
fn raw_report_layout() {
    let text = render(&gib_report(), FormatOptions::raw());
    let expected = concat!(
        "directory                                   size          inodes\n",
        "================================================================\n",
        "                                      1073741824               3\n",
        "subdir                                1073741824               1\n",
        "empty                                          -               -\n",
    );
    assert_eq!(text, expected);
}

#[test]
fn owner_block_is_indented_between_rules() {
    let owner = |name: &str, value| OwnerRow {
        owner: name.into(),
        values: vec![value],
    };
    let report = Report {
        top_directory: String::new(),
        metrics: vec![Metric::Size],
        rows: vec![DirRow {
            owners: vec![
                owner("alice", Value(50)),
                owner("bob", Value(10)),
                owner("carol", NoData),
            ],
            ..dir("a", 1, vec![Value(60)])
        }],
    };

    let expected = concat!(
        "directory                                   size\n",
        "================================================\n",
        "a                                             60\n",
        "    --------------------------------------------\n",
        "    alice                                     50\n",
        "    bob                                       10\n",
        "    carol                                      -\n",
        "    --------------------------------------------\n",
    );
    assert_eq!(render(&report, FormatOptions::raw()), expected);
}

#[test]
fn empty_report_is_header_and_rule() {
    let report = Report {
        top_directory: "/data".into(),
        metrics: Metric::ALL.to_vec(),
        rows: vec![],
    };
    let expected = concat!(
        "directory                                   size          inodes\n",
        "================================================================\n",
    );
    assert_eq!(render(&report, FormatOptions::raw()), expected);
}

#[test]
fn long_names_push_columns_right() {
    let layout_metrics = [Metric::Size];
    let layout = ReportLayout::new(&layout_metrics, FormatOptions::raw());
    let name = "x".repeat(40);
    let mut out = Vec::new();
    layout
        .write_row(&mut out, &dir(&name, 1, vec![Value(5)]))
        .unwrap();
    let line = String::from_utf8(out).unwrap();
    assert!(line.starts_with(&name));
    assert!(line.trim_end().ends_with('5'));
    assert_eq!(line.trim_end().len(), 40 + ReportLayout::VALUE_WIDTH);
}

#[test]
fn full_width_name_and_value_stay_apart() {
    let layout_metrics = [Metric::Size];
    let layout = ReportLayout::new(&layout_metrics, FormatOptions::raw());
    let name = "n".repeat(ReportLayout::NAME_WIDTH);
    let value = 1_234_567_890_123_456u64;
    assert_eq!(value.to_string().len(), ReportLayout::VALUE_WIDTH);

    let mut out = Vec::new();
    layout
        .write_row(&mut out, &dir(&name, 1, vec![Value(value)]))
        .unwrap();
    let line = String::from_utf8(out).unwrap();
    assert_eq!(line, format!("{name} {value}\n"));
}
