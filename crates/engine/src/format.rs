use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::{
    config::Metric,
    report::{DirRow, MetricValue, Report},
};

const BINARY_UNITS: [&str; 6] = ["", "Ki", "Mi", "Gi", "Ti", "Pi"];
const SI_UNITS: [&str; 6] = ["", "K", "M", "G", "T", "P"];

/// Base used when scaling magnitudes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitBase {
    /// Powers of 1024
    #[default]
    Binary,
    /// Powers of 1000
    Si,
}

impl UnitBase {
    #[inline]
    pub fn factor(self) -> f64 {
        match self {
            UnitBase::Binary => 1024.0,
            UnitBase::Si => 1000.0,
        }
    }

    fn units(self) -> &'static [&'static str; 6] {
        match self {
            UnitBase::Binary => &BINARY_UNITS,
            UnitBase::Si => &SI_UNITS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberStyle {
    /// Exact integers
    #[default]
    Raw,
    /// One decimal and a unit prefix
    Human(UnitBase),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOptions {
    pub style: NumberStyle,
}

impl FormatOptions {
    pub fn raw() -> Self {
        Self {
            style: NumberStyle::Raw,
        }
    }

    pub fn human(base: UnitBase) -> Self {
        Self {
            style: NumberStyle::Human(base),
        }
    }
}

/// Scale `value` down to the largest unit that keeps it at or above 1.
/// Anything past peta stays in peta.
pub fn scale_magnitude(value: u64, base: UnitBase) -> (f64, &'static str) {
    let factor = base.factor();
    let units = base.units();
    let mut scaled = value as f64;
    let mut idx = 0;
    while scaled >= factor && idx < units.len() - 1 {
        scaled /= factor;
        idx += 1;
    }
    (scaled, units[idx])
}

pub fn format_magnitude(value: u64, base: UnitBase, suffix: &str) -> String {
    let (scaled, unit) = scale_magnitude(value, base);
    format!("{scaled:.1}{unit}{suffix}")
}

/// Render one metric value. `NoData` is always `-`.
pub fn format_value(value: MetricValue, metric: Metric, style: NumberStyle) -> String {
    match (value, style) {
        (MetricValue::NoData, _) => "-".to_string(),
        (MetricValue::Value(v), NumberStyle::Raw) => v.to_string(),
        (MetricValue::Value(v), NumberStyle::Human(base)) => {
            format_magnitude(v, base, metric.suffix())
        }
    }
}

/// Fixed-width text layout of a report.
///
/// ```text
/// directory                                   size          inodes
/// ================================================================
/// projects                                  1.0GiB           1.2Ki
///     ------------------------------------------------------------
///     alice                                 1.0GiB           1.0Ki
///     ------------------------------------------------------------
/// ```
#[derive(Debug, Clone)]
pub struct ReportLayout<'a> {
    metrics: &'a [Metric],
    options: FormatOptions,
}

impl<'a> ReportLayout<'a> {
    pub const NAME_WIDTH: usize = 32;
    pub const VALUE_WIDTH: usize = 16;
    pub const OWNER_INDENT: usize = 4;

    pub fn new(metrics: &'a [Metric], options: FormatOptions) -> Self {
        Self { metrics, options }
    }

    pub fn width(&self) -> usize {
        Self::NAME_WIDTH + Self::VALUE_WIDTH * self.metrics.len()
    }

    fn line<W: Write>(
        &self,
        out: &mut W,
        indent: usize,
        name: &str,
        cells: &[String],
    ) -> io::Result<()> {
        let mut line = format!(
            "{:indent$}{:<name_width$}",
            "",
            name,
            name_width = Self::NAME_WIDTH - indent
        );
        // Every cell starts with a space so a long name never touches it.
        for cell in cells {
            line.push_str(&format!(" {:>width$}", cell, width = Self::VALUE_WIDTH - 1));
        }
        writeln!(out, "{}", line.trim_end())
    }

    fn cells(&self, values: &[MetricValue]) -> Vec<String> {
        self.metrics
            .iter()
            .enumerate()
            .map(|(slot, metric)| {
                let value = values.get(slot).copied().unwrap_or(MetricValue::NoData);
                format_value(value, *metric, self.options.style)
            })
            .collect()
    }

    fn owner_rule<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(
            out,
            "{:indent$}{}",
            "",
            "-".repeat(self.width() - Self::OWNER_INDENT),
            indent = Self::OWNER_INDENT
        )
    }

    /// Header line and the full-width rule under it.
    pub fn write_header<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let names: Vec<String> = self.metrics.iter().map(|m| m.name().to_string()).collect();
        self.line(out, 0, "directory", &names)?;
        writeln!(out, "{}", "=".repeat(self.width()))
    }

    /// One directory row, followed by its owner block when it has one.
    pub fn write_row<W: Write>(&self, out: &mut W, row: &DirRow) -> io::Result<()> {
        self.line(out, 0, &row.prefix, &self.cells(&row.values))?;

        if row.owners.is_empty() {
            return Ok(());
        }

        self.owner_rule(out)?;
        for owner in &row.owners {
            let cells = self.cells(&owner.values);
            self.line(out, Self::OWNER_INDENT, &owner.owner, &cells)?;
        }
        self.owner_rule(out)
    }
}

/// Write `report` as text.
pub fn render_report<W: Write>(
    report: &Report,
    options: &FormatOptions,
    out: &mut W,
) -> io::Result<()> {
    let layout = ReportLayout::new(&report.metrics, *options);
    layout.write_header(out)?;
    for row in &report.rows {
        layout.write_row(out, row)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
