use std::io::{self, Write};

use rollup_engine::{DirRow, FormatOptions, Metric, MetricValue, Report, ReportLayout};
use rollup_protocol::ReportMetrics;
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Fixed-width text table.
    #[default]
    Human,
    /// NDJSON (newline-delimited JSON) for machine consumption.
    Json,
}

/// Configuration for printing a report.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrinterConfig {
    pub format: OutputFormat,
    /// Number style of the text table. JSON always carries exact integers.
    pub options: FormatOptions,
    /// Whether to show timing statistics.
    pub show_timing: bool,
}

/// Static context about a print run.
#[derive(Debug)]
pub struct ReportPrintContext<'a> {
    pub top_directory: &'a str,
    /// Column order of every row's values.
    pub metrics: &'a [Metric],
    pub rows: usize,
    pub timing: Option<&'a ReportMetrics>,
}

impl<'a> ReportPrintContext<'a> {
    pub fn new(report: &'a Report, timing: Option<&'a ReportMetrics>) -> Self {
        Self {
            top_directory: &report.top_directory,
            metrics: &report.metrics,
            rows: report.rows.len(),
            timing,
        }
    }
}

/// Trait for printing reports.
///
/// Implementations receive the rows in report order and are responsible for
/// formatting and outputting them.
pub trait ReportPrinter {
    /// Called once before any rows are printed.
    fn begin(&mut self, ctx: &ReportPrintContext) -> io::Result<()>;

    fn print_row(&mut self, row: &DirRow, ctx: &ReportPrintContext) -> io::Result<()>;

    /// Called once after all rows are printed.
    ///
    /// Use this for footers, summaries, and timing information.
    fn finish(&mut self, ctx: &ReportPrintContext) -> io::Result<()>;
}

/// Drive `printer` over every row of `report`.
pub fn print_report(
    printer: &mut dyn ReportPrinter,
    report: &Report,
    timing: Option<&ReportMetrics>,
) -> io::Result<()> {
    let ctx = ReportPrintContext::new(report, timing);
    printer.begin(&ctx)?;
    for row in &report.rows {
        printer.print_row(row, &ctx)?;
    }
    printer.finish(&ctx)
}

/// Text table on `out`, timing on `err`.
pub struct HumanPrinter<W: Write, E: Write> {
    out: W,
    err: E,
    cfg: PrinterConfig,
}

impl<W: Write, E: Write> HumanPrinter<W, E> {
    pub fn new(out: W, err: E, cfg: PrinterConfig) -> Self {
        Self { out, err, cfg }
    }

    pub fn into_inner(self) -> (W, E) {
        (self.out, self.err)
    }
}

impl HumanPrinter<io::Stdout, io::Stderr> {
    pub fn stdout(cfg: PrinterConfig) -> Self {
        Self::new(io::stdout(), io::stderr(), cfg)
    }
}

impl<W: Write, E: Write> ReportPrinter for HumanPrinter<W, E> {
    fn begin(&mut self, ctx: &ReportPrintContext) -> io::Result<()> {
        ReportLayout::new(ctx.metrics, self.cfg.options).write_header(&mut self.out)
    }

    fn print_row(&mut self, row: &DirRow, ctx: &ReportPrintContext) -> io::Result<()> {
        ReportLayout::new(ctx.metrics, self.cfg.options).write_row(&mut self.out, row)
    }

    fn finish(&mut self, ctx: &ReportPrintContext) -> io::Result<()> {
        self.out.flush()?;

        if self.cfg.show_timing
            && let Some(m) = ctx.timing
        {
            writeln!(
                self.err,
                "\n[report] {} rows from {} groups in {:.2}ms (scan: {:.2}ms, window: {:.2}ms, sort: {:.2}ms)",
                ctx.rows, m.groups, m.total_ms, m.scan_ms, m.window_ms, m.sort_ms,
            )?;
        }

        Ok(())
    }
}

/// One JSON object per row on `out`, a summary object on `err`.
pub struct JsonPrinter<W: Write, E: Write> {
    out: W,
    err: E,
    cfg: PrinterConfig,
}

impl<W: Write, E: Write> JsonPrinter<W, E> {
    pub fn new(out: W, err: E, cfg: PrinterConfig) -> Self {
        Self { out, err, cfg }
    }

    pub fn into_inner(self) -> (W, E) {
        (self.out, self.err)
    }
}

impl JsonPrinter<io::Stdout, io::Stderr> {
    pub fn stdout(cfg: PrinterConfig) -> Self {
        Self::new(io::stdout(), io::stderr(), cfg)
    }
}

/// `{"size": 60, "inodes": null}`; `null` is the no-data sentinel.
fn json_values(metrics: &[Metric], values: &[MetricValue]) -> Value {
    let map: Map<String, Value> = metrics
        .iter()
        .enumerate()
        .map(|(slot, metric)| {
            let value = values
                .get(slot)
                .and_then(|v| v.value())
                .map_or(Value::Null, Value::from);
            (metric.name().to_owned(), value)
        })
        .collect();
    Value::Object(map)
}

impl<W: Write, E: Write> ReportPrinter for JsonPrinter<W, E> {
    fn begin(&mut self, _ctx: &ReportPrintContext) -> io::Result<()> {
        Ok(())
    }

    fn print_row(&mut self, row: &DirRow, ctx: &ReportPrintContext) -> io::Result<()> {
        let mut obj = json!({
            "type": "row",
            "top_directory": ctx.top_directory,
            "prefix": row.prefix,
            "depth": row.depth,
            "values": json_values(ctx.metrics, &row.values),
        });

        if !row.owners.is_empty() {
            let owners: Vec<Value> = row
                .owners
                .iter()
                .map(|o| {
                    json!({
                        "owner": o.owner,
                        "values": json_values(ctx.metrics, &o.values),
                    })
                })
                .collect();
            obj["owners"] = Value::Array(owners);
        }

        writeln!(self.out, "{}", obj)
    }

    fn finish(&mut self, ctx: &ReportPrintContext) -> io::Result<()> {
        self.out.flush()?;

        if self.cfg.show_timing
            && let Some(m) = ctx.timing
        {
            let obj = json!({
                "type": "summary",
                "top_directory": ctx.top_directory,
                "rows": ctx.rows,
                "groups": m.groups,
                "timing_ms": {
                    "total": m.total_ms,
                    "scan": m.scan_ms,
                    "window": m.window_ms,
                    "sort": m.sort_ms,
                }
            });
            writeln!(self.err, "{}", obj)?;
        }

        Ok(())
    }
}

/// Build the printer for `cfg` on the process's stdout and stderr.
pub fn make_printer(cfg: PrinterConfig) -> Box<dyn ReportPrinter> {
    match cfg.format {
        OutputFormat::Human => Box::new(HumanPrinter::stdout(cfg)),
        OutputFormat::Json => Box::new(JsonPrinter::stdout(cfg)),
    }
}

#[cfg(test)]
#[path = "printer_tests.rs"]
mod tests;
