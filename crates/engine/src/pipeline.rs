use std::time::{Duration, Instant};

use log::debug;
use rollup_store::RecordSource;

use crate::{
    aggregate::Aggregator,
    config::{MetricPlan, ReportConfig},
    decompose::TopDirectory,
    error::ConfigError,
    filter::FilterStage,
    report::{DirRow, Report},
    sort::RowOrder,
    window::DepthWindow,
};

/// Shared, state-independent pipeline context.
struct PipelineCtx<'a, S: RecordSource> {
    source: &'a S,
    config: &'a ReportConfig,
    /// Metrics resolved once for the whole run.
    plan: MetricPlan,
    top: TopDirectory,
}

/// Pipeline created, nothing scanned yet.
pub struct InitialState;

/// Every directory group built, unfiltered by depth.
pub struct AggregatedState {
    rows: Vec<DirRow>,
}

/// Rows outside the depth window dropped.
pub struct WindowedState {
    rows: Vec<DirRow>,
}

/// Rows in final order.
pub struct SortedState {
    rows: Vec<DirRow>,
}

/// Stages for which we record timings.
#[derive(Copy, Clone, Debug)]
pub enum Stage {
    Scan,
    Window,
    Sort,
}

/// Timing metrics collected during pipeline execution.
#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    /// Scanning the store and aggregating.
    pub scan_time: Option<Duration>,
    pub window_time: Option<Duration>,
    pub sort_time: Option<Duration>,
    /// Directory groups built before windowing.
    pub groups: usize,
}

impl PipelineMetrics {
    /// Total time across all measured stages.
    pub fn total(&self) -> Duration {
        self.scan_time.unwrap_or_default()
            + self.window_time.unwrap_or_default()
            + self.sort_time.unwrap_or_default()
    }
}

/// Strategy trait for timing behavior.
pub trait Timer {
    /// Run `f`, optionally measuring and recording the duration for `stage`.
    fn measure<F, R>(&mut self, stage: Stage, f: F) -> R
    where
        F: FnOnce() -> R;

    /// Record the number of groups the scan produced.
    fn record_groups(&mut self, _groups: usize) {}

    fn metrics(&self) -> Option<&PipelineMetrics> {
        None
    }
}

/// Timer implementation that does nothing
#[derive(Debug, Default)]
pub struct NoopTimer;

impl Timer for NoopTimer {
    #[inline]
    fn measure<F, R>(&mut self, _stage: Stage, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        f()
    }
}

/// Timer implementation that collects `PipelineMetrics`.
#[derive(Debug, Default)]
pub struct MetricsTimer {
    metrics: PipelineMetrics,
}

impl Timer for MetricsTimer {
    fn measure<F, R>(&mut self, stage: Stage, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        match stage {
            Stage::Scan => self.metrics.scan_time = Some(elapsed),
            Stage::Window => self.metrics.window_time = Some(elapsed),
            Stage::Sort => self.metrics.sort_time = Some(elapsed),
        }

        result
    }

    fn record_groups(&mut self, groups: usize) {
        self.metrics.groups = groups;
    }

    fn metrics(&self) -> Option<&PipelineMetrics> {
        Some(&self.metrics)
    }
}

/// A type-safe report pipeline.
///
/// The typestate enforces scan, then window, then sort. Timing is chosen by
/// the `Timer` parameter:
///
/// - `T = NoopTimer`    => untimed pipeline
/// - `T = MetricsTimer` => timed pipeline
pub struct ReportPipeline<'a, S: RecordSource, St, T: Timer = NoopTimer> {
    ctx: PipelineCtx<'a, S>,
    state: St,
    timer: T,
}

fn build_ctx<'a, S: RecordSource>(
    source: &'a S,
    config: &'a ReportConfig,
) -> Result<PipelineCtx<'a, S>, ConfigError> {
    config.validate()?;

    let top = match config.top_directory.as_deref() {
        Some(dir) => TopDirectory::new(dir),
        None => source.root_path().map(TopDirectory::new).unwrap_or_default(),
    };

    Ok(PipelineCtx {
        source,
        config,
        plan: config.plan(),
        top,
    })
}

impl<'a, S: RecordSource> ReportPipeline<'a, S, InitialState, NoopTimer> {
    /// Create an untimed pipeline. Fails if `config` does not validate.
    pub fn new(source: &'a S, config: &'a ReportConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            ctx: build_ctx(source, config)?,
            state: InitialState,
            timer: NoopTimer,
        })
    }
}

impl<'a, S: RecordSource> ReportPipeline<'a, S, InitialState, MetricsTimer> {
    /// Create a timed pipeline. Fails if `config` does not validate.
    pub fn new_timed(source: &'a S, config: &'a ReportConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            ctx: build_ctx(source, config)?,
            state: InitialState,
            timer: MetricsTimer::default(),
        })
    }
}

impl<'a, S: RecordSource, St, T: Timer> ReportPipeline<'a, S, St, T> {
    /// Access timing metrics, if enabled.
    pub fn metrics(&self) -> Option<&PipelineMetrics> {
        self.timer.metrics()
    }

    /// The resolved top directory.
    pub fn top(&self) -> &TopDirectory {
        &self.ctx.top
    }

    pub fn plan(&self) -> &MetricPlan {
        &self.ctx.plan
    }
}

impl<'a, S: RecordSource, T: Timer> ReportPipeline<'a, S, InitialState, T> {
    /// Scan the store and roll every scoped record up into its directories.
    pub fn aggregate(self) -> ReportPipeline<'a, S, AggregatedState, T> {
        let ReportPipeline {
            ctx,
            state: InitialState,
            mut timer,
        } = self;

        let config = ctx.config;
        let filter = FilterStage::new(&ctx.top, &config.time);
        let aggregator = Aggregator::new(&ctx.plan, &filter)
            .per_owner(config.per_owner)
            .depth_cap(Some(config.max_depth));

        let rows = timer.measure(Stage::Scan, || {
            aggregator.aggregate(ctx.source, config.workers)
        });
        timer.record_groups(rows.len());

        ReportPipeline {
            ctx,
            state: AggregatedState { rows },
            timer,
        }
    }
}

impl<'a, S: RecordSource, T: Timer> ReportPipeline<'a, S, AggregatedState, T> {
    pub fn rows(&self) -> &[DirRow] {
        &self.state.rows
    }

    /// Keep only rows inside `[min_depth, max_depth]`.
    pub fn window(self) -> ReportPipeline<'a, S, WindowedState, T> {
        let ReportPipeline {
            ctx,
            state: AggregatedState { rows },
            mut timer,
        } = self;

        let window = DepthWindow::new(ctx.config.min_depth, ctx.config.max_depth);
        let rows = timer.measure(Stage::Window, || window.apply(rows));

        ReportPipeline {
            ctx,
            state: WindowedState { rows },
            timer,
        }
    }
}

impl<'a, S: RecordSource, T: Timer> ReportPipeline<'a, S, WindowedState, T> {
    pub fn rows(&self) -> &[DirRow] {
        &self.state.rows
    }

    pub fn sort(self) -> ReportPipeline<'a, S, SortedState, T> {
        let ReportPipeline {
            ctx,
            state: WindowedState { mut rows },
            mut timer,
        } = self;

        let order = RowOrder::new(&ctx.config.sort_keys, &ctx.plan);
        timer.measure(Stage::Sort, || order.sort(&mut rows));

        if log::log_enabled!(log::Level::Debug) {
            let mut depth_counts: Vec<(usize, usize)> = Vec::new();
            for row in &rows {
                match depth_counts.last_mut() {
                    Some((depth, count)) if *depth == row.depth => *count += 1,
                    _ => depth_counts.push((row.depth, 1)),
                }
            }
            for (depth, count) in depth_counts {
                debug!("found {count} directories at depth {depth}");
            }
        }

        ReportPipeline {
            ctx,
            state: SortedState { rows },
            timer,
        }
    }
}

impl<'a, S: RecordSource, T: Timer> ReportPipeline<'a, S, SortedState, T> {
    pub fn rows(&self) -> &[DirRow] {
        &self.state.rows
    }

    /// Consume the pipeline into a report showing only the requested metrics.
    pub fn into_report(self) -> Report {
        let displayed = self.ctx.plan.displayed_count();
        let mut rows = self.state.rows;

        for row in &mut rows {
            row.values.truncate(displayed);
            for owner in &mut row.owners {
                owner.values.truncate(displayed);
            }
        }

        Report {
            top_directory: self.ctx.top.as_str().to_owned(),
            metrics: self.ctx.plan.displayed(),
            rows,
        }
    }

    /// Like [Self::into_report], also handing back the timer's metrics.
    pub fn into_parts(self) -> (Report, Option<PipelineMetrics>) {
        let metrics = self.timer.metrics().cloned();
        (self.into_report(), metrics)
    }
}

/// Run a full report against `source`.
pub fn run_report<S: RecordSource>(
    source: &S,
    config: &ReportConfig,
) -> Result<Report, ConfigError> {
    Ok(ReportPipeline::new(source, config)?
        .aggregate()
        .window()
        .sort()
        .into_report())
}

/// Run a full report and collect per-stage timings.
pub fn run_report_timed<S: RecordSource>(
    source: &S,
    config: &ReportConfig,
) -> Result<(Report, PipelineMetrics), ConfigError> {
    let (report, metrics) = ReportPipeline::new_timed(source, config)?
        .aggregate()
        .window()
        .sort()
        .into_parts();
    Ok((report, metrics.unwrap_or_default()))
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
