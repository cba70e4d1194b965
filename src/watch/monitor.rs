use std::time::Duration;

use log::{debug, info, warn};

use crate::error::Result;
use crate::providers::ActionsApi;
use crate::shutdown::StopSignal;
use crate::state::{RepositoryState, StateStore};

use super::classifier::{Classifier, Cycle, Mode};
use super::event::EventSink;
use super::walker::{PageLimits, WalkStats, Walker};
use super::watermark::Watermark;

/// Result of one full walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub stats: WalkStats,
    pub emitted: usize,
}

/// Watches one repository: a catch-up pass at startup, then live polls on a
/// fixed interval until stopped.
///
/// Owns everything that changes while watching: the persisted record, the
/// watermark and the classifier's status caches. Only the stop signal is
/// shared with other tasks.
pub struct Monitor<A, S> {
    api: A,
    sink: S,
    store: StateStore,
    state: RepositoryState,
    watermark: Watermark,
    classifier: Classifier,
    limits: PageLimits,
    interval: Duration,
    stop: StopSignal,
    catch_up_done: bool,
}

impl<A, S> Monitor<A, S>
where
    A: ActionsApi,
    S: EventSink,
{
    pub fn new(
        api: A,
        sink: S,
        store: StateStore,
        state: RepositoryState,
        interval: Duration,
        stop: StopSignal,
    ) -> Self {
        let watermark = Watermark::new(state.last_completion_time);

        Self {
            api,
            sink,
            store,
            state,
            watermark,
            classifier: Classifier::new(),
            limits: PageLimits::default(),
            interval,
            stop,
            catch_up_done: false,
        }
    }

    /// Runs catch-up once and then polls until the stop signal trips.
    ///
    /// Cycle failures are logged and retried on the next tick. The state is
    /// stored after any cycle that advanced the watermark, and once more on
    /// the way out.
    pub async fn run(mut self) -> RepositoryState {
        info!(
            "Watching {} every {}s (watermark {})",
            self.state.repo,
            self.interval.as_secs(),
            self.watermark.current()
        );

        if let Err(e) = self.catch_up().await {
            warn!("Catch-up failed: {e}");
        }

        while !self.stop.is_stopped() {
            if let Err(e) = self.tick().await {
                warn!("Poll failed: {e}");
            }
            self.stop.sleep(self.interval).await;
        }

        info!("Stopping; saving state for {}", self.state.repo);
        self.persist();

        self.state
    }

    /// One live poll followed by a store if the watermark moved.
    pub async fn tick(&mut self) -> Result<CycleReport> {
        let before = self.watermark.current();
        let outcome = self.poll_once().await;

        if self.watermark.current() > before {
            self.persist();
        }

        outcome
    }

    /// The startup reconciliation pass.
    ///
    /// A repository seen for the first time is only marked initialized: its
    /// history predates the watermark and is not replayed. Otherwise every
    /// completion after the stored watermark is reported once. Calling this
    /// again after it has succeeded is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the API error that aborted the walk. Completions reported
    /// before the error still advance the watermark.
    pub async fn catch_up(&mut self) -> Result<CycleReport> {
        if self.catch_up_done {
            return Ok(CycleReport::default());
        }

        if !self.state.initialized {
            info!(
                "First run for {}; skipping historical events",
                self.state.repo
            );
            self.state.initialized = true;
            self.catch_up_done = true;
            self.persist();
            return Ok(CycleReport::default());
        }

        let report = self.walk(Mode::CatchUp).await?;
        self.catch_up_done = true;
        self.persist();

        info!(
            "Catch-up for {} reported {} completions across {} runs",
            self.state.repo, report.emitted, report.stats.runs
        );

        Ok(report)
    }

    /// A single live poll cycle, without persistence.
    ///
    /// # Errors
    ///
    /// Returns the API error that aborted the walk.
    pub async fn poll_once(&mut self) -> Result<CycleReport> {
        let report = self.walk(Mode::Live).await?;
        debug!(
            "Poll visited {} runs, {} jobs, {} steps; {} events",
            report.stats.runs, report.stats.jobs, report.stats.steps, report.emitted
        );
        Ok(report)
    }

    async fn walk(&mut self, mode: Mode) -> Result<CycleReport> {
        let mut cycle = Cycle::new(mode, &self.state.repo, &mut self.watermark, &mut self.sink);
        debug!("{mode:?} walk from floor {}", cycle.floor());
        let walker = Walker::new(&self.api, &self.stop, self.limits);

        let result = walker.walk(&mut self.classifier, &mut cycle).await;
        let emitted = cycle.emitted();

        let stats = result?;
        if stats.interrupted {
            info!("Walk interrupted by stop request after {emitted} events");
        }

        Ok(CycleReport { stats, emitted })
    }

    /// Best-effort store: failures are logged and retried on the next advance.
    fn persist(&mut self) {
        self.state.last_completion_time = self.watermark.current();

        if let Err(e) = self.store.store(&self.state) {
            warn!("Failed to store state for {}: {e}", self.state.repo);
        }
    }
}
