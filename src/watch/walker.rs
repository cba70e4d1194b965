use std::future::Future;

use log::{debug, info};

use crate::error::Result;
use crate::model::Run;
use crate::providers::ActionsApi;
use crate::shutdown::StopSignal;

use super::classifier::{Classifier, Cycle};

/// Page sizes and the cap on run pages fetched per walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub runs_per_page: u32,
    pub jobs_per_page: u32,
    /// Bounds the work done per poll against very long histories. Job
    /// pagination within a run is not capped.
    pub max_run_pages: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            runs_per_page: 50,
            jobs_per_page: 50,
            max_run_pages: 5,
        }
    }
}

/// Counters for one walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkStats {
    pub run_pages: u32,
    pub runs: usize,
    pub jobs: usize,
    pub steps: usize,
    /// Set when a stop request ended the walk early
    pub interrupted: bool,
}

/// Walks runs, then each run's jobs, then each job's steps, in API order,
/// handing every entity to the classifier.
///
/// A stop request is honoured at checkpoints: after every entity and before
/// every page fetch. Outstanding pages are then left unfetched. A page fetch
/// already in flight is abandoned when a stop arrives.
pub struct Walker<'a> {
    api: &'a dyn ActionsApi,
    stop: &'a StopSignal,
    limits: PageLimits,
}

impl<'a> Walker<'a> {
    pub fn new(api: &'a dyn ActionsApi, stop: &'a StopSignal, limits: PageLimits) -> Self {
        Self { api, stop, limits }
    }

    /// Visits the current run/job/step hierarchy once.
    ///
    /// # Errors
    ///
    /// Returns the first API error; entities visited before it have already
    /// been classified.
    pub async fn walk(&self, classifier: &mut Classifier, cycle: &mut Cycle<'_>) -> Result<WalkStats> {
        let mut stats = WalkStats::default();
        let per_page = self.limits.runs_per_page;

        for page in 1..=self.limits.max_run_pages {
            if self.checkpoint(&mut stats) {
                break;
            }

            let Some(runs) = self
                .fetch(self.api.list_runs(page, per_page), &mut stats)
                .await?
            else {
                break;
            };
            stats.run_pages += 1;
            debug!("Run page {page}: {} runs", runs.len());

            if runs.is_empty() {
                break;
            }

            for run in &runs {
                classifier.observe_run(run, cycle);
                stats.runs += 1;
                if self.checkpoint(&mut stats) {
                    return Ok(stats);
                }

                self.walk_jobs(run, classifier, cycle, &mut stats).await?;
                if stats.interrupted {
                    return Ok(stats);
                }
            }

            if runs.len() < per_page as usize {
                break;
            }
        }

        Ok(stats)
    }

    async fn walk_jobs(
        &self,
        run: &Run,
        classifier: &mut Classifier,
        cycle: &mut Cycle<'_>,
        stats: &mut WalkStats,
    ) -> Result<()> {
        let per_page = self.limits.jobs_per_page;
        let mut page = 1;

        loop {
            let Some(jobs) = self
                .fetch(self.api.list_jobs(run.id, page, per_page), stats)
                .await?
            else {
                return Ok(());
            };
            if jobs.is_empty() {
                return Ok(());
            }

            for job in &jobs {
                classifier.observe_job(run, job, cycle);
                stats.jobs += 1;
                if self.checkpoint(stats) {
                    return Ok(());
                }

                for step in &job.steps {
                    classifier.observe_step(run, job, step, cycle);
                    stats.steps += 1;
                    if self.checkpoint(stats) {
                        return Ok(());
                    }
                }
            }

            if jobs.len() < per_page as usize || self.checkpoint(stats) {
                return Ok(());
            }
            page += 1;
        }
    }

    /// Awaits `request` unless a stop arrives first, in which case the walk
    /// is marked interrupted and `None` is returned.
    async fn fetch<T>(
        &self,
        request: impl Future<Output = Result<T>>,
        stats: &mut WalkStats,
    ) -> Result<Option<T>> {
        tokio::select! {
            biased;
            result = request => result.map(Some),
            () = self.stop.stopped() => {
                info!("Stop requested while a page request was in flight");
                stats.interrupted = true;
                Ok(None)
            }
        }
    }

    fn checkpoint(&self, stats: &mut WalkStats) -> bool {
        if self.stop.is_stopped() {
            stats.interrupted = true;
        }
        stats.interrupted
    }
}
