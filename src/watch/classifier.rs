use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::debug;

use crate::model::{Job, Run, Status, Step};

use super::event::{Event, EventSink};
use super::watermark::Watermark;

/// How a full walk is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One-time reconciliation after a restart: completions only.
    CatchUp,
    /// Steady-state polling: status edges against the in-memory caches.
    Live,
}

/// Per-walk context handed to the classifier for every entity.
///
/// `floor` is frozen when the walk begins; advances made while emitting only
/// raise the floor of the next walk.
pub struct Cycle<'a> {
    mode: Mode,
    floor: DateTime<Utc>,
    repo: &'a str,
    watermark: &'a mut Watermark,
    sink: &'a mut dyn EventSink,
    emitted: usize,
}

impl<'a> Cycle<'a> {
    pub fn new(
        mode: Mode,
        repo: &'a str,
        watermark: &'a mut Watermark,
        sink: &'a mut dyn EventSink,
    ) -> Self {
        Self {
            mode,
            floor: watermark.current(),
            repo,
            watermark,
            sink,
            emitted: 0,
        }
    }

    pub fn floor(&self) -> DateTime<Utc> {
        self.floor
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    fn after_floor(&self, instant: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        instant.filter(|instant| *instant > self.floor)
    }

    fn emit(&mut self, event: Event<'_>) {
        self.sink.emit(&event.line(self.repo));
        self.emitted += 1;

        if event.kind.is_completion() {
            if let Some(completed_at) = event.completed_at {
                self.watermark.advance(completed_at);
            }
        }
    }
}

/// Decides which observed entities represent a transition worth reporting.
///
/// Holds the last status seen per job and per step for the lifetime of one
/// monitor. The caches turn the level signal "currently in_progress" of a
/// re-fetched snapshot into a one-shot edge.
#[derive(Debug, Default)]
pub struct Classifier {
    job_status: HashMap<u64, Status>,
    step_status: HashMap<(u64, u32), Status>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_run(&mut self, run: &Run, cycle: &mut Cycle<'_>) {
        match cycle.mode {
            Mode::CatchUp => {
                if run.is(&Status::Completed) && cycle.after_floor(Some(run.updated_at)).is_some() {
                    cycle.emit(Event::run_completed(run));
                }
            }
            Mode::Live => {
                // Queued runs are reported level-triggered: a run does not stay
                // queued for long, so no cache is kept for runs.
                if run.is(&Status::Queued) && cycle.after_floor(Some(run.created_at)).is_some() {
                    cycle.emit(Event::run_queued(run));
                }
                if run.is(&Status::Completed) && cycle.after_floor(Some(run.updated_at)).is_some() {
                    cycle.emit(Event::run_completed(run));
                }
            }
        }
    }

    pub fn observe_job(&mut self, run: &Run, job: &Job, cycle: &mut Cycle<'_>) {
        match cycle.mode {
            Mode::CatchUp => {
                if let Some(completed_at) = cycle.after_floor(job.completed_at) {
                    cycle.emit(Event::job_completed(run, job, completed_at));
                }
            }
            Mode::Live => {
                let previous = remember(&mut self.job_status, job.id, job.status.as_ref());
                let edge = Edge::new(previous.as_ref(), job.status.as_ref());

                if edge.entered(&Status::InProgress) {
                    if let Some(started_at) = cycle.after_floor(job.started_at) {
                        cycle.emit(Event::job_started(run, job, started_at));
                    }
                }
                if edge.entered(&Status::Completed) {
                    if let Some(completed_at) = cycle.after_floor(job.completed_at) {
                        cycle.emit(Event::job_completed(run, job, completed_at));
                    }
                }
            }
        }
    }

    pub fn observe_step(&mut self, run: &Run, job: &Job, step: &Step, cycle: &mut Cycle<'_>) {
        match cycle.mode {
            Mode::CatchUp => {
                if let Some(completed_at) = cycle.after_floor(step.completed_at) {
                    cycle.emit(Event::step_completed(run, job, step, completed_at));
                }
            }
            Mode::Live => {
                let key = (job.id, step.number);
                let previous = remember(&mut self.step_status, key, step.status.as_ref());
                let edge = Edge::new(previous.as_ref(), step.status.as_ref());

                if edge.entered(&Status::InProgress) {
                    if let Some(started_at) = cycle.after_floor(step.started_at) {
                        cycle.emit(Event::step_started(run, job, step, started_at));
                    }
                }
                if edge.entered(&Status::Completed) {
                    if let Some(completed_at) = cycle.after_floor(step.completed_at) {
                        cycle.emit(Event::step_completed(run, job, step, completed_at));
                    }
                }
            }
        }
    }

    /// Number of jobs and steps with a cached status.
    #[cfg(test)]
    pub fn cached(&self) -> (usize, usize) {
        (self.job_status.len(), self.step_status.len())
    }
}

/// Previous and current status of one entity across two observations.
#[derive(Debug, Clone, Copy)]
struct Edge<'s> {
    previous: Option<&'s Status>,
    current: Option<&'s Status>,
}

impl<'s> Edge<'s> {
    fn new(previous: Option<&'s Status>, current: Option<&'s Status>) -> Self {
        Self { previous, current }
    }

    /// True when the entity just entered `target`.
    fn entered(&self, target: &Status) -> bool {
        self.current == Some(target) && self.previous != Some(target)
    }
}

/// Caches the status for `key` and returns what was there before.
/// An absent current status leaves the cached entry untouched.
fn remember<K>(cache: &mut HashMap<K, Status>, key: K, current: Option<&Status>) -> Option<Status>
where
    K: std::hash::Hash + Eq + Copy + std::fmt::Debug,
{
    let Some(status) = current else {
        return cache.get(&key).cloned();
    };

    let previous = cache.insert(key, status.clone());
    if previous.as_ref() != current {
        debug!("{key:?}: {previous:?} -> {current:?}");
    }
    previous
}
