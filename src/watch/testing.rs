//! In-memory `ActionsApi` and entity builders for walker and monitor tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::error::{Result, WatchError};
use crate::model::{Job, Run, Status, Step};
use crate::providers::ActionsApi;
use crate::shutdown::StopSignal;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
}

pub fn at(seconds: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(seconds)
}

pub fn run_at(id: u64, seconds: i64) -> Run {
    Run {
        id,
        name: Some("CI".to_string()),
        run_number: id,
        head_branch: Some("main".to_string()),
        head_sha: Some(format!("{id:040x}")),
        status: Some(Status::InProgress),
        conclusion: None,
        created_at: at(seconds),
        updated_at: at(seconds),
    }
}

pub fn job_with_steps(id: u64, steps: u32) -> Job {
    Job {
        id,
        name: Some(format!("job-{id}")),
        status: Some(Status::Queued),
        conclusion: None,
        started_at: None,
        completed_at: None,
        steps: (1..=steps)
            .map(|number| Step {
                name: Some(format!("step-{number}")),
                number,
                status: Some(Status::Queued),
                conclusion: None,
                started_at: None,
                completed_at: None,
            })
            .collect(),
    }
}

#[derive(Default)]
struct FakeState {
    run_pages: Vec<Vec<Run>>,
    job_pages: HashMap<u64, Vec<Vec<Job>>>,
    failing_run_page: Option<u32>,
    stalled_run_page: Option<u32>,
    stop_on_run_page: Option<(u32, StopSignal)>,
    run_requests: Vec<u32>,
    job_requests: Vec<(u64, u32)>,
}

/// Serves canned pages and records every request.
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_run_pages(&self, pages: Vec<Vec<Run>>) {
        self.state.lock().unwrap().run_pages = pages;
    }

    pub fn set_runs(&self, runs: Vec<Run>) {
        self.set_run_pages(vec![runs]);
    }

    pub fn set_job_pages(&self, run_id: u64, pages: Vec<Vec<Job>>) {
        self.state.lock().unwrap().job_pages.insert(run_id, pages);
    }

    pub fn set_jobs(&self, run_id: u64, jobs: Vec<Job>) {
        self.set_job_pages(run_id, vec![jobs]);
    }

    pub fn fail_runs_page(&self, page: u32) {
        self.state.lock().unwrap().failing_run_page = Some(page);
    }

    pub fn clear_failure(&self) {
        self.state.lock().unwrap().failing_run_page = None;
    }

    /// Requests for `page` never complete.
    pub fn stall_runs_page(&self, page: u32) {
        self.state.lock().unwrap().stalled_run_page = Some(page);
    }

    pub fn stop_when_serving_runs_page(&self, page: u32, stop: StopSignal) {
        self.state.lock().unwrap().stop_on_run_page = Some((page, stop));
    }

    pub fn run_page_requests(&self) -> Vec<u32> {
        self.state.lock().unwrap().run_requests.clone()
    }

    pub fn job_requests(&self) -> Vec<(u64, u32)> {
        self.state.lock().unwrap().job_requests.clone()
    }
}

#[async_trait]
impl ActionsApi for FakeApi {
    async fn list_runs(&self, page: u32, _per_page: u32) -> Result<Vec<Run>> {
        let stalled = {
            let mut state = self.state.lock().unwrap();
            state.run_requests.push(page);
            state.stalled_run_page == Some(page)
        };
        if stalled {
            std::future::pending::<()>().await;
        }

        let state = self.state.lock().unwrap();

        if state.failing_run_page == Some(page) {
            return Err(WatchError::Api {
                status: 502,
                message: "bad gateway".to_string(),
            });
        }

        if let Some((stop_page, stop)) = &state.stop_on_run_page {
            if *stop_page == page {
                stop.stop();
            }
        }

        Ok(state
            .run_pages
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_jobs(&self, run_id: u64, page: u32, _per_page: u32) -> Result<Vec<Job>> {
        let mut state = self.state.lock().unwrap();
        state.job_requests.push((run_id, page));

        Ok(state
            .job_pages
            .get(&run_id)
            .and_then(|pages| pages.get(page as usize - 1))
            .cloned()
            .unwrap_or_default())
    }
}
