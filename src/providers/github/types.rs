use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::{Job, Run, Status, Step};

/// GitHub Actions workflow run as returned by the REST API.
///
/// Only the fields the watcher reads are declared; everything else in the
/// payload is ignored. Timestamps stay raw until conversion so a malformed
/// value degrades to a fallback instead of failing the whole page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GitHubWorkflowRun {
    /// Unique identifier for the workflow run
    pub id: u64,
    /// Name of the workflow
    pub name: Option<String>,
    /// Run number
    pub run_number: u64,
    /// Head branch or tag name
    pub head_branch: Option<String>,
    /// SHA of the head commit
    pub head_sha: Option<String>,
    /// Status of the run
    pub status: Option<String>,
    /// Conclusion of the run (success, failure, etc.)
    pub conclusion: Option<String>,
    /// When the run was created
    pub created_at: Option<String>,
    /// When the run was updated
    pub updated_at: Option<String>,
}

/// Job within a GitHub Actions workflow run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GitHubJob {
    /// Unique identifier for the job
    pub id: u64,
    /// Name of the job
    pub name: Option<String>,
    /// Status of the job
    pub status: Option<String>,
    /// Conclusion of the job
    pub conclusion: Option<String>,
    /// When the job started
    pub started_at: Option<String>,
    /// When the job completed
    pub completed_at: Option<String>,
    /// Steps in this job; GitHub sends `null` for jobs that have not been picked up yet
    pub steps: Option<Vec<GitHubStep>>,
}

/// Step within a GitHub Actions job.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GitHubStep {
    /// Name of the step
    pub name: Option<String>,
    /// Status of the step
    pub status: Option<String>,
    /// Conclusion of the step
    pub conclusion: Option<String>,
    /// Step number
    pub number: u32,
    /// When the step started
    pub started_at: Option<String>,
    /// When the step completed
    pub completed_at: Option<String>,
}

/// Response from GitHub API for workflow runs.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WorkflowRunsResponse {
    pub workflow_runs: Vec<GitHubWorkflowRun>,
}

/// Response from GitHub API for workflow jobs.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WorkflowJobsResponse {
    pub jobs: Vec<GitHubJob>,
}

/// Parses an RFC 3339 timestamp, treating blank or malformed input as absent.
pub fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn parse_status(value: Option<&str>) -> Option<Status> {
    value.map(Status::parse)
}

impl GitHubWorkflowRun {
    /// Converts into a domain run; `now` backs missing creation/update times.
    pub fn into_run(self, now: DateTime<Utc>) -> Run {
        Run {
            id: self.id,
            name: self.name,
            run_number: self.run_number,
            head_branch: self.head_branch,
            head_sha: self.head_sha,
            status: parse_status(self.status.as_deref()),
            conclusion: self.conclusion,
            created_at: parse_timestamp(self.created_at.as_deref()).unwrap_or(now),
            updated_at: parse_timestamp(self.updated_at.as_deref()).unwrap_or(now),
        }
    }
}

impl GitHubJob {
    pub fn into_job(self) -> Job {
        Job {
            id: self.id,
            name: self.name,
            status: parse_status(self.status.as_deref()),
            conclusion: self.conclusion,
            started_at: parse_timestamp(self.started_at.as_deref()),
            completed_at: parse_timestamp(self.completed_at.as_deref()),
            steps: self
                .steps
                .unwrap_or_default()
                .into_iter()
                .map(GitHubStep::into_step)
                .collect(),
        }
    }
}

impl GitHubStep {
    pub fn into_step(self) -> Step {
        Step {
            name: self.name,
            number: self.number,
            status: parse_status(self.status.as_deref()),
            conclusion: self.conclusion,
            started_at: parse_timestamp(self.started_at.as_deref()),
            completed_at: parse_timestamp(self.completed_at.as_deref()),
        }
    }
}
