use std::fmt;

use chrono::{DateTime, Utc};

/// Lifecycle status reported by the Actions API for runs, jobs and steps.
///
/// Matching is case-insensitive. Anything the watcher does not act on is kept
/// verbatim in `Other` so it can still be printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Queued,
    InProgress,
    Completed,
    Other(String),
}

impl Status {
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("queued") {
            Self::Queued
        } else if raw.eq_ignore_ascii_case("in_progress") {
            Self::InProgress
        } else if raw.eq_ignore_ascii_case("completed") {
            Self::Completed
        } else {
            Self::Other(raw.to_owned())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A workflow run.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub id: u64,
    pub name: Option<String>,
    pub run_number: u64,
    pub head_branch: Option<String>,
    pub head_sha: Option<String>,
    pub status: Option<Status>,
    /// Only set once `status` is completed
    pub conclusion: Option<String>,
    /// Falls back to the observation time when the API value is missing or unparseable
    pub created_at: DateTime<Utc>,
    /// Falls back to the observation time when the API value is missing or unparseable
    pub updated_at: DateTime<Utc>,
}

/// A job within a workflow run. Steps arrive embedded in the job payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: u64,
    pub name: Option<String>,
    pub status: Option<Status>,
    pub conclusion: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub steps: Vec<Step>,
}

/// A step within a job, identified by `(job id, number)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub name: Option<String>,
    /// 1-based, unique within the owning job
    pub number: u32,
    pub status: Option<Status>,
    pub conclusion: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Run {
    pub fn is(&self, status: &Status) -> bool {
        self.status.as_ref() == Some(status)
    }
}
