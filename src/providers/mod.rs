mod github;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Job, Run};

pub use github::GitHubClient;

/// Read-only view of a repository's Actions history, one page at a time.
///
/// Pages are 1-based. The hierarchy walker only talks to this trait, so tests
/// can drive it with canned pages.
#[async_trait]
pub trait ActionsApi: Send + Sync {
    /// Lists workflow runs, newest first.
    async fn list_runs(&self, page: u32, per_page: u32) -> Result<Vec<Run>>;

    /// Lists the jobs of one workflow run, with their steps embedded.
    async fn list_jobs(&self, run_id: u64, page: u32, per_page: u32) -> Result<Vec<Job>>;
}
