use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;

use crate::auth::Token;
use crate::error::{Result, WatchError};
use crate::model::{Job, Run};
use crate::providers::ActionsApi;

use super::types::{WorkflowJobsResponse, WorkflowRunsResponse};

const MAX_PER_PAGE: u32 = 100;

/// Upper bound on a single request, connect through body.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// GitHub REST API client for workflow runs and jobs.
#[derive(Clone)]
pub struct GitHubClient {
    /// HTTP client
    client: reqwest::Client,
    /// Base URL for GitHub API
    base_url: String,
    /// Repository owner
    pub(super) owner: String,
    /// Repository name
    pub(super) repo: String,
}

impl GitHubClient {
    /// Create a new GitHub API client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - GitHub API base URL (e.g., "https://api.github.com")
    /// * `repository` - Repository path in format "owner/repo"
    /// * `token` - GitHub token with Actions read permission
    ///
    /// # Errors
    ///
    /// Returns `WatchError::Config` if the repository path is malformed, the
    /// token is blank or cannot be sent as a header, or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str, repository: &str, token: &Token) -> Result<Self> {
        Self::with_timeout(base_url, repository, token, REQUEST_TIMEOUT)
    }

    /// Like [`GitHubClient::new`], with a custom per-request timeout.
    pub fn with_timeout(
        base_url: &str,
        repository: &str,
        token: &Token,
        timeout: Duration,
    ) -> Result<Self> {
        let (owner, repo) = split_repository(repository)?;

        if token.is_blank() {
            return Err(WatchError::Config("token must not be blank".into()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("gha-watch/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
            .map_err(|e| WatchError::Config(format!("Token is not a valid header value: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| WatchError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    async fn get_page<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {url}");

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(WatchError::Auth {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(WatchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    fn runs_url(&self, page: u32, per_page: u32) -> String {
        format!(
            "{}/repos/{}/{}/actions/runs?page={}&per_page={}",
            self.base_url, self.owner, self.repo, page, per_page
        )
    }

    fn jobs_url(&self, run_id: u64, page: u32, per_page: u32) -> String {
        format!(
            "{}/repos/{}/{}/actions/runs/{}/jobs?page={}&per_page={}",
            self.base_url, self.owner, self.repo, run_id, page, per_page
        )
    }
}

#[async_trait]
impl ActionsApi for GitHubClient {
    async fn list_runs(&self, page: u32, per_page: u32) -> Result<Vec<Run>> {
        check_page(page, per_page)?;

        let response: WorkflowRunsResponse = self.get_page(&self.runs_url(page, per_page)).await?;
        let now = Utc::now();

        Ok(response
            .workflow_runs
            .into_iter()
            .map(|run| run.into_run(now))
            .collect())
    }

    async fn list_jobs(&self, run_id: u64, page: u32, per_page: u32) -> Result<Vec<Job>> {
        check_page(page, per_page)?;

        let response: WorkflowJobsResponse = self
            .get_page(&self.jobs_url(run_id, page, per_page))
            .await?;

        Ok(response.jobs.into_iter().map(|job| job.into_job()).collect())
    }
}

/// Splits "owner/repo", rejecting anything without exactly one slash.
pub(crate) fn split_repository(repository: &str) -> Result<(&str, &str)> {
    match repository.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner, repo))
        }
        _ => Err(WatchError::Config(
            "Repository must be in format 'owner/repo'".into(),
        )),
    }
}

fn check_page(page: u32, per_page: u32) -> Result<()> {
    if page < 1 {
        return Err(WatchError::Config("page must be >= 1".into()));
    }
    if !(1..=MAX_PER_PAGE).contains(&per_page) {
        return Err(WatchError::Config(format!(
            "per_page must be between 1 and {MAX_PER_PAGE}"
        )));
    }
    Ok(())
}
