use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use log::info;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::Token;
use crate::config::Config;
use crate::error::WatchError;
use crate::providers::GitHubClient;
use crate::shutdown::{self, StopSignal};
use crate::state::StateStore;
use crate::watch::{Monitor, StdoutSink};

const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_INTERVAL_SECONDS: u64 = 15;

#[derive(Parser, Debug)]
#[command(name = "gha-watch")]
#[command(author, version, about = "Watch GitHub Actions runs, jobs and steps", long_about = None)]
pub struct Cli {
    /// Repository in the form owner/repo
    #[arg(short, long, value_parser = parse_repo)]
    repo: Option<String>,

    /// GitHub token with Actions read permission
    #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true, value_parser = parse_token)]
    token: String,

    /// Poll interval in seconds [default: 15]
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// GitHub API base URL [default: https://api.github.com]
    #[arg(long)]
    api_url: Option<String>,

    /// Directory for per-repository state files [default: ~/.gha-monitor]
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Configuration file providing defaults for the options above
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Fully resolved options: command line over config file over defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub repo: String,
    pub token: Token,
    pub interval: Duration,
    pub api_url: String,
    pub state_dir: Option<PathBuf>,
}

fn parse_repo(value: &str) -> std::result::Result<String, String> {
    match value.split_once('/') {
        Some((owner, repo))
            if !owner.trim().is_empty() && !repo.trim().is_empty() && !repo.contains('/') =>
        {
            Ok(value.to_string())
        }
        _ => Err("repository must be in format owner/repo".to_string()),
    }
}

fn parse_token(value: &str) -> std::result::Result<String, String> {
    if value.trim().is_empty() {
        Err("token must not be blank".to_string())
    } else {
        Ok(value.to_string())
    }
}

impl Cli {
    /// Merges the command line with `config`.
    ///
    /// # Errors
    ///
    /// Returns `WatchError::Config` if no repository is given anywhere, or a
    /// value taken from the config file is invalid.
    pub fn resolve(&self, config: Config) -> std::result::Result<Settings, WatchError> {
        let repo = match self.repo.clone().or(config.repo) {
            Some(repo) => parse_repo(&repo).map_err(WatchError::Config)?,
            None => {
                return Err(WatchError::Config(
                    "Missing required --repo <owner/repo> argument".into(),
                ))
            }
        };

        let interval = self
            .interval
            .or(config.interval)
            .unwrap_or(DEFAULT_INTERVAL_SECONDS);
        if interval == 0 {
            return Err(WatchError::Config("interval must be > 0".into()));
        }

        Ok(Settings {
            repo,
            token: Token::from(self.token.as_str()),
            interval: Duration::from_secs(interval),
            api_url: self
                .api_url
                .clone()
                .or(config.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            state_dir: self.state_dir.clone().or(config.state_dir),
        })
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let settings = match self.resolve(config) {
            Ok(settings) => settings,
            Err(e) => Cli::command().error(ErrorKind::InvalidValue, e).exit(),
        };

        let client = GitHubClient::new(&settings.api_url, &settings.repo, &settings.token)
            .context("Failed to create GitHub client")?;

        let store = StateStore::new(settings.state_dir.clone())?;
        let state = store
            .load(&settings.repo)
            .with_context(|| format!("Failed to load state for {}", settings.repo))?;
        info!("Using state directory: {}", store.dir().display());

        let stop = StopSignal::new();
        shutdown::install(stop.clone());

        let monitor = Monitor::new(client, StdoutSink, store, state, settings.interval, stop);
        let final_state = monitor.run().await;

        info!(
            "Stopped watching {} (watermark {})",
            final_state.repo, final_state.last_completion_time
        );

        Ok(())
    }
}
