use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, WatchError};

const STATE_DIR_NAME: &str = ".gha-monitor";

/// Persisted per-repository record.
///
/// `last_completion_time` is the watermark: every completion at or before it
/// has already been reported. `initialized` is false only until the first
/// catch-up pass for the repository has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryState {
    pub repo: String,
    #[serde(
        serialize_with = "serialize_instant",
        deserialize_with = "deserialize_instant"
    )]
    pub last_completion_time: DateTime<Utc>,
    pub initialized: bool,
}

impl RepositoryState {
    /// Record for a repository seen for the first time.
    pub fn fresh(repo: &str, now: DateTime<Utc>) -> Self {
        Self {
            repo: repo.to_string(),
            last_completion_time: now,
            initialized: false,
        }
    }
}

fn serialize_instant<S>(value: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// An unparseable timestamp reads as the Unix epoch rather than failing the load.
fn deserialize_instant<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(DateTime::parse_from_rfc3339(raw.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH))
}

/// Loads and stores [`RepositoryState`] records, one JSON file per repository.
///
/// Files live under `~/.gha-monitor/` by default, named after the repository
/// with `/` replaced by `_` (e.g. `octo/widgets` → `octo_widgets.json`).
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// Creates a store rooted at `dir`, or at `~/.gha-monitor` when `None`.
    ///
    /// # Errors
    ///
    /// Returns `WatchError::State` if no directory is given and the home
    /// directory cannot be determined.
    pub fn new(dir: Option<PathBuf>) -> Result<Self> {
        let dir = match dir {
            Some(dir) => dir,
            None => dirs::home_dir()
                .ok_or_else(|| WatchError::State("Cannot determine user home directory".into()))?
                .join(STATE_DIR_NAME),
        };

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, repo: &str) -> PathBuf {
        self.dir.join(repo.replace('/', "_") + ".json")
    }

    /// Loads the record for `repo`, or returns a fresh one (watermark = now,
    /// not initialized) if none has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the state directory cannot be created or an
    /// existing record cannot be read or parsed.
    pub fn load(&self, repo: &str) -> Result<RepositoryState> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for(repo);
        if !path.exists() {
            info!("No saved state for {repo}, starting fresh");
            return Ok(RepositoryState::fresh(repo, Utc::now()));
        }

        let content = fs::read_to_string(&path)?;
        let state: RepositoryState = serde_json::from_str(&content).map_err(|e| {
            WatchError::State(format!("Corrupt state file {}: {e}", path.display()))
        })?;

        debug!(
            "Loaded state from {}: watermark={} initialized={}",
            path.display(),
            state.last_completion_time,
            state.initialized
        );

        Ok(state)
    }

    /// Writes the record, replacing any previous one for the same repository.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub fn store(&self, state: &RepositoryState) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for(&state.repo);
        let staging = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(state)?;

        fs::write(&staging, content)?;
        fs::rename(&staging, &path)?;

        debug!("Saved state to {}", path.display());

        Ok(())
    }
}
