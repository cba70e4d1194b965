use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file structure for gha-watch.
///
/// Holds defaults for the command-line options so a long-running watcher can
/// be started without repeating them. The token is never read from here;
/// pass it with `--token` or `GITHUB_TOKEN`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Repository to watch (e.g., 'owner/repo')
    pub repo: Option<String>,

    /// GitHub API base URL
    pub api_url: Option<String>,

    /// Poll interval in seconds
    pub interval: Option<u64>,

    /// Directory holding the per-repository state files
    pub state_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./gha-watch.toml
    /// 3. ./gha-watch.json
    /// 4. ./gha-watch.yaml
    /// 5. ./gha-watch.yml
    ///
    /// Returns default configuration if no file is found. An explicitly
    /// specified path that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "gha-watch.toml",
            "gha-watch.json",
            "gha-watch.yaml",
            "gha-watch.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => {
                // Try TOML first, then JSON, then YAML
                toml::from_str(&contents)
                    .ok()
                    .or_else(|| serde_json::from_str(&contents).ok())
                    .or_else(|| serde_yaml::from_str(&contents).ok())
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.repo.is_none());
        assert!(config.api_url.is_none());
        assert!(config.interval.is_none());
        assert!(config.state_dir.is_none());
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
repo = "octo/widgets"
api-url = "https://ghe.example.com/api/v3"
interval = 30
state-dir = "/var/lib/gha-watch"
"#;
        write!(temp_file, "{}", toml_content).unwrap();

        let config = Config::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.repo.as_deref(), Some("octo/widgets"));
        assert_eq!(
            config.api_url.as_deref(),
            Some("https://ghe.example.com/api/v3")
        );
        assert_eq!(config.interval, Some(30));
        assert_eq!(config.state_dir, Some(PathBuf::from("/var/lib/gha-watch")));
    }

    #[test]
    fn test_load_json_config() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        write!(temp_file, r#"{{"repo": "octo/widgets", "interval": 5}}"#).unwrap();

        let config = Config::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.repo.as_deref(), Some("octo/widgets"));
        assert_eq!(config.interval, Some(5));
        assert!(config.api_url.is_none());
    }

    #[test]
    fn test_load_yaml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".yml").unwrap();
        write!(temp_file, "repo: octo/widgets\napi-url: http://localhost:8080\n").unwrap();

        let config = Config::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.repo.as_deref(), Some("octo/widgets"));
        assert_eq!(config.api_url.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn test_unknown_extension_tries_each_format() {
        let mut temp_file = NamedTempFile::with_suffix(".conf").unwrap();
        write!(temp_file, r#"{{"interval": 60}}"#).unwrap();

        let config = Config::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.interval, Some(60));
    }

    #[test]
    fn test_load_missing_explicit_config_fails() {
        let result = Config::load(Some(Path::new("does-not-exist.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "interval = \"soon\"").unwrap();

        let err = Config::load(Some(temp_file.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML config"));
    }
}
