//! Project-level configuration support
//!
//! Loads per-project configuration from `repominer.toml` or
//! `.repominer.json` in the repository root.
//!
//! # Configuration Format
//!
//! ```toml
//! # repominer.toml
//!
//! [mining]
//! branch = "master"
//! language = "ansible"      # ansible, tosca, any
//! regex = "(bug|fix|error|issue|crash|problem|fail|defect|patch)"
//! labels = ["bug", "type: bug"]
//! exclude_commits = []
//!
//! [tracker]
//! url = "https://github.com/owner/repo"
//! enabled = true
//! max_retries = 3
//! max_wait_secs = 900
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::languages::Language;

pub const DEFAULT_BRANCH: &str = "master";
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_MAX_WAIT_SECS: u64 = 900;

/// Project configuration loaded from repominer.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub mining: MiningConfig,

    #[serde(default)]
    pub tracker: TrackerConfig,
}

/// `[mining]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MiningConfig {
    /// Branch to mine
    pub branch: Option<String>,

    /// Language whose files are considered relevant
    pub language: Option<Language>,

    /// Commit-message pattern for fixing commits
    pub regex: Option<String>,

    /// Issue labels that mark bug reports
    pub labels: Option<Vec<String>>,

    /// Commits never reported as fixing commits
    #[serde(default)]
    pub exclude_commits: Vec<String>,
}

/// `[tracker]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TrackerConfig {
    /// Repository URL on GitHub or GitLab (default: the `origin` remote)
    pub url: Option<String>,

    /// Query the issue tracker at all
    pub enabled: Option<bool>,

    /// Retries after a rate-limit response
    pub max_retries: Option<u32>,

    /// Longest single wait for a rate-limit reset
    pub max_wait_secs: Option<u64>,
}

/// Load project configuration from the repository root
///
/// Searches for config files in order:
/// 1. `repominer.toml`
/// 2. `.repominer.json`
///
/// Returns default configuration if no config file is found or the file
/// cannot be parsed.
pub fn load_project_config(repo_path: &Path) -> ProjectConfig {
    let toml_path = repo_path.join("repominer.toml");
    if toml_path.exists() {
        match load_toml_config(&toml_path) {
            Ok(config) => {
                debug!("Loaded project config from {}", toml_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", toml_path.display(), e);
            }
        }
    }

    let json_path = repo_path.join(".repominer.json");
    if json_path.exists() {
        match load_json_config(&json_path) {
            Ok(config) => {
                debug!("Loaded project config from {}", json_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", json_path.display(), e);
            }
        }
    }

    debug!("No project config found, using defaults");
    ProjectConfig::default()
}

fn load_toml_config(path: &Path) -> anyhow::Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ProjectConfig = toml::from_str(&content)?;
    Ok(config)
}

fn load_json_config(path: &Path) -> anyhow::Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ProjectConfig = serde_json::from_str(&content)?;
    Ok(config)
}

/// Values given on the command line. `None`/empty means "not given".
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub branch: Option<String>,
    pub language: Option<Language>,
    pub regex: Option<String>,
    pub labels: Vec<String>,
    pub url: Option<String>,
    pub no_issues: bool,
    pub exclude_commits: Vec<String>,
}

/// Settings for one mining run, after merging CLI flags over the project
/// config over built-in defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct MinerSettings {
    pub branch: String,
    pub language: Language,
    /// `None` uses the built-in fix pattern
    pub regex: Option<String>,
    /// `None` uses the built-in bug label vocabulary
    pub labels: Option<Vec<String>>,
    pub exclude_commits: HashSet<String>,
    pub tracker_url: Option<String>,
    pub use_tracker: bool,
    pub max_retries: u32,
    pub max_wait: Duration,
}

impl Default for MinerSettings {
    fn default() -> Self {
        Self::resolve(&ProjectConfig::default(), SettingsOverrides::default())
    }
}

impl MinerSettings {
    pub fn resolve(config: &ProjectConfig, overrides: SettingsOverrides) -> Self {
        let mining = &config.mining;
        let tracker = &config.tracker;

        let labels = if overrides.labels.is_empty() {
            mining.labels.clone()
        } else {
            Some(overrides.labels)
        };

        let mut exclude_commits: HashSet<String> = mining.exclude_commits.iter().cloned().collect();
        exclude_commits.extend(overrides.exclude_commits);

        Self {
            branch: overrides
                .branch
                .or_else(|| mining.branch.clone())
                .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            language: overrides.language.or(mining.language).unwrap_or_default(),
            regex: overrides.regex.or_else(|| mining.regex.clone()),
            labels,
            exclude_commits,
            tracker_url: overrides.url.or_else(|| tracker.url.clone()),
            use_tracker: !overrides.no_issues && tracker.enabled.unwrap_or(true),
            max_retries: tracker.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            max_wait: Duration::from_secs(tracker.max_wait_secs.unwrap_or(DEFAULT_MAX_WAIT_SECS)),
        }
    }
}
