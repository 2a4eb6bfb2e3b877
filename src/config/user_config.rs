//! User-level configuration for repominer
//!
//! Supports loading config from:
//! - Environment variables
//! - ~/.config/repominer/config.toml

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::issues::Host;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UserConfig {
    #[serde(default)]
    pub tokens: TokenConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TokenConfig {
    /// GitHub personal access token
    pub github: Option<String>,

    /// GitLab personal access token
    pub gitlab: Option<String>,
}

impl UserConfig {
    /// Load config from all sources, with priority:
    /// 1. Environment variables (highest)
    /// 2. User config (~/.config/repominer/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = UserConfig::default();

        if let Some(user_config) = Self::user_config_path()
            .filter(|p| p.exists())
            .and_then(|p| std::fs::read_to_string(&p).ok())
            .and_then(|content| toml::from_str::<UserConfig>(&content).ok())
        {
            config.merge(user_config);
        }

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("repominer").join("config.toml"))
    }

    /// Merge another config into this one (other takes priority)
    fn merge(&mut self, other: UserConfig) {
        if other.tokens.github.is_some() {
            self.tokens.github = other.tokens.github;
        }
        if other.tokens.gitlab.is_some() {
            self.tokens.gitlab = other.tokens.gitlab;
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("GITHUB_ACCESS_TOKEN").filter(|t| !t.is_empty()) {
            self.tokens.github = Some(token);
        }
        if let Some(token) = lookup("GITLAB_ACCESS_TOKEN").filter(|t| !t.is_empty()) {
            self.tokens.gitlab = Some(token);
        }
    }

    /// Access token for the given tracker host, if configured
    pub fn token_for(&self, host: Host) -> Option<String> {
        match host {
            Host::GitHub => self.tokens.github.clone(),
            Host::GitLab => self.tokens.gitlab.clone(),
        }
    }
}
