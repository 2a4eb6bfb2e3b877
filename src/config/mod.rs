//! Configuration module for repominer
//!
//! This module handles:
//! - Project-level configuration (repominer.toml)
//! - User-level tracker tokens (~/.config/repominer/config.toml)
//! - Merging CLI flags into the settings of one mining run

mod project_config;
mod user_config;

pub use project_config::{
    load_project_config, MinerSettings, MiningConfig, ProjectConfig, SettingsOverrides, TrackerConfig,
    DEFAULT_BRANCH,
};
pub use user_config::{TokenConfig, UserConfig};
