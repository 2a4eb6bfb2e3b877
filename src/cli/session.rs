//! Shared setup for the mining commands

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use super::MiningArgs;
use crate::config::{load_project_config, MinerSettings, SettingsOverrides, UserConfig};
use crate::git::GitRepository;
use crate::issues::{parse_remote_url, tracker_for, IssueTracker, RetryingTracker};
use crate::languages::RelevantFile;
use crate::mining::{FixMessagePattern, Miner};
use crate::models::{decode_fixed_files, decode_fixing_commits, FixedFile};

/// An opened repository and the settings of this run.
pub(super) struct Session {
    pub repo: GitRepository,
    pub settings: MinerSettings,
    relevant: Box<dyn RelevantFile>,
}

impl Session {
    pub fn open(path: &Path, args: &MiningArgs, exclude_commits: Vec<String>) -> Result<Self> {
        let repo_path = path
            .canonicalize()
            .with_context(|| format!("Path does not exist: {}", path.display()))?;
        let repo = GitRepository::open(&repo_path)?;
        let root = repo.repo_root()?.to_path_buf();

        let project = load_project_config(&root);
        let settings = MinerSettings::resolve(
            &project,
            SettingsOverrides {
                branch: args.branch.clone(),
                language: args.language,
                regex: args.regex.clone(),
                labels: args.labels.clone(),
                url: args.url.clone(),
                no_issues: args.no_issues,
                exclude_commits,
            },
        );
        info!(
            "Mining {} on branch {} ({} files)",
            root.display(),
            settings.branch,
            settings.language
        );

        let relevant = settings.language.predicate();
        Ok(Self {
            repo,
            settings,
            relevant,
        })
    }

    pub fn miner(&self) -> Result<Miner<'_>> {
        Miner::new(&self.repo, &self.settings.branch, self.relevant.as_ref())
    }

    pub fn pattern(&self) -> Result<FixMessagePattern> {
        FixMessagePattern::new(self.settings.regex.as_deref())
    }

    pub fn exclude_commits(&self) -> &HashSet<String> {
        &self.settings.exclude_commits
    }

    /// Issue tracker for this repository, wrapped with rate-limit retries.
    ///
    /// An explicit URL that cannot be used is an error. When the URL comes
    /// from the `origin` remote, an unsupported host only disables issue
    /// evidence.
    pub fn tracker(&self) -> Result<Option<Box<dyn IssueTracker>>> {
        if !self.settings.use_tracker {
            return Ok(None);
        }

        let remote = match &self.settings.tracker_url {
            Some(url) => parse_remote_url(url)?,
            None => {
                let Some(origin) = self.repo.remote_url("origin") else {
                    info!("No origin remote; using commit messages only");
                    return Ok(None);
                };
                match parse_remote_url(&origin) {
                    Ok(remote) => remote,
                    Err(e) => {
                        warn!("Issue tracker disabled: {}", e);
                        return Ok(None);
                    }
                }
            }
        };

        let token = UserConfig::load()?.token_for(remote.host);
        if token.is_none() {
            warn!(
                "No access token for {}; unauthenticated requests are heavily rate limited",
                remote.domain
            );
        }

        let tracker = tracker_for(&remote, token)?;
        Ok(Some(Box::new(RetryingTracker::new(
            tracker,
            self.settings.max_retries,
            self.settings.max_wait,
        ))))
    }
}

pub(super) fn read_commit_list(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    decode_fixing_commits(&content).with_context(|| format!("Invalid commit list in {}", path.display()))
}

pub(super) fn read_fixed_files(path: &Path) -> Result<Vec<FixedFile>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    decode_fixed_files(&content).with_context(|| format!("Invalid fixed files in {}", path.display()))
}
