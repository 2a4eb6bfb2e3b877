//! Fixing-commit detection
//!
//! Two sources of evidence are combined:
//!
//! 1. **Issues**: closed issues carrying a bug label, and the commit that
//!    closed each one.
//! 2. **Messages**: commits whose message matches the fix pattern.
//!
//! The union is filtered to commits that touch at least one relevant file
//! and returned oldest first.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use rustc_hash::FxHashSet;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::index::CommitIndex;
use crate::git::Vcs;
use crate::issues::{IssueError, IssueResult, IssueTracker};
use crate::languages::RelevantFile;

/// Default message pattern, matched case-insensitively.
pub const DEFAULT_FIX_REGEX: &str = r"(bug|fix|error|issue|crash|problem|fail|defect|patch)";

/// Leading words that only contain "bug"/"fix" as a fragment (`debugs`, `prefixes`).
const FRAGMENT_REGEX: &str = r"^(\w+(bug|fix)\w)*";

/// Labels that mark an issue as a bug report on common trackers.
pub const DEFAULT_BUG_LABELS: &[&str] = &[
    "bug",
    "Bug",
    "BUG",
    "type: bug",
    "Type: Bug",
    "kind/bug",
    "kind: bug",
    "type:bug",
    "T: bug",
    "bug report",
    "defect",
    "Defect",
    "type: defect",
    "regression",
    "Regression",
    "crash",
    "fix",
    "bugfix",
    "type: fix",
    "error",
    "problem",
    "Priority: Critical",
];

/// Commit-message rule for fixing commits.
#[derive(Debug, Clone)]
pub struct FixMessagePattern {
    fragment: Regex,
    pattern: Regex,
}

impl FixMessagePattern {
    /// Compile `pattern`, or [`DEFAULT_FIX_REGEX`] when `None`.
    pub fn new(pattern: Option<&str>) -> Result<Self> {
        let source = pattern.unwrap_or(DEFAULT_FIX_REGEX);
        let pattern = RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Invalid fix regex: {}", source))?;
        let fragment = RegexBuilder::new(FRAGMENT_REGEX)
            .case_insensitive(true)
            .build()
            .context("Invalid fragment regex")?;
        Ok(Self { fragment, pattern })
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn matches(&self, message: &str) -> bool {
        let stripped = self.fragment.replace(message, "");
        self.pattern.is_match(&stripped)
    }
}

pub struct FixingCommitDetector<'a> {
    vcs: &'a dyn Vcs,
    index: &'a CommitIndex,
    relevant: &'a dyn RelevantFile,
}

impl<'a> FixingCommitDetector<'a> {
    pub fn new(vcs: &'a dyn Vcs, index: &'a CommitIndex, relevant: &'a dyn RelevantFile) -> Self {
        Self {
            vcs,
            index,
            relevant,
        }
    }

    /// Fixing commits on the indexed branch, oldest first.
    ///
    /// `labels` defaults to [`DEFAULT_BUG_LABELS`]. Commits in `exclude` are
    /// never returned. Without a tracker only message evidence is used.
    pub fn detect(
        &self,
        tracker: Option<&dyn IssueTracker>,
        exclude: &HashSet<String>,
        labels: Option<&[String]>,
        pattern: &FixMessagePattern,
    ) -> Result<Vec<String>> {
        let mut candidates: FxHashSet<String> = FxHashSet::default();

        if let Some(tracker) = tracker {
            let default_labels: Vec<String>;
            let labels = match labels {
                Some(labels) => labels,
                None => {
                    default_labels = DEFAULT_BUG_LABELS.iter().map(|l| l.to_string()).collect();
                    &default_labels
                }
            };
            let from_issues = self.from_closed_issues(tracker, labels)?;
            info!("{} fixing commits from closed issues", from_issues.len());
            candidates.extend(from_issues);
        }

        let from_messages = self.from_commit_messages(pattern)?;
        info!("{} fixing commits from commit messages", from_messages.len());
        candidates.extend(from_messages);

        let mut commits: Vec<String> = candidates
            .into_iter()
            .filter(|c| !exclude.contains(c))
            .collect();
        self.index.sort(&mut commits);

        self.discard_undesired(commits)
    }

    /// Commits that closed an issue carrying one of `labels`.
    ///
    /// Rate limiting propagates. Any other failure to resolve a single
    /// issue skips that issue.
    pub fn from_closed_issues(
        &self,
        tracker: &dyn IssueTracker,
        labels: &[String],
    ) -> IssueResult<Vec<String>> {
        let repo_labels = tracker.labels()?;
        let mut matching: Vec<&String> = labels.iter().filter(|l| repo_labels.contains(*l)).collect();
        matching.sort();
        matching.dedup();
        debug!("Bug labels on the tracker: {:?}", matching);

        let mut seen_issues = HashSet::new();
        let mut commits = Vec::new();

        for label in matching {
            for issue in tracker.closed_issues(label)? {
                if !seen_issues.insert(issue.number) {
                    continue;
                }
                match tracker.commit_closing_issue(&issue) {
                    Ok(Some(commit)) if self.index.contains(&commit) => {
                        debug!("Issue #{} closed by {}", issue.number, commit);
                        commits.push(commit);
                    }
                    Ok(Some(commit)) => {
                        debug!("Issue #{} closed by {} (not on branch)", issue.number, commit);
                    }
                    Ok(None) => debug!("Issue #{} has no closing commit", issue.number),
                    Err(e @ IssueError::RateLimited { .. }) => return Err(e),
                    Err(e) => warn!("Skipping issue #{}: {}", issue.number, e),
                }
            }
        }

        Ok(commits)
    }

    /// Commits on the branch whose message matches `pattern`.
    pub fn from_commit_messages(&self, pattern: &FixMessagePattern) -> Result<Vec<String>> {
        let mut commits = Vec::new();
        for commit in self.index.commits() {
            let message = self.vcs.commit_message(commit)?;
            if pattern.matches(&message) {
                commits.push(commit.clone());
            }
        }
        Ok(commits)
    }

    /// Keep only commits (oldest first) that touch a relevant file.
    fn discard_undesired(&self, commits: Vec<String>) -> Result<Vec<String>> {
        let mut kept = Vec::with_capacity(commits.len());
        for commit in commits.into_iter().rev() {
            let modifications = self.vcs.modifications(&commit)?;
            if modifications.iter().any(|m| self.relevant.accepts(m)) {
                kept.push(commit);
            } else {
                debug!("Discarding {}: no relevant file touched", commit);
            }
        }
        kept.reverse();
        Ok(kept)
    }
}
