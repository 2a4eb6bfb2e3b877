//! Issue tracker access
//!
//! Fixing commits can be found through the issue tracker: closed issues
//! carrying a bug label, and the commit that closed each one. GitHub and
//! GitLab are supported through their REST APIs over sync HTTP (ureq).
//!
//! # Environment Variables
//!
//! - `GITHUB_ACCESS_TOKEN`: token for GitHub repositories
//! - `GITLAB_ACCESS_TOKEN`: token for GitLab repositories
//!
//! # Example
//!
//! ```rust,ignore
//! use repominer::issues::{parse_remote_url, tracker_for};
//!
//! let remote = parse_remote_url("https://github.com/adriagalin/ansible.motd")?;
//! let tracker = tracker_for(&remote, std::env::var("GITHUB_ACCESS_TOKEN").ok())?;
//! let labels = tracker.labels()?;
//! ```

mod github;
mod gitlab;
mod http;
mod remote;
mod retry;

pub use github::GitHubTracker;
pub use gitlab::GitLabTracker;
pub use remote::{parse_remote_url, Host, RemoteRepo};
pub use retry::RetryingTracker;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur while talking to an issue tracker
#[derive(Error, Debug)]
pub enum IssueError {
    #[error("Rate limited by the issue tracker{}", reset_suffix(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("Unauthorized: check the access token for {host}")]
    Unauthorized { host: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to parse API response: {0}")]
    Parse(String),

    #[error("Unsupported issue tracker host: {0}")]
    UnsupportedHost(String),

    #[error("Malformed repository URL: {0}")]
    MalformedUrl(String),
}

fn reset_suffix(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => format!(" until {}", at.to_rfc3339()),
        None => String::new(),
    }
}

impl From<ureq::Error> for IssueError {
    fn from(e: ureq::Error) -> Self {
        IssueError::Request(e.to_string())
    }
}

pub type IssueResult<T> = Result<T, IssueError>;

/// A closed issue as seen by the miner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Issue {
    /// Issue number (GitHub) or project-scoped iid (GitLab)
    pub number: u64,
    pub title: String,
    pub labels: Vec<String>,
}

/// Read access to a hosted repository's issues.
pub trait IssueTracker {
    /// All label names defined on the repository.
    fn labels(&self) -> IssueResult<HashSet<String>>;

    /// Closed issues carrying `label`.
    fn closed_issues(&self, label: &str) -> IssueResult<Vec<Issue>>;

    /// The commit that closed `issue`, if the tracker recorded one.
    fn commit_closing_issue(&self, issue: &Issue) -> IssueResult<Option<String>>;
}

/// Build the tracker client for a remote.
pub fn tracker_for(remote: &RemoteRepo, token: Option<String>) -> IssueResult<Box<dyn IssueTracker>> {
    match remote.host {
        Host::GitHub => Ok(Box::new(GitHubTracker::new(remote, token))),
        Host::GitLab => Ok(Box::new(GitLabTracker::new(remote, token))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rate_limited_message() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).single();
        let err = IssueError::RateLimited { reset_at: at };
        assert!(err.to_string().starts_with("Rate limited by the issue tracker until 2023-11-14"));

        let err = IssueError::RateLimited { reset_at: None };
        assert_eq!(err.to_string(), "Rate limited by the issue tracker");
    }

    #[test]
    fn test_tracker_for_host() -> IssueResult<()> {
        let remote = parse_remote_url("https://gitlab.com/group/project")?;
        assert!(tracker_for(&remote, None).is_ok());
        Ok(())
    }
}
