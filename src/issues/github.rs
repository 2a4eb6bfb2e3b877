//! GitHub issue tracker
//!
//! The closing commit of an issue is read from its events: a `closed` or
//! `merged` event that carries a `commit_id`. When the issue was closed
//! by hand, a `referenced` commit whose message uses a closing keyword for
//! the issue (`fixes #12`) is accepted instead.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;

use super::http::{make_agent, read_json, PER_PAGE, USER_AGENT};
use super::{Issue, IssueResult, IssueTracker, RemoteRepo};

pub struct GitHubTracker {
    api_base: String,
    domain: String,
    full_name: String,
    token: Option<String>,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct GhLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GhIssue {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    labels: Vec<GhLabel>,
    /// Present when the "issue" is a pull request
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GhEvent {
    event: String,
    #[serde(default)]
    commit_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GhCommit {
    commit: GhCommitDetail,
}

#[derive(Debug, Deserialize)]
struct GhCommitDetail {
    message: String,
}

impl GitHubTracker {
    pub fn new(remote: &RemoteRepo, token: Option<String>) -> Self {
        Self {
            api_base: remote.api_base(),
            domain: remote.domain.clone(),
            full_name: remote.full_name.clone(),
            token,
            agent: make_agent(),
        }
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> IssueResult<T> {
        let url = format!("{}/repos/{}{}", self.api_base, self.full_name, path);
        let mut req = self
            .agent
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT);

        if let Some(token) = &self.token {
            req = req.header("Authorization", &format!("Bearer {}", token));
        }
        for (key, value) in query {
            req = req.query(*key, *value);
        }

        let response = req.call()?;
        read_json(response, &self.domain, &url)
    }

    fn get_all<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> IssueResult<Vec<T>> {
        let per_page = PER_PAGE.to_string();
        let mut items = Vec::new();
        let mut page = 1usize;

        loop {
            let page_str = page.to_string();
            let mut page_query = query.to_vec();
            page_query.push(("per_page", &per_page));
            page_query.push(("page", &page_str));

            let batch: Vec<T> = self.get(path, &page_query)?;
            let done = batch.len() < PER_PAGE;
            items.extend(batch);
            if done {
                break;
            }
            page += 1;
        }

        Ok(items)
    }

    fn commit_message(&self, sha: &str) -> IssueResult<String> {
        let commit: GhCommit = self.get(&format!("/commits/{}", sha), &[])?;
        Ok(commit.commit.message)
    }
}

impl IssueTracker for GitHubTracker {
    fn labels(&self) -> IssueResult<HashSet<String>> {
        let labels: Vec<GhLabel> = self.get_all("/labels", &[])?;
        Ok(labels.into_iter().map(|l| l.name).collect())
    }

    fn closed_issues(&self, label: &str) -> IssueResult<Vec<Issue>> {
        let issues: Vec<GhIssue> =
            self.get_all("/issues", &[("state", "closed"), ("labels", label)])?;
        Ok(issues
            .into_iter()
            .filter(|i| i.pull_request.is_none())
            .map(|i| Issue {
                number: i.number,
                title: i.title,
                labels: i.labels.into_iter().map(|l| l.name).collect(),
            })
            .collect())
    }

    fn commit_closing_issue(&self, issue: &Issue) -> IssueResult<Option<String>> {
        let events: Vec<GhEvent> =
            self.get_all(&format!("/issues/{}/events", issue.number), &[])?;

        if let Some(sha) = closing_commit_from_events(&events) {
            return Ok(Some(sha));
        }

        for sha in referenced_commits(&events) {
            let message = self.commit_message(&sha)?;
            if mentions_closing(&message, issue.number) {
                debug!("Issue #{} closed by reference in {}", issue.number, sha);
                return Ok(Some(sha));
            }
        }

        Ok(None)
    }
}

/// Commit of the last `closed`/`merged` event that names one.
fn closing_commit_from_events(events: &[GhEvent]) -> Option<String> {
    events
        .iter()
        .rev()
        .filter(|e| e.event == "closed" || e.event == "merged")
        .find_map(|e| e.commit_id.clone())
}

/// Commits that referenced the issue, newest first.
fn referenced_commits(events: &[GhEvent]) -> Vec<String> {
    let mut seen = HashSet::new();
    events
        .iter()
        .rev()
        .filter(|e| e.event == "referenced")
        .filter_map(|e| e.commit_id.clone())
        .filter(|sha| seen.insert(sha.clone()))
        .collect()
}

/// Whether `message` closes issue `number` using a GitHub closing keyword.
fn mentions_closing(message: &str, number: u64) -> bool {
    static CLOSING: OnceLock<Regex> = OnceLock::new();
    let closing = CLOSING.get_or_init(|| {
        Regex::new(r"(?i)\b(?:close[sd]?|fix(?:e[sd])?|resolve[sd]?)\s*:?\s+#(\d+)\b")
            .expect("valid regex")
    });
    closing
        .captures_iter(message)
        .filter_map(|c| c.get(1)?.as_str().parse::<u64>().ok())
        .any(|n| n == number)
}
