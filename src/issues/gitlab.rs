//! GitLab issue tracker
//!
//! Closing commits come from the issue's `closed_by` merge requests. Issues
//! closed straight from a commit push leave a system note instead
//! (`closed via commit 1a2b3c4d`), which is used as the fallback.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::OnceLock;

use super::http::{make_agent, read_json, PER_PAGE, USER_AGENT};
use super::{Issue, IssueResult, IssueTracker, RemoteRepo};

pub struct GitLabTracker {
    api_base: String,
    domain: String,
    project_id: String,
    token: Option<String>,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct GlLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GlIssue {
    iid: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GlMergeRequest {
    #[serde(default)]
    state: String,
    #[serde(default)]
    merge_commit_sha: Option<String>,
    #[serde(default)]
    squash_commit_sha: Option<String>,
    #[serde(default)]
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlNote {
    #[serde(default)]
    body: String,
    #[serde(default)]
    system: bool,
}

impl GitLabTracker {
    pub fn new(remote: &RemoteRepo, token: Option<String>) -> Self {
        Self {
            api_base: remote.api_base(),
            domain: remote.domain.clone(),
            project_id: remote.full_name.replace('/', "%2F"),
            token,
            agent: make_agent(),
        }
    }

    fn get_all<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> IssueResult<Vec<T>> {
        let url = format!("{}/projects/{}{}", self.api_base, self.project_id, path);
        let per_page = PER_PAGE.to_string();
        let mut items = Vec::new();
        let mut page = 1usize;

        loop {
            let mut req = self
                .agent
                .get(&url)
                .header("User-Agent", USER_AGENT)
                .query("per_page", &per_page)
                .query("page", page.to_string());
            if let Some(token) = &self.token {
                req = req.header("PRIVATE-TOKEN", token.as_str());
            }
            for (key, value) in query {
                req = req.query(*key, *value);
            }

            let batch: Vec<T> = read_json(req.call()?, &self.domain, &url)?;
            let done = batch.len() < PER_PAGE;
            items.extend(batch);
            if done {
                break;
            }
            page += 1;
        }

        Ok(items)
    }
}

impl IssueTracker for GitLabTracker {
    fn labels(&self) -> IssueResult<HashSet<String>> {
        let labels: Vec<GlLabel> = self.get_all("/labels", &[])?;
        Ok(labels.into_iter().map(|l| l.name).collect())
    }

    fn closed_issues(&self, label: &str) -> IssueResult<Vec<Issue>> {
        let issues: Vec<GlIssue> =
            self.get_all("/issues", &[("state", "closed"), ("labels", label)])?;
        Ok(issues
            .into_iter()
            .map(|i| Issue {
                number: i.iid,
                title: i.title,
                labels: i.labels,
            })
            .collect())
    }

    fn commit_closing_issue(&self, issue: &Issue) -> IssueResult<Option<String>> {
        let merge_requests: Vec<GlMergeRequest> =
            self.get_all(&format!("/issues/{}/closed_by", issue.number), &[])?;
        if let Some(sha) = closing_commit_from_merge_requests(&merge_requests) {
            return Ok(Some(sha));
        }

        let notes: Vec<GlNote> = self.get_all(
            &format!("/issues/{}/notes", issue.number),
            &[("sort", "desc")],
        )?;
        Ok(closing_commit_from_notes(&notes))
    }
}

/// The commit a merged MR landed as. Merged MRs win over open ones.
fn closing_commit_from_merge_requests(merge_requests: &[GlMergeRequest]) -> Option<String> {
    let landed = |mr: &GlMergeRequest| {
        mr.merge_commit_sha
            .clone()
            .or_else(|| mr.squash_commit_sha.clone())
            .or_else(|| mr.sha.clone())
    };
    merge_requests
        .iter()
        .filter(|mr| mr.state == "merged")
        .find_map(landed)
        .or_else(|| merge_requests.iter().find_map(landed))
}

fn closing_commit_from_notes(notes: &[GlNote]) -> Option<String> {
    static CLOSED_VIA: OnceLock<Regex> = OnceLock::new();
    let closed_via = CLOSED_VIA.get_or_init(|| {
        Regex::new(r"(?i)closed via commit ([0-9a-f]{7,40})").expect("valid regex")
    });
    notes
        .iter()
        .filter(|n| n.system)
        .find_map(|n| closed_via.captures(&n.body))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
