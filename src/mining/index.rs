//! Commit ordering arena
//!
//! Commit order is position in the branch's linearized, oldest-first commit
//! list, never hash or timestamp comparison. Positions are computed once per
//! run so every "happened before" check is a map lookup.

use anyhow::Result;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::git::Vcs;

/// Oldest-first commit list with O(1) position lookup.
#[derive(Debug, Clone, Default)]
pub struct CommitIndex {
    order: Vec<String>,
    positions: FxHashMap<String, usize>,
}

impl CommitIndex {
    pub fn new(order: Vec<String>) -> Self {
        let positions = order
            .iter()
            .enumerate()
            .map(|(pos, commit)| (commit.clone(), pos))
            .collect();
        Self { order, positions }
    }

    /// Index the commits of `branch`.
    pub fn from_vcs(vcs: &dyn Vcs, branch: &str) -> Result<Self> {
        let index = Self::new(vcs.list_commits(branch)?);
        debug!("Indexed {} commits on {}", index.len(), branch);
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn commits(&self) -> &[String] {
        &self.order
    }

    pub fn position(&self, commit: &str) -> Option<usize> {
        self.positions.get(commit).copied()
    }

    pub fn contains(&self, commit: &str) -> bool {
        self.positions.contains_key(commit)
    }

    pub fn commit_at(&self, position: usize) -> Option<&str> {
        self.order.get(position).map(String::as_str)
    }

    /// Sort commits oldest first. Commits not on the branch are dropped.
    pub fn sort(&self, commits: &mut Vec<String>) {
        commits.retain(|c| self.contains(c));
        commits.sort_by_key(|c| self.positions[c.as_str()]);
    }

    /// Commits from `newest` down to `oldest`, both inclusive.
    pub fn walk_back(&self, newest: usize, oldest: usize) -> impl Iterator<Item = (usize, &str)> {
        let newest = newest.min(self.order.len().saturating_sub(1));
        let range = if self.order.is_empty() || oldest > newest {
            0..0
        } else {
            oldest..newest + 1
        };
        range.rev().map(move |pos| (pos, self.order[pos].as_str()))
    }

    /// The oldest of `candidates` that occurs strictly before `before`.
    pub fn oldest_before<'c>(
        &self,
        candidates: impl IntoIterator<Item = &'c String>,
        before: usize,
    ) -> Option<(usize, &'c String)> {
        candidates
            .into_iter()
            .filter_map(|c| self.position(c).map(|pos| (pos, c)))
            .filter(|(pos, _)| *pos < before)
            .min_by_key(|(pos, _)| *pos)
    }
}
