//! Scripted in-memory history
//!
//! A [`Vcs`] whose commits, modifications and blame answers are supplied by
//! the caller. Useful for replaying recorded histories and for exercising
//! the mining stages without a clone.

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use std::collections::HashSet;

use super::{BlameResult, Modification, Vcs};

#[derive(Debug, Clone)]
struct MemoryCommit {
    hash: String,
    message: String,
    modifications: Vec<Modification>,
}

/// Linear history held in memory, oldest commit first.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    commits: Vec<MemoryCommit>,
    positions: FxHashMap<String, usize>,
    /// (commit, path) -> blamed commits
    blame: FxHashMap<(String, String), HashSet<String>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a commit on top of the history.
    pub fn commit(
        &mut self,
        hash: impl Into<String>,
        message: impl Into<String>,
        modifications: Vec<Modification>,
    ) -> &mut Self {
        let hash = hash.into();
        self.positions.insert(hash.clone(), self.commits.len());
        self.commits.push(MemoryCommit {
            hash,
            message: message.into(),
            modifications,
        });
        self
    }

    /// Answer blame queries for `path` at `commit` with `blamed`.
    pub fn blame(
        &mut self,
        commit: impl Into<String>,
        path: impl Into<String>,
        blamed: &[&str],
    ) -> &mut Self {
        self.blame
            .entry((commit.into(), path.into()))
            .or_default()
            .extend(blamed.iter().map(|c| c.to_string()));
        self
    }

    fn find(&self, commit: &str) -> Result<&MemoryCommit> {
        self.positions
            .get(commit)
            .map(|&pos| &self.commits[pos])
            .with_context(|| format!("Commit {} not found", commit))
    }
}

impl Vcs for MemoryRepository {
    fn list_commits(&self, _branch: &str) -> Result<Vec<String>> {
        Ok(self.commits.iter().map(|c| c.hash.clone()).collect())
    }

    fn commit_message(&self, commit: &str) -> Result<String> {
        Ok(self.find(commit)?.message.clone())
    }

    fn modifications(&self, commit: &str) -> Result<Vec<Modification>> {
        Ok(self.find(commit)?.modifications.clone())
    }

    fn blame_last_modified_lines(
        &self,
        commit: &str,
        modification: &Modification,
    ) -> Result<BlameResult> {
        self.find(commit)?;
        let mut result = BlameResult::new();
        for path in [&modification.old_path, &modification.new_path]
            .into_iter()
            .flatten()
        {
            if let Some(blamed) = self.blame.get(&(commit.to_string(), path.clone())) {
                result.insert(path.clone(), blamed.clone());
            }
        }
        Ok(result)
    }
}
