//! Version-control access for the miner
//!
//! Provides the linearized commit history, per-commit modifications and
//! line blame that the mining stages consume.
//!
//! # Features
//!
//! - List the commits of a branch, oldest first
//! - Extract modifications (add/modify/rename/delete) with changed lines
//! - Blame the lines a modification removed back to the commits that wrote them
//! - Check out a commit for the duration of a scope and restore HEAD afterwards
//!
//! # Example
//!
//! ```no_run
//! use repominer::git::{GitRepository, Vcs};
//! use std::path::Path;
//!
//! let repo = GitRepository::open(Path::new("/path/to/repo")).unwrap();
//! let commits = repo.list_commits("master").unwrap();
//! for commit in &commits {
//!     let modifications = repo.modifications(commit).unwrap();
//!     println!("{} touched {} files", commit, modifications.len());
//! }
//! ```

pub mod blame;
pub mod checkout;
pub mod history;
pub mod memory;

pub use blame::LineBlame;
pub use checkout::{contained_path, Checkout};
pub use history::{CommitInfo, GitRepository};
pub use memory::MemoryRepository;

use anyhow::Result;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Commits that last touched the changed lines, keyed by file path.
pub type BlameResult = HashMap<String, HashSet<String>>;

/// Kind of change a commit made to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Add,
    Modify,
    Rename,
    Delete,
}

/// One file touched by one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    pub change_type: ChangeType,
    /// Path before the commit (`None` for additions)
    pub old_path: Option<String>,
    /// Path after the commit (`None` for deletions)
    pub new_path: Option<String>,
    /// File content before the commit, if text
    pub source_before: Option<String>,
    /// File content after the commit, if text
    pub source_after: Option<String>,
    /// Either side of the change is binary
    pub binary: bool,
    /// Lines added, as (line number in the new file, content)
    pub added_lines: Vec<(u32, String)>,
    /// Lines removed, as (line number in the old file, content)
    pub deleted_lines: Vec<(u32, String)>,
}

impl Modification {
    fn new(change_type: ChangeType, old_path: Option<String>, new_path: Option<String>) -> Self {
        Self {
            change_type,
            old_path,
            new_path,
            source_before: None,
            source_after: None,
            binary: false,
            added_lines: Vec::new(),
            deleted_lines: Vec::new(),
        }
    }

    pub fn added(path: impl Into<String>) -> Self {
        Self::new(ChangeType::Add, None, Some(path.into()))
    }

    pub fn modified(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(ChangeType::Modify, Some(path.clone()), Some(path))
    }

    pub fn renamed(old_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        Self::new(
            ChangeType::Rename,
            Some(old_path.into()),
            Some(new_path.into()),
        )
    }

    pub fn deleted(path: impl Into<String>) -> Self {
        Self::new(ChangeType::Delete, Some(path.into()), None)
    }

    pub fn with_source_after(mut self, source: impl Into<String>) -> Self {
        self.source_after = Some(source.into());
        self
    }

    pub fn with_deleted_line(mut self, line: u32, content: impl Into<String>) -> Self {
        self.deleted_lines.push((line, content.into()));
        self
    }

    pub fn with_added_line(mut self, line: u32, content: impl Into<String>) -> Self {
        self.added_lines.push((line, content.into()));
        self
    }

    /// The path the file has after the commit, or before it for deletions.
    pub fn path(&self) -> &str {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .unwrap_or_default()
    }

    /// Text content on the side of the change that still exists.
    pub fn content(&self) -> Option<&str> {
        match self.change_type {
            ChangeType::Delete => self.source_before.as_deref(),
            _ => self.source_after.as_deref(),
        }
    }
}

/// Read access to a repository's history.
///
/// Implemented by [`GitRepository`] over libgit2 and by [`MemoryRepository`]
/// for scripted histories.
pub trait Vcs {
    /// All commit ids reachable from `branch`, oldest first.
    fn list_commits(&self, branch: &str) -> Result<Vec<String>>;

    /// Full commit message.
    fn commit_message(&self, commit: &str) -> Result<String>;

    /// Files touched by `commit` relative to its parent. Merge commits have none.
    fn modifications(&self, commit: &str) -> Result<Vec<Modification>>;

    /// Commits that last touched the lines `modification` removed at `commit`.
    fn blame_last_modified_lines(
        &self,
        commit: &str,
        modification: &Modification,
    ) -> Result<BlameResult>;
}
