//! Core data models for repominer
//!
//! Records produced by the mining stages and their JSON encoding. The
//! field names are the on-disk schema shared with downstream tools:
//!
//! - fixed file: `{"filepath", "fic", "bic"}`
//! - failure-prone file: `{"filepath", "commit", "fixing_commit"}`
//! - fixing commits: a JSON array of commit ids

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A file path implicated by a fixing commit.
///
/// Equality and hashing look at `filepath` only. The resolver relies on
/// this to find the pending record for a path and merge into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedFile {
    /// Path of the file at the time of the fixing commit
    pub filepath: String,
    /// Fixing commit
    pub fic: String,
    /// Bug-inducing commit
    pub bic: String,
}

impl FixedFile {
    pub fn new(
        filepath: impl Into<String>,
        fic: impl Into<String>,
        bic: impl Into<String>,
    ) -> Self {
        Self {
            filepath: filepath.into(),
            fic: fic.into(),
            bic: bic.into(),
        }
    }

    /// Defect introduced and fixed by the same commit; labels nothing.
    pub fn has_only_one_commit(&self) -> bool {
        self.fic == self.bic
    }

    fn validate(&self) -> Result<()> {
        if self.filepath.is_empty() || self.fic.is_empty() || self.bic.is_empty() {
            bail!("fixed file record has an empty field: {:?}", self);
        }
        Ok(())
    }
}

impl PartialEq for FixedFile {
    fn eq(&self, other: &Self) -> bool {
        self.filepath == other.filepath
    }
}

impl Eq for FixedFile {}

impl Hash for FixedFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.filepath.hash(state);
    }
}

/// A version of a file (path at a given commit) that lies inside a
/// bug-inducing → fixing window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureProneFile {
    /// Path of the file at `commit`
    pub filepath: String,
    /// Commit whose version of the file is labeled
    pub commit: String,
    /// Fixing commit of the window that produced this label
    pub fixing_commit: String,
}

impl FailureProneFile {
    pub fn new(
        filepath: impl Into<String>,
        commit: impl Into<String>,
        fixing_commit: impl Into<String>,
    ) -> Self {
        Self {
            filepath: filepath.into(),
            commit: commit.into(),
            fixing_commit: fixing_commit.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.filepath.is_empty() || self.commit.is_empty() || self.fixing_commit.is_empty() {
            bail!("failure-prone record has an empty field: {:?}", self);
        }
        Ok(())
    }
}

impl PartialEq for FailureProneFile {
    fn eq(&self, other: &Self) -> bool {
        self.filepath == other.filepath && self.commit == other.commit
    }
}

impl Eq for FailureProneFile {}

impl Hash for FailureProneFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.filepath.hash(state);
        self.commit.hash(state);
    }
}

pub fn encode_fixing_commits(commits: &[String]) -> Result<String> {
    Ok(serde_json::to_string_pretty(commits)?)
}

pub fn decode_fixing_commits(json: &str) -> Result<Vec<String>> {
    let commits: Vec<String> =
        serde_json::from_str(json).context("Invalid fixing commits JSON")?;
    if commits.iter().any(|c| c.is_empty()) {
        bail!("fixing commits contain an empty id");
    }
    Ok(commits)
}

pub fn encode_fixed_files(files: &[FixedFile]) -> Result<String> {
    Ok(serde_json::to_string_pretty(files)?)
}

pub fn decode_fixed_files(json: &str) -> Result<Vec<FixedFile>> {
    let files: Vec<FixedFile> = serde_json::from_str(json).context("Invalid fixed files JSON")?;
    for file in &files {
        file.validate()?;
    }
    Ok(files)
}

pub fn encode_failure_prone_files(files: &[FailureProneFile]) -> Result<String> {
    Ok(serde_json::to_string_pretty(files)?)
}

pub fn decode_failure_prone_files(json: &str) -> Result<Vec<FailureProneFile>> {
    let files: Vec<FailureProneFile> =
        serde_json::from_str(json).context("Invalid failure-prone files JSON")?;
    for file in &files {
        file.validate()?;
    }
    Ok(files)
}
