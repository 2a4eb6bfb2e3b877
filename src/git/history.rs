//! Git history extraction using libgit2
//!
//! Linearizes a branch, extracts per-commit modifications with their changed
//! lines, and answers blame queries, using the git2 crate (Rust bindings to
//! libgit2).

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use git2::{BranchType, Delta, DiffFindOptions, DiffOptions, Oid, Patch, Repository, Sort};
use std::path::Path;
use tracing::{debug, warn};

use super::{blame, BlameResult, ChangeType, Modification, Vcs};

/// Information about a git commit.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    /// Short hash (12 characters)
    pub hash: String,
    /// Full commit hash
    pub full_hash: String,
    /// Author name
    pub author: String,
    /// Commit timestamp (ISO 8601)
    pub timestamp: String,
    /// Commit message (first line)
    pub message: String,
}

/// A local clone read through libgit2.
pub struct GitRepository {
    pub(super) repo: Repository,
}

impl GitRepository {
    /// Open a git repository.
    ///
    /// # Arguments
    /// * `path` - Path to the repository (or any subdirectory)
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path)
            .with_context(|| format!("Failed to open git repository at {:?}", path))?;
        debug!("Opened git repository at {:?}", repo.path());
        Ok(Self { repo })
    }

    /// Check if a path is inside a git repository.
    pub fn is_git_repo(path: &Path) -> bool {
        Repository::discover(path).is_ok()
    }

    /// Get the repository root path.
    pub fn repo_root(&self) -> Result<&Path> {
        self.repo
            .workdir()
            .context("Repository has no working directory (bare repo?)")
    }

    /// URL of a configured remote, if any.
    pub fn remote_url(&self, name: &str) -> Option<String> {
        self.repo
            .find_remote(name)
            .ok()
            .and_then(|remote| remote.url().map(String::from))
    }

    /// Resolve a branch name (local, then `origin/<name>`, then any revspec).
    fn resolve_branch(&self, branch: &str) -> Result<Oid> {
        if let Ok(local) = self.repo.find_branch(branch, BranchType::Local) {
            return Ok(local.get().peel_to_commit()?.id());
        }
        let remote_name = format!("origin/{}", branch);
        if let Ok(remote) = self.repo.find_branch(&remote_name, BranchType::Remote) {
            return Ok(remote.get().peel_to_commit()?.id());
        }
        let object = self
            .repo
            .revparse_single(branch)
            .with_context(|| format!("Branch '{}' not found", branch))?;
        Ok(object.peel_to_commit()?.id())
    }

    fn find_commit(&self, commit: &str) -> Result<git2::Commit<'_>> {
        let oid = Oid::from_str(commit).with_context(|| format!("Invalid commit id {}", commit))?;
        self.repo
            .find_commit(oid)
            .with_context(|| format!("Commit {} not found", commit))
    }

    /// Summary information for a commit.
    pub fn commit_info(&self, commit: &str) -> Result<CommitInfo> {
        let commit = self.find_commit(commit)?;
        let author = commit.author();
        let full_hash = commit.id().to_string();
        let message = String::from_utf8_lossy(commit.message_bytes())
            .lines()
            .next()
            .unwrap_or("")
            .to_string();

        Ok(CommitInfo {
            hash: full_hash[..full_hash.len().min(12)].to_string(),
            full_hash,
            author: author.name().unwrap_or("Unknown").to_string(),
            timestamp: format_git_time(&commit.time()),
            message,
        })
    }

    /// Text content of a blob; `None` for missing, binary or non-UTF-8 blobs.
    fn blob_text(&self, id: Oid, binary: &mut bool) -> Option<String> {
        if id.is_zero() {
            return None;
        }
        let blob = match self.repo.find_blob(id) {
            Ok(blob) => blob,
            Err(e) => {
                warn!("Unreadable blob {}: {}", id, e);
                return None;
            }
        };
        if blob.is_binary() {
            *binary = true;
            return None;
        }
        match std::str::from_utf8(blob.content()) {
            Ok(text) => Some(text.to_string()),
            Err(_) => {
                *binary = true;
                None
            }
        }
    }

    fn diff_modifications(&self, commit: &git2::Commit) -> Result<Vec<Modification>> {
        if commit.parent_count() > 1 {
            return Ok(vec![]);
        }

        let parent = commit.parent(0).ok();
        let tree = commit.tree()?;
        let parent_tree = parent.as_ref().map(|p| p.tree()).transpose()?;

        let mut diff_opts = DiffOptions::new();
        diff_opts.context_lines(0);

        let mut diff =
            self.repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut diff_opts))?;

        let mut find_opts = DiffFindOptions::new();
        find_opts.renames(true);
        diff.find_similar(Some(&mut find_opts))?;

        let mut modifications = Vec::new();

        for idx in 0..diff.deltas().len() {
            let Some(delta) = diff.get_delta(idx) else {
                continue;
            };

            let change_type = match delta.status() {
                Delta::Added | Delta::Copied => ChangeType::Add,
                Delta::Deleted => ChangeType::Delete,
                Delta::Renamed => ChangeType::Rename,
                Delta::Modified | Delta::Typechange => ChangeType::Modify,
                _ => continue,
            };

            let old_path = match change_type {
                ChangeType::Add => None,
                _ => path_string(delta.old_file().path()),
            };
            let new_path = match change_type {
                ChangeType::Delete => None,
                _ => path_string(delta.new_file().path()),
            };

            let mut modification = Modification::new(change_type, old_path, new_path);
            let mut binary = delta.flags().is_binary();
            modification.source_before = self.blob_text(delta.old_file().id(), &mut binary);
            modification.source_after = self.blob_text(delta.new_file().id(), &mut binary);
            modification.binary = binary;

            if !binary {
                if let Some(patch) = Patch::from_diff(&diff, idx)? {
                    collect_changed_lines(&patch, &mut modification)?;
                }
            }

            modifications.push(modification);
        }

        Ok(modifications)
    }
}

impl Vcs for GitRepository {
    fn list_commits(&self, branch: &str) -> Result<Vec<String>> {
        let head = self.resolve_branch(branch)?;

        let mut revwalk = self.repo.revwalk()?;
        revwalk.push(head)?;
        revwalk.simplify_first_parent()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME | Sort::REVERSE)?;

        let mut commits = Vec::new();
        for oid in revwalk {
            commits.push(oid?.to_string());
        }

        debug!("Branch {} has {} commits", branch, commits.len());
        Ok(commits)
    }

    fn commit_message(&self, commit: &str) -> Result<String> {
        let commit = self.find_commit(commit)?;
        Ok(String::from_utf8_lossy(commit.message_bytes()).into_owned())
    }

    fn modifications(&self, commit: &str) -> Result<Vec<Modification>> {
        let commit = self.find_commit(commit)?;
        self.diff_modifications(&commit)
            .with_context(|| format!("Failed to diff commit {}", commit.id()))
    }

    fn blame_last_modified_lines(
        &self,
        commit: &str,
        modification: &Modification,
    ) -> Result<BlameResult> {
        let commit = self.find_commit(commit)?;
        blame::last_modified_lines(&self.repo, &commit, modification)
    }
}

fn collect_changed_lines(patch: &Patch, modification: &mut Modification) -> Result<()> {
    for hunk_idx in 0..patch.num_hunks() {
        for line_idx in 0..patch.num_lines_in_hunk(hunk_idx)? {
            let line = patch.line_in_hunk(hunk_idx, line_idx)?;
            let content = String::from_utf8_lossy(line.content())
                .trim_end_matches(['\n', '\r'])
                .to_string();
            match line.origin() {
                '+' => {
                    if let Some(lineno) = line.new_lineno() {
                        modification.added_lines.push((lineno, content));
                    }
                }
                '-' => {
                    if let Some(lineno) = line.old_lineno() {
                        modification.deleted_lines.push((lineno, content));
                    }
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn path_string(path: Option<&Path>) -> Option<String> {
    path.map(|p| p.to_string_lossy().replace('\\', "/"))
}

/// Format a git timestamp as ISO 8601.
fn format_git_time(time: &git2::Time) -> String {
    match Utc.timestamp_opt(time.seconds(), 0).single() {
        Some(dt) => dt.to_rfc3339(),
        None => "1970-01-01T00:00:00Z".to_string(),
    }
}
