//! Line blame for bug-inducing commit identification
//!
//! For a modification, the lines it removed are blamed in the parent
//! revision: the commit that last wrote each of those lines is a candidate
//! bug-inducing commit. Blank lines and comment-only lines are skipped since
//! they cannot carry a defect.

use anyhow::{Context, Result};
use git2::{BlameOptions, Oid, Repository};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use super::{BlameResult, ChangeType, Modification};

/// Blame information for a single line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineBlame {
    /// Line number (1-indexed) in the blamed revision
    pub line: u32,
    /// Full hash of the commit that last modified the line
    pub commit: String,
}

/// Lines with no content worth attributing.
pub fn is_useless_line(line: &str) -> bool {
    let line = line.trim();
    line.is_empty()
        || line.starts_with('#')
        || line.starts_with("//")
        || line.starts_with("/*")
        || line.starts_with("'''")
        || line.starts_with("\"\"\"")
        || line.starts_with('*')
}

/// Blame specific lines of `file_path` as of revision `at`.
///
/// Lines beyond the end of the file are ignored.
pub fn blame_lines_at(
    repo: &Repository,
    at: Oid,
    file_path: &str,
    lines: &[u32],
) -> Result<Vec<LineBlame>> {
    if lines.is_empty() {
        return Ok(vec![]);
    }

    let mut opts = BlameOptions::new();
    opts.newest_commit(at);

    let blame = repo
        .blame_file(Path::new(file_path), Some(&mut opts))
        .with_context(|| format!("Failed to blame {} at {}", file_path, at))?;

    let mut entries = Vec::new();
    for &line in lines {
        if line == 0 {
            continue;
        }
        if let Some(hunk) = blame.get_line(line as usize) {
            entries.push(LineBlame {
                line,
                commit: hunk.final_commit_id().to_string(),
            });
        }
    }

    Ok(entries)
}

/// Commits that last touched the lines removed by `modification` in `commit`.
///
/// Returns an empty result for additions, root commits and modifications
/// that removed only blank or comment lines.
pub fn last_modified_lines(
    repo: &Repository,
    commit: &git2::Commit,
    modification: &Modification,
) -> Result<BlameResult> {
    let mut result = BlameResult::new();

    if modification.change_type == ChangeType::Add {
        return Ok(result);
    }
    let Some(old_path) = modification.old_path.as_deref() else {
        return Ok(result);
    };
    let Ok(parent) = commit.parent(0) else {
        return Ok(result);
    };

    let lines: Vec<u32> = modification
        .deleted_lines
        .iter()
        .filter(|(_, content)| !is_useless_line(content))
        .map(|(line, _)| *line)
        .collect();

    if lines.is_empty() {
        debug!(
            "{}: no blameable lines removed from {}",
            commit.id(),
            old_path
        );
        return Ok(result);
    }

    let blamed = blame_lines_at(repo, parent.id(), old_path, &lines)?;
    let commits: HashSet<String> = blamed.into_iter().map(|b| b.commit).collect();
    if !commits.is_empty() {
        result.insert(old_path.to_string(), commits);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn commit_file(
        repo: &Repository,
        dir: &Path,
        name: &str,
        content: &str,
        message: &str,
    ) -> Result<Oid> {
        fs::write(dir.join(name), content)?;
        let sig = repo.signature()?;
        let tree_id = {
            let mut index = repo.index()?;
            index.add_path(Path::new(name))?;
            index.write()?;
            index.write_tree()?
        };
        let tree = repo.find_tree(tree_id)?;
        let parents = match repo.head() {
            Ok(head) => vec![head.peel_to_commit()?],
            Err(_) => vec![],
        };
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        Ok(repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)?)
    }

    fn create_test_repo() -> Result<(tempfile::TempDir, Repository)> {
        let dir = tempdir()?;
        let repo = Repository::init(dir.path())?;
        let mut config = repo.config()?;
        config.set_str("user.name", "Test User")?;
        config.set_str("user.email", "test@example.com")?;
        Ok((dir, repo))
    }

    #[test]
    fn test_useless_lines() {
        assert!(is_useless_line(""));
        assert!(is_useless_line("   "));
        assert!(is_useless_line("# comment"));
        assert!(is_useless_line("  // comment"));
        assert!(!is_useless_line("- name: install nginx"));
    }

    #[test]
    fn test_blame_lines_at() -> Result<()> {
        let (dir, repo) = create_test_repo()?;
        let first = commit_file(&repo, dir.path(), "site.yml", "a: 1\nb: 2\n", "add")?;
        let second = commit_file(&repo, dir.path(), "site.yml", "a: 1\nb: 3\n", "change b")?;

        let entries = blame_lines_at(&repo, second, "site.yml", &[1, 2, 9])?;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].commit, first.to_string());
        assert_eq!(entries[1].commit, second.to_string());
        Ok(())
    }

    #[test]
    fn test_last_modified_lines_skips_additions() -> Result<()> {
        let (dir, repo) = create_test_repo()?;
        let oid = commit_file(&repo, dir.path(), "site.yml", "a: 1\n", "add")?;
        let commit = repo.find_commit(oid)?;

        let result = last_modified_lines(&repo, &commit, &Modification::added("site.yml"))?;
        assert!(result.is_empty());
        Ok(())
    }

    #[test]
    fn test_last_modified_lines_blames_parent() -> Result<()> {
        let (dir, repo) = create_test_repo()?;
        let first = commit_file(&repo, dir.path(), "site.yml", "a: 1\n# note\n", "add")?;
        let fix = commit_file(&repo, dir.path(), "site.yml", "a: 2\n", "fix a")?;
        let commit = repo.find_commit(fix)?;

        let modification = Modification::modified("site.yml")
            .with_deleted_line(1, "a: 1")
            .with_deleted_line(2, "# note");
        let result = last_modified_lines(&repo, &commit, &modification)?;
        let blamed = &result["site.yml"];
        assert_eq!(blamed.len(), 1);
        assert!(blamed.contains(&first.to_string()));
        Ok(())
    }
}
