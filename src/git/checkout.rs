//! Scoped working-tree checkout
//!
//! [`GitRepository::checkout`] moves the working tree to a commit and hands
//! back a [`Checkout`] guard. Dropping the guard restores the HEAD that was
//! checked out before, on every exit path.

use anyhow::{bail, Context, Result};
use git2::build::CheckoutBuilder;
use git2::{Commit, Oid, Repository, StatusOptions};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use super::GitRepository;

/// Where HEAD pointed before the checkout.
enum HeadState {
    Branch(String),
    Detached(Oid),
}

/// Working tree checked out at a commit until dropped.
pub struct Checkout<'r> {
    repo: &'r Repository,
    workdir: PathBuf,
    commit: String,
    restore: HeadState,
}

impl GitRepository {
    /// Check out `commit` into the working tree.
    ///
    /// Refuses to run over uncommitted changes, since a forced checkout
    /// would discard them.
    pub fn checkout(&self, commit: &str) -> Result<Checkout<'_>> {
        let workdir = self.repo_root()?.to_path_buf();
        if has_local_changes(&self.repo)? {
            bail!(
                "Working tree at {} has uncommitted changes; commit or stash them first",
                workdir.display()
            );
        }

        let oid = Oid::from_str(commit).with_context(|| format!("Invalid commit id {}", commit))?;
        let target = self
            .repo
            .find_commit(oid)
            .with_context(|| format!("Commit {} not found", commit))?;

        // from here on the guard restores HEAD, even if the move fails halfway
        let checkout = Checkout::begin(&self.repo, workdir, commit)?;
        checkout.move_to(&target)?;
        debug!("Checked out {}", commit);
        Ok(checkout)
    }
}

impl<'r> Checkout<'r> {
    fn begin(repo: &'r Repository, workdir: PathBuf, commit: &str) -> Result<Self> {
        let head = repo.head().context("Repository has no HEAD")?;
        let restore = if head.is_branch() {
            let name = head.name().context("HEAD reference name is not UTF-8")?;
            HeadState::Branch(name.to_string())
        } else {
            HeadState::Detached(head.peel_to_commit()?.id())
        };
        Ok(Self {
            repo,
            workdir,
            commit: commit.to_string(),
            restore,
        })
    }

    fn move_to(&self, target: &Commit<'_>) -> Result<()> {
        self.repo
            .checkout_tree(target.as_object(), Some(CheckoutBuilder::new().force()))
            .with_context(|| format!("Failed to check out {}", self.commit))?;
        self.repo.set_head_detached(target.id())?;
        Ok(())
    }
}

impl Checkout<'_> {
    pub fn commit(&self) -> &str {
        &self.commit
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Bytes of a file in the checked-out tree, `None` if absent.
    pub fn read_file(&self, relative: &str) -> Result<Option<Vec<u8>>> {
        let path = self.workdir.join(contained_path(relative)?);
        if !path.is_file() {
            return Ok(None);
        }
        let bytes =
            std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(bytes))
    }

    fn reset(&self) -> Result<()> {
        match &self.restore {
            HeadState::Branch(name) => self.repo.set_head(name)?,
            HeadState::Detached(oid) => self.repo.set_head_detached(*oid)?,
        }
        self.repo
            .checkout_head(Some(CheckoutBuilder::new().force()))?;
        Ok(())
    }
}

impl Drop for Checkout<'_> {
    fn drop(&mut self) {
        match self.reset() {
            Ok(()) => debug!("Restored working tree after {}", self.commit),
            Err(e) => warn!(
                "Failed to restore working tree after checking out {}: {}",
                self.commit, e
            ),
        }
    }
}

/// `relative` as a path that stays below whatever directory it is joined to.
///
/// Absolute paths and `..` components are rejected.
pub fn contained_path(relative: &str) -> Result<&Path> {
    let path = Path::new(relative);
    let contained = path.components().next().is_some()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !contained {
        bail!("Path {} leaves the repository", relative);
    }
    Ok(path)
}

fn has_local_changes(repo: &Repository) -> Result<bool> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(false).include_ignored(false);
    let statuses = repo.statuses(Some(&mut opts))?;
    Ok(!statuses.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn commit_file(repo: &Repository, dir: &Path, content: &str, message: &str) -> Result<Oid> {
        fs::write(dir.join("site.yml"), content)?;
        let sig = repo.signature()?;
        let tree_id = {
            let mut index = repo.index()?;
            index.add_path(Path::new("site.yml"))?;
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
    fn test_checkout_restores_head_on_drop() -> Result<()> {
        let (dir, repo) = create_test_repo()?;
        let first = commit_file(&repo, dir.path(), "version: 1\n", "first")?;
        commit_file(&repo, dir.path(), "version: 2\n", "second")?;
        let branch = repo.head()?.name().unwrap_or_default().to_string();

        let git = GitRepository::open(dir.path())?;
        {
            let checkout = git.checkout(&first.to_string())?;
            let content = checkout.read_file("site.yml")?.unwrap_or_default();
            assert_eq!(content, b"version: 1\n");
            assert!(checkout.read_file("missing.yml")?.is_none());
        }

        assert_eq!(fs::read_to_string(dir.path().join("site.yml"))?, "version: 2\n");
        assert_eq!(repo.head()?.name().unwrap_or_default(), branch);
        Ok(())
    }

    #[test]
    fn test_interrupted_move_is_restored() -> Result<()> {
        let (dir, repo) = create_test_repo()?;
        let first = commit_file(&repo, dir.path(), "version: 1\n", "first")?;
        commit_file(&repo, dir.path(), "version: 2\n", "second")?;
        let branch = repo.head()?.name().unwrap_or_default().to_string();

        let git = GitRepository::open(dir.path())?;
        {
            // the tree moved but HEAD was never detached
            let checkout = Checkout::begin(&git.repo, dir.path().to_path_buf(), &first.to_string())?;
            let target = git.repo.find_commit(first)?;
            git.repo
                .checkout_tree(target.as_object(), Some(CheckoutBuilder::new().force()))?;
            assert_eq!(fs::read_to_string(dir.path().join("site.yml"))?, "version: 1\n");
            drop(checkout);
        }

        assert_eq!(fs::read_to_string(dir.path().join("site.yml"))?, "version: 2\n");
        assert_eq!(repo.head()?.name().unwrap_or_default(), branch);
        Ok(())
    }

    #[test]
    fn test_read_file_stays_in_workdir() -> Result<()> {
        let (dir, repo) = create_test_repo()?;
        let first = commit_file(&repo, dir.path(), "version: 1\n", "first")?;

        let git = GitRepository::open(dir.path())?;
        let checkout = git.checkout(&first.to_string())?;
        assert!(checkout.read_file("../site.yml").is_err());
        assert!(checkout.read_file("/etc/hostname").is_err());
        assert!(checkout.read_file("").is_err());
        assert!(checkout.read_file("./site.yml")?.is_some());
        Ok(())
    }

    #[test]
    fn test_contained_path() {
        assert!(contained_path("tasks/main.yml").is_ok());
        assert!(contained_path("tasks/../../etc/passwd").is_err());
        assert!(contained_path("/tmp/x.yml").is_err());
    }

    #[test]
    fn test_checkout_refuses_dirty_tree() -> Result<()> {
        let (dir, repo) = create_test_repo()?;
        let first = commit_file(&repo, dir.path(), "version: 1\n", "first")?;
        fs::write(dir.path().join("site.yml"), "local edit\n")?;

        let git = GitRepository::open(dir.path())?;
        assert!(git.checkout(&first.to_string()).is_err());
        assert_eq!(fs::read_to_string(dir.path().join("site.yml"))?, "local edit\n");
        Ok(())
    }
}
