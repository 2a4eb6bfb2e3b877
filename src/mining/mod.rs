//! SZZ-style mining pipeline
//!
//! Three stages over one branch of one repository:
//!
//! 1. [`FixingCommitDetector`]: which commits fixed something
//! 2. [`FixedFileResolver`]: which files each fix touched, and the
//!    bug-inducing commit found by blaming the removed lines
//! 3. [`FailureProneLabeler`]: every version of those files between the
//!    bug-inducing commit and the fix
//!
//! All ordering goes through [`CommitIndex`].
//!
//! # Example
//!
//! ```rust,ignore
//! use repominer::git::GitRepository;
//! use repominer::languages::AnsibleFiles;
//! use repominer::mining::{FixMessagePattern, Miner};
//!
//! let repo = GitRepository::open(path)?;
//! let miner = Miner::new(&repo, "master", &AnsibleFiles)?;
//! let fixing = miner.fixing_commits(None, &Default::default(), None, &FixMessagePattern::new(None)?)?;
//! let fixed = miner.fixed_files(&fixing, &[])?;
//! for labeled in miner.label(&fixing, &fixed) {
//!     println!("{:?}", labeled?);
//! }
//! ```

pub mod detector;
pub mod index;
pub mod labeler;
pub mod resolver;

pub use detector::{FixMessagePattern, FixingCommitDetector, DEFAULT_BUG_LABELS, DEFAULT_FIX_REGEX};
pub use index::CommitIndex;
pub use labeler::FailureProneLabeler;
pub use resolver::FixedFileResolver;

use anyhow::Result;
use std::collections::HashSet;

use crate::git::Vcs;
use crate::issues::IssueTracker;
use crate::languages::RelevantFile;
use crate::models::FixedFile;

/// One mining run: a repository, a branch and a file predicate.
pub struct Miner<'a> {
    vcs: &'a dyn Vcs,
    relevant: &'a dyn RelevantFile,
    index: CommitIndex,
}

impl<'a> Miner<'a> {
    pub fn new(vcs: &'a dyn Vcs, branch: &str, relevant: &'a dyn RelevantFile) -> Result<Self> {
        let index = CommitIndex::from_vcs(vcs, branch)?;
        Ok(Self {
            vcs,
            relevant,
            index,
        })
    }

    pub fn index(&self) -> &CommitIndex {
        &self.index
    }

    pub fn fixing_commits(
        &self,
        tracker: Option<&dyn IssueTracker>,
        exclude: &HashSet<String>,
        labels: Option<&[String]>,
        pattern: &FixMessagePattern,
    ) -> Result<Vec<String>> {
        FixingCommitDetector::new(self.vcs, &self.index, self.relevant)
            .detect(tracker, exclude, labels, pattern)
    }

    pub fn fixed_files(&self, fixing_commits: &[String], exclude: &[FixedFile]) -> Result<Vec<FixedFile>> {
        FixedFileResolver::new(self.vcs, &self.index, self.relevant).resolve(fixing_commits, exclude)
    }

    pub fn label(&self, fixing_commits: &[String], fixed_files: &[FixedFile]) -> FailureProneLabeler<'_> {
        FailureProneLabeler::new(self.vcs, &self.index, fixing_commits, fixed_files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{MemoryRepository, Modification};
    use crate::languages::AnsibleFiles;
    use crate::models::FailureProneFile;

    #[test]
    fn test_pipeline_on_scripted_history() -> Result<()> {
        let mut repo = MemoryRepository::new();
        repo.commit("c0", "initial", vec![Modification::added("tasks/main.yml")])
            .commit("c1", "add handler", vec![Modification::modified("tasks/main.yml")])
            .commit("c2", "docs", vec![Modification::added("README.md")])
            .commit("c3", "fix handler name", vec![Modification::modified("tasks/main.yml")])
            .blame("c3", "tasks/main.yml", &["c1"]);

        let miner = Miner::new(&repo, "master", &AnsibleFiles)?;
        let fixing = miner.fixing_commits(None, &HashSet::new(), None, &FixMessagePattern::new(None)?)?;
        assert_eq!(fixing, vec!["c3"]);

        let fixed = miner.fixed_files(&fixing, &[])?;
        assert_eq!(fixed, vec![FixedFile::new("tasks/main.yml", "c3", "c1")]);

        let labeled: Vec<FailureProneFile> = miner.label(&fixing, &fixed).collect::<Result<_>>()?;
        let commits: Vec<&str> = labeled.iter().map(|f| f.commit.as_str()).collect();
        assert_eq!(commits, vec!["c2", "c1"]);
        Ok(())
    }

    fn labeled_for(miner: &Miner<'_>, fixing: &[String], fixed: &[FixedFile], fic: &str) -> Result<Vec<(String, String)>> {
        let labeled: Vec<FailureProneFile> = miner.label(fixing, fixed).collect::<Result<_>>()?;
        Ok(labeled
            .into_iter()
            .filter(|f| f.fixing_commit == fic)
            .map(|f| (f.filepath, f.commit))
            .collect())
    }

    #[test]
    fn test_reused_path_is_not_relabeled() -> Result<()> {
        let mut repo = MemoryRepository::new();
        repo.commit(
            "c0",
            "initial",
            vec![
                Modification::added("tasks/b.yml"),
                Modification::added("tasks/a.yml"),
                Modification::added("tasks/other.yml"),
            ],
        )
        .commit("c1", "tune b", vec![Modification::modified("tasks/b.yml")])
        .commit("c2", "tune b again", vec![Modification::modified("tasks/b.yml")])
        .commit("c3", "fix b", vec![Modification::modified("tasks/b.yml")])
        .commit("c4", "drop b", vec![Modification::deleted("tasks/b.yml")])
        .commit("c5", "move a", vec![Modification::renamed("tasks/a.yml", "tasks/b.yml")])
        .commit("c6", "fix other", vec![Modification::modified("tasks/other.yml")])
        .blame("c3", "tasks/b.yml", &["c1"])
        .blame("c6", "tasks/other.yml", &["c0"]);

        let miner = Miner::new(&repo, "master", &AnsibleFiles)?;
        let fixing = miner.fixing_commits(None, &HashSet::new(), None, &FixMessagePattern::new(None)?)?;
        assert_eq!(fixing, vec!["c3", "c6"]);

        let fixed = miner.fixed_files(&fixing, &[])?;
        let b = fixed.iter().find(|f| f.fic == "c3").expect("window for c3");
        assert_eq!((b.filepath.as_str(), b.bic.as_str()), ("tasks/b.yml", "c1"));

        let labeled = labeled_for(&miner, &fixing, &fixed, "c3")?;
        assert_eq!(
            labeled,
            vec![
                ("tasks/b.yml".to_string(), "c2".to_string()),
                ("tasks/b.yml".to_string(), "c1".to_string()),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_alias_chain_labels_under_old_name() -> Result<()> {
        let mut repo = MemoryRepository::new();
        repo.commit("c0", "initial", vec![Modification::added("tasks/a.yml")])
            .commit("c1", "tune", vec![Modification::modified("tasks/a.yml")])
            .commit("c2", "tune again", vec![Modification::modified("tasks/a.yml")])
            .commit("c3", "fix a", vec![Modification::modified("tasks/a.yml")])
            .commit("c4", "tune", vec![Modification::modified("tasks/a.yml")])
            .commit("c5", "fix and rename", vec![Modification::renamed("tasks/a.yml", "tasks/b.yml")])
            .blame("c3", "tasks/a.yml", &["c1"])
            .blame("c5", "tasks/a.yml", &["c4"]);

        let miner = Miner::new(&repo, "master", &AnsibleFiles)?;
        let fixing = miner.fixing_commits(None, &HashSet::new(), None, &FixMessagePattern::new(None)?)?;
        assert_eq!(fixing, vec!["c3", "c5"]);

        let fixed = miner.fixed_files(&fixing, &[])?;
        let older = fixed.iter().find(|f| f.fic == "c3").expect("window for c3");
        assert_eq!((older.filepath.as_str(), older.bic.as_str()), ("tasks/b.yml", "c1"));

        let labeled = labeled_for(&miner, &fixing, &fixed, "c3")?;
        assert_eq!(
            labeled,
            vec![
                ("tasks/a.yml".to_string(), "c2".to_string()),
                ("tasks/a.yml".to_string(), "c1".to_string()),
            ]
        );
        assert_eq!(
            labeled_for(&miner, &fixing, &fixed, "c5")?,
            vec![("tasks/a.yml".to_string(), "c4".to_string())]
        );
        Ok(())
    }
}
