//! Fixed-file and bug-inducing commit resolution
//!
//! History is walked from the newest fixing commit back to the oldest one.
//! For every relevant file a fixing commit modified, the lines it removed
//! are blamed in the parent revision and the oldest blamed commit becomes
//! the bug-inducing commit.
//!
//! Renames seen along the way are chained so a file keeps the name it had
//! at the newest fix that touched it. When two fixes hit the same path the
//! later-discovered (older) one either opens a separate window, widens the
//! existing window, or is dropped.

use anyhow::Result;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, warn};

use super::index::CommitIndex;
use crate::git::{ChangeType, Modification, Vcs};
use crate::languages::RelevantFile;
use crate::models::FixedFile;

/// A fixed file together with the positions of its commits.
#[derive(Debug, Clone)]
struct Window {
    file: FixedFile,
    fic_pos: usize,
    bic_pos: usize,
}

pub struct FixedFileResolver<'a> {
    vcs: &'a dyn Vcs,
    index: &'a CommitIndex,
    relevant: &'a dyn RelevantFile,
}

impl<'a> FixedFileResolver<'a> {
    pub fn new(vcs: &'a dyn Vcs, index: &'a CommitIndex, relevant: &'a dyn RelevantFile) -> Self {
        Self {
            vcs,
            index,
            relevant,
        }
    }

    /// Fixed files of `fixing_commits`, in discovery order.
    ///
    /// `exclude` lists (filepath, fic) pairs that must not be reported.
    pub fn resolve(&self, fixing_commits: &[String], exclude: &[FixedFile]) -> Result<Vec<FixedFile>> {
        let fixing: FxHashSet<&str> = fixing_commits
            .iter()
            .map(String::as_str)
            .filter(|c| {
                let known = self.index.contains(c);
                if !known {
                    debug!("Fixing commit {} is not on the branch", c);
                }
                known
            })
            .collect();

        let positions = fixing.iter().filter_map(|c| self.index.position(c));
        let (Some(oldest), Some(newest)) = (positions.clone().min(), positions.max()) else {
            return Ok(Vec::new());
        };

        let excluded: FxHashSet<(&str, &str)> = exclude
            .iter()
            .map(|f| (f.filepath.as_str(), f.fic.as_str()))
            .collect();

        let mut renamed: FxHashMap<String, String> = FxHashMap::default();
        let mut windows: Vec<Window> = Vec::new();

        for (pos, commit) in self.index.walk_back(newest, oldest) {
            let is_fixing = fixing.contains(commit);

            for modification in self.vcs.modifications(commit)? {
                track_rename(&mut renamed, &modification, is_fixing);

                if !is_fixing
                    || !matches!(modification.change_type, ChangeType::Modify | ChangeType::Rename)
                    || !self.relevant.accepts(&modification)
                {
                    continue;
                }

                let Some(new_path) = modification.new_path.as_deref() else {
                    continue;
                };
                let filepath = renamed.get(new_path).map(String::as_str).unwrap_or(new_path);

                if excluded.contains(&(filepath, commit)) {
                    debug!("{} at {} is excluded", filepath, commit);
                    continue;
                }

                let Some((bic_pos, bic)) = self.bug_inducing_commit(commit, pos, &modification) else {
                    continue;
                };

                let window = Window {
                    file: FixedFile::new(filepath, commit, bic),
                    fic_pos: pos,
                    bic_pos,
                };
                merge_window(&mut windows, window);
            }
        }

        info!(
            "Resolved {} fixed files from {} fixing commits",
            windows.len(),
            fixing.len()
        );
        Ok(windows.into_iter().map(|w| w.file).collect())
    }

    /// Oldest blamed commit strictly before the fix, if any.
    fn bug_inducing_commit(
        &self,
        commit: &str,
        fic_pos: usize,
        modification: &Modification,
    ) -> Option<(usize, String)> {
        let blamed = match self.vcs.blame_last_modified_lines(commit, modification) {
            Ok(blamed) => blamed,
            Err(e) => {
                warn!("Blame failed for {} at {}: {:#}", modification.path(), commit, e);
                return None;
            }
        };

        let candidates = blamed.values().flatten();
        match self.index.oldest_before(candidates, fic_pos) {
            Some((pos, bic)) => Some((pos, bic.clone())),
            None => {
                debug!("No bug-inducing commit for {} at {}", modification.path(), commit);
                None
            }
        }
    }
}

/// Chain renames so older names map to the name at the newest fix.
fn track_rename(renamed: &mut FxHashMap<String, String>, modification: &Modification, is_fixing: bool) {
    if modification.change_type != ChangeType::Rename {
        return;
    }
    let (Some(old_path), Some(new_path)) = (&modification.old_path, &modification.new_path) else {
        return;
    };

    if let Some(alias) = renamed.get(new_path).cloned() {
        renamed.insert(old_path.clone(), alias);
    } else if is_fixing {
        renamed.insert(old_path.clone(), new_path.clone());
    }
}

/// Add `window`, reconciling it with the latest window on the same path.
fn merge_window(windows: &mut Vec<Window>, window: Window) {
    let Some(existing) = windows.iter_mut().rev().find(|w| w.file == window.file) else {
        windows.push(window);
        return;
    };

    if window.fic_pos < existing.bic_pos {
        // an earlier, independent defect on the same path
        windows.push(window);
    } else if window.bic_pos < existing.bic_pos {
        debug!(
            "Widening {}: bic {} -> {}",
            existing.file.filepath, existing.file.bic, window.file.bic
        );
        existing.file.bic = window.file.bic;
        existing.bic_pos = window.bic_pos;
    } else {
        debug!(
            "Dropping {} at {}: covered by fix {}",
            window.file.filepath, window.file.fic, existing.file.fic
        );
    }
}
