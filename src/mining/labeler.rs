//! Failure-prone file labeling
//!
//! Walks history backwards from the newest fixing commit and yields one
//! [`FailureProneFile`] for every commit inside a fixed file's window,
//! `bic <= commit < fic`. Renames inside a window move tracking to the
//! old name, so versions before the rename carry the path they had then.
//!
//! A rename newer than a window's fix moves it only provisionally: fixed
//! files are named by their newest path, but the new path may also reuse the
//! name of a file deleted in between. Seeing that delete before the fix puts
//! the window back on its own path.
//!
//! The labeler is a lazy iterator: it only visits as many commits as the
//! consumer asks for.

use anyhow::Result;
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

use super::index::CommitIndex;
use crate::git::{ChangeType, Vcs};
use crate::models::{FailureProneFile, FixedFile};

#[derive(Debug, Clone)]
struct Entry {
    fic: String,
    fic_pos: usize,
    bic_pos: usize,
    /// Path held before a rename newer than `fic`, until the fix confirms it
    renamed_from: Option<String>,
}

impl Entry {
    fn in_window(&self, pos: usize) -> bool {
        self.fic_pos > pos && pos >= self.bic_pos
    }
}

pub struct FailureProneLabeler<'a> {
    vcs: &'a dyn Vcs,
    index: &'a CommitIndex,
    /// Tracked path -> windows still open on it
    active: BTreeMap<String, Vec<Entry>>,
    /// Next position to visit
    cursor: Option<usize>,
    pending: VecDeque<FailureProneFile>,
}

impl<'a> FailureProneLabeler<'a> {
    pub fn new(
        vcs: &'a dyn Vcs,
        index: &'a CommitIndex,
        fixing_commits: &[String],
        fixed_files: &[FixedFile],
    ) -> Self {
        let cursor = fixing_commits.iter().filter_map(|c| index.position(c)).max();

        let mut active: BTreeMap<String, Vec<Entry>> = BTreeMap::new();
        if cursor.is_some() {
            for file in fixed_files {
                let fic_pos = index.position(&file.fic);
                let bic_pos = index.position(&file.bic);
                let (Some(fic_pos), Some(bic_pos)) = (fic_pos, bic_pos) else {
                    debug!("Skipping {}: commits not on the branch", file.filepath);
                    continue;
                };
                active.entry(file.filepath.clone()).or_default().push(Entry {
                    fic: file.fic.clone(),
                    fic_pos,
                    bic_pos,
                    renamed_from: None,
                });
            }
        }

        Self {
            vcs,
            index,
            active,
            cursor,
            pending: VecDeque::new(),
        }
    }

    fn visit(&mut self, pos: usize, commit: &str) -> Result<()> {
        for (path, entries) in self.active.iter_mut() {
            for entry in entries.iter().filter(|e| e.in_window(pos)) {
                self.pending
                    .push_back(FailureProneFile::new(path.as_str(), commit, entry.fic.as_str()));
            }
            entries.retain(|e| e.bic_pos != pos);
        }
        self.active.retain(|_, entries| !entries.is_empty());
        if self.active.is_empty() {
            return Ok(());
        }

        let mut moves: Vec<(String, Entry)> = Vec::new();
        for modification in self.vcs.modifications(commit)? {
            if modification.change_type == ChangeType::Delete {
                if let Some(old_path) = modification.old_path.as_deref() {
                    self.revert_renames(old_path, pos, &mut moves);
                }
                continue;
            }
            let Some(new_path) = modification.new_path.as_deref() else {
                continue;
            };
            let Some(entries) = self.active.get_mut(new_path) else {
                continue;
            };

            match modification.change_type {
                ChangeType::Add => {
                    entries.retain(|e| !e.in_window(pos));
                }
                ChangeType::Rename => {
                    let Some(old_path) = modification.old_path else {
                        continue;
                    };
                    let (moving, staying): (Vec<Entry>, Vec<Entry>) =
                        entries.drain(..).partition(|e| e.bic_pos < pos);
                    *entries = staying;
                    if !moving.is_empty() {
                        debug!("{} was {} before {}", new_path, old_path, commit);
                    }
                    for mut entry in moving {
                        // fix already behind us: unconfirmed until it is reached
                        if entry.fic_pos < pos && entry.renamed_from.is_none() {
                            entry.renamed_from = Some(new_path.to_string());
                        }
                        moves.push((old_path.clone(), entry));
                    }
                }
                _ => {}
            }
        }

        self.active.retain(|_, entries| !entries.is_empty());
        for (path, entry) in moves {
            self.active.entry(path).or_default().push(entry);
        }
        Ok(())
    }

    /// `deleted` existed between a provisional rename and the fix, so the
    /// rename reused its name: windows moved away from it go back.
    fn revert_renames(&mut self, deleted: &str, pos: usize, moves: &mut Vec<(String, Entry)>) {
        for (path, entries) in self.active.iter_mut() {
            let (back, keep): (Vec<Entry>, Vec<Entry>) = entries
                .drain(..)
                .partition(|e| e.fic_pos < pos && e.renamed_from.as_deref() == Some(deleted));
            *entries = keep;
            for mut entry in back {
                debug!("{} is not {} at fix {}", path, deleted, entry.fic);
                entry.renamed_from = None;
                moves.push((deleted.to_string(), entry));
            }
        }
    }
}

impl Iterator for FailureProneLabeler<'_> {
    type Item = Result<FailureProneFile>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(file) = self.pending.pop_front() {
                return Some(Ok(file));
            }
            if self.active.is_empty() {
                return None;
            }

            let pos = self.cursor?;
            let commit = self.index.commit_at(pos)?;
            self.cursor = pos.checked_sub(1);

            if let Err(e) = self.visit(pos, commit) {
                self.active.clear();
                self.cursor = None;
                return Some(Err(e));
            }
        }
    }
}
