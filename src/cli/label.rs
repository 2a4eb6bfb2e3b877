//! label command

use anyhow::{Context, Result};
use console::style;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::output::{emit, format_failure_prone_files, spinner};
use super::session::{read_commit_list, read_fixed_files, Session};
use super::{Format, MiningArgs};
use crate::git::{contained_path, GitRepository};
use crate::models::{encode_failure_prone_files, FailureProneFile};

#[allow(clippy::too_many_arguments)]
pub fn run(
    path: &Path,
    args: &MiningArgs,
    fixing_commits: &Path,
    fixed_files: &Path,
    limit: Option<usize>,
    export_dir: Option<&Path>,
    format: Format,
    output: Option<&Path>,
) -> Result<()> {
    let fixing = read_commit_list(fixing_commits)?;
    let fixed = read_fixed_files(fixed_files)?;

    let session = Session::open(path, args, Vec::new())?;
    let miner = session.miner()?;

    let progress = spinner("Labeling failure-prone files...");
    let labeler = miner.label(&fixing, &fixed);
    let labeled: Result<Vec<FailureProneFile>> = match limit {
        Some(n) => labeler.take(n).collect(),
        None => labeler.collect(),
    };
    progress.finish_and_clear();
    let labeled = labeled?;

    if let Some(dir) = export_dir {
        let written = export_versions(&session.repo, &labeled, dir)?;
        eprintln!(
            "{} Exported {} file versions to {}",
            style("✓").green(),
            written,
            style(dir.display()).cyan()
        );
    }

    let content = match format {
        Format::Json => encode_failure_prone_files(&labeled)?,
        Format::Text => format_failure_prone_files(&labeled),
    };
    emit(&content, output)
}

/// Copy every labeled file version to `dir/<commit>/<filepath>`.
///
/// Each commit is checked out once; the original HEAD is restored when the
/// checkout guard drops.
fn export_versions(repo: &GitRepository, labeled: &[FailureProneFile], dir: &Path) -> Result<usize> {
    let mut by_commit: Vec<(&str, Vec<&str>)> = Vec::new();
    for file in labeled {
        export_target(dir, &file.commit, &file.filepath)?;
        match by_commit.iter_mut().find(|(commit, _)| *commit == file.commit) {
            Some((_, paths)) => paths.push(file.filepath.as_str()),
            None => by_commit.push((file.commit.as_str(), vec![file.filepath.as_str()])),
        }
    }

    let mut written = 0;
    for (commit, paths) in by_commit {
        let checkout = repo.checkout(commit)?;
        for filepath in paths {
            let Some(bytes) = checkout.read_file(filepath)? else {
                warn!("{} does not exist at {}", filepath, commit);
                continue;
            };
            let target = export_target(dir, commit, filepath)?;
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(&target, bytes)
                .with_context(|| format!("Failed to write {}", target.display()))?;
            debug!("Exported {}", target.display());
            written += 1;
        }
    }
    Ok(written)
}

/// `dir/<commit>/<filepath>`, refusing names that would land outside `dir`.
fn export_target(dir: &Path, commit: &str, filepath: &str) -> Result<PathBuf> {
    let commit = contained_path(commit)?;
    let filepath = contained_path(filepath)
        .with_context(|| format!("Refusing to export {}", filepath))?;
    Ok(dir.join(commit).join(filepath))
}
