//! fixing-commits command

use anyhow::Result;
use std::path::Path;

use super::output::{emit, format_classifications, format_fixing_commits, spinner};
use super::session::{read_commit_list, Session};
use super::{Format, MiningArgs};
use crate::classifier::{Classification, CommitClassifier};
use crate::models::encode_fixing_commits;

pub fn run(
    path: &Path,
    args: &MiningArgs,
    exclude_commits: Option<&Path>,
    classify: bool,
    format: Format,
    output: Option<&Path>,
) -> Result<()> {
    let exclude = match exclude_commits {
        Some(file) => read_commit_list(file)?,
        None => Vec::new(),
    };
    let session = Session::open(path, args, exclude)?;
    let miner = session.miner()?;
    let pattern = session.pattern()?;
    let tracker = session.tracker()?;

    let progress = spinner("Detecting fixing commits...");
    let commits = miner.fixing_commits(
        tracker.as_deref(),
        session.exclude_commits(),
        session.settings.labels.as_deref(),
        &pattern,
    );
    progress.finish_and_clear();
    let commits = commits?;

    if classify {
        let classifier = CommitClassifier::new(pattern);
        let classifications = commits
            .iter()
            .map(|c| classifier.classify(&session.repo, c))
            .collect::<Result<Vec<Classification>>>()?;
        let content = match format {
            Format::Json => serde_json::to_string_pretty(&classifications)?,
            Format::Text => format_classifications(&classifications),
        };
        return emit(&content, output);
    }

    let content = match format {
        Format::Json => encode_fixing_commits(&commits)?,
        Format::Text => format_fixing_commits(&commits),
    };
    emit(&content, output)
}
