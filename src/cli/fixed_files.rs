//! fixed-files command

use anyhow::Result;
use std::path::Path;

use super::output::{emit, format_fixed_files, spinner};
use super::session::{read_commit_list, read_fixed_files, Session};
use super::{Format, MiningArgs};
use crate::models::encode_fixed_files;

pub fn run(
    path: &Path,
    args: &MiningArgs,
    fixing_commits: &Path,
    exclude_fixed_files: Option<&Path>,
    format: Format,
    output: Option<&Path>,
) -> Result<()> {
    let fixing = read_commit_list(fixing_commits)?;
    let exclude = match exclude_fixed_files {
        Some(file) => read_fixed_files(file)?,
        None => Vec::new(),
    };

    let session = Session::open(path, args, Vec::new())?;
    let miner = session.miner()?;

    let progress = spinner("Blaming fixed files...");
    let fixed = miner.fixed_files(&fixing, &exclude);
    progress.finish_and_clear();
    let fixed = fixed?;

    let content = match format {
        Format::Json => encode_fixed_files(&fixed)?,
        Format::Text => format_fixed_files(&fixed),
    };
    emit(&content, output)
}
