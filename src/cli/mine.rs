//! mine command: every stage in sequence

use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use std::time::Instant;

use super::output::spinner;
use super::session::{read_commit_list, Session};
use super::MiningArgs;
use crate::models::{
    encode_failure_prone_files, encode_fixed_files, encode_fixing_commits, FailureProneFile,
};

pub fn run(path: &Path, args: &MiningArgs, exclude_commits: Option<&Path>, output_dir: &Path) -> Result<()> {
    let start = Instant::now();
    let exclude = match exclude_commits {
        Some(file) => read_commit_list(file)?,
        None => Vec::new(),
    };
    let session = Session::open(path, args, exclude)?;
    let miner = session.miner()?;
    let pattern = session.pattern()?;
    let tracker = session.tracker()?;

    println!("\n{} Mining {}\n", style("⛏").bold(), style(path.display()).cyan());

    let progress = spinner("Detecting fixing commits...");
    let fixing = miner.fixing_commits(
        tracker.as_deref(),
        session.exclude_commits(),
        session.settings.labels.as_deref(),
        &pattern,
    );
    progress.finish_and_clear();
    let fixing = fixing?;
    println!("{} {} fixing commits", style("✓").green(), style(fixing.len()).bold());

    let progress = spinner("Blaming fixed files...");
    let fixed = miner.fixed_files(&fixing, &[]);
    progress.finish_and_clear();
    let fixed = fixed?;
    println!("{} {} fixed files", style("✓").green(), style(fixed.len()).bold());

    let progress = spinner("Labeling failure-prone files...");
    let labeled: Result<Vec<FailureProneFile>> = miner.label(&fixing, &fixed).collect();
    progress.finish_and_clear();
    let labeled = labeled?;
    println!(
        "{} {} failure-prone file versions",
        style("✓").green(),
        style(labeled.len()).bold()
    );

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let outputs = [
        ("fixing-commits.json", encode_fixing_commits(&fixing)?),
        ("fixed-files.json", encode_fixed_files(&fixed)?),
        ("failure-prone-files.json", encode_failure_prone_files(&labeled)?),
    ];
    for (name, content) in outputs {
        let target = output_dir.join(name);
        std::fs::write(&target, content)
            .with_context(|| format!("Failed to write {}", target.display()))?;
    }

    println!(
        "\n{} Results in {} ({:.1}s)",
        style("✓").green(),
        style(output_dir.display()).cyan(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
