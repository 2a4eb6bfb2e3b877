//! Output formatting shared by the mining commands

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use crate::classifier::Classification;
use crate::models::{FailureProneFile, FixedFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Text,
    Json,
}

/// Spinner on stderr, cleared when the stage finishes.
pub(super) fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Write to `output`, or stdout when `None`.
pub(super) fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} Wrote {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
        None => println!("{}", content),
    }
    Ok(())
}

pub(super) fn format_fixing_commits(commits: &[String]) -> String {
    let mut out = String::new();
    for commit in commits {
        out.push_str(commit);
        out.push('\n');
    }
    out.push_str(&format!(
        "{} {} fixing commits",
        style("→").dim(),
        style(commits.len()).bold()
    ));
    out
}

pub(super) fn format_classifications(classifications: &[Classification]) -> String {
    let mut out = String::new();
    for c in classifications {
        let categories: Vec<&str> = c.categories.iter().map(|c| c.as_str()).collect();
        out.push_str(&format!(
            "{}  {}\n",
            c.commit,
            if categories.is_empty() {
                style("uncategorized".to_string()).dim()
            } else {
                style(categories.join(", ")).yellow()
            }
        ));
    }
    out.push_str(&format!(
        "{} {} fixing commits",
        style("→").dim(),
        style(classifications.len()).bold()
    ));
    out
}

pub(super) fn format_fixed_files(files: &[FixedFile]) -> String {
    let mut out = String::new();
    for f in files {
        out.push_str(&format!(
            "{}  {} {} {}\n",
            style(&f.filepath).cyan(),
            short(&f.bic),
            style("→").dim(),
            short(&f.fic)
        ));
    }
    out.push_str(&format!(
        "{} {} fixed files",
        style("→").dim(),
        style(files.len()).bold()
    ));
    out
}

pub(super) fn format_failure_prone_files(files: &[FailureProneFile]) -> String {
    let mut out = String::new();
    for f in files {
        out.push_str(&format!(
            "{}  {}  {} {}\n",
            short(&f.commit),
            style(&f.filepath).cyan(),
            style("fixed by").dim(),
            short(&f.fixing_commit)
        ));
    }
    out.push_str(&format!(
        "{} {} failure-prone file versions",
        style("→").dim(),
        style(files.len()).bold()
    ));
    out
}

fn short(commit: &str) -> &str {
    commit.get(..12).unwrap_or(commit)
}
