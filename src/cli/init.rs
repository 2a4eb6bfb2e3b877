//! Init command - write an example repominer.toml

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

const EXAMPLE_CONFIG: &str = r#"# Repominer Configuration

[mining]
# Branch to mine
branch = "master"

# Relevant files: ansible, tosca, any
language = "ansible"

# Commit-message pattern for fixing commits (case-insensitive)
# regex = "(bug|fix|error|issue|crash|problem|fail|defect|patch)"

# Issue labels that mark bug reports (default: built-in list)
# labels = ["bug", "type: bug"]

# Commits never reported as fixing commits
exclude_commits = []

[tracker]
# GitHub or GitLab URL (default: the origin remote)
# url = "https://github.com/owner/repo"

# Set to false to use commit messages only
enabled = true

# Rate-limit handling
max_retries = 3
max_wait_secs = 900
"#;

/// Run the init command
pub fn run(path: &Path) -> Result<()> {
    let repo_path = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;

    if !repo_path.is_dir() {
        anyhow::bail!("Path is not a directory: {}", repo_path.display());
    }

    println!("\n{} Initializing repominer\n", style("⛏").bold());

    let config_path = repo_path.join("repominer.toml");
    if config_path.exists() {
        println!(
            "{} Already initialized at {}",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
    } else {
        std::fs::write(&config_path, EXAMPLE_CONFIG)
            .with_context(|| format!("Failed to create {}", config_path.display()))?;
        println!(
            "{} Created {}",
            style("✓").green(),
            style("repominer.toml").cyan()
        );
    }

    let gitignore_path = repo_path.join(".gitignore");
    if gitignore_path.exists() {
        let content = std::fs::read_to_string(&gitignore_path).unwrap_or_default();
        if !content.contains(".repominer") {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            use std::io::Write;
            file.write_all(b"\n# Repominer\n.repominer/\n")?;
            println!(
                "{} Added .repominer/ to {}",
                style("✓").green(),
                style(".gitignore").cyan()
            );
        }
    }

    println!("\nNext steps:");
    println!("  {} Detect fixing commits", style("repominer fixing-commits").cyan());
    println!("  {} Run every stage", style("repominer mine").cyan());

    Ok(())
}
