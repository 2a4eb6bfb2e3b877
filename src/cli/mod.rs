//! CLI command definitions and handlers

mod fixed_files;
mod fixing_commits;
mod init;
mod label;
mod mine;
mod output;
mod session;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::languages::Language;
pub(crate) use output::Format;

/// Repominer - failure-prone file mining for infrastructure code
#[derive(Parser, Debug)]
#[command(name = "repominer")]
#[command(
    version,
    about = "Mine git history for fixing commits, bug-inducing commits and failure-prone IaC files",
    long_about = "Repominer finds the commits that fixed defects in an Infrastructure-as-Code \
repository, blames the lines they changed to find the commits that introduced each defect, \
and labels every version of the affected files in between as failure-prone.\n\n\
Run without a subcommand to mine the current directory:\n  \
repominer .",
    after_help = "\
Examples:
  repominer init                                   Write an example repominer.toml
  repominer fixing-commits --no-issues             Message-based detection only
  repominer fixing-commits --classify -f json      Fixing commits with fix categories
  repominer fixed-files --fixing-commits fc.json   Bug-inducing commits per fixed file
  repominer label --fixing-commits fc.json --fixed-files ff.json --limit 10
  repominer mine /path/to/repo --output-dir out    All three stages"
)]
pub struct Cli {
    /// Path to repository (default: current directory)
    #[arg(global = true, default_value = ".")]
    pub path: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options shared by every mining stage
#[derive(Args, Debug, Clone, Default)]
pub struct MiningArgs {
    /// Branch to mine (default: from repominer.toml, else master)
    #[arg(long, short = 'b')]
    pub branch: Option<String>,

    /// Language whose files are relevant
    #[arg(long, short = 'l', value_enum)]
    pub language: Option<Language>,

    /// Commit-message regex for fixing commits (case-insensitive)
    #[arg(long)]
    pub regex: Option<String>,

    /// Issue label marking bug reports (repeatable; default: built-in list)
    #[arg(long = "label")]
    pub labels: Vec<String>,

    /// Repository URL on GitHub or GitLab (default: the origin remote)
    #[arg(long)]
    pub url: Option<String>,

    /// Skip the issue tracker, use commit messages only
    #[arg(long)]
    pub no_issues: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a repominer.toml config file with example settings
    Init,

    /// Detect fixing commits from closed issues and commit messages
    FixingCommits {
        #[command(flatten)]
        mining: MiningArgs,

        /// JSON array of commit ids never to report
        #[arg(long)]
        exclude_commits: Option<PathBuf>,

        /// Add fix categories to each commit
        #[arg(long)]
        classify: bool,

        /// Output format
        #[arg(long, short = 'f', value_enum, default_value = "text")]
        format: Format,

        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Resolve fixed files and their bug-inducing commits
    FixedFiles {
        #[command(flatten)]
        mining: MiningArgs,

        /// JSON array of fixing commits (from `fixing-commits -f json`)
        #[arg(long)]
        fixing_commits: PathBuf,

        /// JSON fixed files to leave out, matched by filepath and fic
        #[arg(long)]
        exclude_fixed_files: Option<PathBuf>,

        /// Output format
        #[arg(long, short = 'f', value_enum, default_value = "text")]
        format: Format,

        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Label failure-prone file versions
    Label {
        #[command(flatten)]
        mining: MiningArgs,

        /// JSON array of fixing commits
        #[arg(long)]
        fixing_commits: PathBuf,

        /// JSON fixed files (from `fixed-files -f json`)
        #[arg(long)]
        fixed_files: PathBuf,

        /// Stop after this many labeled files
        #[arg(long)]
        limit: Option<usize>,

        /// Write each labeled file version to DIR/<commit>/<filepath>
        #[arg(long, value_name = "DIR")]
        export_dir: Option<PathBuf>,

        /// Output format
        #[arg(long, short = 'f', value_enum, default_value = "text")]
        format: Format,

        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Run all stages and write their JSON outputs
    Mine {
        #[command(flatten)]
        mining: MiningArgs,

        /// JSON array of commit ids never to report
        #[arg(long)]
        exclude_commits: Option<PathBuf>,

        /// Directory for fixing-commits.json, fixed-files.json and failure-prone-files.json
        #[arg(long, default_value = ".repominer")]
        output_dir: PathBuf,
    },
}

/// Run the CLI
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Init) => init::run(&cli.path),

        Some(Commands::FixingCommits {
            mining,
            exclude_commits,
            classify,
            format,
            output,
        }) => fixing_commits::run(
            &cli.path,
            &mining,
            exclude_commits.as_deref(),
            classify,
            format,
            output.as_deref(),
        ),

        Some(Commands::FixedFiles {
            mining,
            fixing_commits,
            exclude_fixed_files,
            format,
            output,
        }) => fixed_files::run(
            &cli.path,
            &mining,
            &fixing_commits,
            exclude_fixed_files.as_deref(),
            format,
            output.as_deref(),
        ),

        Some(Commands::Label {
            mining,
            fixing_commits,
            fixed_files,
            limit,
            export_dir,
            format,
            output,
        }) => label::run(
            &cli.path,
            &mining,
            &fixing_commits,
            &fixed_files,
            limit,
            export_dir.as_deref(),
            format,
            output.as_deref(),
        ),

        Some(Commands::Mine {
            mining,
            exclude_commits,
            output_dir,
        }) => mine::run(&cli.path, &mining, exclude_commits.as_deref(), &output_dir),

        None => mine::run(&cli.path, &MiningArgs::default(), None, &PathBuf::from(".repominer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fixing_commits() {
        let cli = Cli::parse_from([
            "repominer",
            "repo",
            "fixing-commits",
            "--branch",
            "main",
            "--label",
            "bug",
            "--label",
            "type: bug",
            "--no-issues",
            "-f",
            "json",
        ]);
        assert_eq!(cli.path, PathBuf::from("repo"));
        match cli.command {
            Some(Commands::FixingCommits { mining, format, .. }) => {
                assert_eq!(mining.branch.as_deref(), Some("main"));
                assert_eq!(mining.labels, vec!["bug", "type: bug"]);
                assert!(mining.no_issues);
                assert_eq!(format, Format::Json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_label_requires_inputs() {
        assert!(Cli::try_parse_from(["repominer", "label", "--fixing-commits", "fc.json"]).is_err());

        let cli = Cli::try_parse_from([
            "repominer",
            "label",
            "--fixing-commits",
            "fc.json",
            "--fixed-files",
            "ff.json",
            "--limit",
            "5",
            "--language",
            "tosca",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Label { limit, mining, .. }) => {
                assert_eq!(limit, Some(5));
                assert_eq!(mining.language, Some(Language::Tosca));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::parse_from(["repominer", "."]);
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "warn");
    }
}
