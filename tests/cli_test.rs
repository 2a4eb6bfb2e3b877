//! CLI contract tests
//!
//! Runs the binary against a throwaway repository with the tracker disabled.

mod common;

use std::path::Path;
use std::process::{Command, Output};

fn repominer_bin() -> &'static str {
    env!("CARGO_BIN_EXE_repominer")
}

fn run(dir: &Path, args: &[&str]) -> Output {
    let output = Command::new(repominer_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run repominer");
    assert!(
        output.status.success(),
        "repominer {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

#[test]
fn test_mine_writes_all_outputs() {
    let fx = common::ansible_role().unwrap();
    let branch = fx.branch().unwrap();
    let out = tempfile::tempdir().unwrap();
    let out_dir = out.path().to_str().unwrap();

    run(
        fx.path(),
        &["mine", "--no-issues", "--branch", &branch, "--output-dir", out_dir],
    );

    let fixing: Vec<String> = serde_json::from_str(
        &std::fs::read_to_string(out.path().join("fixing-commits.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(fixing, vec![fx.commits[3].clone()]);

    let fixed: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out.path().join("fixed-files.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(fixed[0]["filepath"], "tasks/main.yml");
    assert_eq!(fixed[0]["bic"], fx.commits[1].as_str());

    let labeled: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out.path().join("failure-prone-files.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(labeled.as_array().map(Vec::len), Some(2));
}

#[test]
fn test_fixing_commits_json_stdout() {
    let fx = common::ansible_role().unwrap();
    let branch = fx.branch().unwrap();

    let output = run(
        fx.path(),
        &["fixing-commits", "--no-issues", "-b", &branch, "-f", "json"],
    );
    let fixing: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(fixing, vec![fx.commits[3].clone()]);
}

#[test]
fn test_custom_regex_finds_nothing() {
    let fx = common::ansible_role().unwrap();
    let branch = fx.branch().unwrap();

    let output = run(
        fx.path(),
        &[
            "fixing-commits",
            "--no-issues",
            "-b",
            &branch,
            "--regex",
            "hotfix",
            "-f",
            "json",
        ],
    );
    let fixing: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    assert!(fixing.is_empty());
}

#[test]
fn test_label_exports_versions() {
    let fx = common::ansible_role().unwrap();
    let branch = fx.branch().unwrap();
    let work = tempfile::tempdir().unwrap();
    let fixing_path = work.path().join("fixing.json");
    let fixed_path = work.path().join("fixed.json");
    let export = work.path().join("versions");

    let fixing = run(
        fx.path(),
        &["fixing-commits", "--no-issues", "-b", &branch, "-f", "json"],
    );
    std::fs::write(&fixing_path, &fixing.stdout).unwrap();

    let fixed = run(
        fx.path(),
        &[
            "fixed-files",
            "-b",
            &branch,
            "--fixing-commits",
            fixing_path.to_str().unwrap(),
            "-f",
            "json",
        ],
    );
    std::fs::write(&fixed_path, &fixed.stdout).unwrap();

    let labeled = run(
        fx.path(),
        &[
            "label",
            "-b",
            &branch,
            "--fixing-commits",
            fixing_path.to_str().unwrap(),
            "--fixed-files",
            fixed_path.to_str().unwrap(),
            "--export-dir",
            export.to_str().unwrap(),
            "--limit",
            "1",
            "-f",
            "json",
        ],
    );
    let labeled: serde_json::Value = serde_json::from_slice(&labeled.stdout).unwrap();
    assert_eq!(labeled.as_array().map(Vec::len), Some(1));
    assert_eq!(labeled[0]["commit"], fx.commits[2].as_str());

    let exported = export.join(&fx.commits[2]).join("tasks/main.yml");
    let content = std::fs::read_to_string(exported).unwrap();
    assert!(content.contains("state=latest"));
}

#[test]
fn test_label_export_rejects_escaping_paths() {
    let fx = common::ansible_role().unwrap();
    let branch = fx.branch().unwrap();
    let work = tempfile::tempdir().unwrap();
    let fixing_path = work.path().join("fixing.json");
    let fixed_path = work.path().join("fixed.json");
    let export = work.path().join("versions");

    std::fs::write(&fixing_path, format!("[\"{}\"]", fx.commits[3])).unwrap();
    std::fs::write(
        &fixed_path,
        format!(
            "[{{\"filepath\": \"../../escape.yml\", \"fic\": \"{}\", \"bic\": \"{}\"}}]",
            fx.commits[3], fx.commits[1]
        ),
    )
    .unwrap();

    let output = Command::new(repominer_bin())
        .args([
            "label",
            "-b",
            &branch,
            "--fixing-commits",
            fixing_path.to_str().unwrap(),
            "--fixed-files",
            fixed_path.to_str().unwrap(),
            "--export-dir",
            export.to_str().unwrap(),
        ])
        .current_dir(fx.path())
        .output()
        .expect("Failed to run repominer");

    assert!(!output.status.success());
    assert!(!work.path().join("escape.yml").exists());
    assert!(!export.exists());
}

#[test]
fn test_init_creates_config() {
    let fx = common::empty_repo().unwrap();
    run(fx.path(), &["init"]);
    assert!(fx.path().join("repominer.toml").exists());

    // running twice keeps the existing file
    std::fs::write(fx.path().join("repominer.toml"), "[mining]\n").unwrap();
    run(fx.path(), &["init"]);
    let content = std::fs::read_to_string(fx.path().join("repominer.toml")).unwrap();
    assert_eq!(content, "[mining]\n");
}
