//! Rule-based commit classifier
//!
//! Decides whether a commit is a fix and sorts fixes into the defect
//! categories common in infrastructure code:
//!
//! | Category | Typical change |
//! |---|---|
//! | conditional | `when:` clauses, Jinja `if` blocks |
//! | configuration_data | literal values: ports, paths, versions |
//! | dependency | includes, imports, role dependencies |
//! | documentation | comments, READMEs |
//! | idempotency | `changed_when`, `creates`, `removes` |
//! | security | file modes, credentials, certificates |
//! | service | service state, handlers |
//! | syntax | YAML indentation, quoting, lint errors |
//!
//! Classification enriches fixing-commit reports. It never decides which
//! commits the miner treats as fixing commits.

mod rules;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::git::{Modification, Vcs};
use crate::mining::FixMessagePattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixCategory {
    Conditional,
    ConfigurationData,
    Dependency,
    Documentation,
    Idempotency,
    Security,
    Service,
    Syntax,
}

impl FixCategory {
    pub const ALL: [FixCategory; 8] = [
        FixCategory::Conditional,
        FixCategory::ConfigurationData,
        FixCategory::Dependency,
        FixCategory::Documentation,
        FixCategory::Idempotency,
        FixCategory::Security,
        FixCategory::Service,
        FixCategory::Syntax,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FixCategory::Conditional => "conditional",
            FixCategory::ConfigurationData => "configuration_data",
            FixCategory::Dependency => "dependency",
            FixCategory::Documentation => "documentation",
            FixCategory::Idempotency => "idempotency",
            FixCategory::Security => "security",
            FixCategory::Service => "service",
            FixCategory::Syntax => "syntax",
        }
    }
}

impl std::fmt::Display for FixCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier verdict for one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub commit: String,
    pub is_fix: bool,
    pub categories: Vec<FixCategory>,
}

pub struct CommitClassifier {
    pattern: FixMessagePattern,
}

impl CommitClassifier {
    pub fn new(pattern: FixMessagePattern) -> Self {
        Self { pattern }
    }

    /// Same message rule the fixing-commit detector applies.
    pub fn is_fix(&self, message: &str) -> bool {
        self.pattern.matches(message)
    }

    /// Categories suggested by the message and the changed lines.
    pub fn categorize(&self, message: &str, modifications: &[Modification]) -> Vec<FixCategory> {
        let changed: Vec<&str> = modifications
            .iter()
            .filter(|m| !m.binary)
            .flat_map(|m| m.added_lines.iter().chain(&m.deleted_lines))
            .map(|(_, line)| line.as_str())
            .collect();

        let mut categories = BTreeSet::new();
        for rule in rules::rules() {
            let by_message = rule.message.is_match(message);
            let by_code = rule
                .code
                .as_ref()
                .is_some_and(|code| changed.iter().any(|line| code.is_match(line)));
            if by_message || by_code {
                categories.insert(rule.category);
            }
        }

        if modifications.iter().any(|m| is_documentation_file(m.path())) {
            categories.insert(FixCategory::Documentation);
        }

        categories.into_iter().collect()
    }

    pub fn classify(&self, vcs: &dyn Vcs, commit: &str) -> Result<Classification> {
        let message = vcs.commit_message(commit)?;
        let modifications = vcs.modifications(commit)?;
        Ok(Classification {
            commit: commit.to_string(),
            is_fix: self.is_fix(&message),
            categories: self.categorize(&message, &modifications),
        })
    }
}


fn is_documentation_file(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    let name = lower.rsplit('/').next().unwrap_or(&lower);
    name.starts_with("readme")
        || name.starts_with("changelog")
        || lower.ends_with(".md")
        || lower.ends_with(".rst")
        || lower.starts_with("docs/")
}
