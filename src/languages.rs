//! Relevant-file predicates
//!
//! Mining only considers files of the language under study. A predicate
//! sees the path and, when available, the text content of a file version.

use serde::{Deserialize, Serialize};

use crate::git::Modification;

/// Decides whether a file belongs to the language being mined.
pub trait RelevantFile {
    fn is_relevant(&self, path: &str, content: Option<&str>) -> bool;

    /// Binary or undecodable files are never relevant.
    fn accepts(&self, modification: &Modification) -> bool {
        !modification.binary && self.is_relevant(modification.path(), modification.content())
    }
}

/// Languages with a built-in predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ansible,
    Tosca,
    Any,
}

impl Language {
    pub fn predicate(&self) -> Box<dyn RelevantFile> {
        match self {
            Language::Ansible => Box::new(AnsibleFiles),
            Language::Tosca => Box::new(ToscaFiles),
            Language::Any => Box::new(AnyFile),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Ansible => write!(f, "ansible"),
            Language::Tosca => write!(f, "tosca"),
            Language::Any => write!(f, "any"),
        }
    }
}

const ANSIBLE_DIRS: &[&str] = &[
    "playbooks",
    "meta",
    "tasks",
    "handlers",
    "roles",
    "vars",
    "defaults",
    "group_vars",
    "host_vars",
];

const ANSIBLE_PLAYBOOKS: &[&str] = &["site.yml", "site.yaml", "playbook.yml", "playbook.yaml", "main.yml", "main.yaml"];

fn is_yaml(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".yml") || lower.ends_with(".yaml")
}

/// YAML files in Ansible content directories, plus top-level playbooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsibleFiles;

impl RelevantFile for AnsibleFiles {
    fn is_relevant(&self, path: &str, _content: Option<&str>) -> bool {
        if !is_yaml(path) {
            return false;
        }
        let parts: Vec<&str> = path.split('/').collect();
        let (file_name, dirs) = match parts.split_last() {
            Some((name, dirs)) => (*name, dirs),
            None => return false,
        };
        dirs.iter().any(|d| ANSIBLE_DIRS.contains(d))
            || (dirs.is_empty() && ANSIBLE_PLAYBOOKS.contains(&file_name))
    }
}

/// `.tosca` files and YAML files declaring a TOSCA definitions version.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToscaFiles;

impl RelevantFile for ToscaFiles {
    fn is_relevant(&self, path: &str, content: Option<&str>) -> bool {
        if path.to_ascii_lowercase().ends_with(".tosca") {
            return true;
        }
        is_yaml(path) && content.is_some_and(|c| c.contains("tosca_definitions_version"))
    }
}

/// Every text file.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyFile;

impl RelevantFile for AnyFile {
    fn is_relevant(&self, path: &str, _content: Option<&str>) -> bool {
        !path.is_empty()
    }
}
