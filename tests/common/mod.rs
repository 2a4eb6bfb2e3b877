//! Throwaway git repositories for integration tests

#![allow(dead_code)]

use anyhow::Result;
use git2::{IndexAddOption, Oid, Repository};
use std::fs;
use std::path::Path;

pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
    pub commits: Vec<String>,
}

impl Fixture {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn branch(&self) -> Result<String> {
        Ok(self.repo.head()?.shorthand().unwrap_or("master").to_string())
    }

    pub fn write(&self, relative: &str, content: &str) -> Result<()> {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Stage everything and commit.
    pub fn commit(&mut self, message: &str) -> Result<String> {
        let sig = self.repo.signature()?;
        let tree_id = {
            let mut index = self.repo.index()?;
            index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
            index.update_all(["*"].iter(), None)?;
            index.write()?;
            index.write_tree()?
        };
        let tree = self.repo.find_tree(tree_id)?;
        let parents = match self.repo.head() {
            Ok(head) => vec![head.peel_to_commit()?],
            Err(_) => vec![],
        };
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        let oid: Oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)?;
        self.commits.push(oid.to_string());
        Ok(oid.to_string())
    }
}

pub fn empty_repo() -> Result<Fixture> {
    let dir = tempfile::tempdir()?;
    let repo = Repository::init(dir.path())?;
    let mut config = repo.config()?;
    config.set_str("user.name", "Test User")?;
    config.set_str("user.email", "test@example.com")?;
    Ok(Fixture {
        dir,
        repo,
        commits: Vec::new(),
    })
}

/// Four commits on an Ansible role:
///
/// 0. initial tasks
/// 1. switch nginx to `state=latest` (the defect)
/// 2. unrelated README
/// 3. fix, back to `state=present`
pub fn ansible_role() -> Result<Fixture> {
    let mut fx = empty_repo()?;

    fx.write(
        "tasks/main.yml",
        "- name: install nginx\n  apt: name=nginx state=present\n",
    )?;
    fx.commit("Initial tasks")?;

    fx.write(
        "tasks/main.yml",
        "- name: install nginx\n  apt: name=nginx state=latest\n  notify: restart nginx\n",
    )?;
    fx.commit("Track latest nginx")?;

    fx.write("README.md", "# nginx role\n")?;
    fx.commit("Add readme")?;

    fx.write(
        "tasks/main.yml",
        "- name: install nginx\n  apt: name=nginx state=present\n  notify: restart nginx\n",
    )?;
    fx.commit("Fix nginx state")?;

    Ok(fx)
}
