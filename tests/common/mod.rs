//! Shared fixtures for integration tests.
//!
//! Every repository lives in its own `TempDir` and is driven with the real
//! `git` binary for setup, so the code under test sees ordinary on-disk
//! repositories.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tempfile::TempDir;

use git_desk::config::SessionConfig;

/// A repository on `main` with one commit containing `README.md`.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        let repo = Self::empty();
        repo.commit_file("README.md", "# Test Repo\n", "Initial commit");
        repo
    }

    /// A repository on an unborn `main` branch.
    pub fn empty() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        run_git(dir.path(), &["init"]);
        run_git(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "user.name", "Test User"]);
        run_git(dir.path(), &["config", "commit.gpgsign", "false"]);
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn canonical_path(&self) -> PathBuf {
        std::fs::canonicalize(self.path()).unwrap()
    }

    pub fn write(&self, path: &str, content: &str) {
        let full = self.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }

    pub fn commit_file(&self, path: &str, content: &str, message: &str) -> String {
        self.write(path, content);
        run_git(self.path(), &["add", path]);
        run_git(self.path(), &["commit", "-m", message]);
        self.rev_parse("HEAD")
    }

    pub fn rev_parse(&self, rev: &str) -> String {
        git_stdout(self.path(), &["rev-parse", rev])
    }

    pub fn current_branch(&self) -> String {
        git_stdout(self.path(), &["rev-parse", "--abbrev-ref", "HEAD"])
    }

    pub fn branch_exists(&self, name: &str) -> bool {
        Command::new("git")
            .args(["rev-parse", "--verify", "--quiet", &format!("refs/heads/{}", name)])
            .current_dir(self.path())
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    pub fn git(&self, args: &[&str]) {
        run_git(self.path(), args);
    }
}

/// Run a git command in the given directory.
pub fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

pub fn git_stdout(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");
    assert!(output.status.success(), "git {:?} failed", args);
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

/// Config with a short debounce so watcher tests finish quickly.
pub fn test_config() -> SessionConfig {
    SessionConfig {
        debounce: Duration::from_millis(100),
        ..SessionConfig::default()
    }
}
