//! Git operations used by the workflow.
//!
//! Covers what the repair loops need from version control: which files the
//! editor's last commit introduced, committing fixes, and listing tracked
//! files for file selection.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Version control primitives consumed by the workflow.
#[async_trait]
pub(crate) trait VersionControl: Send + Sync {
    /// Paths added by the most recent commit, in git's order.
    async fn files_added_in_last_commit(&self) -> Result<Vec<PathBuf>>;

    /// Commits every change to already-tracked files.
    async fn commit_all_tracked(&self, message: &str) -> Result<()>;

    /// Stages everything, new files included, and commits.
    async fn commit_all(&self, message: &str) -> Result<()>;

    /// Tracked files under `dir`, relative to the repository root.
    async fn tracked_files(&self, dir: &Path) -> Result<Vec<PathBuf>>;
}

/// `git` CLI backed version control.
#[derive(Debug, Clone)]
pub(crate) struct GitVcs {
    repo_dir: PathBuf,
}

impl GitVcs {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    async fn git(&self, args: &[&str]) -> Result<std::process::Output> {
        tokio::process::Command::new("git")
            .current_dir(&self.repo_dir)
            .args(args)
            .output()
            .await
            .with_context(|| format!("Failed to run git {}", args.join(" ")))
    }

    async fn commit(&self, args: &[&str]) -> Result<()> {
        let output = self.git(args).await?;
        if output.status.success() {
            info!("Created commit");
            return Ok(());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if is_nothing_to_commit(&stdout) {
            debug!("Nothing to commit");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("Git commit failed: {}{}", stdout.trim(), stderr.trim());
    }
}

fn is_nothing_to_commit(stdout: &str) -> bool {
    stdout.contains("nothing to commit")
        || stdout.contains("nothing added to commit")
        || stdout.contains("no changes added to commit")
}

fn parse_paths(stdout: &[u8]) -> Vec<PathBuf> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(PathBuf::from)
        .collect()
}

#[async_trait]
impl VersionControl for GitVcs {
    async fn files_added_in_last_commit(&self) -> Result<Vec<PathBuf>> {
        let output = self
            .git(&[
                "diff-tree",
                "--no-commit-id",
                "--name-only",
                "--diff-filter=A",
                "--root",
                "-r",
                "HEAD",
            ])
            .await?;

        if !output.status.success() {
            bail!(
                "Git diff-tree failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(parse_paths(&output.stdout))
    }

    async fn commit_all_tracked(&self, message: &str) -> Result<()> {
        debug!("Committing tracked changes: {}", message);
        self.commit(&["commit", "-a", "-m", message]).await
    }

    async fn commit_all(&self, message: &str) -> Result<()> {
        debug!("Committing all changes: {}", message);
        let output = self.git(&["add", "-A"]).await?;
        if !output.status.success() {
            bail!(
                "Git add failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        self.commit(&["commit", "-m", message]).await
    }

    async fn tracked_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let dir = dir.to_string_lossy();
        let output = self.git(&["ls-files", "--full-name", "--", &dir]).await?;

        if !output.status.success() {
            bail!(
                "Git ls-files failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(parse_paths(&output.stdout))
    }
}
