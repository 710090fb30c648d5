//! Version control contract and its git implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, VcsError};

/// One entry of `git worktree list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeEntry {
    pub path: PathBuf,
    /// Short branch name; `None` for detached checkouts
    pub branch: Option<String>,
    pub is_main: bool,
}

/// Branch and worktree primitives
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Name of the checked-out branch
    async fn current_branch(&self) -> Result<String>;

    /// Switch to `branch`, creating it first when `create` is set
    async fn checkout(&self, branch: &str, create: bool) -> Result<()>;

    async fn worktree_list(&self) -> Result<Vec<WorktreeEntry>>;

    /// Add a worktree at `path`, on a new branch when `new_branch` is set
    async fn worktree_add(&self, path: &Path, branch: &str, new_branch: bool) -> Result<()>;

    async fn worktree_remove(&self, path: &Path) -> Result<()>;
}

/// `git` subprocesses run from the project root
#[derive(Debug, Clone)]
pub struct GitVcs {
    repo_root: PathBuf,
}

impl GitVcs {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    /// Run git and return stdout. Failures carry stdout and stderr combined.
    async fn git<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new("git");
        command.args(args).current_dir(&self.repo_root);
        let rendered = render_args(command.as_std());
        debug!(command = %rendered, "running git");

        let output = command.output().await.map_err(|e| VcsError::Spawn {
            message: e.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let combined = format!("{}{}", stdout, stderr).trim().to_string();
            return Err(VcsError::command_failed(rendered, combined).into());
        }
        Ok(stdout)
    }
}

fn render_args(command: &std::process::Command) -> String {
    command
        .get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl Vcs for GitVcs {
    async fn current_branch(&self) -> Result<String> {
        let stdout = self.git(["branch", "--show-current"]).await?;
        Ok(stdout.trim().to_string())
    }

    async fn checkout(&self, branch: &str, create: bool) -> Result<()> {
        if create {
            self.git(["checkout", "-b", branch]).await?;
        } else {
            self.git(["checkout", branch]).await?;
        }
        Ok(())
    }

    async fn worktree_list(&self) -> Result<Vec<WorktreeEntry>> {
        let stdout = self.git(["worktree", "list", "--porcelain"]).await?;
        Ok(parse_worktree_porcelain(&stdout))
    }

    async fn worktree_add(&self, path: &Path, branch: &str, new_branch: bool) -> Result<()> {
        let path = path.as_os_str();
        let branch = OsStr::new(branch);
        if new_branch {
            self.git([OsStr::new("worktree"), OsStr::new("add"), OsStr::new("-b"), branch, path])
                .await?;
        } else {
            self.git([OsStr::new("worktree"), OsStr::new("add"), path, branch])
                .await?;
        }
        Ok(())
    }

    async fn worktree_remove(&self, path: &Path) -> Result<()> {
        self.git([OsStr::new("worktree"), OsStr::new("remove"), path.as_os_str()])
            .await?;
        Ok(())
    }
}

/// Parse `git worktree list --porcelain`.
///
/// Entries are blank-line separated; the first one is the main worktree.
pub fn parse_worktree_porcelain(output: &str) -> Vec<WorktreeEntry> {
    let mut entries = Vec::new();
    let mut path: Option<PathBuf> = None;
    let mut branch: Option<String> = None;

    let mut flush = |path: &mut Option<PathBuf>, branch: &mut Option<String>| {
        if let Some(path) = path.take() {
            entries.push(WorktreeEntry {
                path,
                branch: branch.take(),
                is_main: entries.is_empty(),
            });
        }
        *branch = None;
    };

    for line in output.lines() {
        if line.trim().is_empty() {
            flush(&mut path, &mut branch);
        } else if let Some(value) = line.strip_prefix("worktree ") {
            flush(&mut path, &mut branch);
            path = Some(PathBuf::from(value));
        } else if let Some(value) = line.strip_prefix("branch ") {
            branch = Some(value.trim_start_matches("refs/heads/").to_string());
        }
    }
    flush(&mut path, &mut branch);

    entries
}
