//! Worktree commands, with optional per-worktree databases.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use crate::allowlist;
use crate::config::Config;
use crate::envfile;
use crate::error::{BranchDbError, Result};
use crate::executor::{DatabaseExecutor, ServiceTarget};
use crate::lifecycle::{BranchManager, ProgressStage};
use crate::naming;
use crate::vcs::{Vcs, WorktreeEntry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeAddResult {
    pub path: PathBuf,
    pub branch: String,
    /// Database wired into the worktree's `.env.local`, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default)]
    pub created: bool,
    #[serde(default)]
    pub cloned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeRemoveResult {
    pub path: PathBuf,
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Fail with `PathTraversal` unless `path` stays inside `base` once
/// `.` and `..` are resolved lexically.
pub fn check_path_traversal(path: &Path, base: &Path) -> Result<()> {
    if normalize(path).starts_with(normalize(base)) {
        Ok(())
    } else {
        Err(BranchDbError::PathTraversal {
            path: path.display().to_string(),
            base: base.display().to_string(),
        })
    }
}

impl<E, V> BranchManager<E, V>
where
    E: DatabaseExecutor,
    V: Vcs,
{
    fn worktree_path(&self, config: &Config, branch: &str) -> Result<PathBuf> {
        naming::validate_branch_name(branch)?;
        let worktrees = config.require_worktrees()?;

        let base = self.project_root().join(&worktrees.base_path);
        let path = base.join(naming::worktree_dir_name(branch));
        check_path_traversal(&path, &base)?;
        Ok(path)
    }

    pub async fn worktree_list(&self) -> Result<Vec<WorktreeEntry>> {
        self.vcs().worktree_list().await
    }

    /// Check `branch` out into `<base_path>/<branch with / as ->`.
    pub async fn worktree_add(&self, branch: &str, new_branch: bool) -> Result<WorktreeAddResult> {
        let config = self.load_config()?;
        let path = self.worktree_path(&config, branch)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.vcs().worktree_add(&path, branch, new_branch).await?;
        info!(branch, path = %path.display(), "worktree added");

        let mut result = WorktreeAddResult {
            path,
            branch: branch.to_string(),
            database: None,
            created: false,
            cloned: false,
        };

        let worktrees = config.require_worktrees()?;
        if worktrees.db_per_worktree {
            self.provision_worktree_database(&config, &worktrees.db_prefix, &mut result)
                .await?;
        }

        Ok(result)
    }

    async fn provision_worktree_database(
        &self,
        config: &Config,
        prefix: &str,
        result: &mut WorktreeAddResult,
    ) -> Result<()> {
        let allowed = &config.require_database()?.allowed;
        let target = ServiceTarget::from_config(config, self.project_root())?;
        let default_database = target.default_database().to_string();
        let database = naming::worktree_database_name(prefix, &result.branch);

        let existing = self
            .executor()
            .list_databases(&target, &default_database)
            .await?;
        if existing.contains(&database) {
            debug!(database = %database, "worktree database exists, reusing");
        } else {
            allowlist::check(&database, allowed)?;

            self.report(ProgressStage::Creating, &database);
            self.executor().create_database(&target, &database).await?;
            result.created = true;

            self.clone_into(&target, &default_database, &database)
                .await?;
            result.cloned = true;
        }

        self.report(ProgressStage::Patching, envfile::ENV_LOCAL);
        envfile::upsert(
            &result.path.join(envfile::ENV_LOCAL),
            envfile::DATABASE_URL,
            &target.dsn.with_database(&database).to_string(),
        )?;

        result.database = Some(database);
        Ok(())
    }

    /// Remove the worktree for `branch`. Its database is left in place.
    pub async fn worktree_remove(&self, branch: &str) -> Result<WorktreeRemoveResult> {
        let config = self.load_config()?;
        let path = self.worktree_path(&config, branch)?;

        self.vcs().worktree_remove(&path).await?;
        info!(branch, path = %path.display(), "worktree removed");
        Ok(WorktreeRemoveResult { path })
    }
}
