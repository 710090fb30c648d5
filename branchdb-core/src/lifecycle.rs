//! Branch-scoped database lifecycle: switch and checkout.
//!
//! Steps run strictly in sequence with no rollback. Once a database has been
//! created, a failure while cloning or patching the env file leaves it in
//! place for manual cleanup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::allowlist;
use crate::config::Config;
use crate::envfile;
use crate::error::{Result, VcsError};
use crate::executor::{DatabaseExecutor, ServiceTarget};
use crate::naming;
use crate::vcs::Vcs;

/// Stages reported while provisioning a database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStage {
    Creating,
    Cloning,
    Dumping,
    Importing,
    Patching,
}

impl std::fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ProgressStage::Creating => "creating",
            ProgressStage::Cloning => "cloning",
            ProgressStage::Dumping => "dumping",
            ProgressStage::Importing => "importing",
            ProgressStage::Patching => "patching",
        };
        f.write_str(label)
    }
}

/// Callback invoked before each provisioning stage
pub type ProgressFn = Box<dyn Fn(ProgressStage, &str) + Send + Sync>;

/// Outcome of [`BranchManager::switch`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchResult {
    pub branch: String,
    pub database: String,
    pub created: bool,
    pub cloned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloned_from: Option<String>,
}

/// Outcome of [`BranchManager::checkout`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub branch: String,
    pub database: String,
    pub created: bool,
    pub cloned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloned_from: Option<String>,
}

impl From<SwitchResult> for CheckoutResult {
    fn from(result: SwitchResult) -> Self {
        Self {
            branch: result.branch,
            database: result.database,
            created: result.created,
            cloned: result.cloned,
            cloned_from: result.cloned_from,
        }
    }
}

/// Pick the database to seed a new branch database from.
///
/// An explicit source wins; otherwise non-trunk branches clone the default
/// database and trunk branches start empty.
pub fn select_clone_source<'a>(
    clone_from: Option<&'a str>,
    branch: &str,
    default_database: &'a str,
) -> Option<&'a str> {
    match clone_from.filter(|source| !source.is_empty()) {
        Some(source) => Some(source),
        None if !naming::is_trunk(branch) => Some(default_database),
        None => None,
    }
}

/// Drives branch databases for one project directory.
///
/// Holds no state between calls; the config is reloaded on every operation.
pub struct BranchManager<E, V> {
    project_root: PathBuf,
    executor: E,
    vcs: V,
    progress: Option<ProgressFn>,
}

impl<E, V> BranchManager<E, V>
where
    E: DatabaseExecutor,
    V: Vcs,
{
    pub fn new(project_root: impl Into<PathBuf>, executor: E, vcs: V) -> Self {
        Self {
            project_root: project_root.into(),
            executor,
            vcs,
            progress: None,
        }
    }

    /// Report provisioning stages through `progress`
    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(ProgressStage, &str) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    pub(crate) fn report(&self, stage: ProgressStage, detail: &str) {
        debug!(%stage, detail, "progress");
        if let Some(progress) = &self.progress {
            progress(stage, detail);
        }
    }

    /// Fresh config for this project
    pub fn load_config(&self) -> Result<Config> {
        Config::load(&self.project_root)
    }

    /// Point the project at the database for `branch` (the current branch
    /// when `None`), creating and seeding it first if it does not exist.
    ///
    /// Resolving the current branch on a detached HEAD fails with
    /// `VcsFailure` before anything is touched.
    pub async fn switch(
        &self,
        branch: Option<&str>,
        clone_from: Option<&str>,
    ) -> Result<SwitchResult> {
        let config = self.load_config()?;
        let database = config.require_database()?;

        let branch = match branch {
            Some(branch) => branch.to_string(),
            None => {
                let current = self.vcs.current_branch().await?;
                if current.is_empty() {
                    debug!("no current branch, HEAD is detached");
                    return Err(VcsError::DetachedHead.into());
                }
                current
            }
        };

        let target = ServiceTarget::from_config(&config, &self.project_root)?;
        let default_database = target.default_database().to_string();
        let branch_database = naming::derive_database_name(&default_database, &branch);
        info!(branch = %branch, database = %branch_database, "switching database");

        let existing = self
            .executor
            .list_databases(&target, &default_database)
            .await?;

        let mut result = SwitchResult {
            branch: branch.clone(),
            database: branch_database.clone(),
            created: false,
            cloned: false,
            cloned_from: None,
        };

        if existing.contains(&branch_database) {
            debug!(database = %branch_database, "database exists, reusing");
        } else {
            allowlist::check(&branch_database, &database.allowed)?;

            self.report(ProgressStage::Creating, &branch_database);
            self.executor
                .create_database(&target, &branch_database)
                .await?;
            result.created = true;

            if let Some(source) = select_clone_source(clone_from, &branch, &default_database) {
                self.clone_into(&target, source, &branch_database).await?;
                result.cloned = true;
                result.cloned_from = Some(source.to_string());
            }
        }

        self.report(ProgressStage::Patching, envfile::ENV_LOCAL);
        let url = target.dsn.with_database(&branch_database).to_string();
        envfile::upsert(
            &self.project_root.join(envfile::ENV_LOCAL),
            envfile::DATABASE_URL,
            &url,
        )?;

        info!(
            branch = %result.branch,
            database = %result.database,
            created = result.created,
            cloned = result.cloned,
            "switch complete"
        );
        Ok(result)
    }

    /// Switch git to `branch` (creating it when `create` is set), then switch
    /// the database. A failed git operation leaves databases and env files
    /// untouched.
    pub async fn checkout(
        &self,
        branch: &str,
        create: bool,
        clone_from: Option<&str>,
    ) -> Result<CheckoutResult> {
        self.vcs.checkout(branch, create).await?;
        info!(branch, create, "checked out branch");

        let result = self.switch(Some(branch), clone_from).await?;
        Ok(result.into())
    }

    /// Seed `database` with a dump of `source`; returns the dump file.
    pub(crate) async fn clone_into(
        &self,
        target: &ServiceTarget,
        source: &str,
        database: &str,
    ) -> Result<PathBuf> {
        self.report(ProgressStage::Cloning, &format!("{source} -> {database}"));

        self.report(ProgressStage::Dumping, source);
        let dump_path = self.executor.dump_database(target, source, &[]).await?;

        self.report(ProgressStage::Importing, database);
        self.executor
            .import_sql(target, database, &dump_path)
            .await?;

        info!(source, database, dump = %dump_path.display(), "database cloned");
        Ok(dump_path)
    }
}
