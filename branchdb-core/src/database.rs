//! Explicit database commands: list, create, drop, dump, import, clone.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::allowlist;
use crate::error::{BranchDbError, Result};
use crate::executor::{DatabaseExecutor, DatabaseList, ServiceTarget};
use crate::lifecycle::{BranchManager, ProgressStage};
use crate::naming;
use crate::vcs::Vcs;

/// A dump file found in the dumps directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpResult {
    pub database: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneResult {
    pub source: String,
    pub target: String,
    pub created: bool,
    pub dump: PathBuf,
}

impl<E, V> BranchManager<E, V>
where
    E: DatabaseExecutor,
    V: Vcs,
{
    fn service_target(&self) -> Result<(ServiceTarget, Vec<String>)> {
        let config = self.load_config()?;
        let allowed = config.require_database()?.allowed.clone();
        let target = ServiceTarget::from_config(&config, self.project_root())?;
        Ok((target, allowed))
    }

    pub async fn list_databases(&self) -> Result<DatabaseList> {
        let (target, _) = self.service_target()?;
        self.executor()
            .list_databases(&target, target.default_database())
            .await
    }

    pub async fn create_database(&self, name: &str) -> Result<()> {
        naming::validate_database_name(name)?;
        let (target, allowed) = self.service_target()?;
        allowlist::check_strict(name, &allowed)?;

        self.report(ProgressStage::Creating, name);
        self.executor().create_database(&target, name).await
    }

    /// Drop `name`. The default database is never dropped.
    pub async fn drop_database(&self, name: &str) -> Result<()> {
        naming::validate_database_name(name)?;
        let (target, allowed) = self.service_target()?;
        if name == target.default_database() {
            return Err(BranchDbError::DatabaseIsDefault {
                name: name.to_string(),
            });
        }
        allowlist::check_strict(name, &allowed)?;

        warn!(database = name, "dropping database");
        self.executor().drop_database(&target, name).await
    }

    /// Dump `database` (the DSN database when `None`), optionally limited to `tables`.
    pub async fn dump_database(
        &self,
        database: Option<&str>,
        tables: &[String],
    ) -> Result<DumpResult> {
        let (target, _) = self.service_target()?;
        let database = database
            .filter(|name| !name.is_empty())
            .unwrap_or(target.default_database())
            .to_string();

        self.report(ProgressStage::Dumping, &database);
        let path = self
            .executor()
            .dump_database(&target, &database, tables)
            .await?;
        Ok(DumpResult { database, path })
    }

    /// Load `sql_path` (relative to the project root) into `database`.
    pub async fn import_database(&self, database: &str, sql_path: &Path) -> Result<()> {
        let path = self.project_root().join(sql_path);
        if !path.is_file() {
            return Err(BranchDbError::FileNotFound {
                path: sql_path.display().to_string(),
            });
        }

        let (target, allowed) = self.service_target()?;
        allowlist::check_strict(database, &allowed)?;

        self.report(ProgressStage::Importing, database);
        self.executor().import_sql(&target, database, &path).await
    }

    /// Copy `source` (the DSN database when `None`) into `target_database`,
    /// creating it first when absent.
    pub async fn clone_database(
        &self,
        source: Option<&str>,
        target_database: &str,
    ) -> Result<CloneResult> {
        naming::validate_database_name(target_database)?;
        let (target, allowed) = self.service_target()?;
        allowlist::check_strict(target_database, &allowed)?;

        let source = source
            .filter(|name| !name.is_empty())
            .unwrap_or(target.default_database())
            .to_string();

        let existing = self
            .executor()
            .list_databases(&target, target.default_database())
            .await?;
        let created = !existing.contains(target_database);
        if created {
            self.report(ProgressStage::Creating, target_database);
            self.executor()
                .create_database(&target, target_database)
                .await?;
        }

        let dump = self.clone_into(&target, &source, target_database).await?;
        info!(source = %source, target = target_database, created, "clone complete");

        Ok(CloneResult {
            source,
            target: target_database.to_string(),
            created,
            dump,
        })
    }

    /// SQL dumps under the dumps directory, newest first.
    pub fn list_dumps(&self) -> Result<Vec<DumpFile>> {
        let config = self.load_config()?;
        config.require_database()?;
        let dumps_dir = config
            .dumps_dir(self.project_root())
            .unwrap_or_else(|| self.project_root().join("var/dumps"));
        read_dumps(&dumps_dir)
    }
}

/// `*.sql` files in `dir`, newest first. A missing directory has no dumps.
pub fn read_dumps(dir: &Path) -> Result<Vec<DumpFile>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut dumps = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("sql") {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        dumps.push(DumpFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
            size: metadata.len(),
            modified: DateTime::<Local>::from(metadata.modified()?),
        });
    }

    dumps.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
    Ok(dumps)
}
