//! Database executor contract.
//!
//! The executor runs database operations against the compose service named
//! in the config. Client behavior (mysql vs postgres) is chosen per call from
//! the DSN's engine.

pub mod docker;
pub mod engine;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::dsn::Dsn;
use crate::error::Result;

pub use docker::DockerExecutor;
pub use engine::{ClientCommand, ClientEngine, MysqlClient, PostgresClient, client_for};

/// One database as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub name: String,
    pub is_default: bool,
}

/// Result of a list operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseList {
    pub databases: Vec<DatabaseInfo>,
}

impl DatabaseList {
    pub fn from_names<I, S>(names: I, default_database: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let databases = names
            .into_iter()
            .map(|name| {
                let name = name.into();
                DatabaseInfo {
                    is_default: name == default_database,
                    name,
                }
            })
            .collect();
        Self { databases }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.databases.iter().any(|database| database.name == name)
    }
}

/// Where database commands are sent
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceTarget {
    /// Compose service running the server
    pub service: String,
    /// Connection credentials and default database
    pub dsn: Dsn,
    /// Compose files passed with `-f`, relative to the project root
    pub compose_files: Vec<String>,
    /// Directory receiving dump files
    pub dumps_dir: PathBuf,
}

impl ServiceTarget {
    /// Build a target from the database section of `config`.
    pub fn from_config(config: &Config, project_root: &Path) -> Result<Self> {
        let database = config.require_database()?;
        Ok(Self {
            service: database.service.clone(),
            dsn: Dsn::parse(&database.dsn)?,
            compose_files: config.compose_files().to_vec(),
            dumps_dir: project_root.join(&database.dumps_path),
        })
    }

    pub fn default_database(&self) -> &str {
        &self.dsn.database
    }
}

/// Capability interface for database operations
#[async_trait]
pub trait DatabaseExecutor: Send + Sync {
    /// List databases on the server, flagging `default_database`
    async fn list_databases(
        &self,
        target: &ServiceTarget,
        default_database: &str,
    ) -> Result<DatabaseList>;

    /// Create an empty database
    async fn create_database(&self, target: &ServiceTarget, name: &str) -> Result<()>;

    /// Drop a database if it exists
    async fn drop_database(&self, target: &ServiceTarget, name: &str) -> Result<()>;

    /// Dump a database (optionally limited to `tables`) and return the dump file path
    async fn dump_database(
        &self,
        target: &ServiceTarget,
        database: &str,
        tables: &[String],
    ) -> Result<PathBuf>;

    /// Load a SQL file into a database
    async fn import_sql(&self, target: &ServiceTarget, database: &str, sql_path: &Path)
    -> Result<()>;
}
