pub mod error;
pub mod logging;
pub mod dsn;
pub mod naming;
pub mod allowlist;
pub mod envfile;
pub mod config;
pub mod executor;
pub mod vcs;
pub mod lifecycle;
pub mod database;
pub mod worktree;
pub mod project;


pub use error::{BranchDbError, CommandError, EngineError, ErrorCode, Result, VcsError};
pub use logging::{LogConfig, LogContext, CorrelationId, init_logging, init_cli_logging, LogFormat};
pub use dsn::{Dsn, Engine};
pub use config::{
    Config, DatabaseConfig, DockerConfig, ProjectConfig, WorktreesConfig,
    resolve_env_vars, resolve_env_vars_with,
};
pub use executor::{
    DatabaseExecutor, DatabaseInfo, DatabaseList, DockerExecutor, ServiceTarget,
    ClientEngine, ClientCommand, MysqlClient, PostgresClient, client_for,
};
pub use vcs::{GitVcs, Vcs, WorktreeEntry};
pub use lifecycle::{
    BranchManager, CheckoutResult, ProgressFn, ProgressStage, SwitchResult, select_clone_source,
};
pub use database::{CloneResult, DumpFile, DumpResult};
pub use worktree::{WorktreeAddResult, WorktreeRemoveResult};
pub use project::{ConfigSummary, InitResult, ProjectInfo};
