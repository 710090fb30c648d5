use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main result type for BranchDB operations
pub type Result<T> = std::result::Result<T, BranchDbError>;

/// Main error type for BranchDB operations
#[derive(Debug, Error)]
pub enum BranchDbError {
    /// No config file, or a required config section is absent
    #[error("{message}")]
    ConfigMissing { message: String },

    /// Config file unreadable, malformed JSON, or missing a required field
    #[error("{message}")]
    ConfigInvalid { message: String },

    /// Connection string could not be parsed
    #[error("Malformed DSN: {reason}")]
    MalformedDsn { reason: String },

    /// Database name rejected by the allow-list
    #[error("Database '{name}' is not in the allowed list")]
    DatabaseNotAllowed { name: String },

    /// Destructive operation aimed at the default database
    #[error("Refusing to operate on the default database '{name}'")]
    DatabaseIsDefault { name: String },

    /// Branch or database name failed validation
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Computed path escapes its base directory
    #[error("Path '{path}' escapes base directory '{base}'")]
    PathTraversal { path: String, base: String },

    /// Referenced file does not exist
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Refusing to overwrite an existing config file
    #[error("Config file already exists: {path}")]
    ConfigExists { path: String },

    /// Destructive command issued without explicit confirmation
    #[error("Refusing to {action} without --yes")]
    ConfirmationRequired { action: String },

    /// git subprocess errors
    #[error("VCS error: {0}")]
    Vcs(#[from] VcsError),

    /// Database client subprocess errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the version control collaborator
#[derive(Debug, Error)]
pub enum VcsError {
    /// git exited with a non-zero status
    #[error("`git {command}` failed: {output}")]
    CommandFailed { command: String, output: String },

    /// git could not be started at all
    #[error("failed to run git: {message}")]
    Spawn { message: String },

    /// HEAD is not on a branch
    #[error("HEAD is detached; pass a branch explicitly")]
    DetachedHead,
}

/// Errors raised by the database executor collaborator
#[derive(Debug, Error)]
pub enum EngineError {
    /// DSN scheme has no client implementation
    #[error("Unsupported database engine: {engine}")]
    Unsupported { engine: String },

    /// Client command exited with a non-zero status
    #[error("{operation} failed for database '{database}': {output}")]
    CommandFailed {
        operation: String,
        database: String,
        output: String,
    },

    /// Client command could not be started
    #[error("failed to run {program}: {message}")]
    Spawn { program: String, message: String },
}

/// Stable machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ConfigMissing,
    ConfigInvalid,
    MalformedDsn,
    DbNotAllowed,
    DbIsDefault,
    InvalidName,
    PathTraversal,
    FileNotFound,
    ConfigExists,
    ConfirmationRequired,
    VcsFailure,
    EngineError,
    IoError,
    /// Failures outside the typed taxonomy
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissing => "CONFIG_MISSING",
            ErrorCode::ConfigInvalid => "CONFIG_INVALID",
            ErrorCode::MalformedDsn => "MALFORMED_DSN",
            ErrorCode::DbNotAllowed => "DB_NOT_ALLOWED",
            ErrorCode::DbIsDefault => "DB_IS_DEFAULT",
            ErrorCode::InvalidName => "INVALID_NAME",
            ErrorCode::PathTraversal => "PATH_TRAVERSAL",
            ErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ErrorCode::ConfigExists => "CONFIG_EXISTS",
            ErrorCode::ConfirmationRequired => "CONFIRMATION_REQUIRED",
            ErrorCode::VcsFailure => "VCS_FAILURE",
            ErrorCode::EngineError => "ENGINE_ERROR",
            ErrorCode::IoError => "IO_ERROR",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable surface form of an error: short code plus message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandError {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&BranchDbError> for CommandError {
    fn from(error: &BranchDbError) -> Self {
        Self {
            code: error.code(),
            message: error.to_string(),
        }
    }
}

/// Convenience methods for creating specific errors
impl BranchDbError {
    /// Create a config missing error
    pub fn config_missing(message: impl Into<String>) -> Self {
        Self::ConfigMissing {
            message: message.into(),
        }
    }

    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    /// Create a malformed DSN error
    pub fn malformed_dsn(reason: impl Into<String>) -> Self {
        Self::MalformedDsn {
            reason: reason.into(),
        }
    }

    /// Create a not-allowed error for a database name
    pub fn not_allowed(name: impl Into<String>) -> Self {
        Self::DatabaseNotAllowed { name: name.into() }
    }

    /// Create an invalid name error
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing-confirmation error for `action`
    pub fn confirmation_required(action: impl Into<String>) -> Self {
        Self::ConfirmationRequired {
            action: action.into(),
        }
    }

    /// Machine-readable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ConfigMissing { .. } => ErrorCode::ConfigMissing,
            Self::ConfigInvalid { .. } => ErrorCode::ConfigInvalid,
            Self::MalformedDsn { .. } => ErrorCode::MalformedDsn,
            Self::DatabaseNotAllowed { .. } => ErrorCode::DbNotAllowed,
            Self::DatabaseIsDefault { .. } => ErrorCode::DbIsDefault,
            Self::InvalidName { .. } => ErrorCode::InvalidName,
            Self::PathTraversal { .. } => ErrorCode::PathTraversal,
            Self::FileNotFound { .. } => ErrorCode::FileNotFound,
            Self::ConfigExists { .. } => ErrorCode::ConfigExists,
            Self::ConfirmationRequired { .. } => ErrorCode::ConfirmationRequired,
            Self::Vcs(_) => ErrorCode::VcsFailure,
            Self::Engine(_) => ErrorCode::EngineError,
            Self::Io(_) => ErrorCode::IoError,
        }
    }
}

impl VcsError {
    /// Create a command failure carrying combined stdout/stderr
    pub fn command_failed(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            output: output.into(),
        }
    }
}

impl EngineError {
    /// Create a client command failure
    pub fn command_failed(
        operation: impl Into<String>,
        database: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            operation: operation.into(),
            database: database.into(),
            output: output.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            BranchDbError::config_missing("no config").code(),
            ErrorCode::ConfigMissing
        );
        assert_eq!(
            BranchDbError::not_allowed("other_db").code(),
            ErrorCode::DbNotAllowed
        );

        let vcs: BranchDbError = VcsError::command_failed("checkout nope", "error: pathspec").into();
        assert_eq!(vcs.code(), ErrorCode::VcsFailure);

        let engine: BranchDbError = EngineError::Unsupported {
            engine: "sqlite".to_string(),
        }
        .into();
        assert_eq!(engine.code(), ErrorCode::EngineError);
    }

    #[test]
    fn test_error_display() {
        let error = BranchDbError::not_allowed("other_db");
        assert_eq!(error.to_string(), "Database 'other_db' is not in the allowed list");

        let vcs: BranchDbError = VcsError::command_failed("checkout x", "fatal: bad").into();
        assert!(vcs.to_string().contains("fatal: bad"));
    }

    #[test]
    fn test_command_error_serialization() {
        let error = BranchDbError::malformed_dsn("missing host");
        let command_error = CommandError::from(&error);
        let json = serde_json::to_value(&command_error).unwrap();
        assert_eq!(json["code"], "MALFORMED_DSN");
        assert_eq!(json["message"], "Malformed DSN: missing host");
    }

    #[test]
    fn test_confirmation_and_detached_codes() {
        let error = BranchDbError::confirmation_required("drop 'app_old'");
        assert_eq!(error.code().as_str(), "CONFIRMATION_REQUIRED");
        assert_eq!(error.to_string(), "Refusing to drop 'app_old' without --yes");

        let detached: BranchDbError = VcsError::DetachedHead.into();
        assert_eq!(detached.code(), ErrorCode::VcsFailure);

        let json = serde_json::to_value(ErrorCode::Internal).unwrap();
        assert_eq!(json, "INTERNAL");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, ".env.local");
        let error: BranchDbError = io_error.into();
        assert!(matches!(error, BranchDbError::Io(_)));
        assert_eq!(error.code().as_str(), "IO_ERROR");
    }
}
