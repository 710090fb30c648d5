//! Name derivation for branch databases and worktree directories.

use crate::error::{BranchDbError, Result};

/// Branches that always map onto the default database
pub const TRUNK_BRANCHES: [&str; 2] = ["main", "master"];

/// Longest identifier accepted by both MySQL and Postgres (63 bytes there, 64 here)
const MAX_DATABASE_NAME_LEN: usize = 64;

pub fn is_trunk(branch: &str) -> bool {
    TRUNK_BRANCHES.contains(&branch)
}

/// Replace `/`, `-` and `.` with `_`.
pub fn sanitize_branch(branch: &str) -> String {
    branch.replace(['/', '-', '.'], "_")
}

/// Database name for `branch`.
///
/// Trunk branches get `default_database` unchanged; every other branch gets
/// `<default_database>_<sanitized branch>`.
pub fn derive_database_name(default_database: &str, branch: &str) -> String {
    if is_trunk(branch) {
        return default_database.to_string();
    }
    format!("{default_database}_{}", sanitize_branch(branch))
}

/// Database name for a worktree checked out on `branch`.
pub fn worktree_database_name(prefix: &str, branch: &str) -> String {
    format!("{prefix}{}", sanitize_branch(branch))
}

/// Directory name for a worktree: `feature/x` becomes `feature-x`.
pub fn worktree_dir_name(branch: &str) -> String {
    branch.replace('/', "-")
}

/// Reject names that git would refuse or that could escape a directory.
pub fn validate_branch_name(branch: &str) -> Result<()> {
    let reason = if branch.is_empty() {
        Some("branch name cannot be empty")
    } else if branch.starts_with('-') {
        Some("branch name cannot start with '-'")
    } else if branch.contains("..") {
        Some("branch name cannot contain '..'")
    } else if branch.chars().any(|c| c.is_whitespace() || c.is_control()) {
        Some("branch name cannot contain whitespace or control characters")
    } else if branch.starts_with('/') || branch.ends_with('/') {
        Some("branch name cannot start or end with '/'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(BranchDbError::invalid_name(branch, reason)),
        None => Ok(()),
    }
}

/// Database names given explicitly on the command line must be plain identifiers.
pub fn validate_database_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(BranchDbError::invalid_name(name, "database name cannot be empty"));
    }
    if name.len() > MAX_DATABASE_NAME_LEN {
        return Err(BranchDbError::invalid_name(
            name,
            format!("database name exceeds {MAX_DATABASE_NAME_LEN} characters"),
        ));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(BranchDbError::invalid_name(
            name,
            "database name may only contain letters, digits and '_'",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_trunk_branches_keep_default() {
        assert_eq!(derive_database_name("app", "main"), "app");
        assert_eq!(derive_database_name("app", "master"), "app");
    }

    #[test]
    fn test_feature_branch_is_suffixed() {
        assert_eq!(derive_database_name("app", "feature/x-1"), "app_feature_x_1");
        assert_eq!(derive_database_name("app", "release/1.2"), "app_release_1_2");
        assert_eq!(derive_database_name("app", "develop"), "app_develop");
    }

    #[test]
    fn test_derivation_is_stable() {
        let first = derive_database_name("shop", "fix/cart-total");
        let second = derive_database_name("shop", "fix/cart-total");
        assert_eq!(first, second);
    }

    #[test]
    fn test_worktree_names() {
        assert_eq!(worktree_dir_name("feature/login"), "feature-login");
        assert_eq!(worktree_database_name("app_wt_", "feature/login"), "app_wt_feature_login");
    }

    #[test]
    fn test_validate_branch_name() {
        assert!(validate_branch_name("feature/x-1").is_ok());
        for bad in ["", "-rf", "a/../b", "has space", "trailing/", "/leading"] {
            let error = validate_branch_name(bad).unwrap_err();
            assert_eq!(error.code(), ErrorCode::InvalidName, "input {bad:?}");
        }
    }

    #[test]
    fn test_validate_database_name() {
        assert!(validate_database_name("app_feature_1").is_ok());
        assert!(validate_database_name("app-feature").is_err());
        assert!(validate_database_name("app`; DROP").is_err());
        assert!(validate_database_name(&"a".repeat(65)).is_err());
    }
}
