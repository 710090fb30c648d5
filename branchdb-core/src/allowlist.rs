//! Allow-list policy guarding database creation and destruction.
//!
//! A pattern matches a name exactly, or as a prefix when it ends in `*`.
//! A bare `*` allows everything.

use crate::error::{BranchDbError, Result};

fn pattern_matches(name: &str, pattern: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => name == pattern,
    }
}

/// Exact / prefix / bare-`*` matching only.
pub fn check_strict(name: &str, patterns: &[String]) -> Result<()> {
    if patterns.iter().any(|pattern| pattern_matches(name, pattern)) {
        Ok(())
    } else {
        Err(BranchDbError::not_allowed(name))
    }
}

/// Check used when provisioning a branch database.
///
/// On top of [`check_strict`], the name passes whenever the list holds a bare
/// `*` or the pattern `<patterns[0]>_*`, whichever pattern the name was
/// checked against. The inference keys off the first pattern only.
pub fn check(name: &str, patterns: &[String]) -> Result<()> {
    let strict = check_strict(name, patterns);
    if strict.is_ok() {
        return strict;
    }

    let Some(first) = patterns.first() else {
        return strict;
    };
    let branch_wildcard = format!("{first}_*");
    if patterns
        .iter()
        .any(|pattern| pattern == "*" || *pattern == branch_wildcard)
    {
        tracing::debug!(name, pattern = %branch_wildcard, "name allowed by branch wildcard");
        return Ok(());
    }

    strict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn patterns(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn test_exact_and_prefix_match() {
        let allowed = patterns(&["app", "app_*"]);
        assert!(check("app", &allowed).is_ok());
        assert!(check("app_feature_x", &allowed).is_ok());
        assert!(check_strict("app_feature_x", &allowed).is_ok());
    }

    #[test]
    fn test_rejects_unlisted_name() {
        let error = check("other_db", &patterns(&["app"])).unwrap_err();
        assert_eq!(error.code(), ErrorCode::DbNotAllowed);
        assert!(check_strict("other_db", &patterns(&["app"])).is_err());
    }

    #[test]
    fn test_bare_star_allows_anything() {
        assert!(check_strict("whatever", &patterns(&["*"])).is_ok());
        assert!(check("whatever", &patterns(&["app", "*"])).is_ok());
    }

    #[test]
    fn test_first_pattern_wildcard_inference() {
        let allowed = patterns(&["app", "app_*"]);
        // Unrelated names pass because the list opts into `<first>_*`.
        assert!(check("other_db", &allowed).is_ok());
        assert!(check_strict("other_db", &allowed).is_err());

        // The wildcard anchors on the first pattern only.
        let allowed = patterns(&["shop", "app", "app_*"]);
        assert!(check("other_db", &allowed).is_err());
    }

    #[test]
    fn test_empty_list_denies() {
        assert!(check("app", &[]).is_err());
        assert!(check_strict("app", &[]).is_err());
    }
}
