//! Small `KEY=value` env files: lookup and idempotent upsert.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::Result;

/// Name of the local env file rewritten on every switch
pub const ENV_LOCAL: &str = ".env.local";
/// Committed env file consulted last during variable resolution
pub const ENV: &str = ".env";
/// Key carrying the active connection string
pub const DATABASE_URL: &str = "DATABASE_URL";

/// Set `key` to `value` in the file at `path`.
///
/// The first line starting with `key=` is replaced; otherwise a line is
/// appended. A missing file counts as empty. The result always ends with
/// exactly one newline, so repeating the call leaves the bytes unchanged.
pub fn upsert(path: &Path, key: &str, value: &str) -> Result<()> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let updated = upsert_content(&content, key, value);
    fs::write(path, updated)?;
    tracing::debug!(path = %path.display(), key, "env file updated");
    Ok(())
}

fn upsert_content(content: &str, key: &str, value: &str) -> String {
    let prefix = format!("{key}=");
    let entry = format!("{prefix}{value}");

    let mut lines: Vec<&str> = content.trim_end_matches('\n').split('\n').collect();
    if content.trim_end_matches('\n').is_empty() {
        lines.clear();
    }

    match lines.iter().position(|line| line.starts_with(&prefix)) {
        Some(index) => lines[index] = &entry,
        None => lines.push(&entry),
    }

    let mut output = lines.join("\n");
    output.push('\n');
    output
}

/// Value of `key` in the env file at `path`.
///
/// Blank lines and `#` comments are skipped; the value is trimmed and
/// stripped of surrounding quotes. Missing files, missing keys and empty
/// values all yield `None`.
pub fn read_value(path: &Path, key: &str) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    content.lines().find_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let (name, value) = line.split_once('=')?;
        if name.trim() != key {
            return None;
        }
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        (!value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_upsert_creates_missing_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join(ENV_LOCAL);

        upsert(&path, DATABASE_URL, "mysql://root@db/app")?;
        assert_eq!(fs::read_to_string(&path)?, "DATABASE_URL=mysql://root@db/app\n");
        Ok(())
    }

    #[test]
    fn test_upsert_replaces_first_match_only() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join(ENV_LOCAL);
        fs::write(
            &path,
            "APP_ENV=dev\nDATABASE_URL=old\nMAILER=null\nDATABASE_URL=older\n",
        )?;

        upsert(&path, DATABASE_URL, "new")?;
        assert_eq!(
            fs::read_to_string(&path)?,
            "APP_ENV=dev\nDATABASE_URL=new\nMAILER=null\nDATABASE_URL=older\n"
        );
        Ok(())
    }

    #[test]
    fn test_upsert_appends_and_normalizes_newlines() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join(ENV_LOCAL);
        fs::write(&path, "APP_ENV=dev\n\n\n")?;

        upsert(&path, DATABASE_URL, "x")?;
        assert_eq!(fs::read_to_string(&path)?, "APP_ENV=dev\nDATABASE_URL=x\n");

        fs::write(&path, "APP_ENV=dev")?;
        upsert(&path, DATABASE_URL, "x")?;
        assert_eq!(fs::read_to_string(&path)?, "APP_ENV=dev\nDATABASE_URL=x\n");
        Ok(())
    }

    #[test]
    fn test_upsert_is_idempotent() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join(ENV_LOCAL);
        fs::write(&path, "# local overrides\nAPP_SECRET=abc")?;

        upsert(&path, DATABASE_URL, "postgres://app:pw@db:5432/app_feature")?;
        let first = fs::read(&path)?;
        upsert(&path, DATABASE_URL, "postgres://app:pw@db:5432/app_feature")?;
        let second = fs::read(&path)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_upsert_does_not_match_longer_key() {
        let output = upsert_content("DATABASE_URL_TEST=t\n", DATABASE_URL, "x");
        assert_eq!(output, "DATABASE_URL_TEST=t\nDATABASE_URL=x\n");
    }

    #[test]
    fn test_read_value() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join(ENV);
        fs::write(
            &path,
            "# comment\n\nDB_USER = \"app\"\nDB_PASS='s3cret'\nEMPTY=\n",
        )?;

        assert_eq!(read_value(&path, "DB_USER").as_deref(), Some("app"));
        assert_eq!(read_value(&path, "DB_PASS").as_deref(), Some("s3cret"));
        assert_eq!(read_value(&path, "EMPTY"), None);
        assert_eq!(read_value(&path, "MISSING"), None);
        assert_eq!(read_value(&temp_dir.path().join("nope"), "DB_USER"), None);
        Ok(())
    }
}
