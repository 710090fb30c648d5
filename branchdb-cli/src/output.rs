//! Terminal rendering for command results.

use branchdb_core::{
    BranchDbError, CheckoutResult, CloneResult, CommandError, DatabaseList, DumpFile, DumpResult,
    ErrorCode, InitResult, ProgressStage, ProjectInfo, SwitchResult, WorktreeAddResult,
    WorktreeEntry,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

/// Writes command results to stdout, owning the progress spinner so that
/// nothing is printed while it still draws.
pub struct Printer {
    json: bool,
    spinner: ProgressBar,
}

impl Printer {
    /// Printer with a ticking spinner; the spinner is hidden in JSON mode.
    pub fn new(json: bool) -> anyhow::Result<Self> {
        if json {
            return Ok(Self {
                json,
                spinner: ProgressBar::hidden(),
            });
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
        spinner.enable_steady_tick(Duration::from_millis(100));
        Ok(Self { json, spinner })
    }

    pub fn spinner(&self) -> &ProgressBar {
        &self.spinner
    }

    /// Stop and erase the spinner.
    pub fn clear(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }

    /// Print `value` as pretty JSON in JSON mode, otherwise render it as text.
    pub fn emit<T, F>(&self, value: &T, text: F) -> anyhow::Result<()>
    where
        T: Serialize,
        F: FnOnce(&T),
    {
        self.clear();
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            text(value);
        }
        Ok(())
    }
}

pub fn progress_message(stage: ProgressStage, detail: &str) -> String {
    match stage {
        ProgressStage::Creating => format!("Creating database {detail}"),
        ProgressStage::Cloning => format!("Cloning {detail}"),
        ProgressStage::Dumping => format!("Dumping {detail}"),
        ProgressStage::Importing => format!("Importing into {detail}"),
        ProgressStage::Patching => format!("Updating {detail}"),
    }
}

pub fn switched(result: &SwitchResult) {
    println!("✓ Database for branch '{}': {}", result.branch, result.database);
    provisioning(result.created, result.cloned_from.as_deref());
}

pub fn checked_out(result: &CheckoutResult) {
    println!("✓ Checked out branch '{}'", result.branch);
    println!("✓ Database: {}", result.database);
    provisioning(result.created, result.cloned_from.as_deref());
}

fn provisioning(created: bool, cloned_from: Option<&str>) {
    if created {
        println!("  created new database");
    }
    if let Some(source) = cloned_from {
        println!("  cloned from {source}");
    }
    println!("  DATABASE_URL written to .env.local");
}

pub fn databases(list: &DatabaseList) {
    if list.databases.is_empty() {
        println!("No databases found");
        return;
    }
    for database in &list.databases {
        if database.is_default {
            println!("* {} (default)", database.name);
        } else {
            println!("  {}", database.name);
        }
    }
}

pub fn dumped(result: &DumpResult) {
    println!("✓ Dumped {} to {}", result.database, result.path.display());
}

pub fn cloned(result: &CloneResult) {
    if result.created {
        println!("✓ Created {}", result.target);
    }
    println!("✓ Cloned {} into {}", result.source, result.target);
}

pub fn dumps(files: &Vec<DumpFile>) {
    if files.is_empty() {
        println!("No dumps found");
        return;
    }
    for file in files {
        println!(
            "{}  {:>10}  {}",
            file.modified.format("%Y-%m-%d %H:%M:%S"),
            human_size(file.size),
            file.name
        );
    }
}

pub fn worktrees(entries: &Vec<WorktreeEntry>) {
    for entry in entries {
        let branch = entry.branch.as_deref().unwrap_or("(detached)");
        let marker = if entry.is_main { " (main)" } else { "" };
        println!("{}  {}{}", entry.path.display(), branch, marker);
    }
}

pub fn worktree_added(result: &WorktreeAddResult) {
    println!("✓ Worktree for '{}' at {}", result.branch, result.path.display());
    if let Some(database) = &result.database {
        println!("✓ Database: {database}");
        provisioning(result.created, result.cloned.then_some("default database"));
    }
}

pub fn project_info(info: &ProjectInfo) {
    match &info.config_summary {
        Some(summary) => println!("Project: {} ({})", summary.name, summary.kind),
        None => println!("Project: not configured (run `branchdb init`)"),
    }
    if info.env_files.is_empty() {
        println!("Env files: none");
    } else {
        println!("Env files: {}", info.env_files.join(", "));
    }
    let compose = if info.compose_file_exists { "found" } else { "missing" };
    println!("Compose file: {compose}");
}

pub fn initialized(result: &InitResult) {
    match &result.written {
        Some(path) => println!("✓ Created {}", path.display()),
        None => println!("{}", result.suggested_config),
    }
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

/// Typed form of a failed command. Errors outside the core taxonomy carry
/// the `INTERNAL` code.
pub fn command_error(error: &anyhow::Error) -> CommandError {
    match error.downcast_ref::<BranchDbError>() {
        Some(error) => CommandError::from(error),
        None => CommandError {
            code: ErrorCode::Internal,
            message: format!("{error:#}"),
        },
    }
}

fn error_line(error: &CommandError) -> String {
    format!("Error [{}]: {}", error.code, error.message)
}

/// Report a failed command on stderr, or on stdout as JSON.
pub fn error(error: &anyhow::Error, json: bool) {
    let command_error = command_error(error);
    if json {
        match serde_json::to_string_pretty(&command_error) {
            Ok(rendered) => println!("{rendered}"),
            Err(_) => eprintln!("{}", error_line(&command_error)),
        }
    } else {
        eprintln!("{}", error_line(&command_error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_command_error_from_core_error() {
        let error = anyhow::Error::from(BranchDbError::confirmation_required("drop 'app_old'"));
        let command_error = command_error(&error);
        assert_eq!(command_error.code, ErrorCode::ConfirmationRequired);
        assert_eq!(
            error_line(&command_error),
            "Error [CONFIRMATION_REQUIRED]: Refusing to drop 'app_old' without --yes"
        );

        let json = serde_json::to_value(&command_error).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "code": "CONFIRMATION_REQUIRED",
                "message": "Refusing to drop 'app_old' without --yes",
            })
        );
    }

    #[test]
    fn test_command_error_fallback_code() {
        let error = anyhow::anyhow!("template rejected").context("failed to start spinner");
        let command_error = command_error(&error);
        assert_eq!(command_error.code, ErrorCode::Internal);
        assert_eq!(
            error_line(&command_error),
            "Error [INTERNAL]: failed to start spinner: template rejected"
        );

        let json = serde_json::to_value(&command_error).unwrap();
        assert_eq!(json["code"], "INTERNAL");
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_emit_clears_spinner_first() {
        for json in [false, true] {
            let printer = Printer {
                json,
                spinner: ProgressBar::hidden(),
            };
            printer.spinner().set_message("Creating database app_feature");
            assert!(!printer.spinner().is_finished());

            printer.emit(&serde_json::json!({"ok": true}), |_| {}).unwrap();
            assert!(printer.spinner().is_finished());
        }
    }

    #[test]
    fn test_progress_message() {
        assert_eq!(
            progress_message(ProgressStage::Cloning, "app -> app_feature"),
            "Cloning app -> app_feature"
        );
        assert_eq!(progress_message(ProgressStage::Patching, ".env.local"), "Updating .env.local");
    }
}
