use branchdb_core::{
    BranchDbError, BranchManager, Config, DockerExecutor, GitVcs, LogContext, init_cli_logging,
};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::output::Printer;

mod output;


#[derive(Parser)]
#[command(name = "branchdb")]
#[command(about = "Per-branch development databases for docker compose projects")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Project root holding the config file
    #[arg(short = 'C', long, global = true, default_value = ".")]
    project_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Point DATABASE_URL at the database for a branch, creating it if needed
    Switch {
        /// Branch to switch to (defaults to the current git branch)
        #[arg(long)]
        branch: Option<String>,

        /// Database to seed a newly created database from
        #[arg(long)]
        clone_from: Option<String>,
    },

    /// Check out a git branch, then switch its database
    Checkout {
        /// Branch to check out
        branch: String,

        /// Create the branch
        #[arg(short, long)]
        create: bool,

        /// Database to seed a newly created database from
        #[arg(long)]
        clone_from: Option<String>,
    },

    /// Manage databases
    Db {
        #[command(subcommand)]
        action: DbActions,
    },

    /// Manage git worktrees
    Worktree {
        #[command(subcommand)]
        action: WorktreeActions,
    },

    /// Print the resolved configuration
    Config,

    /// Summarize the project: config, env files, compose file
    Info,

    /// Suggest a config for this project
    Init {
        /// Write the config to .branchdb/config.json; never overwrites
        #[arg(short, long)]
        write: bool,

        /// Nest the config under a "branchdb" key
        #[arg(short, long)]
        namespace: bool,
    },
}

#[derive(Subcommand)]
enum DbActions {
    /// List databases on the server
    List,

    /// Create an empty database
    Create {
        name: String,
    },

    /// Drop a database
    Drop {
        name: String,

        /// Confirm the drop
        #[arg(long)]
        yes: bool,
    },

    /// Dump a database into the dumps directory
    Dump {
        /// Database to dump (defaults to the configured database)
        #[arg(long)]
        database: Option<String>,

        /// Restrict the dump to a table; repeatable
        #[arg(long = "table")]
        tables: Vec<String>,
    },

    /// Load a SQL file into a database
    Import {
        database: String,

        /// SQL file, relative to the project root
        sql_path: PathBuf,
    },

    /// Copy one database into another
    Clone {
        /// Source database (defaults to the configured database)
        #[arg(long)]
        source: Option<String>,

        target: String,
    },

    /// List dump files, newest first
    Dumps,
}

#[derive(Subcommand)]
enum WorktreeActions {
    /// List worktrees
    List,

    /// Add a worktree for a branch
    Add {
        branch: String,

        /// Create the branch
        #[arg(long)]
        new_branch: bool,
    },

    /// Remove the worktree for a branch
    Remove {
        branch: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_cli_logging(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let context = LogContext::new("main", "branchdb-cli");

    if let Err(error) = run(&cli, &context).await {
        context.error(&format!("{error:#}"));
        output::error(&error, cli.json);
        std::process::exit(1);
    }
}

fn project_root(dir: &Path) -> branchdb_core::Result<PathBuf> {
    std::fs::canonicalize(dir).map_err(|e| match e.kind() {
        ErrorKind::NotFound => BranchDbError::FileNotFound {
            path: dir.display().to_string(),
        },
        _ => e.into(),
    })
}

async fn run(cli: &Cli, context: &LogContext) -> anyhow::Result<()> {
    let Some(command) = &cli.command else {
        println!("BranchDB CLI - Use --help for available commands");
        info!("CLI started without command");
        return Ok(());
    };

    let root = project_root(&cli.project_dir)?;
    let printer = Printer::new(cli.json)?;
    let progress = printer.spinner().clone();
    let manager = BranchManager::new(&root, DockerExecutor::new(&root), GitVcs::new(&root))
        .with_progress(move |stage, detail| {
            progress.set_message(output::progress_message(stage, detail));
        });

    let result = dispatch(&printer, command, &manager, context).await;
    printer.clear();
    result
}

async fn dispatch(
    printer: &Printer,
    command: &Commands,
    manager: &BranchManager<DockerExecutor, GitVcs>,
    context: &LogContext,
) -> anyhow::Result<()> {
    match command {
        Commands::Switch { branch, clone_from } => {
            context.info("Switching branch database");
            let result = manager
                .switch(branch.as_deref(), clone_from.as_deref())
                .await?;
            printer.emit(&result, output::switched)
        }
        Commands::Checkout {
            branch,
            create,
            clone_from,
        } => {
            context.info(&format!("Checking out {branch}"));
            let result = manager
                .checkout(branch, *create, clone_from.as_deref())
                .await?;
            printer.emit(&result, output::checked_out)
        }
        Commands::Db { action } => db(printer, action, manager).await,
        Commands::Worktree { action } => worktree(printer, action, manager).await,
        Commands::Config => {
            let config = Config::load(manager.project_root())?;
            printer.clear();
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Info => {
            let info = manager.info()?;
            printer.emit(&info, output::project_info)
        }
        Commands::Init { write, namespace } => {
            let result = manager.init_config(*namespace, *write)?;
            printer.emit(&result, output::initialized)
        }
    }
}

async fn db(
    printer: &Printer,
    action: &DbActions,
    manager: &BranchManager<DockerExecutor, GitVcs>,
) -> anyhow::Result<()> {
    match action {
        DbActions::List => {
            let list = manager.list_databases().await?;
            printer.emit(&list, output::databases)
        }
        DbActions::Create { name } => {
            manager.create_database(name).await?;
            printer.emit(&json!({ "database": name, "created": true }), |_| {
                println!("✓ Created database {name}")
            })
        }
        DbActions::Drop { name, yes } => {
            if !yes {
                return Err(BranchDbError::confirmation_required(format!("drop '{name}'")).into());
            }
            manager.drop_database(name).await?;
            printer.emit(&json!({ "database": name, "dropped": true }), |_| {
                println!("✓ Dropped database {name}")
            })
        }
        DbActions::Dump { database, tables } => {
            let result = manager.dump_database(database.as_deref(), tables).await?;
            printer.emit(&result, output::dumped)
        }
        DbActions::Import { database, sql_path } => {
            manager.import_database(database, sql_path).await?;
            printer.emit(
                &json!({ "database": database, "imported": sql_path }),
                |_| println!("✓ Imported {} into {database}", sql_path.display()),
            )
        }
        DbActions::Clone { source, target } => {
            let result = manager.clone_database(source.as_deref(), target).await?;
            printer.emit(&result, output::cloned)
        }
        DbActions::Dumps => {
            let dumps = manager.list_dumps()?;
            printer.emit(&dumps, output::dumps)
        }
    }
}

async fn worktree(
    printer: &Printer,
    action: &WorktreeActions,
    manager: &BranchManager<DockerExecutor, GitVcs>,
) -> anyhow::Result<()> {
    match action {
        WorktreeActions::List => {
            let entries = manager.worktree_list().await?;
            printer.emit(&entries, output::worktrees)
        }
        WorktreeActions::Add { branch, new_branch } => {
            let result = manager.worktree_add(branch, *new_branch).await?;
            printer.emit(&result, output::worktree_added)
        }
        WorktreeActions::Remove { branch } => {
            let result = manager.worktree_remove(branch).await?;
            printer.emit(&result, |result| {
                println!("✓ Removed worktree {}", result.path.display())
            })
        }
    }
}
