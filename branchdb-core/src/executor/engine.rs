//! Engine-specific client invocations.

use crate::dsn::{Dsn, Engine};

/// Schemas MySQL reports that never belong to the application
const MYSQL_SYSTEM_SCHEMAS: [&str; 4] = ["information_schema", "mysql", "performance_schema", "sys"];

/// A client program invocation inside the database container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientCommand {
    /// Variables passed with `exec -e`
    pub env: Vec<(String, String)>,
    /// Program followed by its arguments
    pub args: Vec<String>,
}

impl ClientCommand {
    fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            env: Vec::new(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn with_env(mut self, key: &str, value: Option<&String>) -> Self {
        if let Some(value) = value.filter(|value| !value.is_empty()) {
            self.env.push((key.to_string(), value.clone()));
        }
        self
    }

    pub fn program(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or_default()
    }
}

/// Builds client commands for one database engine
pub trait ClientEngine: Send + Sync {
    fn engine(&self) -> Engine;

    fn list_command(&self, dsn: &Dsn, default_database: &str) -> ClientCommand;

    /// Database names from the list command's stdout
    fn parse_list(&self, stdout: &str) -> Vec<String>;

    fn create_command(&self, dsn: &Dsn, name: &str) -> ClientCommand;

    fn drop_command(&self, dsn: &Dsn, name: &str) -> ClientCommand;

    fn dump_command(&self, dsn: &Dsn, database: &str, tables: &[String]) -> ClientCommand;

    /// Command reading SQL from stdin into `database`
    fn import_command(&self, dsn: &Dsn, database: &str) -> ClientCommand;
}

/// Select the client implementation for an engine
pub fn client_for(engine: Engine) -> Box<dyn ClientEngine> {
    match engine {
        Engine::Mysql => Box::new(MysqlClient),
        Engine::Postgres => Box::new(PostgresClient),
    }
}

fn lines(stdout: &str) -> impl Iterator<Item = &str> {
    stdout.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// `mysql` / `mysqldump`, password passed through `MYSQL_PWD`
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlClient;

impl MysqlClient {
    fn user(dsn: &Dsn) -> &str {
        dsn.user.as_deref().unwrap_or("root")
    }

    fn quote(name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn statement(dsn: &Dsn, sql: String) -> ClientCommand {
        ClientCommand::new(["mysql", "-u", Self::user(dsn), "-e"])
            .with_arg(sql)
            .with_env("MYSQL_PWD", dsn.password.as_ref())
    }
}

impl ClientEngine for MysqlClient {
    fn engine(&self) -> Engine {
        Engine::Mysql
    }

    fn list_command(&self, dsn: &Dsn, _default_database: &str) -> ClientCommand {
        ClientCommand::new(["mysql", "-u", Self::user(dsn), "-N", "-B", "-e", "SHOW DATABASES"])
            .with_env("MYSQL_PWD", dsn.password.as_ref())
    }

    fn parse_list(&self, stdout: &str) -> Vec<String> {
        lines(stdout)
            .filter(|name| !MYSQL_SYSTEM_SCHEMAS.contains(name))
            .map(str::to_string)
            .collect()
    }

    fn create_command(&self, dsn: &Dsn, name: &str) -> ClientCommand {
        Self::statement(dsn, format!("CREATE DATABASE {}", Self::quote(name)))
    }

    fn drop_command(&self, dsn: &Dsn, name: &str) -> ClientCommand {
        Self::statement(dsn, format!("DROP DATABASE IF EXISTS {}", Self::quote(name)))
    }

    fn dump_command(&self, dsn: &Dsn, database: &str, tables: &[String]) -> ClientCommand {
        let mut command = ClientCommand::new([
            "mysqldump",
            "-u",
            Self::user(dsn),
            "--single-transaction",
            "--routines",
            "--triggers",
            database,
        ]);
        command.args.extend(tables.iter().cloned());
        command.with_env("MYSQL_PWD", dsn.password.as_ref())
    }

    fn import_command(&self, dsn: &Dsn, database: &str) -> ClientCommand {
        ClientCommand::new(["mysql", "-u", Self::user(dsn), database])
            .with_env("MYSQL_PWD", dsn.password.as_ref())
    }
}

/// `psql` / `pg_dump`, password passed through `PGPASSWORD`
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresClient;

impl PostgresClient {
    /// Maintenance database used for CREATE / DROP
    const MAINTENANCE_DB: &'static str = "postgres";

    fn user(dsn: &Dsn) -> &str {
        dsn.user.as_deref().unwrap_or("postgres")
    }

    fn quote(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn statement(dsn: &Dsn, sql: String) -> ClientCommand {
        ClientCommand::new([
            "psql",
            "-U",
            Self::user(dsn),
            "-d",
            Self::MAINTENANCE_DB,
            "-v",
            "ON_ERROR_STOP=1",
            "-c",
        ])
        .with_arg(sql)
        .with_env("PGPASSWORD", dsn.password.as_ref())
    }
}

impl ClientEngine for PostgresClient {
    fn engine(&self) -> Engine {
        Engine::Postgres
    }

    fn list_command(&self, dsn: &Dsn, default_database: &str) -> ClientCommand {
        let database = if default_database.is_empty() {
            Self::MAINTENANCE_DB
        } else {
            default_database
        };
        ClientCommand::new([
            "psql",
            "-U",
            Self::user(dsn),
            "-d",
            database,
            "-At",
            "-c",
            "SELECT datname FROM pg_database WHERE datistemplate = false ORDER BY datname",
        ])
        .with_env("PGPASSWORD", dsn.password.as_ref())
    }

    fn parse_list(&self, stdout: &str) -> Vec<String> {
        lines(stdout).map(str::to_string).collect()
    }

    fn create_command(&self, dsn: &Dsn, name: &str) -> ClientCommand {
        Self::statement(dsn, format!("CREATE DATABASE {}", Self::quote(name)))
    }

    fn drop_command(&self, dsn: &Dsn, name: &str) -> ClientCommand {
        Self::statement(dsn, format!("DROP DATABASE IF EXISTS {}", Self::quote(name)))
    }

    fn dump_command(&self, dsn: &Dsn, database: &str, tables: &[String]) -> ClientCommand {
        let mut command = ClientCommand::new([
            "pg_dump",
            "-U",
            Self::user(dsn),
            "--no-owner",
            "--no-privileges",
            "-d",
            database,
        ]);
        for table in tables {
            command.args.push("-t".to_string());
            command.args.push(table.clone());
        }
        command.with_env("PGPASSWORD", dsn.password.as_ref())
    }

    fn import_command(&self, dsn: &Dsn, database: &str) -> ClientCommand {
        ClientCommand::new([
            "psql",
            "-U",
            Self::user(dsn),
            "-d",
            database,
            "-v",
            "ON_ERROR_STOP=1",
            "-q",
        ])
        .with_env("PGPASSWORD", dsn.password.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dsn(raw: &str) -> Dsn {
        Dsn::parse(raw).unwrap()
    }

    #[test]
    fn test_client_selected_by_engine() {
        let mysql = dsn("mysql://root:secret@db:3306/app");
        let postgres = dsn("postgresql://app:pw@db:5432/app");
        assert_eq!(client_for(mysql.engine_kind().unwrap()).engine(), Engine::Mysql);
        assert_eq!(client_for(postgres.engine_kind().unwrap()).engine(), Engine::Postgres);
    }

    #[test]
    fn test_mysql_create_quotes_and_passes_password() {
        let command = MysqlClient.create_command(&dsn("mysql://root:secret@db:3306/app"), "app_feature");
        assert_eq!(command.program(), "mysql");
        assert_eq!(command.args.last().unwrap(), "CREATE DATABASE `app_feature`");
        assert_eq!(command.env, vec![("MYSQL_PWD".to_string(), "secret".to_string())]);
    }

    #[test]
    fn test_mysql_list_hides_system_schemas() {
        let stdout = "information_schema\napp\napp_feature_x\nmysql\nperformance_schema\nsys\n";
        assert_eq!(MysqlClient.parse_list(stdout), vec!["app", "app_feature_x"]);
    }

    #[test]
    fn test_mysql_dump_with_tables() {
        let command = MysqlClient.dump_command(
            &dsn("mysql://root@db/app"),
            "app",
            &["users".to_string(), "orders".to_string()],
        );
        assert_eq!(command.program(), "mysqldump");
        assert!(command.env.is_empty());
        assert_eq!(&command.args[command.args.len() - 3..], ["app", "users", "orders"]);
    }

    #[test]
    fn test_postgres_commands() {
        let value = dsn("postgres://app:pw@db:5432/app");

        let create = PostgresClient.create_command(&value, "we\"ird");
        assert_eq!(create.args.last().unwrap(), "CREATE DATABASE \"we\"\"ird\"");
        assert!(create.args.contains(&"postgres".to_string()));

        let dump = PostgresClient.dump_command(&value, "app", &["users".to_string()]);
        assert_eq!(&dump.args[dump.args.len() - 2..], ["-t", "users"]);

        let import = PostgresClient.import_command(&value, "app_feature");
        assert_eq!(import.program(), "psql");
        assert_eq!(import.env, vec![("PGPASSWORD".to_string(), "pw".to_string())]);
    }

    #[test]
    fn test_postgres_parse_list() {
        assert_eq!(
            PostgresClient.parse_list("app\n app_feature \n\n"),
            vec!["app", "app_feature"]
        );
    }
}
