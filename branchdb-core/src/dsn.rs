//! Connection string model.
//!
//! Parsing keeps the scheme exactly as written; serialization normalizes
//! `postgresql` to `postgres` and percent-encodes the credentials.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{BranchDbError, EngineError, Result};

/// Characters left verbatim inside `user:password`. Everything else,
/// including `@ : # ! $`, is escaped; dotenv loaders expand a bare `$`.
const USERINFO: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

/// Characters left verbatim in the database path segment
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const SERVER_VERSION: &str = "serverVersion";

/// Database engines with a client implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Mysql,
    Postgres,
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Engine::Mysql => write!(f, "mysql"),
            Engine::Postgres => write!(f, "postgres"),
        }
    }
}

impl std::str::FromStr for Engine {
    type Err = BranchDbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Engine::Mysql),
            "postgres" | "postgresql" | "pgsql" => Ok(Engine::Postgres),
            _ => Err(EngineError::Unsupported {
                engine: s.to_string(),
            }
            .into()),
        }
    }
}

/// A parsed connection string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dsn {
    /// Scheme as written in the source string
    pub engine: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    /// Empty when the DSN targets the server rather than a schema
    pub database: String,
    pub server_version: Option<String>,
    /// Remaining query parameters in source order
    pub params: Vec<(String, String)>,
}

impl Dsn {
    /// Parse a connection string of the form
    /// `scheme://[user[:password]@]host[:port]/database[?params]`.
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw.trim())
            .map_err(|e| BranchDbError::malformed_dsn(format!("{raw}: {e}")))?;

        let engine = url.scheme().to_string();
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| BranchDbError::malformed_dsn(format!("{raw}: missing host")))?
            .to_string();

        let user = Some(url.username())
            .filter(|user| !user.is_empty())
            .map(decode);
        let password = url.password().map(decode);
        let database = decode(url.path().trim_start_matches('/'));

        let mut server_version = None;
        let mut params = Vec::new();
        for (key, value) in url.query_pairs() {
            if key == SERVER_VERSION {
                server_version = Some(value.into_owned());
            } else {
                params.push((key.into_owned(), value.into_owned()));
            }
        }

        Ok(Self {
            engine,
            user,
            password,
            host,
            port: url.port(),
            database,
            server_version,
            params,
        })
    }

    /// Canonical scheme used when serializing
    pub fn scheme(&self) -> &str {
        match self.engine.as_str() {
            "postgresql" => "postgres",
            other => other,
        }
    }

    /// Engine variant selecting client behavior
    pub fn engine_kind(&self) -> Result<Engine> {
        self.engine.parse()
    }

    /// Same connection pointed at another database
    pub fn with_database(&self, database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..self.clone()
        }
    }
}

fn decode(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

impl std::fmt::Display for Dsn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://", self.scheme())?;

        if let Some(user) = &self.user {
            write!(f, "{}", utf8_percent_encode(user, USERINFO))?;
            if let Some(password) = &self.password {
                write!(f, ":{}", utf8_percent_encode(password, USERINFO))?;
            }
            f.write_str("@")?;
        }

        f.write_str(&self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        if !self.database.is_empty() {
            write!(f, "/{}", utf8_percent_encode(&self.database, PATH_SEGMENT))?;
        }

        if self.server_version.is_some() || !self.params.is_empty() {
            let mut query = url::form_urlencoded::Serializer::new(String::new());
            if let Some(version) = &self.server_version {
                query.append_pair(SERVER_VERSION, version);
            }
            for (key, value) in &self.params {
                query.append_pair(key, value);
            }
            write!(f, "?{}", query.finish())?;
        }

        Ok(())
    }
}
