//! Backend-agnostic session contract.
//!
//! Both [`RemoteSession`] and [`LocalSession`] implement [`D1Session`], so
//! callers can swap the remote service for a local SQLite emulation without
//! changing code. The two behave alike except for two documented gaps:
//!
//! - `update_database` always fails on the local backend, since read
//!   replication has no meaning for a single SQLite file.
//! - `execute_query_raw` is identical to `execute_query` on the local
//!   backend; it does not produce the remote service's columnar shape.
//!
//! Use [`D1Session::backend`] when gap-sensitive behavior matters.
//!
//! # Example
//!
//! ```ignore
//! use d1kit::{LocalSession, D1Session, Value};
//!
//! let session = LocalSession::open("./.d1")?;
//! let db = session.create_database("t1")?.result.uuid;
//! session.execute_query(db, "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", &[])?;
//! session.execute_query(db, "INSERT INTO users (name) VALUES (?)", &[Value::from("alice")])?;
//! let rows = session.execute_query(db, "SELECT * FROM users", &[])?;
//! ```

use crate::config::Config;
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::local::LocalSession;
use crate::remote::RemoteSession;
use crate::types::{DatabaseRecord, DatabaseSettings, DeleteResult, QueryResult, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The D1 REST API.
    #[default]
    Remote,
    /// SQLite files emulating D1.
    Local,
}

impl Backend {
    /// Whether `update_database` can succeed.
    pub fn supports_update(self) -> bool {
        matches!(self, Self::Remote)
    }

    /// Whether `execute_query_raw` returns a shape distinct from `execute_query`.
    pub fn distinguishes_raw(self) -> bool {
        matches!(self, Self::Remote)
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote => f.write_str("remote"),
            Self::Local => f.write_str("local"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(Self::Remote),
            "local" => Ok(Self::Local),
            other => Err(Error::config(format!(
                "unknown backend '{other}' (expected 'remote' or 'local')"
            ))),
        }
    }
}

/// Operations every backend provides.
///
/// All calls are blocking. A returned `Err` means the call itself failed
/// (configuration, transport, unknown database). Statement and settings
/// failures reported by the backend arrive as `Ok` with an envelope whose
/// `success` is false.
pub trait D1Session: Send + Sync {
    /// Which backend this session talks to.
    fn backend(&self) -> Backend;

    /// Creates a database and registers `name` for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database could not be created or reached.
    fn create_database(&self, name: &str) -> Result<Envelope<DatabaseRecord>>;

    /// Deletes a database. Deleting an already-deleted database succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if storage removal or the request fails.
    fn delete_database(&self, id: Uuid) -> Result<Envelope<DeleteResult>>;

    /// Changes database settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn update_database(
        &self,
        id: Uuid,
        settings: DatabaseSettings,
    ) -> Result<Envelope<DatabaseRecord>>;

    /// Fetches one database record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unknown or cannot be inspected.
    fn get_database(&self, id: Uuid) -> Result<Envelope<DatabaseRecord>>;

    /// Lists every database visible to this session.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn list_databases(&self) -> Result<Envelope<Vec<DatabaseRecord>>>;

    /// Executes one statement with positional parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unknown or unreachable. Invalid
    /// SQL is not an error.
    fn execute_query(
        &self,
        id: Uuid,
        sql: &str,
        params: &[Value],
    ) -> Result<Envelope<Vec<QueryResult>>>;

    /// Executes one statement against the raw endpoint.
    ///
    /// # Errors
    ///
    /// Same as [`D1Session::execute_query`].
    fn execute_query_raw(
        &self,
        id: Uuid,
        sql: &str,
        params: &[Value],
    ) -> Result<Envelope<Vec<QueryResult>>>;

    /// Identifier registered under `name` by this session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NameNotFound`] if the name was never registered.
    fn resolve(&self, name: &str) -> Result<Uuid>;
}

/// Opens the session selected by `config`.
///
/// # Errors
///
/// Returns [`Error::Config`] if the selected backend is not fully configured,
/// or an IO error if the local root cannot be created.
pub fn connect(config: &Config) -> Result<Box<dyn D1Session>> {
    config.validate()?;
    Ok(match config.backend {
        Backend::Remote => Box::new(RemoteSession::from_config(&config.remote)?),
        Backend::Local => Box::new(LocalSession::from_config(&config.local)?),
    })
}

/// Resolves a user-supplied database reference.
///
/// Accepts a UUID, a name registered in this session, or the name of any
/// database returned by `list_databases`.
///
/// # Errors
///
/// Returns [`Error::NameNotFound`] if nothing matches.
pub fn find_database(session: &dyn D1Session, name_or_id: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(name_or_id) {
        return Ok(id);
    }
    if let Ok(id) = session.resolve(name_or_id) {
        return Ok(id);
    }

    let listing = session.list_databases()?;
    listing
        .result
        .iter()
        .find(|record| record.name == name_or_id)
        .map(|record| record.uuid)
        .ok_or_else(|| Error::NameNotFound {
            name: name_or_id.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_capabilities() {
        assert!(Backend::Remote.supports_update());
        assert!(Backend::Remote.distinguishes_raw());
        assert!(!Backend::Local.supports_update());
        assert!(!Backend::Local.distinguishes_raw());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("Local".parse::<Backend>().unwrap(), Backend::Local);
        assert_eq!(" remote ".parse::<Backend>().unwrap(), Backend::Remote);
        assert!(matches!("sqlite".parse::<Backend>(), Err(Error::Config(_))));
    }
}
