//! [`D1Session`] implementation emulating D1 with local SQLite files.

use super::execute::execute;
use crate::config::LocalConfig;
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::identity::IdentityRegistry;
use crate::session::{Backend, D1Session};
use crate::types::{
    DatabaseRecord, DatabaseSettings, DeleteResult, QueryResult, ReadReplication,
    ReplicationMode, Value,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

// =============================================================================
// Constants
// =============================================================================

/// Error code used for every application failure reported by the emulator.
pub const LOCAL_ERROR_CODE: i64 = 1000;
/// Version tag reported for emulated databases.
pub const LOCAL_VERSION: &str = "1.0.0";
/// Extension of database files under the root directory.
pub const DATABASE_EXTENSION: &str = "sqlite";

const UNSUPPORTED_UPDATE: &str = "There is no concept of replication modes in local sqlite";

/// Counts user tables, skipping SQLite, Android and D1 bookkeeping tables.
const COUNT_TABLES_SQL: &str = "SELECT count(*) FROM sqlite_master \
     WHERE type = 'table' \
     AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
     AND name NOT LIKE '\\_cf\\_%' ESCAPE '\\' \
     AND name != 'android_metadata'";

/// Files SQLite may leave next to a database.
const SIDECAR_SUFFIXES: [&str; 3] = ["-wal", "-shm", "-journal"];

// =============================================================================
// Connection State
// =============================================================================

/// One open database. `conn` becomes `None` once deletion or close has
/// started, so callers that raced the removal see the database as gone.
struct DatabaseHandle {
    path: PathBuf,
    created_at: DateTime<Utc>,
    conn: Mutex<Option<Connection>>,
}

impl DatabaseHandle {
    fn with_conn<T>(&self, id: Uuid, f: impl FnOnce(&Connection) -> T) -> Result<T> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(Error::DatabaseNotFound { id })?;
        Ok(f(conn))
    }

    /// Takes the connection out and closes it. Returns the close error, if any.
    fn close(&self) -> Option<rusqlite::Error> {
        let conn = self.conn.lock().take()?;
        conn.close().err().map(|(_, err)| err)
    }
}

#[derive(Default)]
struct State {
    registry: IdentityRegistry,
    databases: HashMap<Uuid, Arc<DatabaseHandle>>,
}

// =============================================================================
// Session
// =============================================================================

/// Session emulating the D1 service with one SQLite file per database.
///
/// Files live at `<root>/<uuid>.sqlite`. Identifiers and names exist only in
/// memory: a new session does not rediscover files left by a previous one.
///
/// # Thread Safety
///
/// The registry and the connection map share one lock. Each connection has
/// its own lock, held for the duration of a statement, so statements against
/// different databases run concurrently and statements against one database
/// are serialized. The state lock is never held while waiting on a
/// connection lock.
pub struct LocalSession {
    root: PathBuf,
    busy_timeout: Duration,
    state: Mutex<State>,
}

impl LocalSession {
    /// Opens a session storing databases under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `root` is empty, or an IO error if the
    /// directory cannot be created.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        Self::from_config(&LocalConfig::new(root.as_ref()))
    }

    /// Opens a session from local settings.
    ///
    /// # Errors
    ///
    /// Same as [`LocalSession::open`].
    pub fn from_config(config: &LocalConfig) -> Result<Self> {
        Self::with_registry(config, IdentityRegistry::new())
    }

    /// Opens a session that starts from an existing registry.
    ///
    /// Names in `registry` whose identifiers have no connection in this
    /// session are skipped by `list_databases`.
    ///
    /// # Errors
    ///
    /// Same as [`LocalSession::open`].
    pub fn with_registry(config: &LocalConfig, registry: IdentityRegistry) -> Result<Self> {
        let root = config.resolve_root()?;
        fs::create_dir_all(&root).map_err(|e| {
            Error::io(format!("creating database directory {}", root.display()), e)
        })?;
        let root = fs::canonicalize(&root)
            .map_err(|e| Error::io(format!("resolving {}", root.display()), e))?;

        debug!(root = %root.display(), "Opened local D1 session");
        Ok(Self {
            root,
            busy_timeout: config.busy_timeout(),
            state: Mutex::new(State {
                registry,
                databases: HashMap::new(),
            }),
        })
    }

    /// Directory holding the database files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing the database `id`.
    pub fn database_path(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{id}.{DATABASE_EXTENSION}"))
    }

    /// Snapshot of the name to identifier mapping.
    pub fn registry(&self) -> IdentityRegistry {
        self.state.lock().registry.clone()
    }

    /// Closes every open connection.
    ///
    /// Every connection is detached and closed even if an earlier one fails;
    /// the first failure is returned. Later calls on the closed databases
    /// report [`Error::DatabaseNotFound`].
    ///
    /// # Errors
    ///
    /// Returns the first close failure.
    pub fn close(&self) -> Result<()> {
        let handles: Vec<(Uuid, Arc<DatabaseHandle>)> =
            self.state.lock().databases.drain().collect();

        let mut first_error = None;
        for (id, handle) in handles {
            if let Some(err) = handle.close() {
                warn!(%id, error = %err, "Failed to close database connection");
                first_error.get_or_insert(Error::sqlite(format!("closing database {id}"), err));
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn handle(&self, id: Uuid) -> Result<Arc<DatabaseHandle>> {
        self.state
            .lock()
            .databases
            .get(&id)
            .cloned()
            .ok_or(Error::DatabaseNotFound { id })
    }

    fn open_connection(&self, path: &Path) -> Result<Connection> {
        let context = || format!("opening database {}", path.display());
        let conn = Connection::open(path).map_err(|e| Error::sqlite(context(), e))?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(|e| Error::sqlite(context(), e))?;
        // Forces the file into existence so size and mtime can be read.
        conn.query_row("PRAGMA schema_version", [], |_| Ok(()))
            .map_err(|e| Error::sqlite(context(), e))?;
        Ok(conn)
    }

    fn query(&self, id: Uuid, sql: &str, params: &[Value]) -> Result<Envelope<Vec<QueryResult>>> {
        let handle = self.handle(id)?;
        let started = Instant::now();
        let outcome = handle.with_conn(id, |conn| execute(conn, sql, params))?;
        let elapsed = started.elapsed();

        match outcome {
            Ok(execution) => {
                let size_after = storage_stats(&handle.path).map_or(0, |(size, _)| size);
                let result = execution.into_query_result(elapsed, size_after);
                debug!(
                    %id,
                    rows_read = result.meta.rows_read,
                    rows_written = result.meta.rows_written,
                    "Executed statement"
                );
                Ok(Envelope::success(vec![result]))
            }
            Err(err) => {
                debug!(%id, error = %err, "Statement failed");
                Ok(Envelope::failure(LOCAL_ERROR_CODE, err.to_string()))
            }
        }
    }
}

impl Drop for LocalSession {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "Error while closing local D1 session");
        }
    }
}

// =============================================================================
// Session Contract
// =============================================================================

impl D1Session for LocalSession {
    fn backend(&self) -> Backend {
        Backend::Local
    }

    fn create_database(&self, name: &str) -> Result<Envelope<DatabaseRecord>> {
        let id = Uuid::new_v4();
        let path = self.database_path(id);
        let conn = self.open_connection(&path)?;
        let created_at = Utc::now();

        {
            let mut state = self.state.lock();
            state.databases.insert(
                id,
                Arc::new(DatabaseHandle {
                    path,
                    created_at,
                    conn: Mutex::new(Some(conn)),
                }),
            );
            state.registry.register(name, id);
        }

        info!(name, %id, "Created local database");
        Ok(Envelope::success(DatabaseRecord {
            created_at,
            file_size: 0,
            name: name.to_string(),
            num_tables: 0,
            read_replication: ReadReplication {
                mode: ReplicationMode::Disabled,
            },
            uuid: id,
            version: LOCAL_VERSION.to_string(),
        }))
    }

    fn delete_database(&self, id: Uuid) -> Result<Envelope<DeleteResult>> {
        let handle = {
            let mut state = self.state.lock();
            state.registry.remove(id);
            state.databases.remove(&id)
        };

        if let Some(handle) = handle
            && let Some(err) = handle.close()
        {
            warn!(%id, error = %err, "Failed to close database before deletion");
        }

        let path = self.database_path(id);
        remove_storage(&path)?;
        for suffix in SIDECAR_SUFFIXES {
            let mut sidecar = path.clone().into_os_string();
            sidecar.push(suffix);
            remove_storage(Path::new(&sidecar))?;
        }

        info!(%id, "Deleted local database");
        Ok(Envelope::success(DeleteResult::default()))
    }

    fn update_database(
        &self,
        id: Uuid,
        settings: DatabaseSettings,
    ) -> Result<Envelope<DatabaseRecord>> {
        debug!(%id, mode = %settings.replication, "Rejecting replication update");
        Ok(Envelope::failure(LOCAL_ERROR_CODE, UNSUPPORTED_UPDATE))
    }

    fn get_database(&self, id: Uuid) -> Result<Envelope<DatabaseRecord>> {
        let handle = self.handle(id)?;
        let num_tables = handle
            .with_conn(id, |conn| {
                conn.query_row(COUNT_TABLES_SQL, [], |row| row.get::<_, i64>(0))
            })?
            .map_err(|e| Error::sqlite(format!("counting tables of {id}"), e))?;

        let (file_size, created_at) = match storage_stats(&handle.path) {
            Ok((size, modified)) => (size, modified.unwrap_or(handle.created_at)),
            Err(err) => {
                debug!(%id, error = %err, "Database file not readable");
                (0, handle.created_at)
            }
        };

        let name = self
            .state
            .lock()
            .registry
            .name_of(id)
            .unwrap_or_default()
            .to_string();

        Ok(Envelope::success(DatabaseRecord {
            created_at,
            file_size,
            name,
            num_tables,
            read_replication: ReadReplication {
                mode: ReplicationMode::Disabled,
            },
            uuid: id,
            version: LOCAL_VERSION.to_string(),
        }))
    }

    fn list_databases(&self) -> Result<Envelope<Vec<DatabaseRecord>>> {
        let ids = self.state.lock().registry.ids();

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_database(id) {
                Ok(envelope) => records.push(envelope.result),
                Err(err) => warn!(%id, error = %err, "Skipping database in listing"),
            }
        }
        Ok(Envelope::success(records))
    }

    fn execute_query(
        &self,
        id: Uuid,
        sql: &str,
        params: &[Value],
    ) -> Result<Envelope<Vec<QueryResult>>> {
        self.query(id, sql, params)
    }

    /// Same as `execute_query`: the columnar raw shape is not emulated.
    fn execute_query_raw(
        &self,
        id: Uuid,
        sql: &str,
        params: &[Value],
    ) -> Result<Envelope<Vec<QueryResult>>> {
        self.query(id, sql, params)
    }

    fn resolve(&self, name: &str) -> Result<Uuid> {
        self.state.lock().registry.resolve(name)
    }
}

// =============================================================================
// Storage Helpers
// =============================================================================

/// Size in bytes and modification time of a database file.
fn storage_stats(path: &Path) -> io::Result<(i64, Option<DateTime<Utc>>)> {
    let metadata = fs::metadata(path)?;
    let size = i64::try_from(metadata.len()).unwrap_or(i64::MAX);
    let modified = metadata.modified().ok().map(DateTime::<Utc>::from);
    Ok((size, modified))
}

/// Removes a file, treating absence as success.
fn remove_storage(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(Error::io(format!("removing {}", path.display()), err)),
    }
}
