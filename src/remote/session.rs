//! [`D1Session`] implementation backed by the D1 REST API.

use super::transport::{Method, Transport};
use crate::config::RemoteConfig;
use crate::envelope::Envelope;
use crate::error::Result;
use crate::identity::IdentityRegistry;
use crate::session::{Backend, D1Session};
use crate::types::{DatabaseRecord, DatabaseSettings, DeleteResult, QueryResult, Value};
use parking_lot::Mutex;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

/// Session talking to the remote D1 service.
///
/// Only `create_database` touches the registry: a successful create records
/// `name -> uuid`. Deletes and renames done elsewhere are not tracked.
pub struct RemoteSession {
    transport: Transport,
    registry: Mutex<IdentityRegistry>,
}

impl RemoteSession {
    /// Creates a session with default endpoint and timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if either credential is
    /// empty.
    pub fn new(account_id: impl Into<String>, api_token: impl Into<String>) -> Result<Self> {
        Self::from_config(&RemoteConfig::new(account_id, api_token))
    }

    /// Creates a session from remote settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the settings are
    /// invalid.
    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        Self::with_registry(config, IdentityRegistry::new())
    }

    /// Creates a session that starts from an existing registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the settings are
    /// invalid.
    pub fn with_registry(config: &RemoteConfig, registry: IdentityRegistry) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transport: Transport::new(config),
            registry: Mutex::new(registry),
        })
    }

    /// Snapshot of the name to identifier mapping.
    pub fn registry(&self) -> IdentityRegistry {
        self.registry.lock().clone()
    }

    fn query_endpoint(
        &self,
        id: Uuid,
        endpoint: &str,
        sql: &str,
        params: &[Value],
    ) -> Result<Envelope<Vec<QueryResult>>> {
        let url = self.transport.database_url(id, Some(endpoint));
        let body = json!({ "sql": sql, "params": params });
        self.transport.send(Method::Post, &url, Some(body))
    }
}

impl D1Session for RemoteSession {
    fn backend(&self) -> Backend {
        Backend::Remote
    }

    fn create_database(&self, name: &str) -> Result<Envelope<DatabaseRecord>> {
        let url = self.transport.databases_url();
        let envelope: Envelope<DatabaseRecord> =
            self.transport
                .send(Method::Post, &url, Some(json!({ "name": name })))?;

        if envelope.success {
            info!(name, id = %envelope.result.uuid, "Created remote database");
            self.registry.lock().register(name, envelope.result.uuid);
        }
        Ok(envelope)
    }

    fn delete_database(&self, id: Uuid) -> Result<Envelope<DeleteResult>> {
        let url = self.transport.database_url(id, None);
        self.transport.send(Method::Delete, &url, None)
    }

    fn update_database(
        &self,
        id: Uuid,
        settings: DatabaseSettings,
    ) -> Result<Envelope<DatabaseRecord>> {
        let url = self.transport.database_url(id, None);
        let body = json!({
            "read_replication": { "mode": settings.replication.as_str() }
        });
        self.transport.send(Method::Patch, &url, Some(body))
    }

    fn get_database(&self, id: Uuid) -> Result<Envelope<DatabaseRecord>> {
        let url = self.transport.database_url(id, None);
        self.transport.send(Method::Get, &url, None)
    }

    fn list_databases(&self) -> Result<Envelope<Vec<DatabaseRecord>>> {
        let url = self.transport.databases_url();
        self.transport.send(Method::Get, &url, None)
    }

    fn execute_query(
        &self,
        id: Uuid,
        sql: &str,
        params: &[Value],
    ) -> Result<Envelope<Vec<QueryResult>>> {
        self.query_endpoint(id, "query", sql, params)
    }

    fn execute_query_raw(
        &self,
        id: Uuid,
        sql: &str,
        params: &[Value],
    ) -> Result<Envelope<Vec<QueryResult>>> {
        self.query_endpoint(id, "raw", sql, params)
    }

    fn resolve(&self, name: &str) -> Result<Uuid> {
        self.registry.lock().resolve(name)
    }
}
