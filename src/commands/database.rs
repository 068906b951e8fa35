//! Database lifecycle commands.

use super::print_envelope;
use anyhow::{Context, Result};
use d1kit::{D1Session, DatabaseSettings, ReplicationMode, find_database};

pub fn create(session: &dyn D1Session, name: &str) -> Result<()> {
    let envelope = session
        .create_database(name)
        .with_context(|| format!("Failed to create database '{name}'"))?;
    print_envelope(&envelope)
}

pub fn delete(session: &dyn D1Session, db: &str) -> Result<()> {
    let id = find_database(session, db)?;
    let envelope = session
        .delete_database(id)
        .with_context(|| format!("Failed to delete database {id}"))?;
    print_envelope(&envelope)
}

pub fn get(session: &dyn D1Session, db: &str) -> Result<()> {
    let id = find_database(session, db)?;
    let envelope = session
        .get_database(id)
        .with_context(|| format!("Failed to get database {id}"))?;
    print_envelope(&envelope)
}

pub fn list(session: &dyn D1Session) -> Result<()> {
    let envelope = session
        .list_databases()
        .context("Failed to list databases")?;
    print_envelope(&envelope)
}

pub fn update(session: &dyn D1Session, db: &str, replication: ReplicationMode) -> Result<()> {
    let id = find_database(session, db)?;
    let envelope = session
        .update_database(id, DatabaseSettings { replication })
        .with_context(|| format!("Failed to update database {id}"))?;
    print_envelope(&envelope)
}
