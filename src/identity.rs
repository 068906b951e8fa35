//! Name to identifier mapping for databases.
//!
//! The registry itself is not synchronized. Each session owns one behind its
//! own lock and hands out clones via `registry()`.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Bidirectional lookup between database names and identifiers.
///
/// A name maps to at most one identifier; registering a name again replaces
/// the previous mapping. Several names may point at the same identifier if a
/// caller registers them that way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityRegistry {
    by_name: BTreeMap<String, Uuid>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `name -> id`, overwriting any existing mapping for `name`.
    pub fn register(&mut self, name: impl Into<String>, id: Uuid) {
        self.by_name.insert(name.into(), id);
    }

    /// Looks up the identifier registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NameNotFound`] if nothing is registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<Uuid> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::NameNotFound {
                name: name.to_string(),
            })
    }

    /// Removes every name pointing at `id`. Absent ids are a no-op.
    pub fn remove(&mut self, id: Uuid) {
        self.by_name.retain(|_, registered| *registered != id);
    }

    /// First name (in name order) registered for `id`.
    pub fn name_of(&self, id: Uuid) -> Option<&str> {
        self.by_name
            .iter()
            .find(|(_, registered)| **registered == id)
            .map(|(name, _)| name.as_str())
    }

    /// Distinct registered identifiers, ordered by their first name.
    pub fn ids(&self) -> Vec<Uuid> {
        let mut ids = Vec::with_capacity(self.by_name.len());
        for id in self.by_name.values() {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Uuid)> {
        self.by_name.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
