//! Managed service and the in-memory registry.

use std::collections::BTreeMap;

use serde::Serialize;

/// A service the proxy should route to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedService {
    pub name: String,
    /// Host name the proxy matches on.
    pub external_address: String,
    /// Node-level port traffic is forwarded to.
    pub exposed_port: u16,
}

/// Name → service mapping; the single source of truth for what gets rendered.
///
/// Backed by an ordered map so identical content always snapshots in the same
/// order regardless of insertion history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceRegistry {
    services: BTreeMap<String, ManagedService>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or fully replace the entry for `service.name`.
    pub fn upsert(&mut self, service: ManagedService) -> Option<ManagedService> {
        self.services.insert(service.name.clone(), service)
    }

    /// Remove `name`. Removing an absent name is a no-op.
    pub fn remove(&mut self, name: &str) -> Option<ManagedService> {
        self.services.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ManagedService> {
        self.services.get(name)
    }

    /// All services ordered by name.
    pub fn snapshot(&self) -> Vec<ManagedService> {
        self.services.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
