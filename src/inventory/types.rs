//! Raw inventory records and change events.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a service is reachable from outside the cluster.
///
/// Decoded from the inventory's `type` string. Unknown types are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum ExposureMode {
    /// Port opened on every node.
    NodePort,
    #[default]
    ClusterIp,
    LoadBalancer,
    Other(String),
}

impl ExposureMode {
    pub fn as_str(&self) -> &str {
        match self {
            ExposureMode::NodePort => "NodePort",
            ExposureMode::ClusterIp => "ClusterIP",
            ExposureMode::LoadBalancer => "LoadBalancer",
            ExposureMode::Other(kind) => kind,
        }
    }
}

impl From<String> for ExposureMode {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "NodePort" => ExposureMode::NodePort,
            "ClusterIP" => ExposureMode::ClusterIp,
            "LoadBalancer" => ExposureMode::LoadBalancer,
            _ => ExposureMode::Other(kind),
        }
    }
}

impl From<ExposureMode> for String {
    fn from(mode: ExposureMode) -> Self {
        match mode {
            ExposureMode::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ExposureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One port exposed by a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    #[serde(default)]
    pub name: Option<String>,
    pub port: u16,
    /// Node-level port, allocated only for node-exposed services.
    #[serde(default)]
    pub node_port: Option<u16>,
}

/// A service as reported by the inventory source.
///
/// Labels are free-form; only the eligibility filter interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default, rename = "type")]
    pub exposure: ExposureMode,
    #[serde(default)]
    pub ports: Vec<ServicePort>,
}

/// Kind of inventory change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Added,
    Deleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Added => "added",
            EventKind::Deleted => "deleted",
        }
    }
}

/// A single change delivered by the inventory stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEvent {
    pub kind: EventKind,
    pub record: ServiceRecord,
}

impl InventoryEvent {
    pub fn added(record: ServiceRecord) -> Self {
        Self { kind: EventKind::Added, record }
    }

    pub fn deleted(record: ServiceRecord) -> Self {
        Self { kind: EventKind::Deleted, record }
    }
}

/// Errors raised by an inventory source.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The initial full listing could not be obtained.
    #[error("inventory snapshot failed: {0}")]
    Snapshot(String),

    /// The change stream broke.
    #[error("inventory stream failed: {0}")]
    Stream(String),

    /// Inventory content could not be decoded.
    #[error("inventory decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}
