//! Eligibility filter.
//!
//! # Rules
//! ```text
//! label haproxy != "true"          → NotEligible(NotTagged)
//! exposure != NodePort             → NotEligible(NotNodeExposed)
//! more than one port               → Ambiguous(AmbiguousPortError)
//! haproxy_url missing or blank     → NotEligible(MissingAddress)
//! no node port on the single port  → NotEligible(NoNodePort)
//! otherwise                        → Eligible(ManagedService)
//! ```
//!
//! # Design Decisions
//! - The only place that reads the free-form label map
//! - Pure: no I/O, no logging; callers decide what is log-worthy

use thiserror::Error;

use crate::inventory::{ExposureMode, ServiceRecord};
use crate::registry::service::ManagedService;

/// Label that opts a service into proxying.
pub const PROXY_LABEL: &str = "haproxy";

/// Label carrying the externally routable address.
pub const ADDRESS_LABEL: &str = "haproxy_url";

/// Why a record is not proxied. Not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotTagged,
    NotNodeExposed,
    MissingAddress,
    NoNodePort,
}

/// A tagged, node-exposed service that cannot be represented by one backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("service {service} exposes {port_count} ports; exactly one node port is required")]
pub struct AmbiguousPortError {
    pub service: String,
    pub port_count: usize,
}

/// Result of inspecting one inventory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Eligible(ManagedService),
    NotEligible(Rejection),
    Ambiguous(AmbiguousPortError),
}

/// Decide whether `record` should be proxied and extract what is needed to proxy it.
pub fn classify(record: &ServiceRecord) -> Classification {
    if record.labels.get(PROXY_LABEL).map(String::as_str) != Some("true") {
        return Classification::NotEligible(Rejection::NotTagged);
    }
    if record.exposure != ExposureMode::NodePort {
        return Classification::NotEligible(Rejection::NotNodeExposed);
    }
    if record.ports.len() > 1 {
        return Classification::Ambiguous(AmbiguousPortError {
            service: record.name.clone(),
            port_count: record.ports.len(),
        });
    }

    let address = match record.labels.get(ADDRESS_LABEL).map(|a| a.trim()) {
        Some(a) if !a.is_empty() => a,
        _ => return Classification::NotEligible(Rejection::MissingAddress),
    };
    let Some(node_port) = record.ports.first().and_then(|p| p.node_port) else {
        return Classification::NotEligible(Rejection::NoNodePort);
    };

    Classification::Eligible(ManagedService {
        name: record.name.clone(),
        external_address: address.to_string(),
        exposed_port: node_port,
    })
}
