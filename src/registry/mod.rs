//! Service registry subsystem.
//!
//! # Data Flow
//! ```text
//! ServiceRecord (raw)
//!     → eligibility.rs classify()
//!         Eligible     → service.rs ServiceRegistry::upsert
//!         NotEligible  → ignored
//!         Ambiguous    → logged by the caller, excluded
//!     → ServiceRegistry::snapshot() (ordered by name) → renderer
//! ```
//!
//! # Design Decisions
//! - Owned by the reconcile loop; no interior mutability, no globals
//! - Ordered storage keeps rendered output deterministic

pub mod eligibility;
pub mod service;

use crate::inventory::ServiceRecord;

pub use eligibility::{classify, AmbiguousPortError, Classification, Rejection};
pub use service::{ManagedService, ServiceRegistry};

/// Registry for a full inventory listing, plus the records rejected as ambiguous.
pub fn registry_from(records: &[ServiceRecord]) -> (ServiceRegistry, Vec<AmbiguousPortError>) {
    let mut registry = ServiceRegistry::new();
    let mut ambiguous = Vec::new();
    for record in records {
        match classify(record) {
            Classification::Eligible(service) => {
                registry.upsert(service);
            }
            Classification::Ambiguous(e) => ambiguous.push(e),
            Classification::NotEligible(_) => {}
        }
    }
    (registry, ambiguous)
}
