//! Reconciliation subsystem.
//!
//! # Data Flow
//! ```text
//! Bootstrap:
//!     InventorySource::snapshot()
//!     → classify each record → ServiceRegistry::upsert (ambiguous records logged, skipped)
//!     → one cycle, even with an empty registry
//!
//! Steady state (one event at a time, arrival order):
//!     Added   (name unknown)  → classify → upsert → cycle
//!     Deleted (name known)    → remove → cycle
//!     anything else           → ignored
//!
//! Cycle:
//!     render → staging file → change detector → deployment controller
//! ```
//!
//! # Design Decisions
//! - Single writer: the loop owns the registry and runs cycles inline
//! - One cycle per triggering event unless a coalescing window is configured
//! - A malformed service never stops the loop; only a broken stream does

pub mod engine;

use thiserror::Error;

use crate::inventory::InventoryError;

pub use engine::Reconciler;

/// Fatal reconcile errors. Everything else is handled inside a cycle.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("cannot load initial inventory: {0}")]
    Snapshot(#[source] InventoryError),

    #[error("inventory stream broke: {0}")]
    Stream(#[source] InventoryError),
}

/// What a single render/apply cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Rendered content equals the active configuration; nothing touched.
    Unchanged,
    /// New configuration validated and the proxy restarted on it.
    Applied,
    /// Candidate rejected; previous configuration restored and running.
    RolledBack,
    /// Stopped before the proxy was touched (write or required-backup failure).
    Aborted,
    /// Template or staging write failed; active configuration untouched.
    RenderFailed,
    /// Rollback could not reach a known-good state.
    ManualInterventionRequired,
}

impl CycleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::Unchanged => "unchanged",
            CycleOutcome::Applied => "applied",
            CycleOutcome::RolledBack => "rolled_back",
            CycleOutcome::Aborted => "aborted",
            CycleOutcome::RenderFailed => "render_failed",
            CycleOutcome::ManualInterventionRequired => "manual_intervention",
        }
    }
}
