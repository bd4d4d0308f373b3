//! HAProxy reconciler library.
//!
//! Keeps an HAProxy configuration in line with the services a cluster
//! inventory marks for proxying.
//!
//! # Architecture Overview
//!
//! ```text
//!   inventory ──snapshot/events──▶ reconcile ──classify──▶ registry
//!                                      │
//!                                      ▼
//!                                   render ──staging file──▶ deploy::change
//!                                                                │ changed
//!                                                                ▼
//!                                     deploy::controller (backup → replace → validate → restart)
//!                                                                │ failure
//!                                                                ▼
//!                                     rollback (restore newest backup → bounded restart retries)
//! ```

// Core subsystems
pub mod deploy;
pub mod inventory;
pub mod reconcile;
pub mod registry;
pub mod render;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::Settings;
pub use lifecycle::Shutdown;
pub use reconcile::{CycleOutcome, ReconcileError, Reconciler};
