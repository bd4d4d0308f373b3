//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Restart on a restored configuration fails:
//!     → backoff.rs (exponential delay with jitter)
//!     → deploy controller retries until its attempt budget is spent
//! ```
//!
//! # Design Decisions
//! - Retries are always bounded; the caller owns the budget
//! - Deadlines on external processes live next to the process runner (deploy::ops)

pub mod backoff;
