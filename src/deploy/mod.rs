//! Deployment subsystem.
//!
//! # Data Flow
//! ```text
//! staged artifact
//!     → change.rs (SHA-256 of staged vs active; unchanged → stop)
//!     → controller.rs state machine
//!         → backup.rs (snapshot active config)
//!         → ops.rs ConfigFiles (replace active config)
//!         → ops.rs ProxyControl (validate, restart)
//!         → rollback: backup.rs latest → ConfigFiles → bounded restart retries
//! ```
//!
//! # Design Decisions
//! - Sole writer of the active configuration and the backup directory
//! - Side effects sit behind traits so the state machine runs against fakes
//! - Rollback retries are bounded; exhaustion surfaces as manual intervention

pub mod backup;
pub mod change;
pub mod controller;
pub mod ops;

use thiserror::Error;

pub use backup::{BackupManager, BackupSnapshot};
pub use change::{changed, file_digest};
pub use controller::{DeployOutcome, DeploymentController, RetryPolicy};
pub use ops::{ConfigFiles, FsConfigFiles, ProcessFailure, ProxyControl, SystemProxyControl};

/// Failures inside a deployment.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("backup of {path} failed: {source}")]
    Backup {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("writing {path} failed: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("validation failed: {0}")]
    Validation(#[source] ProcessFailure),

    #[error("restart failed: {0}")]
    Restart(#[source] ProcessFailure),

    #[error("restore failed: {0}")]
    Restore(String),

    #[error("proxy did not restart after {attempts} attempts on the restored configuration")]
    ManualInterventionRequired { attempts: u32 },
}
