//! Deployment controller.
//!
//! # States
//! - BackingUp: copy the active configuration into the backup directory
//! - Replacing: atomically copy the staged artifact over the active configuration
//! - Validating: `<binary> -q -c -f <active>`
//! - Restarting: service manager restart
//! - RollingBack: restore the newest backup, then retry the restart
//!
//! # State Transitions
//! ```text
//! BackingUp → Replacing              (backup failure logged, non-fatal unless required)
//! Replacing → Validating             (write failure aborts the cycle)
//! Validating → Restarting            (exit 0)
//! Validating → RollingBack           (non-zero, timeout, spawn error)
//! Restarting → Done                  (exit 0)
//! Restarting → RollingBack           (non-zero, timeout, spawn error)
//! RollingBack → RolledBack           (restore ok, a restart attempt succeeds)
//! RollingBack → ManualIntervention   (restore fails, or restart budget exhausted)
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::DeployConfig;
use crate::deploy::backup::BackupManager;
use crate::deploy::ops::{ConfigFiles, ProxyControl};
use crate::deploy::DeployError;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;

/// How a deployment ended.
#[derive(Debug)]
pub enum DeployOutcome {
    /// The candidate is live.
    Applied,
    /// The candidate was rejected and the previous configuration is live again.
    RolledBack { cause: DeployError },
    /// Nothing was activated; the cycle stopped before touching the proxy process.
    Aborted { cause: DeployError },
    /// No safe state could be reached automatically.
    ManualIntervention { cause: DeployError },
}

/// Retry policy for restarts after a restore.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl From<&DeployConfig> for RetryPolicy {
    fn from(config: &DeployConfig) -> Self {
        Self {
            max_attempts: config.max_restart_attempts,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        }
    }
}

/// Applies staged artifacts to the live proxy.
pub struct DeploymentController<F, P> {
    files: F,
    proxy: P,
    backups: BackupManager,
    active: PathBuf,
    retry: RetryPolicy,
    require_backup: bool,
}

impl<F: ConfigFiles, P: ProxyControl> DeploymentController<F, P> {
    pub fn new(files: F, proxy: P, backups: BackupManager, active: impl Into<PathBuf>, config: &DeployConfig) -> Self {
        Self {
            files,
            proxy,
            backups,
            active: active.into(),
            retry: RetryPolicy::from(config),
            require_backup: config.require_backup,
        }
    }

    pub fn active_path(&self) -> &Path {
        &self.active
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub fn proxy(&self) -> &P {
        &self.proxy
    }

    /// Drive `staged` through backup, replace, validate and restart.
    pub async fn deploy(&self, staged: &Path) -> DeployOutcome {
        match self.backups.create(&self.files, &self.active).await {
            Ok(Some(snapshot)) => {
                tracing::info!(backup = ?snapshot.path, "Active configuration backed up");
            }
            Ok(None) => {
                tracing::info!(active = ?self.active, "No active configuration yet, nothing to back up");
            }
            Err(e) if self.require_backup => {
                tracing::error!(error = %e, "Backup failed, aborting cycle");
                return DeployOutcome::Aborted { cause: e };
            }
            Err(e) => {
                tracing::error!(error = %e, "Backup failed, continuing without a fresh restore point");
            }
        }

        if let Err(source) = self.files.copy(staged, &self.active).await {
            let cause = DeployError::Write {
                path: self.active.display().to_string(),
                source,
            };
            tracing::error!(error = %cause, "Could not replace active configuration");
            return DeployOutcome::Aborted { cause };
        }

        if let Err(e) = self.proxy.validate(&self.active).await {
            tracing::error!(error = %e, "Configuration rejected by proxy check");
            return self.roll_back(DeployError::Validation(e)).await;
        }

        match self.proxy.restart().await {
            Ok(()) => {
                tracing::info!(active = ?self.active, "Proxy restarted with new configuration");
                DeployOutcome::Applied
            }
            Err(e) => {
                tracing::error!(error = %e, "Proxy restart failed");
                self.roll_back(DeployError::Restart(e)).await
            }
        }
    }

    async fn roll_back(&self, cause: DeployError) -> DeployOutcome {
        metrics::record_rollback();

        let snapshot = match self.backups.latest() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                return self.manual(DeployError::Restore(format!(
                    "no backup available in {}",
                    self.backups.dir().display()
                )))
            }
            Err(e) => return self.manual(DeployError::Restore(e.to_string())),
        };

        if let Err(e) = self.files.copy(&snapshot.path, &self.active).await {
            return self.manual(DeployError::Restore(format!(
                "copying {} over {}: {}",
                snapshot.path.display(),
                self.active.display(),
                e
            )));
        }
        tracing::warn!(backup = ?snapshot.path, "Restored previous configuration");

        for attempt in 1..=self.retry.max_attempts {
            if attempt > 1 {
                let delay = calculate_backoff(attempt - 1, self.retry.base_delay, self.retry.max_delay);
                tokio::time::sleep(delay).await;
            }

            match self.proxy.restart().await {
                Ok(()) => {
                    tracing::warn!(attempt, cause = %cause, "Rolled back; proxy running the restored configuration");
                    return DeployOutcome::RolledBack { cause };
                }
                Err(e) => {
                    tracing::error!(attempt, max_attempts = self.retry.max_attempts, error = %e, "Restart on restored configuration failed");
                }
            }
        }

        self.manual(DeployError::ManualInterventionRequired {
            attempts: self.retry.max_attempts,
        })
    }

    fn manual(&self, cause: DeployError) -> DeployOutcome {
        metrics::record_manual_intervention();
        tracing::error!(
            active = ?self.active,
            error = %cause,
            "MANUAL INTERVENTION REQUIRED: proxy configuration could not be brought to a known-good state"
        );
        DeployOutcome::ManualIntervention { cause }
    }
}
