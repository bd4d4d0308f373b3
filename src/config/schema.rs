//! Settings schema definitions.
//!
//! This module defines the complete settings structure for the reconciler.
//! All types derive Serde traits for deserialization from the TOML settings file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Root settings for the reconciler.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Template, staging, active configuration and backup locations.
    pub paths: PathsConfig,

    /// External proxy binary and service manager invocation.
    pub proxy: ProxyConfig,

    /// Deployment controller policy (retries, backup strictness).
    pub deploy: DeployConfig,

    /// Reconciliation loop tuning.
    pub reconcile: ReconcileConfig,

    /// Inventory source settings.
    pub inventory: InventoryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Rebase every relative path onto `base` (the settings file's directory).
    pub fn resolve_relative(mut self, base: &Path) -> Self {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        rebase(&mut self.paths.template_dir);
        rebase(&mut self.paths.staging_file);
        rebase(&mut self.paths.active_config);
        rebase(&mut self.paths.backup_dir);
        rebase(&mut self.inventory.path);
        if let Some(log_file) = self.observability.log_file.as_mut() {
            rebase(log_file);
        }
        self
    }
}

/// File system layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the proxy configuration templates.
    pub template_dir: PathBuf,

    /// Template file name inside `template_dir`.
    pub template_name: String,

    /// Where freshly rendered artifacts are staged.
    pub staging_file: PathBuf,

    /// Configuration file read by the live proxy process.
    pub active_config: PathBuf,

    /// Directory for timestamped backups of the active configuration.
    pub backup_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("templates"),
            template_name: "haproxy.cfg.j2".to_string(),
            staging_file: PathBuf::from("haproxy.cfg.new"),
            active_config: PathBuf::from("/etc/haproxy/haproxy.cfg"),
            backup_dir: PathBuf::from("backup"),
        }
    }
}

/// External process configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Proxy binary used for `-q -c -f <path>` validation.
    pub binary: String,

    /// Service manager executable (e.g. systemctl).
    pub service_manager: String,

    /// Unit name passed to the service manager restart action.
    pub service_name: String,

    /// Deadline for the validation process in seconds.
    pub validate_timeout_secs: u64,

    /// Deadline for the restart process in seconds.
    pub restart_timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            binary: "haproxy".to_string(),
            service_manager: "systemctl".to_string(),
            service_name: "haproxy".to_string(),
            validate_timeout_secs: 10,
            restart_timeout_secs: 30,
        }
    }
}

/// Deployment controller policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Restart attempts against a restored backup before giving up.
    pub max_restart_attempts: u32,

    /// Base delay for exponential backoff between restart attempts in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub retry_max_delay_ms: u64,

    /// Abort the cycle when the pre-write backup cannot be taken.
    pub require_backup: bool,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            max_restart_attempts: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 5000,
            require_backup: false,
        }
    }
}

/// Reconciliation loop tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Coalescing window in milliseconds. 0 runs one cycle per triggering event.
    pub debounce_ms: u64,

    /// Capacity of the channel between the inventory source and the loop.
    pub event_buffer: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 0,
            event_buffer: 256,
        }
    }
}

/// Inventory source settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// JSON export of the cluster-wide service list.
    pub path: PathBuf,

    /// Poll interval for watcher backends that fall back to polling, in seconds.
    pub poll_interval_secs: u64,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("inventory.json"),
            poll_interval_secs: 2,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Human readable or JSON lines.
    pub log_format: LogFormat,

    /// Append logs to this file instead of stdout.
    pub log_file: Option<PathBuf>,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            log_file: None,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
