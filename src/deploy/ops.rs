//! Side-effect seams of the deployment controller.
//!
//! # Responsibilities
//! - Copy configuration files without exposing partial writes
//! - Run the proxy's config check and the service manager restart
//!
//! # Design Decisions
//! - Only the exit status of external commands is observed; output is discarded
//! - Every external command runs under a deadline and is killed when it expires

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::ProxyConfig;

/// File operations on configuration files.
#[async_trait]
pub trait ConfigFiles: Send + Sync {
    /// Replace `to` with a copy of `from`. Readers of `to` never see a partial file.
    async fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// Local file system implementation: copy to a sibling temp file, then rename.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsConfigFiles;

/// Suffix of in-flight copies.
pub const SWAP_SUFFIX: &str = ".swap";

/// `.<name>.swap` next to `path`. The leading dot keeps it out of any name prefix scan.
fn sibling_temp(path: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(SWAP_SUFFIX);
    path.with_file_name(name)
}

#[async_trait]
impl ConfigFiles for FsConfigFiles {
    async fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        let temp = sibling_temp(to);
        if let Err(e) = tokio::fs::copy(from, &temp).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }
        tokio::fs::rename(&temp, to).await
    }
}

/// Failure of an external command.
#[derive(Debug, Error)]
pub enum ProcessFailure {
    #[error("`{command}` exited with {status}")]
    Exit { command: String, status: String },

    #[error("`{command}` timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// Control over the live proxy process.
#[async_trait]
pub trait ProxyControl: Send + Sync {
    /// Check `config` with the proxy binary. Ok means exit status 0.
    async fn validate(&self, config: &Path) -> Result<(), ProcessFailure>;

    /// Restart the proxy through the service manager.
    async fn restart(&self) -> Result<(), ProcessFailure>;
}

/// Runs `<binary> -q -c -f <path>` and `<service_manager> restart <service_name>`.
#[derive(Debug, Clone)]
pub struct SystemProxyControl {
    binary: String,
    service_manager: String,
    service_name: String,
    validate_timeout: Duration,
    restart_timeout: Duration,
}

impl SystemProxyControl {
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            service_manager: config.service_manager.clone(),
            service_name: config.service_name.clone(),
            validate_timeout: Duration::from_secs(config.validate_timeout_secs),
            restart_timeout: Duration::from_secs(config.restart_timeout_secs),
        }
    }
}

async fn run(mut cmd: Command, command: String, limit: Duration) -> Result<(), ProcessFailure> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    tracing::debug!(command = %command, "Running external command");

    let status = match timeout(limit, cmd.status()).await {
        Ok(Ok(status)) => status,
        Ok(Err(source)) => return Err(ProcessFailure::Spawn { command, source }),
        Err(_) => {
            return Err(ProcessFailure::Timeout {
                command,
                secs: limit.as_secs(),
            })
        }
    };

    if status.success() {
        Ok(())
    } else {
        Err(ProcessFailure::Exit {
            command,
            status: status.to_string(),
        })
    }
}

#[async_trait]
impl ProxyControl for SystemProxyControl {
    async fn validate(&self, config: &Path) -> Result<(), ProcessFailure> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["-q", "-c", "-f"]).arg(config);
        let command = format!("{} -q -c -f {}", self.binary, config.display());
        run(cmd, command, self.validate_timeout).await
    }

    async fn restart(&self) -> Result<(), ProcessFailure> {
        let mut cmd = Command::new(&self.service_manager);
        cmd.arg("restart").arg(&self.service_name);
        let command = format!("{} restart {}", self.service_manager, self.service_name);
        run(cmd, command, self.restart_timeout).await
    }
}
