//! Settings validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, retry budget >= 1)
//! - Detect conflicting paths (staging must not alias the active configuration)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Settings → Result<(), Vec<ValidationError>>
//! - Runs before settings are accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::Settings;

/// A single semantic problem in the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("staging_file and active_config must be different paths")]
    StagingIsActive,

    #[error("backup_dir must not be the active configuration path")]
    BackupIsActive,

    #[error("metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Validate settings, collecting every error.
pub fn validate_config(settings: &Settings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.paths.template_name.trim().is_empty() {
        errors.push(ValidationError::Empty("paths.template_name"));
    }
    if settings.paths.active_config.as_os_str().is_empty() {
        errors.push(ValidationError::Empty("paths.active_config"));
    }
    if settings.paths.staging_file == settings.paths.active_config {
        errors.push(ValidationError::StagingIsActive);
    }
    if settings.paths.backup_dir == settings.paths.active_config {
        errors.push(ValidationError::BackupIsActive);
    }
    if settings.proxy.binary.trim().is_empty() {
        errors.push(ValidationError::Empty("proxy.binary"));
    }
    if settings.proxy.service_manager.trim().is_empty() {
        errors.push(ValidationError::Empty("proxy.service_manager"));
    }
    if settings.proxy.service_name.trim().is_empty() {
        errors.push(ValidationError::Empty("proxy.service_name"));
    }
    if settings.proxy.validate_timeout_secs == 0 {
        errors.push(ValidationError::Zero("proxy.validate_timeout_secs"));
    }
    if settings.proxy.restart_timeout_secs == 0 {
        errors.push(ValidationError::Zero("proxy.restart_timeout_secs"));
    }
    if settings.deploy.max_restart_attempts == 0 {
        errors.push(ValidationError::Zero("deploy.max_restart_attempts"));
    }
    if settings.reconcile.event_buffer == 0 {
        errors.push(ValidationError::Zero("reconcile.event_buffer"));
    }
    if settings.observability.metrics_enabled
        && settings.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            settings.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
