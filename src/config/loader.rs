//! Settings loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::Settings;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for settings loading. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate settings from a TOML file.
///
/// Relative paths inside the file are resolved against the file's directory.
pub fn load_config(path: &Path) -> Result<Settings, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let settings: Settings = toml::from_str(&content)?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let settings = settings.resolve_relative(base);

    validate_config(&settings).map_err(ConfigError::Validation)?;

    Ok(settings)
}
