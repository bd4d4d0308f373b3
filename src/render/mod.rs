//! Rendering subsystem.
//!
//! # Data Flow
//! ```text
//! ServiceRegistry::snapshot()
//!     → Renderer::render (template.rs, minijinja)
//!     → write_artifact (temp file + rename onto the staging path)
//!     → deploy::change compares staging against the active configuration
//! ```
//!
//! # Design Decisions
//! - A failed render or write never clobbers the previous staged artifact
//! - The renderer only sees the ordered snapshot, never the registry itself

pub mod template;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::registry::ManagedService;

pub use template::TemplateRenderer;

/// Rendering failures. Each ends the current cycle; the active configuration stays in force.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template {name} not found in {dir}")]
    TemplateNotFound { name: String, dir: String },

    #[error("template syntax error: {0}")]
    Syntax(String),

    #[error("template render failed: {0}")]
    Runtime(String),

    #[error("failed to write staged artifact {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Turns the ordered service list into proxy configuration text.
pub trait Renderer: Send + Sync {
    fn render(&self, services: &[ManagedService]) -> Result<String, RenderError>;
}

fn sibling_temp(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `content` to `path` via a sibling temp file and rename.
pub async fn write_artifact(path: &Path, content: &str) -> Result<(), RenderError> {
    let write_err = |source| RenderError::Write {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    let temp = sibling_temp(path);
    tokio::fs::write(&temp, content).await.map_err(write_err)?;
    tokio::fs::rename(&temp, path).await.map_err(write_err)?;
    Ok(())
}
