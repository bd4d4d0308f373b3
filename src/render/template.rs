//! Jinja template renderer.

use std::path::PathBuf;

use minijinja::{context, Environment, ErrorKind};

use crate::registry::ManagedService;
use crate::render::{RenderError, Renderer};

/// Renders `<template_dir>/<template_name>` with the registry's services.
///
/// The template sees a `services` list whose items carry `name`,
/// `external_address` and `exposed_port`. Blocks are trimmed the way the
/// proxy configs in `templates/` expect.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    template_dir: PathBuf,
    template_name: String,
}

impl TemplateRenderer {
    pub fn new(template_dir: impl Into<PathBuf>, template_name: impl Into<String>) -> Self {
        Self {
            template_dir: template_dir.into(),
            template_name: template_name.into(),
        }
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, services: &[ManagedService]) -> Result<String, RenderError> {
        // Built per render so template edits on disk take effect without a restart.
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_loader(minijinja::path_loader(&self.template_dir));

        let template = env.get_template(&self.template_name).map_err(|e| match e.kind() {
            ErrorKind::TemplateNotFound => RenderError::TemplateNotFound {
                name: self.template_name.clone(),
                dir: self.template_dir.display().to_string(),
            },
            ErrorKind::SyntaxError => RenderError::Syntax(e.to_string()),
            _ => RenderError::Runtime(e.to_string()),
        })?;

        template
            .render(context! { services => services })
            .map_err(|e| RenderError::Runtime(e.to_string()))
    }
}
