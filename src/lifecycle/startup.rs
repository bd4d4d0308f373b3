//! Startup wiring.
//!
//! # Responsibilities
//! - Turn validated settings into the concrete collaborators
//! - Assemble the reconciler around them
//!
//! # Design Decisions
//! - Fail fast: settings and the initial snapshot are checked before any event is taken
//! - Nothing here performs I/O; the caller decides when to bootstrap

use std::time::Duration;

use crate::config::Settings;
use crate::deploy::{BackupManager, DeploymentController, FsConfigFiles, SystemProxyControl};
use crate::inventory::FileInventory;
use crate::reconcile::Reconciler;
use crate::render::TemplateRenderer;

/// Reconciler backed by the real file system, template engine and processes.
pub type SystemReconciler = Reconciler<TemplateRenderer, FsConfigFiles, SystemProxyControl>;

pub fn build_renderer(settings: &Settings) -> TemplateRenderer {
    TemplateRenderer::new(&settings.paths.template_dir, &settings.paths.template_name)
}

pub fn build_inventory(settings: &Settings) -> FileInventory {
    FileInventory::new(
        &settings.inventory.path,
        Duration::from_secs(settings.inventory.poll_interval_secs),
    )
}

pub fn build_reconciler(settings: &Settings) -> SystemReconciler {
    let controller = DeploymentController::new(
        FsConfigFiles,
        SystemProxyControl::from_config(&settings.proxy),
        BackupManager::new(&settings.paths.backup_dir),
        &settings.paths.active_config,
        &settings.deploy,
    );

    Reconciler::new(build_renderer(settings), controller, &settings.paths.staging_file)
        .with_debounce(Duration::from_millis(settings.reconcile.debounce_ms))
}
