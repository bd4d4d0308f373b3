//! The reconcile loop.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{timeout, Instant};
use tracing::Instrument;
use uuid::Uuid;

use crate::deploy::{changed, ConfigFiles, DeployOutcome, DeploymentController, ProxyControl};
use crate::inventory::{EventKind, EventStream, InventoryEvent, InventorySource};
use crate::observability::metrics;
use crate::reconcile::{CycleOutcome, ReconcileError};
use crate::registry::{classify, registry_from, Classification, ServiceRegistry};
use crate::render::{write_artifact, Renderer};

/// A coalescing window never stretches past this many windows.
const MAX_COALESCE_WINDOWS: u32 = 10;

/// Keeps the proxy configuration in line with the inventory.
///
/// Owns the registry; every mutation and every cycle runs on the caller's task,
/// one event at a time.
pub struct Reconciler<R, F, P> {
    registry: ServiceRegistry,
    renderer: R,
    controller: DeploymentController<F, P>,
    staging: PathBuf,
    debounce: Duration,
}

impl<R, F, P> Reconciler<R, F, P>
where
    R: Renderer,
    F: ConfigFiles,
    P: ProxyControl,
{
    pub fn new(renderer: R, controller: DeploymentController<F, P>, staging: impl Into<PathBuf>) -> Self {
        Self {
            registry: ServiceRegistry::new(),
            renderer,
            controller,
            staging: staging.into(),
            debounce: Duration::ZERO,
        }
    }

    /// Coalesce triggering events that arrive within `window` of each other into one cycle.
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn controller(&self) -> &DeploymentController<F, P> {
        &self.controller
    }

    pub fn staging_path(&self) -> &Path {
        &self.staging
    }

    /// Load the full inventory, then run one cycle even if nothing is eligible.
    pub async fn bootstrap<S>(&mut self, source: &S) -> Result<CycleOutcome, ReconcileError>
    where
        S: InventorySource + ?Sized,
    {
        let records = source.snapshot().await.map_err(ReconcileError::Snapshot)?;

        let (registry, ambiguous) = registry_from(&records);
        for e in &ambiguous {
            metrics::record_ambiguous_service();
            tracing::error!(service = %e.service, error = %e, "Skipping service");
        }
        self.registry = registry;
        metrics::record_registry_size(self.registry.len());

        tracing::info!(
            listed = records.len(),
            proxied = self.registry.len(),
            skipped = ambiguous.len(),
            "Bootstrap inventory loaded"
        );

        Ok(self.run_cycle("bootstrap").await)
    }

    /// Apply one inventory event to the registry.
    ///
    /// Returns true when the registry changed and a cycle is due.
    pub fn apply_event(&mut self, event: &InventoryEvent) -> bool {
        metrics::record_event(event.kind.as_str());
        let name = &event.record.name;

        let triggered = match event.kind {
            EventKind::Added => {
                if self.registry.contains(name) {
                    tracing::debug!(service = %name, "Service already registered, ignoring add");
                    return false;
                }
                match classify(&event.record) {
                    Classification::Eligible(service) => {
                        tracing::info!(
                            service = %name,
                            address = %service.external_address,
                            port = service.exposed_port,
                            "Service added"
                        );
                        self.registry.upsert(service);
                        true
                    }
                    Classification::Ambiguous(e) => {
                        metrics::record_ambiguous_service();
                        tracing::error!(service = %name, error = %e, "Skipping service");
                        false
                    }
                    Classification::NotEligible(reason) => {
                        tracing::debug!(service = %name, exposure = %event.record.exposure, ?reason, "Service not proxied");
                        false
                    }
                }
            }
            EventKind::Deleted => match self.registry.remove(name) {
                Some(_) => {
                    tracing::info!(service = %name, "Service removed");
                    true
                }
                None => false,
            },
        };

        if triggered {
            metrics::record_registry_size(self.registry.len());
        }
        triggered
    }

    /// Render the registry and, when the result differs from the active config, deploy it.
    pub async fn run_cycle(&self, trigger: &str) -> CycleOutcome {
        let span = tracing::info_span!(
            "cycle",
            cycle_id = %Uuid::new_v4(),
            trigger = %trigger,
            services = self.registry.len()
        );
        let outcome = self.cycle().instrument(span).await;
        metrics::record_cycle(outcome.as_str());
        outcome
    }

    async fn cycle(&self) -> CycleOutcome {
        let services = self.registry.snapshot();

        let rendered = match self.renderer.render(&services) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::error!(error = %e, "Render failed, active configuration left in place");
                return CycleOutcome::RenderFailed;
            }
        };
        if let Err(e) = write_artifact(&self.staging, &rendered).await {
            tracing::error!(error = %e, "Render failed, active configuration left in place");
            return CycleOutcome::RenderFailed;
        }

        if !changed(&self.staging, self.controller.active_path()) {
            tracing::info!("Rendered configuration matches active configuration");
            return CycleOutcome::Unchanged;
        }

        match self.controller.deploy(&self.staging).await {
            DeployOutcome::Applied => CycleOutcome::Applied,
            DeployOutcome::RolledBack { .. } => CycleOutcome::RolledBack,
            DeployOutcome::Aborted { .. } => CycleOutcome::Aborted,
            DeployOutcome::ManualIntervention { .. } => CycleOutcome::ManualInterventionRequired,
        }
    }

    /// Consume the change stream until it closes, breaks, or shutdown is signalled.
    ///
    /// Shutdown is observed between events only; a running cycle always completes.
    pub async fn run(
        &mut self,
        mut events: EventStream,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ReconcileError> {
        tracing::info!(debounce_ms = self.debounce.as_millis() as u64, "Reconcile loop started");

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("Reconcile loop received shutdown signal, exiting loop");
                    return Ok(());
                }
                next = events.recv() => next,
            };

            let event = match next {
                Some(Ok(event)) => event,
                Some(Err(e)) => {
                    tracing::error!(error = %e, "Inventory stream failed");
                    return Err(ReconcileError::Stream(e));
                }
                None => {
                    tracing::warn!("Inventory stream closed, reconcile loop exiting");
                    return Ok(());
                }
            };

            if !self.apply_event(&event) {
                continue;
            }

            let mut trigger = event.kind.as_str();
            let mut stream_end = None;
            if !self.debounce.is_zero() {
                let (coalesced, end) = self.coalesce(&mut events).await;
                if coalesced > 0 {
                    trigger = "coalesced";
                    tracing::debug!(coalesced, "Coalesced events into one cycle");
                }
                stream_end = end;
            }

            self.run_cycle(trigger).await;

            match stream_end {
                Some(StreamEnd::Failed(e)) => {
                    tracing::error!(error = %e, "Inventory stream failed");
                    return Err(ReconcileError::Stream(e));
                }
                Some(StreamEnd::Closed) => {
                    tracing::warn!("Inventory stream closed, reconcile loop exiting");
                    return Ok(());
                }
                None => {}
            }
        }
    }

    /// Fold further events into the registry until the window passes quietly.
    ///
    /// Returns how many extra triggering events were absorbed, and whether the
    /// stream ended while waiting.
    async fn coalesce(&mut self, events: &mut EventStream) -> (usize, Option<StreamEnd>) {
        let deadline = Instant::now() + self.debounce * MAX_COALESCE_WINDOWS;
        let mut coalesced = 0;

        loop {
            let wait = self.debounce.min(deadline.saturating_duration_since(Instant::now()));
            if wait.is_zero() {
                return (coalesced, None);
            }
            match timeout(wait, events.recv()).await {
                Err(_) => return (coalesced, None),
                Ok(Some(Ok(event))) => {
                    if self.apply_event(&event) {
                        coalesced += 1;
                    }
                }
                Ok(Some(Err(e))) => return (coalesced, Some(StreamEnd::Failed(e))),
                Ok(None) => return (coalesced, Some(StreamEnd::Closed)),
            }
        }
    }
}

enum StreamEnd {
    Closed,
    Failed(crate::inventory::InventoryError),
}
