//! Fixed, in-memory inventory for dry runs and tests.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::inventory::types::{InventoryError, InventoryEvent, ServiceRecord};
use crate::inventory::{EventStream, InventorySource};

/// Serves a fixed snapshot followed by a finite list of events.
///
/// The stream closes after the last event, or after `fail_with` is delivered.
#[derive(Debug, Default)]
pub struct StaticInventory {
    records: Vec<ServiceRecord>,
    events: Mutex<Vec<InventoryEvent>>,
    snapshot_error: Option<String>,
    stream_error: Option<String>,
}

impl StaticInventory {
    pub fn new(records: Vec<ServiceRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    /// Events to deliver, in order, once `watch` is called.
    pub fn with_events(mut self, events: Vec<InventoryEvent>) -> Self {
        self.events = Mutex::new(events);
        self
    }

    /// Make `snapshot` fail.
    pub fn failing_snapshot(mut self, reason: impl Into<String>) -> Self {
        self.snapshot_error = Some(reason.into());
        self
    }

    /// Terminate the stream with a transport error after the last event.
    pub fn fail_with(mut self, reason: impl Into<String>) -> Self {
        self.stream_error = Some(reason.into());
        self
    }
}

#[async_trait]
impl InventorySource for StaticInventory {
    async fn snapshot(&self) -> Result<Vec<ServiceRecord>, InventoryError> {
        match &self.snapshot_error {
            Some(reason) => Err(InventoryError::Snapshot(reason.clone())),
            None => Ok(self.records.clone()),
        }
    }

    fn watch(&self, buffer: usize) -> Result<EventStream, InventoryError> {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let events = std::mem::take(&mut *self.events.lock().unwrap_or_else(|e| e.into_inner()));
        let stream_error = self.stream_error.clone();

        tokio::spawn(async move {
            for event in events {
                if tx.send(Ok(event)).await.is_err() {
                    return;
                }
            }
            if let Some(reason) = stream_error {
                let _ = tx.send(Err(InventoryError::Stream(reason))).await;
            }
        });

        Ok(rx)
    }
}
