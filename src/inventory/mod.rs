//! Inventory subsystem.
//!
//! # Data Flow
//! ```text
//! Cluster inventory (external)
//!     → InventorySource::snapshot()   full listing, once at bootstrap
//!     → InventorySource::watch()      bounded mpsc channel of Added/Deleted events
//!     → reconcile loop (single consumer)
//! ```
//!
//! # Design Decisions
//! - The source is the sole producer; events arrive in occurrence order
//! - Channel is bounded so a stalled reconcile loop applies backpressure
//! - A broken stream is reported in-band as `Err(InventoryError::Stream)`

pub mod file;
pub mod memory;
pub mod types;

use async_trait::async_trait;
use tokio::sync::mpsc;

pub use file::FileInventory;
pub use memory::StaticInventory;
pub use types::{
    EventKind, ExposureMode, InventoryError, InventoryEvent, ServicePort, ServiceRecord,
};

/// Receiving half of an inventory change stream.
pub type EventStream = mpsc::Receiver<Result<InventoryEvent, InventoryError>>;

/// A cluster-wide source of service records.
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// List every service currently known.
    async fn snapshot(&self) -> Result<Vec<ServiceRecord>, InventoryError>;

    /// Stream changes that happen after the last snapshot.
    ///
    /// The stream closes when the source has nothing more to deliver.
    fn watch(&self, buffer: usize) -> Result<EventStream, InventoryError>;
}
