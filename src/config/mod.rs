//! Settings management subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML)
//!     → loader.rs (parse, deserialize, resolve relative paths)
//!     → validation.rs (semantic checks)
//!     → Settings (validated, immutable)
//!     → handed by reference to startup wiring
//! ```
//!
//! # Design Decisions
//! - Settings are read once at startup; a load failure is fatal
//! - All fields have defaults to allow minimal files
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    DeployConfig, InventoryConfig, LogFormat, ObservabilityConfig, PathsConfig, ProxyConfig,
    ReconcileConfig, Settings,
};
