//! # Registry Infrastructure
//!
//! Per-pool plugin registries and the registrars that populate them.
//!
//! ## Architecture
//!
//! ```text
//! Registry Infrastructure
//! ├── PluginRegistry            (ordered plugins of one pool, snapshot dispatch)
//! ├── Registrar                 (named bundle that populates a registry)
//! ├── SingletonPluginRegistrar  (one shared plugin, id = plugin id)
//! └── FnRegistrar               (closure, typically per-pool instances)
//! ```

pub mod plugin_registry;
pub mod registrar;

pub use plugin_registry::{PluginRegistry, PluginSnapshot, RegistryStats};
pub use registrar::{FnRegistrar, Registrar, SingletonPluginRegistrar};
