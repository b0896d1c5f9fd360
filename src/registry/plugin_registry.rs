//! # Plugin Registry
//!
//! Per-pool, thread-safe collection of plugins with an explicit dispatch order.
//!
//! ## Overview
//!
//! Each hooked pool owns one `PluginRegistry`. Plugins are keyed by id and
//! ordered by `(priority, registration sequence)`. Disabled plugins stay
//! registered and queryable but are skipped by dispatch.
//!
//! ## Key Features
//!
//! - **Snapshot dispatch**: every mutation rebuilds immutable, pre-sorted
//!   per-capability vectors under the write lock; dispatch clones an `Arc`
//!   and never observes a half-applied change
//! - **Idempotent registration**: registering an id twice is a no-op
//! - **Lifecycle hooks**: `start` on register, `stop` on unregister and clear
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use poolhook_core::plugin::{Capability, Plugin, TaskAware};
//! use poolhook_core::registry::PluginRegistry;
//! use poolhook_core::task::Task;
//!
//! struct Tagger;
//! impl TaskAware for Tagger {
//!     fn before_task_execute(&self, task: &mut Task) {
//!         task.append_label("#tagged");
//!     }
//! }
//! impl Plugin for Tagger {
//!     fn id(&self) -> &str {
//!         "tagger"
//!     }
//!     fn as_task_aware(&self) -> Option<&dyn TaskAware> {
//!         Some(self)
//!     }
//! }
//!
//! let registry = PluginRegistry::new("orders");
//! assert!(registry.register(Arc::new(Tagger)));
//! assert!(!registry.register(Arc::new(Tagger)));
//! assert_eq!(registry.active_plugins(Capability::TaskAware).len(), 1);
//!
//! registry.disable("tagger");
//! assert!(registry.active_plugins(Capability::TaskAware).is_empty());
//! assert!(registry.is_registered("tagger"));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::log_plugin_operation;
use crate::plugin::{run_isolated, Capability, Plugin, PluginRuntimeInfo};

/// Ordered, immutable view of plugins used for dispatch
pub type PluginSnapshot = Arc<Vec<Arc<dyn Plugin>>>;

struct Entry {
    plugin: Arc<dyn Plugin>,
    priority: i32,
    seq: u64,
    enabled: bool,
}

#[derive(Default)]
struct RegistryState {
    entries: HashMap<String, Entry>,
    next_seq: u64,
    /// Every plugin in dispatch order, enabled or not
    ordered: PluginSnapshot,
    /// Enabled plugins per capability, indexed by `Capability::index`
    active: [PluginSnapshot; 4],
}

impl RegistryState {
    fn rebuild(&mut self) {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by_key(|entry| (entry.priority, entry.seq));

        self.ordered = Arc::new(entries.iter().map(|entry| Arc::clone(&entry.plugin)).collect());
        for capability in Capability::ALL {
            let active: Vec<Arc<dyn Plugin>> = entries
                .iter()
                .filter(|entry| entry.enabled && capability.supported_by(entry.plugin.as_ref()))
                .map(|entry| Arc::clone(&entry.plugin))
                .collect();
            self.active[capability.index()] = Arc::new(active);
        }
    }
}

/// Counts of registered plugins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub pool_id: String,
    pub total: usize,
    pub enabled: usize,
    pub disabled: usize,
    /// Enabled plugins per capability
    pub active_by_capability: BTreeMap<Capability, usize>,
}

/// Plugins attached to one pool
pub struct PluginRegistry {
    pool_id: String,
    state: RwLock<RegistryState>,
}

impl PluginRegistry {
    pub fn new(pool_id: impl Into<String>) -> Self {
        Self {
            pool_id: pool_id.into(),
            state: RwLock::new(RegistryState::default()),
        }
    }

    pub fn pool_id(&self) -> &str {
        &self.pool_id
    }

    /// Register a plugin, enabled; false if its id is already taken
    pub fn register(&self, plugin: Arc<dyn Plugin>) -> bool {
        let plugin_id = plugin.id().to_string();
        {
            let mut state = self.state.write();
            if state.entries.contains_key(&plugin_id) {
                debug!(
                    pool_id = %self.pool_id,
                    plugin_id = %plugin_id,
                    "Plugin already registered, skipping"
                );
                return false;
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            state.entries.insert(
                plugin_id.clone(),
                Entry {
                    priority: plugin.priority(),
                    plugin: Arc::clone(&plugin),
                    seq,
                    enabled: true,
                },
            );
            state.rebuild();
        }

        run_isolated(&self.pool_id, &plugin_id, "start", || plugin.start());
        log_plugin_operation("register", &self.pool_id, &plugin_id, "registered", None);
        true
    }

    /// Remove a plugin, returning it if it was registered
    pub fn unregister(&self, plugin_id: &str) -> Option<Arc<dyn Plugin>> {
        let removed = {
            let mut state = self.state.write();
            let entry = state.entries.remove(plugin_id)?;
            state.rebuild();
            entry.plugin
        };

        run_isolated(&self.pool_id, plugin_id, "stop", || removed.stop());
        log_plugin_operation("unregister", &self.pool_id, plugin_id, "unregistered", None);
        Some(removed)
    }

    /// Resume dispatching to a plugin; false if the id is unknown
    pub fn enable(&self, plugin_id: &str) -> bool {
        self.set_enabled(plugin_id, true)
    }

    /// Stop dispatching to a plugin without unregistering it; false if the id is unknown
    pub fn disable(&self, plugin_id: &str) -> bool {
        self.set_enabled(plugin_id, false)
    }

    fn set_enabled(&self, plugin_id: &str, enabled: bool) -> bool {
        let mut state = self.state.write();
        let Some(entry) = state.entries.get_mut(plugin_id) else {
            return false;
        };
        if entry.enabled != enabled {
            entry.enabled = enabled;
            state.rebuild();
            drop(state);
            let status = if enabled { "enabled" } else { "disabled" };
            log_plugin_operation(status, &self.pool_id, plugin_id, status, None);
        }
        true
    }

    pub fn is_registered(&self, plugin_id: &str) -> bool {
        self.state.read().entries.contains_key(plugin_id)
    }

    /// Whether the plugin is registered and enabled
    pub fn is_enabled(&self, plugin_id: &str) -> bool {
        self.state
            .read()
            .entries
            .get(plugin_id)
            .is_some_and(|entry| entry.enabled)
    }

    pub fn get(&self, plugin_id: &str) -> Option<Arc<dyn Plugin>> {
        self.state
            .read()
            .entries
            .get(plugin_id)
            .map(|entry| Arc::clone(&entry.plugin))
    }

    /// Every plugin in dispatch order, enabled or not
    pub fn get_all(&self) -> Vec<Arc<dyn Plugin>> {
        self.state.read().ordered.as_ref().clone()
    }

    /// Plugins implementing `capability` in dispatch order, enabled or not
    pub fn get_all_of_capability(&self, capability: Capability) -> Vec<Arc<dyn Plugin>> {
        let ordered = Arc::clone(&self.state.read().ordered);
        ordered
            .iter()
            .filter(|plugin| capability.supported_by(plugin.as_ref()))
            .cloned()
            .collect()
    }

    /// Point-in-time snapshot of the enabled plugins implementing `capability`
    pub fn active_plugins(&self, capability: Capability) -> PluginSnapshot {
        Arc::clone(&self.state.read().active[capability.index()])
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every plugin, stopping each in dispatch order
    pub fn clear(&self) {
        let removed = {
            let mut state = self.state.write();
            let removed = Arc::clone(&state.ordered);
            state.entries.clear();
            state.rebuild();
            removed
        };

        for plugin in removed.iter() {
            run_isolated(&self.pool_id, plugin.id(), "stop", || plugin.stop());
        }
        log_plugin_operation(
            "clear",
            &self.pool_id,
            "*",
            "cleared",
            Some(&format!("{} plugins removed", removed.len())),
        );
    }

    pub fn stats(&self) -> RegistryStats {
        let state = self.state.read();
        let enabled = state.entries.values().filter(|entry| entry.enabled).count();
        let active_by_capability = Capability::ALL
            .into_iter()
            .map(|capability| (capability, state.active[capability.index()].len()))
            .collect();
        RegistryStats {
            pool_id: self.pool_id.clone(),
            total: state.entries.len(),
            enabled,
            disabled: state.entries.len() - enabled,
            active_by_capability,
        }
    }

    /// Runtime info of every plugin in dispatch order
    pub fn plugin_runtime_infos(&self) -> Vec<PluginRuntimeInfo> {
        self.get_all()
            .iter()
            .map(|plugin| plugin.runtime_info())
            .collect()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<String> = self.get_all().iter().map(|p| p.id().to_string()).collect();
        f.debug_struct("PluginRegistry")
            .field("pool_id", &self.pool_id)
            .field("plugins", &ids)
            .finish()
    }
}
