//! # Global Coordinator
//!
//! Process-wide directory of hooked pools, shared plugins and registrars,
//! with broadcast operations for centralized plugin rollout.
//!
//! ## Overview
//!
//! The coordinator is constructed explicitly and handed to whatever wires
//! pools together; there is no implicit global instance. It keeps three
//! independent concurrent maps:
//!
//! - **pools**: pool id -> [`PoolHookRuntime`]
//! - **plugins**: plugin id -> shared plugin instance
//! - **registrars**: registrar id -> [`Registrar`]
//!
//! Duplicate pool or plugin registration is a no-op returning `false`.
//! Duplicate registrar ids are a configuration bug and fail with
//! [`PoolHookError::DuplicateRegistrar`].
//!
//! Broadcasts iterate a snapshot of the pool directory, so pools registered
//! or removed concurrently never disturb an in-progress broadcast. Iteration
//! order across pools is unspecified.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use poolhook_core::config::ThreadPoolSettings;
//! use poolhook_core::coordinator::{GlobalCoordinator, PoolSelector};
//! use poolhook_core::executor::{PoolHookRuntime, ThreadPoolExecutor};
//! use poolhook_core::plugins::TaskRejectCountPlugin;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = GlobalCoordinator::new();
//! let pool = ThreadPoolExecutor::new(&ThreadPoolSettings::new(1, 1, 16))?;
//! coordinator.register_pool(PoolHookRuntime::new("orders", Arc::new(pool)));
//!
//! coordinator.register_plugin(Arc::new(TaskRejectCountPlugin::new()));
//! assert!(coordinator.apply_plugin_to_pool("task-reject-count", &PoolSelector::All));
//! assert_eq!(coordinator.get_plugins_by_id("task-reject-count").len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod publisher;

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::config::PluginUniverse;
use crate::error::{PoolHookError, Result};
use crate::executor::PoolHookRuntime;
use crate::plugin::{Capability, Plugin};
use crate::registry::{Registrar, SingletonPluginRegistrar};

pub use publisher::PluginPublisher;

/// Target of a broadcast operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolSelector {
    /// Every registered pool
    All,
    /// The listed pools; unknown ids are skipped
    Only(Vec<String>),
}

impl PoolSelector {
    pub fn pool(pool_id: impl Into<String>) -> Self {
        PoolSelector::Only(vec![pool_id.into()])
    }

    pub fn pools<I, S>(pool_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PoolSelector::Only(pool_ids.into_iter().map(Into::into).collect())
    }
}

/// Directory of pools, shared plugins and registrars
#[derive(Default)]
pub struct GlobalCoordinator {
    pools: DashMap<String, PoolHookRuntime>,
    plugins: DashMap<String, Arc<dyn Plugin>>,
    registrars: DashMap<String, Arc<dyn Registrar>>,
}

impl GlobalCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- pools ----

    /// Add a pool; false if its id is already registered
    pub fn register_pool(&self, runtime: PoolHookRuntime) -> bool {
        match self.pools.entry(runtime.pool_id().to_string()) {
            Entry::Occupied(_) => {
                debug!(pool_id = %runtime.pool_id(), "Pool already registered");
                false
            }
            Entry::Vacant(vacant) => {
                info!(pool_id = %runtime.pool_id(), "📝 COORDINATOR: Pool registered");
                vacant.insert(runtime);
                true
            }
        }
    }

    pub fn unregister_pool(&self, pool_id: &str) -> Option<PoolHookRuntime> {
        let removed = self.pools.remove(pool_id).map(|(_, runtime)| runtime);
        if removed.is_some() {
            info!(pool_id = %pool_id, "COORDINATOR: Pool unregistered");
        }
        removed
    }

    pub fn get_pool(&self, pool_id: &str) -> Option<PoolHookRuntime> {
        self.pools.get(pool_id).map(|entry| entry.value().clone())
    }

    /// Snapshot of every registered pool
    pub fn get_all_pools(&self) -> Vec<PoolHookRuntime> {
        self.pools.iter().map(|entry| entry.value().clone()).collect()
    }

    fn select_pools(&self, selector: &PoolSelector) -> Vec<PoolHookRuntime> {
        match selector {
            PoolSelector::All => self.get_all_pools(),
            PoolSelector::Only(pool_ids) => pool_ids
                .iter()
                .filter_map(|pool_id| self.get_pool(pool_id))
                .collect(),
        }
    }

    // ---- shared plugins ----

    /// Add a shared plugin; false if its id is already registered
    pub fn register_plugin(&self, plugin: Arc<dyn Plugin>) -> bool {
        match self.plugins.entry(plugin.id().to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                info!(plugin_id = %plugin.id(), "📝 COORDINATOR: Plugin registered");
                vacant.insert(plugin);
                true
            }
        }
    }

    /// Remove a shared plugin from the directory; pools that carry it keep it
    pub fn unregister_plugin(&self, plugin_id: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.remove(plugin_id).map(|(_, plugin)| plugin)
    }

    pub fn get_plugin(&self, plugin_id: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.get(plugin_id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn get_all_plugins(&self) -> Vec<Arc<dyn Plugin>> {
        self.plugins
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    // ---- registrars ----

    /// Add a registrar; fails if its id is already taken
    pub fn register_registrar(&self, registrar: Arc<dyn Registrar>) -> Result<()> {
        match self.registrars.entry(registrar.id().to_string()) {
            Entry::Occupied(_) => Err(PoolHookError::duplicate_registrar(registrar.id())),
            Entry::Vacant(vacant) => {
                info!(registrar_id = %registrar.id(), "📝 COORDINATOR: Registrar registered");
                vacant.insert(registrar);
                Ok(())
            }
        }
    }

    /// Wrap one shared plugin in a registrar and register it
    pub fn register_singleton_registrar(&self, plugin: Arc<dyn Plugin>) -> Result<Arc<dyn Registrar>> {
        let registrar: Arc<dyn Registrar> = Arc::new(SingletonPluginRegistrar::new(plugin));
        self.register_registrar(Arc::clone(&registrar))?;
        Ok(registrar)
    }

    pub fn unregister_registrar(&self, registrar_id: &str) -> Option<Arc<dyn Registrar>> {
        self.registrars
            .remove(registrar_id)
            .map(|(_, registrar)| registrar)
    }

    pub fn get_registrar(&self, registrar_id: &str) -> Option<Arc<dyn Registrar>> {
        self.registrars
            .get(registrar_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn get_all_registrars(&self) -> Vec<Arc<dyn Registrar>> {
        self.registrars
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    // ---- broadcasts ----

    /// Register a shared plugin into the selected pools
    ///
    /// False if the plugin id is unknown or a named selection matched no pool.
    pub fn apply_plugin_to_pool(&self, plugin_id: &str, selector: &PoolSelector) -> bool {
        let Some(plugin) = self.get_plugin(plugin_id) else {
            debug!(plugin_id = %plugin_id, "Plugin not found, nothing applied");
            return false;
        };
        let pools = self.select_pools(selector);
        for runtime in &pools {
            runtime.register(Arc::clone(&plugin));
        }
        matches!(selector, PoolSelector::All) || !pools.is_empty()
    }

    /// Apply a registrar to the selected pools
    ///
    /// False if the registrar id is unknown or a named selection matched no pool.
    pub fn apply_registrar_to_pool(&self, registrar_id: &str, selector: &PoolSelector) -> bool {
        let Some(registrar) = self.get_registrar(registrar_id) else {
            debug!(registrar_id = %registrar_id, "Registrar not found, nothing applied");
            return false;
        };
        let pools = self.select_pools(selector);
        for runtime in &pools {
            runtime.apply_registrar(registrar.as_ref());
        }
        matches!(selector, PoolSelector::All) || !pools.is_empty()
    }

    /// Enable a plugin in the selected pools; true if any of them carries it
    pub fn enable_plugin(&self, plugin_id: &str, selector: &PoolSelector) -> bool {
        self.select_pools(selector)
            .iter()
            .fold(false, |found, runtime| runtime.registry().enable(plugin_id) || found)
    }

    /// Disable a plugin in the selected pools; true if any of them carries it
    pub fn disable_plugin(&self, plugin_id: &str, selector: &PoolSelector) -> bool {
        self.select_pools(selector)
            .iter()
            .fold(false, |found, runtime| runtime.registry().disable(plugin_id) || found)
    }

    /// Register every shared plugin and apply every registrar to one pool
    pub fn apply_all_to_pool(&self, pool_id: &str) -> bool {
        let Some(runtime) = self.get_pool(pool_id) else {
            return false;
        };
        self.apply_all_to(&runtime);
        true
    }

    /// Register every shared plugin and apply every registrar to every pool
    pub fn apply_all_to_all_pools(&self) {
        for runtime in self.get_all_pools() {
            self.apply_all_to(&runtime);
        }
    }

    fn apply_all_to(&self, runtime: &PoolHookRuntime) {
        for plugin in self.get_all_plugins() {
            runtime.register(plugin);
        }
        for registrar in self.get_all_registrars() {
            runtime.apply_registrar(registrar.as_ref());
        }
    }

    // ---- aggregation ----

    /// Every plugin of every pool; a plugin shared by three pools appears three times
    pub fn get_all_plugins_across_pools(&self) -> Vec<Arc<dyn Plugin>> {
        self.get_all_pools()
            .iter()
            .flat_map(|runtime| runtime.registry().get_all())
            .collect()
    }

    pub fn get_plugins_of_capability(&self, capability: Capability) -> Vec<Arc<dyn Plugin>> {
        self.get_all_pools()
            .iter()
            .flat_map(|runtime| runtime.registry().get_all_of_capability(capability))
            .collect()
    }

    pub fn get_plugins_by_id(&self, plugin_id: &str) -> Vec<Arc<dyn Plugin>> {
        self.get_all_pools()
            .iter()
            .filter_map(|runtime| runtime.registry().get(plugin_id))
            .collect()
    }
}

impl PluginUniverse for GlobalCoordinator {
    fn known_ids(&self) -> BTreeSet<String> {
        self.registrars
            .iter()
            .map(|entry| entry.key().clone())
            .chain(self.plugins.iter().map(|entry| entry.key().clone()))
            .collect()
    }

    /// Registrars take precedence; a bare plugin resolves to a singleton registrar
    fn resolve(&self, id: &str) -> Option<Arc<dyn Registrar>> {
        self.get_registrar(id).or_else(|| {
            self.get_plugin(id)
                .map(|plugin| Arc::new(SingletonPluginRegistrar::new(plugin)) as Arc<dyn Registrar>)
        })
    }
}

impl std::fmt::Debug for GlobalCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalCoordinator")
            .field("pools", &self.pools.len())
            .field("plugins", &self.plugins.len())
            .field("registrars", &self.registrars.len())
            .finish()
    }
}
