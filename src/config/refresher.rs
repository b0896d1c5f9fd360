//! # Plugin Refresher
//!
//! Applies a freshly loaded configuration snapshot to a live pool.
//!
//! A refresh merges the default and custom tiers, reconciles them against what
//! the pool was last configured with, and clears and reapplies the pool's
//! registrars only when the selection changed. Property overlays are bound to
//! the registered plugins on every refresh, changed or not.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{PoolHookError, Result};
use crate::executor::PoolHookRuntime;
use crate::plugin::Plugin;

use super::reconciler::{merge_tiers, reconcile, resolve_effective_registrars, PluginUniverse};
use super::PluginProperties;

/// Pushes overlay properties into a plugin
pub trait PropertyBinder: Send + Sync {
    fn bind(&self, plugin: &dyn Plugin, properties: &BTreeMap<String, String>) -> Result<()>;
}

/// Binds through [`Configurable`](crate::plugin::Configurable); plugins without it accept no properties
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPropertyBinder;

impl PropertyBinder for DefaultPropertyBinder {
    fn bind(&self, plugin: &dyn Plugin, properties: &BTreeMap<String, String>) -> Result<()> {
        if properties.is_empty() {
            return Ok(());
        }
        let Some(configurable) = plugin.as_configurable() else {
            return Err(PoolHookError::configuration(
                plugin.id(),
                "plugin does not accept properties",
            ));
        };
        for (key, value) in properties {
            configurable.set_property(key, value)?;
        }
        Ok(())
    }
}

pub struct PluginRefresher {
    universe: Arc<dyn PluginUniverse>,
    binder: Arc<dyn PropertyBinder>,
}

impl PluginRefresher {
    pub fn new(universe: Arc<dyn PluginUniverse>) -> Self {
        Self::with_binder(universe, Arc::new(DefaultPropertyBinder))
    }

    pub fn with_binder(universe: Arc<dyn PluginUniverse>, binder: Arc<dyn PropertyBinder>) -> Self {
        Self { universe, binder }
    }

    /// Refresh one pool and return the properties to remember for the next refresh
    ///
    /// Returns `None` only when the pool has never been configured and still
    /// has no configuration in either tier.
    pub fn refresh(
        &self,
        runtime: &PoolHookRuntime,
        previous: Option<&PluginProperties>,
        default_tier: Option<&PluginProperties>,
        custom_tier: Option<&PluginProperties>,
    ) -> Option<PluginProperties> {
        let current = merge_tiers(default_tier, custom_tier);
        let reconciliation = reconcile(previous, current.as_ref());

        let Some(properties) = reconciliation.properties else {
            debug!(pool_id = %runtime.pool_id(), "No plugin configuration for pool");
            return None;
        };

        if reconciliation.changed {
            let registrars = resolve_effective_registrars(&properties, self.universe.as_ref());
            runtime.registry().clear();
            for registrar in &registrars {
                runtime.apply_registrar(registrar.as_ref());
            }
            info!(
                pool_id = %runtime.pool_id(),
                registrars = registrars.len(),
                plugins = runtime.registry().len(),
                "🔄 REFRESHER: Plugin selection changed, registry reapplied"
            );
        }

        // Overlays from a lost configuration stay applied as they were
        if current.is_some() {
            self.bind_overlays(runtime, &properties);
        }

        Some(properties)
    }

    fn bind_overlays(&self, runtime: &PoolHookRuntime, properties: &PluginProperties) {
        for (plugin_id, overlay) in &properties.plugins {
            let Some(plugin) = runtime.registry().get(plugin_id) else {
                debug!(
                    pool_id = %runtime.pool_id(),
                    plugin_id = %plugin_id,
                    "Skipping overlay for plugin not registered in pool"
                );
                continue;
            };
            if let Err(err) = self.binder.bind(plugin.as_ref(), overlay) {
                warn!(
                    pool_id = %runtime.pool_id(),
                    plugin_id = %plugin_id,
                    error = %err,
                    "⚠️ REFRESHER: Failed to bind plugin properties"
                );
            }
        }
    }
}

impl std::fmt::Debug for PluginRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRefresher").finish_non_exhaustive()
    }
}
