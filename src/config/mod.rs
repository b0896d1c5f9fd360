//! # Pool Hook Configuration
//!
//! Configuration snapshots consumed by the hook runtime and the reconciler.
//!
//! ## Architecture
//!
//! - **Two tiers**: a process-wide default tier (`PoolHookConfig::plugins`) and a
//!   per-pool custom tier (`PoolConfig::plugins`), merged field by field
//! - **Unset is not default**: every plugin property is optional so a custom tier
//!   only overrides what it names
//! - **Explicit validation**: pool settings are checked after loading, never
//!   silently corrected
//!
//! ## Usage
//!
//! ```rust
//! use poolhook_core::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new()
//!     .with_toml_str(
//!         r#"
//!         [plugins]
//!         includes = "*"
//!
//!         [pools.orders.thread_pool]
//!         core_pool_size = 2
//!         maximum_pool_size = 4
//!         "#,
//!     )
//!     .load()?;
//!
//! let properties = config.plugin_properties_for("orders");
//! assert!(properties.is_some());
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod reconciler;
pub mod refresher;

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{defaults, ALL_IDS, ID_SEPARATOR};
use crate::error::{PoolHookError, Result};

pub use loader::ConfigLoader;
pub use reconciler::{
    effective_ids, is_changed, merge_tiers, reconcile, resolve_effective_registrars, PluginUniverse,
    Reconciliation,
};
pub use refresher::{DefaultPropertyBinder, PluginRefresher, PropertyBinder};

/// Declarative plugin selection for one pool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginProperties {
    /// Master switch; unset means enabled
    pub enable: Option<bool>,
    /// Registrar ids to apply: empty, `*`, or a comma separated list
    pub includes: Option<String>,
    /// Registrar ids to skip, same grammar as `includes`
    pub excludes: Option<String>,
    /// Per-plugin property overlays: plugin id -> (key -> value)
    pub plugins: BTreeMap<String, BTreeMap<String, String>>,
}

impl PluginProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(mut self, enable: bool) -> Self {
        self.enable = Some(enable);
        self
    }

    pub fn including(mut self, includes: impl Into<String>) -> Self {
        self.includes = Some(includes.into());
        self
    }

    pub fn excluding(mut self, excludes: impl Into<String>) -> Self {
        self.excludes = Some(excludes.into());
        self
    }

    /// Add one overlay property for a plugin
    pub fn with_plugin_property(
        mut self,
        plugin_id: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.plugins
            .entry(plugin_id.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    pub fn effective_enable(&self) -> bool {
        self.enable.unwrap_or(true)
    }

    pub fn effective_includes(&self) -> &str {
        self.includes.as_deref().unwrap_or("")
    }

    pub fn effective_excludes(&self) -> &str {
        self.excludes.as_deref().unwrap_or("")
    }
}

/// Parsed include/exclude expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSelection {
    /// `*`: every known id
    All,
    /// Named ids; empty for an empty expression
    Ids(BTreeSet<String>),
}

impl IdSelection {
    /// Parse `""`, `"*"` or `"a, b,,c"`; ids are trimmed and empty items dropped
    ///
    /// A `*` item anywhere in the list selects everything.
    pub fn parse(expression: &str) -> Self {
        let ids: BTreeSet<String> = expression
            .split(ID_SEPARATOR)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        if ids.contains(ALL_IDS) {
            IdSelection::All
        } else {
            IdSelection::Ids(ids)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, IdSelection::Ids(ids) if ids.is_empty())
    }

    pub fn contains(&self, id: &str) -> bool {
        match self {
            IdSelection::All => true,
            IdSelection::Ids(ids) => ids.contains(id),
        }
    }
}

/// Sizing and threading of a [`ThreadPoolExecutor`](crate::executor::ThreadPoolExecutor)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadPoolSettings {
    pub core_pool_size: usize,
    pub maximum_pool_size: usize,
    /// 0 makes the queue a synchronous handoff
    pub queue_capacity: usize,
    pub keep_alive_ms: u64,
    pub thread_name_prefix: String,
}

impl Default for ThreadPoolSettings {
    fn default() -> Self {
        Self {
            core_pool_size: defaults::CORE_POOL_SIZE,
            maximum_pool_size: defaults::MAXIMUM_POOL_SIZE,
            queue_capacity: defaults::QUEUE_CAPACITY,
            keep_alive_ms: defaults::KEEP_ALIVE.as_millis() as u64,
            thread_name_prefix: defaults::THREAD_NAME_PREFIX.to_string(),
        }
    }
}

impl ThreadPoolSettings {
    pub fn new(core_pool_size: usize, maximum_pool_size: usize, queue_capacity: usize) -> Self {
        Self {
            core_pool_size,
            maximum_pool_size,
            queue_capacity,
            ..Self::default()
        }
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.maximum_pool_size == 0 {
            return Err(PoolHookError::configuration(
                "thread_pool.maximum_pool_size",
                "maximum pool size must be greater than 0",
            ));
        }
        if self.core_pool_size > self.maximum_pool_size {
            return Err(PoolHookError::configuration(
                "thread_pool.core_pool_size",
                format!(
                    "core pool size {} exceeds maximum pool size {}",
                    self.core_pool_size, self.maximum_pool_size
                ),
            ));
        }
        if self.thread_name_prefix.trim().is_empty() {
            return Err(PoolHookError::configuration(
                "thread_pool.thread_name_prefix",
                "thread name prefix must not be empty",
            ));
        }
        Ok(())
    }
}

/// Configuration of one hooked pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub thread_pool: ThreadPoolSettings,
    /// Execution time above which the timeout alarm fires; 0 disables it
    pub execute_timeout_ms: u64,
    /// Bound for waiting on termination after shutdown; 0 skips waiting
    pub await_termination_ms: u64,
    /// Graceful `shutdown` when true, `shutdown_now` otherwise
    pub wait_for_tasks_to_complete_on_shutdown: bool,
    /// Custom plugin tier for this pool
    pub plugins: Option<PluginProperties>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            thread_pool: ThreadPoolSettings::default(),
            execute_timeout_ms: defaults::EXECUTE_TIMEOUT_MS,
            await_termination_ms: defaults::AWAIT_TERMINATION_MS,
            wait_for_tasks_to_complete_on_shutdown: true,
            plugins: None,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        self.thread_pool.validate()
    }
}

/// Root configuration: default plugin tier plus per-pool configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolHookConfig {
    pub plugins: Option<PluginProperties>,
    pub pools: BTreeMap<String, PoolConfig>,
}

impl PoolHookConfig {
    pub fn pool(&self, pool_id: &str) -> Option<&PoolConfig> {
        self.pools.get(pool_id)
    }

    /// Effective plugin properties for a pool; `None` when neither tier is configured
    pub fn plugin_properties_for(&self, pool_id: &str) -> Option<PluginProperties> {
        let custom = self.pools.get(pool_id).and_then(|pool| pool.plugins.as_ref());
        merge_tiers(self.plugins.as_ref(), custom)
    }

    pub fn validate(&self) -> Result<()> {
        for (pool_id, pool) in &self.pools {
            pool.validate().map_err(|err| match err {
                PoolHookError::Configuration { component, message } => {
                    PoolHookError::configuration(format!("pools.{pool_id}.{component}"), message)
                }
                other => other,
            })?;
        }
        Ok(())
    }
}
