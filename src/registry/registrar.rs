//! Registrars: named, reusable bundles that populate a pool's registry.

use std::fmt;
use std::sync::Arc;

use crate::plugin::Plugin;

use super::PluginRegistry;

/// Installs one or more plugins into a registry
pub trait Registrar: Send + Sync {
    fn id(&self) -> &str;

    /// Install this registrar's plugins into `registry`
    fn apply(&self, registry: &PluginRegistry);

    /// The single shared plugin this registrar wraps, if it is a singleton adapter
    fn singleton_plugin(&self) -> Option<Arc<dyn Plugin>> {
        None
    }
}

/// Registrar wrapping exactly one shared plugin; its id is the plugin's id
#[derive(Clone)]
pub struct SingletonPluginRegistrar {
    plugin: Arc<dyn Plugin>,
}

impl SingletonPluginRegistrar {
    pub fn new(plugin: Arc<dyn Plugin>) -> Self {
        Self { plugin }
    }

    pub fn plugin(&self) -> &Arc<dyn Plugin> {
        &self.plugin
    }
}

impl Registrar for SingletonPluginRegistrar {
    fn id(&self) -> &str {
        self.plugin.id()
    }

    fn apply(&self, registry: &PluginRegistry) {
        registry.register(Arc::clone(&self.plugin));
    }

    fn singleton_plugin(&self) -> Option<Arc<dyn Plugin>> {
        Some(Arc::clone(&self.plugin))
    }
}

impl fmt::Debug for SingletonPluginRegistrar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingletonPluginRegistrar")
            .field("plugin_id", &self.plugin.id())
            .finish()
    }
}

type ApplyFn = Box<dyn Fn(&PluginRegistry) + Send + Sync>;

/// Registrar backed by a closure, typically creating per-pool plugin instances
pub struct FnRegistrar {
    id: String,
    apply: ApplyFn,
}

impl FnRegistrar {
    pub fn new<F>(id: impl Into<String>, apply: F) -> Self
    where
        F: Fn(&PluginRegistry) + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            apply: Box::new(apply),
        }
    }
}

impl Registrar for FnRegistrar {
    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&self, registry: &PluginRegistry) {
        (self.apply)(registry);
    }
}

impl fmt::Debug for FnRegistrar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRegistrar").field("id", &self.id).finish()
    }
}
