//! Two-phase plugin rollout.
//!
//! Pools, plugins and registrars are staged while an application is still
//! being wired together and cross-applied in one pass on [`PluginPublisher::commit`].
//! Anything staged after the commit is applied right away.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::error::Result;
use crate::executor::PoolHookRuntime;
use crate::plugin::Plugin;
use crate::registry::Registrar;

use super::GlobalCoordinator;

#[derive(Default)]
struct Staged {
    pools: Vec<PoolHookRuntime>,
    plugins: Vec<Arc<dyn Plugin>>,
    registrars: Vec<Arc<dyn Registrar>>,
}

/// Stages pools, plugins and registrars, then applies them all at once
pub struct PluginPublisher {
    coordinator: Arc<GlobalCoordinator>,
    staged: Mutex<Staged>,
    committed: AtomicBool,
}

impl PluginPublisher {
    pub fn new(coordinator: Arc<GlobalCoordinator>) -> Self {
        Self {
            coordinator,
            staged: Mutex::new(Staged::default()),
            committed: AtomicBool::new(false),
        }
    }

    pub fn coordinator(&self) -> &Arc<GlobalCoordinator> {
        &self.coordinator
    }

    pub fn is_committed(&self) -> bool {
        self.committed.load(Ordering::SeqCst)
    }

    /// Record a pool; after commit it immediately receives every staged plugin and registrar
    pub fn stage_pool(&self, runtime: PoolHookRuntime) -> bool {
        if !self.coordinator.register_pool(runtime.clone()) {
            return false;
        }
        let mut staged = self.staged.lock();
        if self.is_committed() {
            Self::apply_to_pool(&runtime, &staged.plugins, &staged.registrars);
        }
        staged.pools.push(runtime);
        true
    }

    /// Record a shared plugin; after commit it is immediately registered into every staged pool
    pub fn stage_plugin(&self, plugin: Arc<dyn Plugin>) -> bool {
        if !self.coordinator.register_plugin(Arc::clone(&plugin)) {
            return false;
        }
        let mut staged = self.staged.lock();
        if self.is_committed() {
            for runtime in &staged.pools {
                runtime.register(Arc::clone(&plugin));
            }
        }
        staged.plugins.push(plugin);
        true
    }

    /// Record a registrar; after commit it is immediately applied to every staged pool
    pub fn stage_registrar(&self, registrar: Arc<dyn Registrar>) -> Result<()> {
        self.coordinator.register_registrar(Arc::clone(&registrar))?;
        let mut staged = self.staged.lock();
        if self.is_committed() {
            for runtime in &staged.pools {
                runtime.apply_registrar(registrar.as_ref());
            }
        }
        staged.registrars.push(registrar);
        Ok(())
    }

    /// Apply every staged plugin and registrar to every staged pool; later calls do nothing
    pub fn commit(&self) {
        let staged = self.staged.lock();
        if self.committed.swap(true, Ordering::SeqCst) {
            return;
        }
        for runtime in &staged.pools {
            Self::apply_to_pool(runtime, &staged.plugins, &staged.registrars);
        }
        info!(
            pools = staged.pools.len(),
            plugins = staged.plugins.len(),
            registrars = staged.registrars.len(),
            "📣 PUBLISHER: Staged plugins committed"
        );
    }

    fn apply_to_pool(
        runtime: &PoolHookRuntime,
        plugins: &[Arc<dyn Plugin>],
        registrars: &[Arc<dyn Registrar>],
    ) {
        for plugin in plugins {
            runtime.register(Arc::clone(plugin));
        }
        for registrar in registrars {
            runtime.apply_registrar(registrar.as_ref());
        }
    }
}
