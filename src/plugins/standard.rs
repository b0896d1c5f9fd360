//! The standard plugin bundle installed into every dynamic pool.

use std::sync::Arc;

use dashmap::DashMap;

use crate::constants::plugin_ids;
use crate::notify::{LoggingNotifier, Notifier};
use crate::registry::{PluginRegistry, Registrar};

use super::{
    BoundedShutdownPlugin, TaskDecorator, TaskDecoratorPlugin, TaskRejectAlarmPlugin,
    TaskRejectCountPlugin, TaskTimeoutAlarmPlugin,
};

/// The standard plugin instances of one pool
pub struct StandardPluginSet {
    pub task_decorator: Arc<TaskDecoratorPlugin>,
    pub timeout_alarm: Arc<TaskTimeoutAlarmPlugin>,
    pub reject_count: Arc<TaskRejectCountPlugin>,
    pub reject_alarm: Arc<TaskRejectAlarmPlugin>,
    pub bounded_shutdown: Arc<BoundedShutdownPlugin>,
}

impl StandardPluginSet {
    fn new(execute_timeout_ms: u64, await_termination_ms: u64, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            task_decorator: Arc::new(TaskDecoratorPlugin::new()),
            timeout_alarm: Arc::new(TaskTimeoutAlarmPlugin::new(
                execute_timeout_ms,
                Arc::clone(&notifier),
            )),
            reject_count: Arc::new(TaskRejectCountPlugin::new()),
            reject_alarm: Arc::new(TaskRejectAlarmPlugin::new(notifier)),
            bounded_shutdown: Arc::new(BoundedShutdownPlugin::new(await_termination_ms)),
        }
    }

    fn register_into(&self, registry: &PluginRegistry) {
        registry.register(self.task_decorator.clone());
        registry.register(self.timeout_alarm.clone());
        registry.register(self.reject_count.clone());
        registry.register(self.reject_alarm.clone());
        registry.register(self.bounded_shutdown.clone());
    }

    pub fn reject_count_num(&self) -> u64 {
        self.reject_count.reject_count_num()
    }

    pub fn execute_timeout(&self) -> u64 {
        self.timeout_alarm.execute_timeout()
    }

    pub fn set_execute_timeout(&self, execute_timeout_ms: u64) {
        self.timeout_alarm.set_execute_timeout(execute_timeout_ms);
    }

    pub fn await_termination(&self) -> u64 {
        self.bounded_shutdown.await_termination()
    }

    pub fn set_await_termination(&self, await_termination_ms: u64) {
        self.bounded_shutdown
            .set_await_termination(await_termination_ms);
    }

    /// The first configured decorator
    pub fn task_decorator(&self) -> Option<Arc<dyn TaskDecorator>> {
        self.task_decorator.decorators().into_iter().next()
    }

    /// Replace every decorator with `decorator`
    pub fn set_task_decorator(&self, decorator: Arc<dyn TaskDecorator>) {
        self.task_decorator.clear_decorators();
        self.task_decorator.add_decorator(decorator);
    }
}

/// Registrar creating a fresh [`StandardPluginSet`] for every pool it is applied to
///
/// Re-applying to a pool replaces that pool's set, resetting its counters.
pub struct StandardPlugins {
    execute_timeout_ms: u64,
    await_termination_ms: u64,
    notifier: Arc<dyn Notifier>,
    sets: DashMap<String, Arc<StandardPluginSet>>,
}

impl StandardPlugins {
    pub fn new(execute_timeout_ms: u64, await_termination_ms: u64) -> Self {
        Self::with_notifier(execute_timeout_ms, await_termination_ms, Arc::new(LoggingNotifier))
    }

    pub fn with_notifier(
        execute_timeout_ms: u64,
        await_termination_ms: u64,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            execute_timeout_ms,
            await_termination_ms,
            notifier,
            sets: DashMap::new(),
        }
    }

    /// Plugins most recently installed into `pool_id`
    pub fn plugins_for(&self, pool_id: &str) -> Option<Arc<StandardPluginSet>> {
        self.sets.get(pool_id).map(|set| Arc::clone(set.value()))
    }
}

impl Registrar for StandardPlugins {
    fn id(&self) -> &str {
        plugin_ids::STANDARD_PLUGINS_REGISTRAR
    }

    fn apply(&self, registry: &PluginRegistry) {
        let set = Arc::new(StandardPluginSet::new(
            self.execute_timeout_ms,
            self.await_termination_ms,
            Arc::clone(&self.notifier),
        ));
        set.register_into(registry);
        self.sets.insert(registry.pool_id().to_string(), set);
    }
}
