//! # Dynamic Thread Pool Executor
//!
//! A ready-made hooked pool: a [`ThreadPoolExecutor`] wrapped in a
//! [`PoolHookRuntime`] with the standard plugin bundle installed, built from a
//! [`PoolConfig`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::config::PoolConfig;
use crate::constants::plugin_ids;
use crate::error::Result;
use crate::notify::{LoggingNotifier, Notifier};
use crate::plugin::Plugin;
use crate::plugins::{StandardPluginSet, StandardPlugins, TaskDecorator};
use crate::task::{Task, TaskHandle};

use super::runtime::PoolHookRuntime;
use super::service::PoolState;
use super::thread_pool::ThreadPoolExecutor;

pub struct DynamicThreadPoolExecutor {
    runtime: PoolHookRuntime,
    standard: Arc<StandardPlugins>,
    wait_for_tasks_to_complete_on_shutdown: AtomicBool,
    active: AtomicBool,
}

impl DynamicThreadPoolExecutor {
    /// Build a pool whose alarms go to the tracing log
    pub fn new(pool_id: impl Into<String>, config: &PoolConfig) -> Result<Self> {
        Self::with_notifier(pool_id, config, Arc::new(LoggingNotifier))
    }

    pub fn with_notifier(
        pool_id: impl Into<String>,
        config: &PoolConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        config.validate()?;
        let pool_id = pool_id.into();
        let pool = ThreadPoolExecutor::new(&config.thread_pool)?;
        let runtime = PoolHookRuntime::new(pool_id.clone(), Arc::new(pool));

        let standard = Arc::new(StandardPlugins::with_notifier(
            config.execute_timeout_ms,
            config.await_termination_ms,
            notifier,
        ));
        runtime.apply_registrar(standard.as_ref());

        info!(
            pool_id = %pool_id,
            core_pool_size = config.thread_pool.core_pool_size,
            maximum_pool_size = config.thread_pool.maximum_pool_size,
            execute_timeout_ms = config.execute_timeout_ms,
            await_termination_ms = config.await_termination_ms,
            "✅ DYNAMIC_POOL: Created with standard plugins"
        );

        Ok(Self {
            runtime,
            standard,
            wait_for_tasks_to_complete_on_shutdown: AtomicBool::new(
                config.wait_for_tasks_to_complete_on_shutdown,
            ),
            active: AtomicBool::new(true),
        })
    }

    pub fn pool_id(&self) -> &str {
        self.runtime.pool_id()
    }

    pub fn runtime(&self) -> &PoolHookRuntime {
        &self.runtime
    }

    /// Registrar that installed this pool's standard plugins
    pub fn standard_registrar(&self) -> Arc<StandardPlugins> {
        Arc::clone(&self.standard)
    }

    /// Standard plugins currently installed in this pool
    pub fn standard_plugins(&self) -> Option<Arc<StandardPluginSet>> {
        self.standard.plugins_for(self.runtime.pool_id())
    }

    pub fn execute(&self, task: Task) -> Result<()> {
        self.runtime.execute(task)
    }

    pub fn submit<T, F>(&self, f: F) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        self.runtime.submit(f)
    }

    pub fn state(&self) -> PoolState {
        self.runtime.state()
    }

    /// Shut the pool down and remove its plugins; later calls do nothing
    ///
    /// Waits for queued tasks when configured to, otherwise discards them. Tasks
    /// still running past the shutdown bound keep the plugins registered until the
    /// pool terminates, so `after_terminated` still reaches them.
    pub fn destroy(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if self.wait_for_tasks_to_complete_on_shutdown.load(Ordering::SeqCst) {
            self.runtime.shutdown();
        } else {
            let discarded = self.runtime.shutdown_now();
            info!(
                pool_id = %self.pool_id(),
                discarded = discarded.len(),
                "Discarded queued tasks on destroy"
            );
        }
        self.runtime.clear_when_terminated();
        info!(pool_id = %self.pool_id(), "🗑️ DYNAMIC_POOL: Destroyed");
    }

    /// False once `destroy` has been called
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Update the shutdown behaviour
    pub fn set_support_param(&self, await_termination_ms: u64, wait_for_tasks_to_complete_on_shutdown: bool) {
        self.set_await_termination(await_termination_ms);
        self.wait_for_tasks_to_complete_on_shutdown
            .store(wait_for_tasks_to_complete_on_shutdown, Ordering::SeqCst);
    }

    /// Rejections counted by the installed reject counter; 0 once plugins are cleared
    pub fn reject_count_num(&self) -> u64 {
        self.installed()
            .map(|set| set.reject_count_num())
            .unwrap_or(0)
    }

    pub fn execute_timeout(&self) -> Option<u64> {
        self.installed().map(|set| set.execute_timeout())
    }

    pub fn set_execute_timeout(&self, execute_timeout_ms: u64) {
        if let Some(set) = self.installed() {
            set.set_execute_timeout(execute_timeout_ms);
        }
    }

    pub fn await_termination(&self) -> Option<u64> {
        self.installed().map(|set| set.await_termination())
    }

    pub fn set_await_termination(&self, await_termination_ms: u64) {
        if let Some(set) = self.installed() {
            set.set_await_termination(await_termination_ms);
        }
    }

    pub fn task_decorator(&self) -> Option<Arc<dyn TaskDecorator>> {
        self.installed().and_then(|set| set.task_decorator())
    }

    pub fn set_task_decorator(&self, decorator: Arc<dyn TaskDecorator>) {
        if let Some(set) = self.installed() {
            set.set_task_decorator(decorator);
        }
    }

    /// The standard set, if it is still registered in this pool
    fn installed(&self) -> Option<Arc<StandardPluginSet>> {
        let set = self.standard_plugins()?;
        let registered = self
            .runtime
            .registry()
            .get(plugin_ids::TASK_REJECT_COUNT)?;
        let installed: Arc<dyn Plugin> = set.reject_count.clone();
        let same_instance = Arc::ptr_eq(&registered, &installed);
        same_instance.then_some(set)
    }
}

impl std::fmt::Debug for DynamicThreadPoolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicThreadPoolExecutor")
            .field("runtime", &self.runtime)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThreadPoolSettings;
    use crate::plugin::AdaptedPlugin;
    use crossbeam::channel::bounded;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    fn config() -> PoolConfig {
        PoolConfig {
            thread_pool: ThreadPoolSettings::new(1, 2, 8).with_thread_name_prefix("dynamic"),
            execute_timeout_ms: 100,
            await_termination_ms: 20,
            ..PoolConfig::default()
        }
    }

    #[test]
    fn test_standard_plugins_installed_and_tunable() {
        let pool = DynamicThreadPoolExecutor::new("dynamic", &config()).unwrap();
        assert_eq!(pool.runtime().registry().len(), 5);
        assert_eq!(pool.execute_timeout(), Some(100));

        pool.set_execute_timeout(250);
        pool.set_support_param(75, false);
        assert_eq!(pool.execute_timeout(), Some(250));
        assert_eq!(pool.await_termination(), Some(75));
        assert_eq!(pool.reject_count_num(), 0);

        let handle = pool.submit(|| Ok("done")).unwrap();
        assert_eq!(handle.join(), Ok("done"));
        pool.destroy();
    }

    #[test]
    fn test_destroy_is_idempotent_and_clears_plugins() {
        let pool = DynamicThreadPoolExecutor::new("dynamic", &config()).unwrap();
        assert!(pool.is_active());
        pool.destroy();
        pool.destroy();

        assert!(!pool.is_active());
        assert!(pool.runtime().registry().is_empty());
        assert!(pool.runtime().await_termination(Some(Duration::from_secs(5))));
        assert_eq!(pool.execute_timeout(), None);
        assert_eq!(pool.reject_count_num(), 0);
        assert!(pool.execute(Task::from_fn(|| {})).is_err());
    }

    #[test]
    fn test_destroy_keeps_plugins_until_terminated() {
        let pool = DynamicThreadPoolExecutor::new("lingering", &config()).unwrap();
        let terminated = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&terminated);
        pool.runtime().register(Arc::new(
            AdaptedPlugin::builder("observer")
                .after_terminated(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .build(),
        ));

        let (started_tx, started_rx) = bounded::<()>(1);
        pool.execute(Task::from_fn(move || {
            let _ = started_tx.send(());
            std::thread::sleep(Duration::from_millis(200));
        }))
        .unwrap();
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        pool.destroy();
        assert!(!pool.runtime().registry().is_empty());
        assert_eq!(terminated.load(Ordering::SeqCst), 0);

        assert!(pool.runtime().await_termination(Some(Duration::from_secs(5))));
        let deadline = Instant::now() + Duration::from_secs(5);
        while !pool.runtime().registry().is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(pool.runtime().registry().is_empty());
        assert_eq!(terminated.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = PoolConfig {
            thread_pool: ThreadPoolSettings::new(4, 2, 8),
            ..PoolConfig::default()
        };
        assert!(DynamicThreadPoolExecutor::new("broken", &config).is_err());
    }
}
