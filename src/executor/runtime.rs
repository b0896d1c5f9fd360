//! # Pool Hook Runtime
//!
//! Wraps an [`ExecutorService`] and fans its lifecycle events out to the
//! plugins registered for the pool.
//!
//! ## Dispatch
//!
//! | Event | Thread | Capability |
//! |-------|--------|------------|
//! | submit | caller | `TaskAware` chain, then hand-off to the pool |
//! | rejection | caller | `RejectedAware` |
//! | run | worker | `ExecuteAware` before and after the body |
//! | shutdown | caller | `ShutdownAware::before_shutdown` / `after_shutdown` |
//! | termination | observer of termination | `ShutdownAware::after_terminated` |
//!
//! Every hook runs in ascending priority order, "after" hooks included. A
//! panicking hook is logged with its plugin id and pool id and never changes
//! the outcome seen by the caller: only rejections and task failures are
//! propagated.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{PoolHookError, Result, TaskError};
use crate::plugin::{run_isolated, Capability, Plugin, Rejection};
use crate::registry::{PluginRegistry, Registrar};
use crate::task::{Task, TaskBody, TaskHandle, TaskInfo};

use super::service::{ExecutorService, PoolContext, PoolState, RejectedTask};

/// Progress of the shutdown sequence; only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ShutdownPhase {
    Running,
    ShuttingDown,
    AfterShutdownDone,
    Terminated,
}

struct RuntimeShared {
    pool_id: String,
    executor: Arc<dyn ExecutorService>,
    registry: PluginRegistry,
    phase: Mutex<ShutdownPhase>,
}

impl RuntimeShared {
    fn context(&self) -> PoolContext<'_> {
        PoolContext::new(&self.pool_id, self.executor.as_ref())
    }

    fn dispatch<F>(&self, capability: Capability, hook: &str, mut call: F)
    where
        F: FnMut(&dyn Plugin),
    {
        let plugins = self.registry.active_plugins(capability);
        for plugin in plugins.iter() {
            run_isolated(&self.pool_id, plugin.id(), hook, || call(plugin.as_ref()));
        }
    }

    /// Body wrapper installed on every submitted task
    fn run_with_hooks(shared: Weak<RuntimeShared>, info: TaskInfo, body: TaskBody) -> anyhow::Result<()> {
        let Some(shared) = shared.upgrade() else {
            return body();
        };
        let plugins = shared.registry.active_plugins(Capability::ExecuteAware);
        if plugins.is_empty() {
            return body();
        }

        let ctx = shared.context();
        let worker = thread::current();
        for plugin in plugins.iter() {
            if let Some(aware) = plugin.as_execute_aware() {
                run_isolated(&shared.pool_id, plugin.id(), "before_execute", || {
                    aware.before_execute(&ctx, &worker, &info)
                });
            }
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(body));
        let error = match &outcome {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(TaskError::failed(err)),
            Err(payload) => Some(TaskError::panicked(payload.as_ref())),
        };

        for plugin in plugins.iter() {
            if let Some(aware) = plugin.as_execute_aware() {
                run_isolated(&shared.pool_id, plugin.id(), "after_execute", || {
                    aware.after_execute(&ctx, &info, error.as_ref())
                });
            }
        }

        match outcome {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Fire `after_terminated` once, only after `after_shutdown` completed
    fn fire_after_terminated(&self) {
        {
            let mut phase = self.phase.lock();
            if *phase != ShutdownPhase::AfterShutdownDone || !self.executor.is_terminated() {
                return;
            }
            *phase = ShutdownPhase::Terminated;
        }

        info!(pool_id = %self.pool_id, "🏁 POOL_HOOK: Pool terminated");
        let ctx = self.context();
        self.dispatch(Capability::ShutdownAware, "after_terminated", |plugin| {
            if let Some(aware) = plugin.as_shutdown_aware() {
                aware.after_terminated(&ctx);
            }
        });
    }
}

/// A worker pool with plugin hooks
///
/// Cloning is cheap; clones share the pool and its registry.
#[derive(Clone)]
pub struct PoolHookRuntime {
    shared: Arc<RuntimeShared>,
}

impl PoolHookRuntime {
    /// Wrap `executor` under `pool_id` with an empty plugin registry
    pub fn new(pool_id: impl Into<String>, executor: Arc<dyn ExecutorService>) -> Self {
        let pool_id = pool_id.into();
        let shared = Arc::new(RuntimeShared {
            registry: PluginRegistry::new(pool_id.clone()),
            pool_id,
            executor,
            phase: Mutex::new(ShutdownPhase::Running),
        });

        let listener_target = Arc::downgrade(&shared);
        let listening = shared
            .executor
            .add_termination_listener(Box::new(move || {
                if let Some(shared) = listener_target.upgrade() {
                    shared.fire_after_terminated();
                }
            }));
        debug!(
            pool_id = %shared.pool_id,
            termination_listener = listening,
            "Pool hook runtime created"
        );

        Self { shared }
    }

    pub fn pool_id(&self) -> &str {
        &self.shared.pool_id
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.shared.registry
    }

    pub fn executor(&self) -> &Arc<dyn ExecutorService> {
        &self.shared.executor
    }

    /// Register a plugin into this pool's registry
    pub fn register(&self, plugin: Arc<dyn Plugin>) -> bool {
        self.shared.registry.register(plugin)
    }

    /// Let a registrar populate this pool's registry
    pub fn apply_registrar(&self, registrar: &dyn Registrar) {
        registrar.apply(&self.shared.registry);
    }

    /// Submit a task for execution
    ///
    /// `TaskAware` plugins transform the task first. If the pool refuses it,
    /// `RejectedAware` plugins observe the refusal and the rejection is returned.
    pub fn execute(&self, task: Task) -> Result<()> {
        let shared = &self.shared;
        let mut task = task;

        let task_aware = shared.registry.active_plugins(Capability::TaskAware);
        for plugin in task_aware.iter() {
            if let Some(aware) = plugin.as_task_aware() {
                run_isolated(&shared.pool_id, plugin.id(), "before_task_execute", || {
                    aware.before_task_execute(&mut task)
                });
            }
        }

        let info = task.info().clone();
        let runtime = Arc::downgrade(shared);
        let hooked_info = info.clone();
        task.decorate(move |body| {
            Box::new(move || RuntimeShared::run_with_hooks(runtime, hooked_info, body))
        });

        match shared.executor.execute(task) {
            Ok(()) => Ok(()),
            Err(RejectedTask { task, reason }) => {
                drop(task);
                let rejection = Rejection {
                    reason,
                    state: shared.executor.state(),
                };
                warn!(
                    pool_id = %shared.pool_id,
                    task_id = %info.id,
                    label = %info.label,
                    reason = %reason,
                    pool_size = rejection.state.pool_size,
                    active_count = rejection.state.active_count,
                    queue_size = rejection.state.queue_size,
                    "🚫 POOL_HOOK: Task rejected"
                );

                let ctx = shared.context();
                shared.dispatch(
                    Capability::RejectedAware,
                    "before_rejected_execution",
                    |plugin| {
                        if let Some(aware) = plugin.as_rejected_aware() {
                            aware.before_rejected_execution(&ctx, &info, &rejection);
                        }
                    },
                );
                Err(PoolHookError::rejected(&shared.pool_id, info.id, reason))
            }
        }
    }

    /// Submit a closure and get a handle to its result
    pub fn submit<T, F>(&self, f: F) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        self.submit_labeled("", f)
    }

    pub fn submit_labeled<T, F>(&self, label: impl Into<String>, f: F) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        let (task, handle) = Task::with_result(label, f);
        self.execute(task)?;
        Ok(handle)
    }

    pub fn state(&self) -> PoolState {
        self.shared.executor.state()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.executor.is_shutdown()
    }

    /// Whether the pool terminated; observing termination fires `after_terminated`
    pub fn is_terminated(&self) -> bool {
        let terminated = self.shared.executor.is_terminated();
        if terminated {
            self.shared.fire_after_terminated();
        }
        terminated
    }

    /// Wait for termination; `None` waits indefinitely
    pub fn await_termination(&self, timeout: Option<Duration>) -> bool {
        let terminated = self.shared.executor.await_termination(timeout);
        if terminated {
            self.shared.fire_after_terminated();
        }
        terminated
    }

    /// Clear the registry once the pool terminated and `after_terminated` ran
    ///
    /// Clears immediately when the pool already terminated or does not support
    /// termination listeners.
    pub fn clear_when_terminated(&self) {
        if self.is_terminated() {
            self.shared.registry.clear();
            return;
        }
        let target = Arc::downgrade(&self.shared);
        let listening = self
            .shared
            .executor
            .add_termination_listener(Box::new(move || {
                if let Some(shared) = target.upgrade() {
                    shared.fire_after_terminated();
                    shared.registry.clear();
                }
            }));
        if !listening {
            self.shared.registry.clear();
        }
    }

    /// Graceful shutdown: queued tasks still run
    pub fn shutdown(&self) {
        self.shutdown_with(|executor| {
            executor.shutdown();
            Vec::new()
        });
    }

    /// Immediate shutdown: returns the tasks that never started
    pub fn shutdown_now(&self) -> Vec<Task> {
        self.shutdown_with(|executor| executor.shutdown_now())
    }

    fn shutdown_with<F>(&self, delegate: F) -> Vec<Task>
    where
        F: FnOnce(&dyn ExecutorService) -> Vec<Task>,
    {
        let shared = &self.shared;
        let first = {
            let mut phase = shared.phase.lock();
            if *phase == ShutdownPhase::Running {
                *phase = ShutdownPhase::ShuttingDown;
                true
            } else {
                false
            }
        };

        if !first {
            debug!(pool_id = %shared.pool_id, "Shutdown already in progress, delegating only");
            return delegate(shared.executor.as_ref());
        }

        info!(pool_id = %shared.pool_id, "🛑 POOL_HOOK: Shutting down");
        let ctx = shared.context();
        shared.dispatch(Capability::ShutdownAware, "before_shutdown", |plugin| {
            if let Some(aware) = plugin.as_shutdown_aware() {
                aware.before_shutdown(&ctx);
            }
        });

        let remaining = delegate(shared.executor.as_ref());
        let remaining_infos: Vec<TaskInfo> = remaining.iter().map(|task| task.info().clone()).collect();

        shared.dispatch(Capability::ShutdownAware, "after_shutdown", |plugin| {
            if let Some(aware) = plugin.as_shutdown_aware() {
                aware.after_shutdown(&ctx, &remaining_infos);
            }
        });
        *shared.phase.lock() = ShutdownPhase::AfterShutdownDone;
        info!(
            pool_id = %shared.pool_id,
            drained = remaining_infos.len(),
            "🛑 POOL_HOOK: Shutdown complete"
        );

        shared.fire_after_terminated();
        remaining
    }
}

impl fmt::Debug for PoolHookRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolHookRuntime")
            .field("pool_id", &self.shared.pool_id)
            .field("registry", &self.shared.registry)
            .field("phase", &*self.shared.phase.lock())
            .finish()
    }
}
