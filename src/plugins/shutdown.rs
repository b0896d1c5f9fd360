//! Bounded-wait shutdown.
//!
//! After the pool stops accepting work, waits up to a configurable bound for
//! in-flight tasks to finish. Exceeding the bound is logged, never raised: the
//! shutdown caller gets control back after at most the bound.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::constants::{plugin_ids, property_keys};
use crate::error::{PoolHookError, Result};
use crate::executor::PoolContext;
use crate::plugin::{Configurable, Plugin, PluginRuntimeInfo, ShutdownAware};
use crate::task::TaskInfo;

#[derive(Debug, Default)]
pub struct BoundedShutdownPlugin {
    /// 0 skips waiting
    await_termination_ms: AtomicU64,
    shutdown_started: Mutex<Option<Instant>>,
}

impl BoundedShutdownPlugin {
    pub fn new(await_termination_ms: u64) -> Self {
        Self {
            await_termination_ms: AtomicU64::new(await_termination_ms),
            shutdown_started: Mutex::new(None),
        }
    }

    pub fn await_termination(&self) -> u64 {
        self.await_termination_ms.load(Ordering::Relaxed)
    }

    pub fn set_await_termination(&self, await_termination_ms: u64) {
        self.await_termination_ms
            .store(await_termination_ms, Ordering::Relaxed);
    }
}

impl ShutdownAware for BoundedShutdownPlugin {
    fn before_shutdown(&self, ctx: &PoolContext<'_>) {
        *self.shutdown_started.lock() = Some(Instant::now());
        let state = ctx.state();
        info!(
            pool_id = %ctx.pool_id,
            active_count = state.active_count,
            queue_size = state.queue_size,
            await_termination_ms = self.await_termination(),
            "Shutdown started"
        );
    }

    fn after_shutdown(&self, ctx: &PoolContext<'_>, remaining: &[TaskInfo]) {
        if !remaining.is_empty() {
            info!(
                pool_id = %ctx.pool_id,
                cancelled = remaining.len(),
                "Queued tasks discarded by immediate shutdown"
            );
        }

        let bound = self.await_termination();
        if bound == 0 || ctx.is_terminated() {
            return;
        }

        if !ctx.await_termination(Some(Duration::from_millis(bound))) {
            let waited_ms = self
                .shutdown_started
                .lock()
                .map(|started| started.elapsed().as_millis() as u64);
            warn!(
                pool_id = %ctx.pool_id,
                await_termination_ms = bound,
                waited_ms = waited_ms,
                active_count = ctx.state().active_count,
                "⚠️ Pool did not terminate within the shutdown bound"
            );
        }
    }

    fn after_terminated(&self, ctx: &PoolContext<'_>) {
        if let Some(started) = self.shutdown_started.lock().take() {
            info!(
                pool_id = %ctx.pool_id,
                shutdown_ms = started.elapsed().as_millis() as u64,
                "Pool terminated after shutdown"
            );
        }
    }
}

impl Configurable for BoundedShutdownPlugin {
    fn property_keys(&self) -> &[&'static str] {
        &[property_keys::AWAIT_TERMINATION_MS]
    }

    fn set_property(&self, key: &str, value: &str) -> Result<()> {
        if key != property_keys::AWAIT_TERMINATION_MS {
            return Err(PoolHookError::unknown_property(self.id(), key));
        }
        let bound = value
            .trim()
            .parse::<u64>()
            .map_err(|_| PoolHookError::invalid_property(self.id(), key, value))?;
        self.set_await_termination(bound);
        Ok(())
    }
}

impl Plugin for BoundedShutdownPlugin {
    fn id(&self) -> &str {
        plugin_ids::BOUNDED_SHUTDOWN
    }

    fn as_shutdown_aware(&self) -> Option<&dyn ShutdownAware> {
        Some(self)
    }

    fn as_configurable(&self) -> Option<&dyn Configurable> {
        Some(self)
    }

    fn runtime_info(&self) -> PluginRuntimeInfo {
        PluginRuntimeInfo::new(self.id()).with_info("await_termination_ms", self.await_termination())
    }
}
