//! Execution timeout alarm.
//!
//! Records when each task starts on a worker and raises a timeout alarm when
//! its execution took longer than the configured threshold. The start record
//! is consumed after every execution, failed or not, so nothing accumulates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::Thread;
use std::time::Instant;

use dashmap::DashMap;

use crate::constants::{plugin_ids, property_keys};
use crate::error::{PoolHookError, Result, TaskError};
use crate::executor::PoolContext;
use crate::notify::{AlarmKind, AlarmPayload, Notifier};
use crate::plugin::{Configurable, ExecuteAware, Plugin, PluginRuntimeInfo};
use crate::task::{TaskId, TaskInfo};

pub struct TaskTimeoutAlarmPlugin {
    /// 0 disables the alarm
    execute_timeout_ms: AtomicU64,
    started: DashMap<TaskId, Instant>,
    alarms_raised: AtomicU64,
    notifier: Arc<dyn Notifier>,
}

impl TaskTimeoutAlarmPlugin {
    pub fn new(execute_timeout_ms: u64, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            execute_timeout_ms: AtomicU64::new(execute_timeout_ms),
            started: DashMap::new(),
            alarms_raised: AtomicU64::new(0),
            notifier,
        }
    }

    pub fn execute_timeout(&self) -> u64 {
        self.execute_timeout_ms.load(Ordering::Relaxed)
    }

    pub fn set_execute_timeout(&self, execute_timeout_ms: u64) {
        self.execute_timeout_ms
            .store(execute_timeout_ms, Ordering::Relaxed);
    }

    pub fn alarms_raised(&self) -> u64 {
        self.alarms_raised.load(Ordering::Relaxed)
    }

    /// Tasks currently executing
    pub fn in_flight(&self) -> usize {
        self.started.len()
    }
}

impl ExecuteAware for TaskTimeoutAlarmPlugin {
    fn before_execute(&self, _ctx: &PoolContext<'_>, _worker: &Thread, task: &TaskInfo) {
        self.started.insert(task.id, Instant::now());
    }

    fn after_execute(&self, ctx: &PoolContext<'_>, task: &TaskInfo, _error: Option<&TaskError>) {
        let Some((_, started)) = self.started.remove(&task.id) else {
            return;
        };
        let threshold = self.execute_timeout();
        if threshold == 0 {
            return;
        }
        let elapsed = started.elapsed().as_millis() as u64;
        if elapsed > threshold {
            self.alarms_raised.fetch_add(1, Ordering::Relaxed);
            self.notifier.notify(
                ctx.pool_id,
                AlarmKind::Timeout,
                AlarmPayload::timeout(task, elapsed, threshold, ctx.state()),
            );
        }
    }
}

impl Configurable for TaskTimeoutAlarmPlugin {
    fn property_keys(&self) -> &[&'static str] {
        &[property_keys::EXECUTE_TIMEOUT_MS]
    }

    fn set_property(&self, key: &str, value: &str) -> Result<()> {
        if key != property_keys::EXECUTE_TIMEOUT_MS {
            return Err(PoolHookError::unknown_property(self.id(), key));
        }
        let timeout = value
            .trim()
            .parse::<u64>()
            .map_err(|_| PoolHookError::invalid_property(self.id(), key, value))?;
        self.set_execute_timeout(timeout);
        Ok(())
    }
}

impl Plugin for TaskTimeoutAlarmPlugin {
    fn id(&self) -> &str {
        plugin_ids::TASK_TIMEOUT_ALARM
    }

    fn as_execute_aware(&self) -> Option<&dyn ExecuteAware> {
        Some(self)
    }

    fn as_configurable(&self) -> Option<&dyn Configurable> {
        Some(self)
    }

    fn runtime_info(&self) -> PluginRuntimeInfo {
        PluginRuntimeInfo::new(self.id())
            .with_info("execute_timeout_ms", self.execute_timeout())
            .with_info("in_flight", self.in_flight())
            .with_info("alarms_raised", self.alarms_raised())
    }
}
