//! Shared helpers for integration tests

#![allow(dead_code)] // Not every test binary uses every helper

pub mod strategies;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::Thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use poolhook_core::config::ThreadPoolSettings;
use poolhook_core::error::TaskError;
use poolhook_core::executor::{PoolContext, PoolHookRuntime, ThreadPoolExecutor};
use poolhook_core::plugin::{
    ExecuteAware, Plugin, RejectedAware, Rejection, ShutdownAware, TaskAware,
};
use poolhook_core::task::{Task, TaskInfo};

/// Ordered record of hook invocations, shared across plugins
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Events recorded for one hook, in order, reduced to plugin ids
    pub fn plugins_for(&self, hook: &str) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter_map(|event| {
                let (plugin_id, recorded) = event.split_once(':')?;
                (recorded == hook).then(|| plugin_id.to_string())
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }
}

/// Plugin implementing every capability and recording each call as `id:hook`
pub struct RecordingPlugin {
    id: String,
    priority: i32,
    log: EventLog,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl RecordingPlugin {
    pub fn new(id: &str, priority: i32, log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            priority,
            log: log.clone(),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        })
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    fn record(&self, hook: &str) {
        self.log.push(format!("{}:{}", self.id, hook));
    }
}

impl TaskAware for RecordingPlugin {
    fn before_task_execute(&self, task: &mut Task) {
        self.record("before_task_execute");
        task.append_label(&self.id);
    }
}

impl ExecuteAware for RecordingPlugin {
    fn before_execute(&self, _ctx: &PoolContext<'_>, _worker: &Thread, _task: &TaskInfo) {
        self.record("before_execute");
    }

    fn after_execute(&self, _ctx: &PoolContext<'_>, _task: &TaskInfo, _error: Option<&TaskError>) {
        self.record("after_execute");
    }
}

impl RejectedAware for RecordingPlugin {
    fn before_rejected_execution(&self, _ctx: &PoolContext<'_>, _task: &TaskInfo, _rejection: &Rejection) {
        self.record("before_rejected_execution");
    }
}

impl ShutdownAware for RecordingPlugin {
    fn before_shutdown(&self, _ctx: &PoolContext<'_>) {
        self.record("before_shutdown");
    }

    fn after_shutdown(&self, _ctx: &PoolContext<'_>, _remaining: &[TaskInfo]) {
        self.record("after_shutdown");
    }

    fn after_terminated(&self, _ctx: &PoolContext<'_>) {
        self.record("after_terminated");
    }
}

impl Plugin for RecordingPlugin {
    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn as_task_aware(&self) -> Option<&dyn TaskAware> {
        Some(self)
    }

    fn as_execute_aware(&self) -> Option<&dyn ExecuteAware> {
        Some(self)
    }

    fn as_rejected_aware(&self) -> Option<&dyn RejectedAware> {
        Some(self)
    }

    fn as_shutdown_aware(&self) -> Option<&dyn ShutdownAware> {
        Some(self)
    }

    fn start(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hooked thread pool with the given sizing and no plugins
pub fn build_runtime(pool_id: &str, core: usize, max: usize, queue: usize) -> PoolHookRuntime {
    let settings = ThreadPoolSettings::new(core, max, queue).with_thread_name_prefix(pool_id);
    let pool = ThreadPoolExecutor::new(&settings).expect("valid test pool settings");
    PoolHookRuntime::new(pool_id, Arc::new(pool))
}

/// Poll `condition` until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
