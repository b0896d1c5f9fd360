//! Contract between the hook runtime and the underlying worker pool.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RejectReason;
use crate::task::Task;

/// Read-only snapshot of a pool's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    pub core_pool_size: usize,
    pub maximum_pool_size: usize,
    pub pool_size: usize,
    pub active_count: usize,
    pub queue_size: usize,
    pub completed_task_count: u64,
    pub is_shutdown: bool,
    pub is_terminated: bool,
}

/// A task the pool refused, handed back to the caller
#[derive(Debug)]
pub struct RejectedTask {
    pub task: Task,
    pub reason: RejectReason,
}

impl RejectedTask {
    pub fn new(task: Task, reason: RejectReason) -> Self {
        Self { task, reason }
    }
}

/// Worker pool that accepts tasks and can be shut down
pub trait ExecutorService: Send + Sync {
    /// Accept a task for asynchronous execution or hand it back
    fn execute(&self, task: Task) -> Result<(), RejectedTask>;

    fn state(&self) -> PoolState;

    /// Stop accepting tasks; queued tasks still run
    fn shutdown(&self);

    /// Stop accepting tasks and return the ones still queued
    fn shutdown_now(&self) -> Vec<Task>;

    fn is_shutdown(&self) -> bool;

    fn is_terminated(&self) -> bool;

    /// Block until terminated or until `timeout` elapses; `None` waits indefinitely
    fn await_termination(&self, timeout: Option<Duration>) -> bool;

    /// Register a callback run once the pool terminates
    ///
    /// Returns false when the pool does not support listeners, in which case the
    /// callback is dropped without running. Pools that are already terminated run
    /// the callback immediately.
    fn add_termination_listener(&self, listener: Box<dyn FnOnce() + Send>) -> bool {
        drop(listener);
        false
    }
}

/// Pool identity and executor view handed to every hook
#[derive(Clone, Copy)]
pub struct PoolContext<'a> {
    pub pool_id: &'a str,
    pub executor: &'a dyn ExecutorService,
}

impl<'a> PoolContext<'a> {
    pub fn new(pool_id: &'a str, executor: &'a dyn ExecutorService) -> Self {
        Self { pool_id, executor }
    }

    pub fn state(&self) -> PoolState {
        self.executor.state()
    }

    pub fn is_terminated(&self) -> bool {
        self.executor.is_terminated()
    }

    pub fn await_termination(&self, timeout: Option<Duration>) -> bool {
        self.executor.await_termination(timeout)
    }
}

impl fmt::Debug for PoolContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolContext")
            .field("pool_id", &self.pool_id)
            .finish_non_exhaustive()
    }
}
