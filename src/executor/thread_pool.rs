//! # Thread Pool Executor
//!
//! A bounded worker pool of OS threads implementing [`ExecutorService`].
//!
//! ## Admission
//!
//! 1. Fewer than `core_pool_size` workers: start a core worker with the task
//! 2. Otherwise offer the task to the queue
//! 3. Queue full and fewer than `maximum_pool_size` workers: start a non-core worker
//! 4. Otherwise reject with [`RejectReason::QueueFull`]
//!
//! A task queued while no worker is alive (`core_pool_size` of 0, or after every
//! non-core worker retired) starts a non-core worker to pick it up.
//!
//! A queue capacity of 0 is a synchronous handoff: a task is only queued when an
//! idle worker is waiting to take it. Non-core workers retire after sitting idle
//! for `keep_alive`.
//!
//! ## Shutdown
//!
//! `shutdown` closes the queue; workers drain what is left and exit. The last
//! exiting worker marks the pool terminated, wakes `await_termination` callers
//! and runs the termination listeners.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::config::ThreadPoolSettings;
use crate::error::{panic_message, RejectReason, Result};
use crate::task::Task;

use super::service::{ExecutorService, PoolState, RejectedTask};

type TerminationListener = Box<dyn FnOnce() + Send>;

#[derive(Debug, Default)]
struct WorkerSet {
    live: usize,
    largest: usize,
}

struct PoolInner {
    core_pool_size: usize,
    maximum_pool_size: usize,
    keep_alive: Duration,
    thread_name_prefix: String,
    sender: Mutex<Option<Sender<Task>>>,
    receiver: Receiver<Task>,
    /// Lock order: `workers` before `sender`
    workers: Mutex<WorkerSet>,
    termination: Condvar,
    listeners: Mutex<Vec<TerminationListener>>,
    shutdown: AtomicBool,
    terminated: AtomicBool,
    active: AtomicUsize,
    completed: AtomicU64,
    thread_seq: AtomicUsize,
}

/// Fixed-bounds thread pool with a bounded work queue
pub struct ThreadPoolExecutor {
    inner: Arc<PoolInner>,
}

impl ThreadPoolExecutor {
    /// Create a pool from validated settings; no threads are started until work arrives
    pub fn new(settings: &ThreadPoolSettings) -> Result<Self> {
        settings.validate()?;
        let (sender, receiver) = channel::bounded(settings.queue_capacity);

        info!(
            thread_name_prefix = %settings.thread_name_prefix,
            core_pool_size = settings.core_pool_size,
            maximum_pool_size = settings.maximum_pool_size,
            queue_capacity = settings.queue_capacity,
            "🧵 THREAD_POOL: Created"
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                core_pool_size: settings.core_pool_size,
                maximum_pool_size: settings.maximum_pool_size,
                keep_alive: settings.keep_alive(),
                thread_name_prefix: settings.thread_name_prefix.clone(),
                sender: Mutex::new(Some(sender)),
                receiver,
                workers: Mutex::new(WorkerSet::default()),
                termination: Condvar::new(),
                listeners: Mutex::new(Vec::new()),
                shutdown: AtomicBool::new(false),
                terminated: AtomicBool::new(false),
                active: AtomicUsize::new(0),
                completed: AtomicU64::new(0),
                thread_seq: AtomicUsize::new(0),
            }),
        })
    }

    /// Largest number of workers that were ever alive at once
    pub fn largest_pool_size(&self) -> usize {
        self.inner.workers.lock().largest
    }

    pub fn thread_name_prefix(&self) -> &str {
        &self.inner.thread_name_prefix
    }

    fn spawn_worker(
        &self,
        workers: &mut MutexGuard<'_, WorkerSet>,
        task: Option<Task>,
        core: bool,
    ) -> std::result::Result<(), RejectedTask> {
        let seq = self.inner.thread_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let name = format!("{}-worker-{}", self.inner.thread_name_prefix, seq);
        let slot = Arc::new(Mutex::new(task));
        let worker_slot = Arc::clone(&slot);
        let inner = Arc::clone(&self.inner);

        match thread::Builder::new()
            .name(name.clone())
            .spawn(move || inner.run_worker(worker_slot, core))
        {
            Ok(_) => {
                workers.live += 1;
                workers.largest = workers.largest.max(workers.live);
                debug!(worker = %name, core = core, live = workers.live, "Worker started");
                Ok(())
            }
            Err(err) => {
                error!(worker = %name, error = %err, "❌ THREAD_POOL: Failed to start worker");
                match slot.lock().take() {
                    Some(task) => Err(RejectedTask::new(task, RejectReason::WorkerUnavailable)),
                    None => Ok(()),
                }
            }
        }
    }
}

impl PoolInner {
    fn run_worker(self: Arc<Self>, first: Arc<Mutex<Option<Task>>>, core: bool) {
        let mut next = first.lock().take();
        loop {
            let task = match next.take() {
                Some(task) => task,
                None => match self.next_task(core) {
                    Some(task) => task,
                    None => return,
                },
            };
            self.run_task(task);
        }
    }

    /// Wait for the next task; `None` once this worker has retired
    fn next_task(&self, core: bool) -> Option<Task> {
        loop {
            if core {
                return match self.receiver.recv() {
                    Ok(task) => Some(task),
                    Err(_) => {
                        self.retire(self.workers.lock());
                        None
                    }
                };
            }

            match self.receiver.recv_timeout(self.keep_alive) {
                Ok(task) => return Some(task),
                Err(RecvTimeoutError::Disconnected) => {
                    self.retire(self.workers.lock());
                    return None;
                }
                Err(RecvTimeoutError::Timeout) => {
                    let workers = self.workers.lock();
                    // Tasks are offered under the `workers` lock, so an empty queue
                    // here cannot gain a task that relies on this worker.
                    if workers.live > self.core_pool_size && self.receiver.is_empty() {
                        debug!(
                            thread_name_prefix = %self.thread_name_prefix,
                            "Idle non-core worker retiring"
                        );
                        self.retire(workers);
                        return None;
                    }
                }
            }
        }
    }

    fn run_task(&self, task: Task) {
        let task_id = task.id();
        let label = task.label().to_string();
        self.active.fetch_add(1, Ordering::SeqCst);
        let result = task.run();
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);

        if let Err(err) = result {
            warn!(
                thread_name_prefix = %self.thread_name_prefix,
                task_id = %task_id,
                label = %label,
                error = %err,
                "⚠️ THREAD_POOL: Task finished with error"
            );
        }
    }

    fn retire(&self, mut workers: MutexGuard<'_, WorkerSet>) {
        workers.live = workers.live.saturating_sub(1);
        if workers.live == 0 && self.shutdown.load(Ordering::SeqCst) {
            self.terminate(workers);
        }
    }

    fn terminate(&self, workers: MutexGuard<'_, WorkerSet>) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        self.termination.notify_all();
        drop(workers);

        info!(
            thread_name_prefix = %self.thread_name_prefix,
            completed_task_count = self.completed.load(Ordering::SeqCst),
            "🏁 THREAD_POOL: Terminated"
        );

        let listeners = std::mem::take(&mut *self.listeners.lock());
        for listener in listeners {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(listener)) {
                error!(
                    thread_name_prefix = %self.thread_name_prefix,
                    panic = %panic_message(payload.as_ref()),
                    "❌ THREAD_POOL: Termination listener panicked"
                );
            }
        }
    }
}

impl ExecutorService for ThreadPoolExecutor {
    fn execute(&self, task: Task) -> std::result::Result<(), RejectedTask> {
        if self.inner.shutdown.load(Ordering::SeqCst) {
            return Err(RejectedTask::new(task, RejectReason::Shutdown));
        }

        let mut workers = self.inner.workers.lock();
        if self.inner.shutdown.load(Ordering::SeqCst) {
            return Err(RejectedTask::new(task, RejectReason::Shutdown));
        }
        if workers.live < self.inner.core_pool_size {
            return self.spawn_worker(&mut workers, Some(task), true);
        }

        let offered = {
            let sender = self.inner.sender.lock();
            match sender.as_ref() {
                Some(sender) => sender.try_send(task),
                None => return Err(RejectedTask::new(task, RejectReason::Shutdown)),
            }
        };

        match offered {
            Ok(()) if workers.live == 0 => self.spawn_worker(&mut workers, None, false),
            Ok(()) => Ok(()),
            Err(TrySendError::Full(task)) if workers.live < self.inner.maximum_pool_size => {
                self.spawn_worker(&mut workers, Some(task), false)
            }
            Err(TrySendError::Full(task)) => Err(RejectedTask::new(task, RejectReason::QueueFull)),
            Err(TrySendError::Disconnected(task)) => {
                Err(RejectedTask::new(task, RejectReason::Shutdown))
            }
        }
    }

    fn state(&self) -> PoolState {
        let pool_size = self.inner.workers.lock().live;
        PoolState {
            core_pool_size: self.inner.core_pool_size,
            maximum_pool_size: self.inner.maximum_pool_size,
            pool_size,
            active_count: self.inner.active.load(Ordering::SeqCst),
            queue_size: self.inner.receiver.len(),
            completed_task_count: self.inner.completed.load(Ordering::SeqCst),
            is_shutdown: self.is_shutdown(),
            is_terminated: self.is_terminated(),
        }
    }

    fn shutdown(&self) {
        if self.inner.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        let workers = self.inner.workers.lock();
        self.inner.sender.lock().take();
        info!(
            thread_name_prefix = %self.inner.thread_name_prefix,
            live_workers = workers.live,
            queued = self.inner.receiver.len(),
            "🛑 THREAD_POOL: Shutdown requested"
        );
        if workers.live == 0 {
            self.inner.terminate(workers);
        }
    }

    fn shutdown_now(&self) -> Vec<Task> {
        self.shutdown();
        let drained: Vec<Task> = self.inner.receiver.try_iter().collect();
        if !drained.is_empty() {
            info!(
                thread_name_prefix = %self.inner.thread_name_prefix,
                drained = drained.len(),
                "🛑 THREAD_POOL: Drained queued tasks"
            );
        }
        drained
    }

    fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::SeqCst)
    }

    fn is_terminated(&self) -> bool {
        self.inner.terminated.load(Ordering::SeqCst)
    }

    fn await_termination(&self, timeout: Option<Duration>) -> bool {
        let mut workers = self.inner.workers.lock();
        match timeout {
            None => {
                while !self.inner.terminated.load(Ordering::SeqCst) {
                    self.inner.termination.wait(&mut workers);
                }
                true
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while !self.inner.terminated.load(Ordering::SeqCst) {
                    if self
                        .inner
                        .termination
                        .wait_until(&mut workers, deadline)
                        .timed_out()
                    {
                        return self.inner.terminated.load(Ordering::SeqCst);
                    }
                }
                true
            }
        }
    }

    fn add_termination_listener(&self, listener: Box<dyn FnOnce() + Send>) -> bool {
        let mut listeners = self.inner.listeners.lock();
        if self.inner.terminated.load(Ordering::SeqCst) {
            drop(listeners);
            listener();
        } else {
            listeners.push(listener);
        }
        true
    }
}

impl Drop for ThreadPoolExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ThreadPoolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPoolExecutor")
            .field("thread_name_prefix", &self.inner.thread_name_prefix)
            .field("state", &self.state())
            .finish()
    }
}
