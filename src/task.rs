//! # Tasks
//!
//! The unit of work submitted to a hooked pool.
//!
//! A [`Task`] pairs immutable identity ([`TaskInfo`]) with a one-shot body.
//! `TaskAware` plugins transform tasks in place: they can relabel them or wrap
//! their body through [`Task::decorate`]. Observer hooks only ever see the
//! [`TaskInfo`].

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TaskError;

/// Body of a task
pub type TaskBody = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

/// Stable identity of a task, used as a key by plugins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity and descriptive metadata of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub id: TaskId,
    pub label: String,
    pub submitted_at: DateTime<Utc>,
}

impl TaskInfo {
    fn new(label: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            label: label.into(),
            submitted_at: Utc::now(),
        }
    }
}

/// A unit of work accepted by an executor
pub struct Task {
    info: TaskInfo,
    body: Option<TaskBody>,
}

impl Task {
    /// Create an unlabeled task from a fallible body
    pub fn new<F>(body: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        Self::labeled("", body)
    }

    /// Create a labeled task from a fallible body
    pub fn labeled<F>(label: impl Into<String>, body: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            info: TaskInfo::new(label),
            body: Some(Box::new(body)),
        }
    }

    /// Create a task from a body that cannot fail
    pub fn from_fn<F>(body: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::new(move || {
            body();
            Ok(())
        })
    }

    /// Create a task whose outcome is delivered through a [`TaskHandle`]
    ///
    /// The returned task still reports failures to the executor, so `after_execute`
    /// hooks and the pool's own error logging see the same outcome as the handle.
    pub fn with_result<T, F>(label: impl Into<String>, f: F) -> (Self, TaskHandle<T>)
    where
        T: Send + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        let (sender, receiver) = channel::bounded(1);
        let task = Self::labeled(label, move || {
            match panic::catch_unwind(AssertUnwindSafe(f)) {
                Ok(Ok(value)) => {
                    let _ = sender.send(Ok(value));
                    Ok(())
                }
                Ok(Err(err)) => {
                    let _ = sender.send(Err(TaskError::failed(&err)));
                    Err(err)
                }
                Err(payload) => {
                    let _ = sender.send(Err(TaskError::panicked(payload.as_ref())));
                    panic::resume_unwind(payload)
                }
            }
        });
        let handle = TaskHandle {
            info: task.info.clone(),
            receiver,
        };
        (task, handle)
    }

    pub fn id(&self) -> TaskId {
        self.info.id
    }

    pub fn label(&self) -> &str {
        &self.info.label
    }

    pub fn info(&self) -> &TaskInfo {
        &self.info
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.info.label = label.into();
    }

    pub fn append_label(&mut self, suffix: &str) {
        self.info.label.push_str(suffix);
    }

    /// Wrap the body of this task
    ///
    /// If `wrap` panics the body is lost and the task fails with
    /// [`TaskError::Cancelled`] when run.
    pub fn decorate<F>(&mut self, wrap: F)
    where
        F: FnOnce(TaskBody) -> TaskBody,
    {
        if let Some(body) = self.body.take() {
            self.body = Some(wrap(body));
        }
    }

    /// Run the task body on the current thread, converting panics into errors
    pub fn run(self) -> Result<(), TaskError> {
        let Some(body) = self.body else {
            return Err(TaskError::Cancelled);
        };
        match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(TaskError::failed(&err)),
            Err(payload) => Err(TaskError::panicked(payload.as_ref())),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("info", &self.info)
            .field("body", &self.body.as_ref().map(|_| "<TaskBody>"))
            .finish()
    }
}

/// Handle to the result of a submitted task
#[derive(Debug)]
pub struct TaskHandle<T> {
    info: TaskInfo,
    receiver: Receiver<Result<T, TaskError>>,
}

impl<T> TaskHandle<T> {
    pub fn info(&self) -> &TaskInfo {
        &self.info
    }

    /// Block until the task finishes
    ///
    /// Returns [`TaskError::Cancelled`] when the task was dropped without running,
    /// e.g. drained by `shutdown_now` or rejected.
    pub fn join(self) -> Result<T, TaskError> {
        self.receiver.recv().unwrap_or(Err(TaskError::Cancelled))
    }

    /// Block up to `timeout` for the task to finish; `None` if it is still running
    pub fn join_timeout(&self, timeout: Duration) -> Option<Result<T, TaskError>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(TaskError::Cancelled)),
        }
    }
}
