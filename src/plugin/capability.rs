//! # Plugin Capabilities
//!
//! The four hook contracts a plugin can opt into, plus the configuration
//! contract used by declarative overlays.
//!
//! A plugin advertises a capability by returning `Some(self)` from the
//! matching accessor on [`Plugin`](super::Plugin). All hook methods take
//! `&self`; plugins that keep state use interior mutability.

use std::thread::Thread;

use serde::{Deserialize, Serialize};

use crate::error::{RejectReason, Result, TaskError};
use crate::executor::{PoolContext, PoolState};
use crate::task::{Task, TaskInfo};

use super::Plugin;

/// Capability kinds used to select plugins for dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    TaskAware,
    ExecuteAware,
    RejectedAware,
    ShutdownAware,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::TaskAware,
        Capability::ExecuteAware,
        Capability::RejectedAware,
        Capability::ShutdownAware,
    ];

    /// Whether `plugin` implements this capability
    pub fn supported_by(&self, plugin: &dyn Plugin) -> bool {
        match self {
            Capability::TaskAware => plugin.as_task_aware().is_some(),
            Capability::ExecuteAware => plugin.as_execute_aware().is_some(),
            Capability::RejectedAware => plugin.as_rejected_aware().is_some(),
            Capability::ShutdownAware => plugin.as_shutdown_aware().is_some(),
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Capability::TaskAware => 0,
            Capability::ExecuteAware => 1,
            Capability::RejectedAware => 2,
            Capability::ShutdownAware => 3,
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::TaskAware => write!(f, "task_aware"),
            Capability::ExecuteAware => write!(f, "execute_aware"),
            Capability::RejectedAware => write!(f, "rejected_aware"),
            Capability::ShutdownAware => write!(f, "shutdown_aware"),
        }
    }
}

/// Intercepts tasks on the submitting thread before they reach the queue
pub trait TaskAware: Send + Sync {
    /// Transform the task in place: relabel it or wrap its body with [`Task::decorate`]
    fn before_task_execute(&self, task: &mut Task);
}

/// Observes task execution on the worker thread
pub trait ExecuteAware: Send + Sync {
    fn before_execute(&self, ctx: &PoolContext<'_>, worker: &Thread, task: &TaskInfo) {
        let _ = (ctx, worker, task);
    }

    /// Called after the body finished, with its failure if it failed or panicked
    fn after_execute(&self, ctx: &PoolContext<'_>, task: &TaskInfo, error: Option<&TaskError>) {
        let _ = (ctx, task, error);
    }
}

/// Details of a refused submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub reason: RejectReason,
    /// Pool state captured right after the refusal
    pub state: PoolState,
}

/// Observes submissions the pool refused
pub trait RejectedAware: Send + Sync {
    fn before_rejected_execution(&self, ctx: &PoolContext<'_>, task: &TaskInfo, rejection: &Rejection);
}

/// Observes the shutdown sequence of a pool
pub trait ShutdownAware: Send + Sync {
    fn before_shutdown(&self, ctx: &PoolContext<'_>) {
        let _ = ctx;
    }

    /// Called once the pool stopped accepting work; `remaining` lists tasks drained by
    /// `shutdown_now` and is empty for a graceful shutdown
    fn after_shutdown(&self, ctx: &PoolContext<'_>, remaining: &[TaskInfo]) {
        let _ = (ctx, remaining);
    }

    fn after_terminated(&self, ctx: &PoolContext<'_>) {
        let _ = ctx;
    }
}

/// Accepts overlay properties from configuration
pub trait Configurable: Send + Sync {
    /// Property keys this plugin understands
    fn property_keys(&self) -> &[&'static str];

    fn set_property(&self, key: &str, value: &str) -> Result<()>;
}
