//! # Error Types
//!
//! Structured error handling for pool hook operations using thiserror.
//!
//! Only two outcomes are ever propagated to callers of a hooked pool: a task
//! rejection and a task's own execution failure. Plugin hook failures are
//! caught at the dispatch boundary and logged instead.

use std::any::Any;

use thiserror::Error;

use crate::task::TaskId;

/// Reason an executor refused to accept a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Work queue is full and the pool is already at its maximum size
    QueueFull,
    /// Pool has been shut down
    Shutdown,
    /// A worker thread could not be started for the task
    WorkerUnavailable,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::QueueFull => write!(f, "queue full and pool at maximum size"),
            RejectReason::Shutdown => write!(f, "pool is shut down"),
            RejectReason::WorkerUnavailable => write!(f, "worker thread could not be started"),
        }
    }
}

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum PoolHookError {
    #[error("Registrar already registered: {registrar_id}")]
    DuplicateRegistrar { registrar_id: String },

    #[error("Task {task_id} rejected by pool {pool_id}: {reason}")]
    Rejected {
        pool_id: String,
        task_id: TaskId,
        reason: RejectReason,
    },

    #[error("Configuration error: {component}: {message}")]
    Configuration { component: String, message: String },

    #[error("Unknown property for plugin {plugin_id}: {key}")]
    UnknownProperty { plugin_id: String, key: String },

    #[error("Invalid value for property {key} of plugin {plugin_id}: {value}")]
    InvalidProperty {
        plugin_id: String,
        key: String,
        value: String,
    },
}

impl PoolHookError {
    /// Create a duplicate registrar error
    pub fn duplicate_registrar(registrar_id: impl Into<String>) -> Self {
        Self::DuplicateRegistrar {
            registrar_id: registrar_id.into(),
        }
    }

    /// Create a rejection error
    pub fn rejected(pool_id: impl Into<String>, task_id: TaskId, reason: RejectReason) -> Self {
        Self::Rejected {
            pool_id: pool_id.into(),
            task_id,
            reason,
        }
    }

    /// Create a configuration error
    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create an unknown property error
    pub fn unknown_property(plugin_id: impl Into<String>, key: impl Into<String>) -> Self {
        Self::UnknownProperty {
            plugin_id: plugin_id.into(),
            key: key.into(),
        }
    }

    /// Create an invalid property value error
    pub fn invalid_property(
        plugin_id: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::InvalidProperty {
            plugin_id: plugin_id.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    /// Whether this error is a task rejection
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

impl From<config::ConfigError> for PoolHookError {
    fn from(err: config::ConfigError) -> Self {
        Self::configuration("ConfigLoader", err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PoolHookError>;

/// Failure of a task body, as seen by `after_execute` hooks and task handles
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("Task failed: {message}")]
    Failed { message: String },

    #[error("Task panicked: {message}")]
    Panicked { message: String },

    #[error("Task was cancelled before it produced a result")]
    Cancelled,
}

impl TaskError {
    /// Create a failure from the error returned by a task body
    pub fn failed(err: &anyhow::Error) -> Self {
        Self::Failed {
            message: format!("{err:#}"),
        }
    }

    /// Create a failure from a caught panic payload
    pub fn panicked(payload: &(dyn Any + Send)) -> Self {
        Self::Panicked {
            message: panic_message(payload),
        }
    }
}

/// Extract a readable message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(payload.as_ref()), "owned boom");

        let payload: Box<dyn Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(payload.as_ref()), "Unknown panic");
    }

    #[test]
    fn test_task_error_from_anyhow_keeps_context() {
        let err = anyhow::anyhow!("disk full").context("writing report");
        let task_error = TaskError::failed(&err);
        assert_eq!(
            task_error,
            TaskError::Failed {
                message: "writing report: disk full".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_registrar_message_names_id() {
        let err = PoolHookError::duplicate_registrar("standard-plugins");
        assert_eq!(
            err.to_string(),
            "Registrar already registered: standard-plugins"
        );
        assert!(!err.is_rejection());
    }
}
