//! # Plugin Model
//!
//! Capability-typed extension units attached to a hooked pool.
//!
//! ## Overview
//!
//! A [`Plugin`] is identified by a unique, immutable string id and carries an
//! immutable priority (lower runs first). It implements any subset of the four
//! hook capabilities:
//!
//! - **TaskAware**: transforms a task on the submitting thread before queueing
//! - **ExecuteAware**: observes task execution on the worker thread
//! - **RejectedAware**: observes refused submissions
//! - **ShutdownAware**: observes the shutdown sequence
//!
//! Capability membership is answered by explicit accessors returning
//! `Option<&dyn Trait>`, so dispatch never needs downcasting.
//!
//! ## Usage
//!
//! ```rust
//! use poolhook_core::plugin::{Plugin, TaskAware};
//! use poolhook_core::task::Task;
//!
//! struct Tagger;
//!
//! impl TaskAware for Tagger {
//!     fn before_task_execute(&self, task: &mut Task) {
//!         task.append_label("#tagged");
//!     }
//! }
//!
//! impl Plugin for Tagger {
//!     fn id(&self) -> &str {
//!         "tagger"
//!     }
//!
//!     fn as_task_aware(&self) -> Option<&dyn TaskAware> {
//!         Some(self)
//!     }
//! }
//! ```

pub mod adapter;
pub mod capability;

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

pub use adapter::{AdaptedPlugin, AdaptedPluginBuilder, HookPoint};
pub use capability::{
    Capability, Configurable, ExecuteAware, RejectedAware, Rejection, ShutdownAware, TaskAware,
};

use crate::constants::DEFAULT_PLUGIN_PRIORITY;
use crate::error::panic_message;
use crate::logging::log_hook_failure;

/// An extension unit that can be registered in a pool's plugin registry
pub trait Plugin: Send + Sync + 'static {
    /// Unique, stable identifier
    fn id(&self) -> &str;

    /// Dispatch priority, read once at registration; lower runs first
    fn priority(&self) -> i32 {
        DEFAULT_PLUGIN_PRIORITY
    }

    fn as_task_aware(&self) -> Option<&dyn TaskAware> {
        None
    }

    fn as_execute_aware(&self) -> Option<&dyn ExecuteAware> {
        None
    }

    fn as_rejected_aware(&self) -> Option<&dyn RejectedAware> {
        None
    }

    fn as_shutdown_aware(&self) -> Option<&dyn ShutdownAware> {
        None
    }

    fn as_configurable(&self) -> Option<&dyn Configurable> {
        None
    }

    /// Called when the plugin is registered into a registry
    fn start(&self) {}

    /// Called when the plugin is removed from a registry
    fn stop(&self) {}

    /// Describe current plugin state for diagnostics
    fn runtime_info(&self) -> PluginRuntimeInfo {
        PluginRuntimeInfo::new(self.id())
    }
}

/// Diagnostic snapshot of a plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRuntimeInfo {
    pub plugin_id: String,
    pub infos: BTreeMap<String, String>,
}

impl PluginRuntimeInfo {
    pub fn new(plugin_id: impl Into<String>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            infos: BTreeMap::new(),
        }
    }

    /// Add a descriptive entry
    pub fn with_info(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.infos.insert(key.into(), value.to_string());
        self
    }
}

/// Capabilities implemented by `plugin`
pub fn capabilities_of(plugin: &dyn Plugin) -> Vec<Capability> {
    Capability::ALL
        .into_iter()
        .filter(|cap| cap.supported_by(plugin))
        .collect()
}

/// Run one plugin hook, containing and logging any panic it raises
///
/// Returns false when the hook panicked.
pub(crate) fn run_isolated<F: FnOnce()>(pool_id: &str, plugin_id: &str, hook: &str, f: F) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            log_hook_failure(pool_id, plugin_id, hook, &panic_message(payload.as_ref()));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::PoolContext;
    use crate::task::TaskInfo;

    struct Observer;

    impl RejectedAware for Observer {
        fn before_rejected_execution(
            &self,
            _ctx: &PoolContext<'_>,
            _task: &TaskInfo,
            _rejection: &Rejection,
        ) {
        }
    }

    impl ShutdownAware for Observer {}

    impl Plugin for Observer {
        fn id(&self) -> &str {
            "observer"
        }

        fn as_rejected_aware(&self) -> Option<&dyn RejectedAware> {
            Some(self)
        }

        fn as_shutdown_aware(&self) -> Option<&dyn ShutdownAware> {
            Some(self)
        }
    }

    #[test]
    fn test_capabilities_follow_accessors() {
        let plugin = Observer;
        assert_eq!(
            capabilities_of(&plugin),
            vec![Capability::RejectedAware, Capability::ShutdownAware]
        );
        assert!(!Capability::TaskAware.supported_by(&plugin));
        assert_eq!(plugin.priority(), DEFAULT_PLUGIN_PRIORITY);
    }

    #[test]
    fn test_default_runtime_info_names_plugin() {
        let info = Observer.runtime_info().with_info("rejections", 3);
        assert_eq!(info.plugin_id, "observer");
        assert_eq!(info.infos.get("rejections").map(String::as_str), Some("3"));
    }
}
