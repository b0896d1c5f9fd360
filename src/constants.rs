//! # System Constants
//!
//! Identifiers, expression grammar tokens and defaults shared across the
//! plugin runtime, the reconciler and the standard plugins.

use std::time::Duration;

/// Expression token selecting every known id
pub const ALL_IDS: &str = "*";

/// Separator between ids in include/exclude expressions
pub const ID_SEPARATOR: char = ',';

/// Priority assigned to plugins that do not declare one
pub const DEFAULT_PLUGIN_PRIORITY: i32 = 0;

/// Ids of the standard plugins
pub mod plugin_ids {
    pub const TASK_DECORATOR: &str = "task-decorator";
    pub const TASK_TIMEOUT_ALARM: &str = "task-timeout-alarm";
    pub const TASK_REJECT_COUNT: &str = "task-reject-count";
    pub const TASK_REJECT_ALARM: &str = "task-reject-alarm";
    pub const BOUNDED_SHUTDOWN: &str = "bounded-shutdown";

    /// Registrar that installs all of the above into a pool
    pub const STANDARD_PLUGINS_REGISTRAR: &str = "standard-plugins";
}

/// Overlay property keys understood by the standard plugins
pub mod property_keys {
    pub const EXECUTE_TIMEOUT_MS: &str = "execute-timeout-ms";
    pub const AWAIT_TERMINATION_MS: &str = "await-termination-ms";
}

/// Environment variables consulted by logging and configuration loading
pub mod env {
    pub const ENVIRONMENT: &str = "POOLHOOK_ENV";
    pub const FALLBACK_ENVIRONMENT: &str = "APP_ENV";
    pub const LOG_DIR: &str = "POOLHOOK_LOG_DIR";
    pub const CONFIG_PREFIX: &str = "POOLHOOK";
    pub const CONFIG_SEPARATOR: &str = "__";
}

/// Pool defaults
pub mod defaults {
    use super::Duration;

    pub const CORE_POOL_SIZE: usize = 4;
    pub const MAXIMUM_POOL_SIZE: usize = 8;
    pub const QUEUE_CAPACITY: usize = 1024;
    pub const KEEP_ALIVE: Duration = Duration::from_secs(60);
    pub const THREAD_NAME_PREFIX: &str = "poolhook";

    /// 0 disables the execution timeout alarm
    pub const EXECUTE_TIMEOUT_MS: u64 = 0;
    pub const AWAIT_TERMINATION_MS: u64 = 0;
}
