//! # Standard Plugins
//!
//! Reference plugins covering every capability:
//!
//! - **TaskDecoratorPlugin** (`TaskAware`): wraps task bodies with decorators
//! - **TaskTimeoutAlarmPlugin** (`ExecuteAware`): alarms on slow executions
//! - **TaskRejectCountPlugin** (`RejectedAware`): counts rejections
//! - **TaskRejectAlarmPlugin** (`RejectedAware`): alarms on rejections
//! - **BoundedShutdownPlugin** (`ShutdownAware`): bounded wait for termination
//!
//! [`StandardPlugins`] installs a fresh set of all five into each pool.

pub mod reject_alarm;
pub mod reject_count;
pub mod shutdown;
pub mod standard;
pub mod task_decorator;
pub mod timeout_alarm;

pub use reject_alarm::TaskRejectAlarmPlugin;
pub use reject_count::TaskRejectCountPlugin;
pub use shutdown::BoundedShutdownPlugin;
pub use standard::{StandardPluginSet, StandardPlugins};
pub use task_decorator::{TaskDecorator, TaskDecoratorPlugin};
pub use timeout_alarm::TaskTimeoutAlarmPlugin;
