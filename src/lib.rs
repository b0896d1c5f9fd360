#![allow(clippy::doc_markdown)] // Allow technical terms like ThreadPoolExecutor in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # PoolHook Core
//!
//! Plugin and hook runtime for thread pools.
//!
//! ## Overview
//!
//! A worker pool is wrapped in a [`PoolHookRuntime`] that dispatches
//! lifecycle events to plugins registered in a per-pool [`PluginRegistry`].
//! Plugins opt into capabilities (task wrapping, execution timing,
//! rejection handling, shutdown) and run in priority order. A failing hook is
//! logged and skipped; it never breaks the task it observes or the pool.
//!
//! ## Architecture
//!
//! ```text
//! GlobalCoordinator ─── PluginPublisher (staged rollout)
//! ├── shared plugins + registrars
//! └── PoolHookRuntime (one per pool)
//!     ├── PluginRegistry      (priority-ordered, snapshot dispatch)
//!     └── dyn ExecutorService (ThreadPoolExecutor by default)
//!
//! ConfigLoader ─► PoolHookConfig ─► PluginRefresher (reconcile + reapply)
//! ```
//!
//! ## Module Organization
//!
//! - [`plugin`] - Plugin trait, capability traits and the closure adapter
//! - [`registry`] - Per-pool registries and registrars
//! - [`executor`] - Executor contract, thread pool and hook runtime
//! - [`coordinator`] - Cross-pool broadcasts and staged publishing
//! - [`config`] - Configuration snapshots, loading and reconciliation
//! - [`plugins`] - Standard plugins (decorators, alarms, rejection counting, bounded shutdown)
//! - [`notify`] - Alarm delivery
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use poolhook_core::config::ThreadPoolSettings;
//! use poolhook_core::executor::{PoolHookRuntime, ThreadPoolExecutor};
//! use poolhook_core::plugin::AdaptedPlugin;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = ThreadPoolExecutor::new(&ThreadPoolSettings::new(2, 2, 16))?;
//! let runtime = PoolHookRuntime::new("orders", Arc::new(pool));
//!
//! runtime.register(Arc::new(
//!     AdaptedPlugin::builder("label-tasks")
//!         .before_task_execute(|task| task.append_label("orders"))
//!         .build(),
//! ));
//!
//! let handle = runtime.submit(|| Ok(21 * 2))?;
//! assert_eq!(handle.join(), Ok(42));
//!
//! runtime.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod logging;
pub mod notify;
pub mod plugin;
pub mod plugins;
pub mod registry;
pub mod task;

pub use config::{
    ConfigLoader, PluginProperties, PluginRefresher, PoolConfig, PoolHookConfig, ThreadPoolSettings,
};
pub use coordinator::{GlobalCoordinator, PluginPublisher, PoolSelector};
pub use error::{PoolHookError, RejectReason, Result, TaskError};
pub use executor::{
    DynamicThreadPoolExecutor, ExecutorService, PoolContext, PoolHookRuntime, PoolState,
    ThreadPoolExecutor,
};
pub use plugin::{
    AdaptedPlugin, Capability, Configurable, ExecuteAware, Plugin, PluginRuntimeInfo,
    RejectedAware, Rejection, ShutdownAware, TaskAware,
};
pub use registry::{PluginRegistry, Registrar, SingletonPluginRegistrar};
pub use task::{Task, TaskHandle, TaskId, TaskInfo};
