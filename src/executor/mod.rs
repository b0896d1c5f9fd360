//! # Executors
//!
//! The worker pool contract, a concrete thread pool, and the hook runtime
//! that wraps a pool with plugin dispatch.
//!
//! ## Architecture
//!
//! ```text
//! DynamicThreadPoolExecutor
//! └── PoolHookRuntime          (plugin dispatch, shutdown phases)
//!     ├── PluginRegistry       (per-pool plugins)
//!     └── dyn ExecutorService
//!         └── ThreadPoolExecutor (OS threads, bounded queue)
//! ```

pub mod dynamic;
pub mod runtime;
pub mod service;
pub mod thread_pool;

pub use dynamic::DynamicThreadPoolExecutor;
pub use runtime::PoolHookRuntime;
pub use service::{ExecutorService, PoolContext, PoolState, RejectedTask};
pub use thread_pool::ThreadPoolExecutor;
