//! Counts rejected submissions.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::constants::plugin_ids;
use crate::executor::PoolContext;
use crate::plugin::{Plugin, PluginRuntimeInfo, RejectedAware, Rejection};
use crate::task::TaskInfo;

/// Counts rejected submissions
#[derive(Debug, Default)]
pub struct TaskRejectCountPlugin {
    reject_count: AtomicU64,
}

impl TaskRejectCountPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejections observed since this instance was registered
    pub fn reject_count_num(&self) -> u64 {
        self.reject_count.load(Ordering::SeqCst)
    }
}

impl RejectedAware for TaskRejectCountPlugin {
    fn before_rejected_execution(&self, _ctx: &PoolContext<'_>, _task: &TaskInfo, _rejection: &Rejection) {
        self.reject_count.fetch_add(1, Ordering::SeqCst);
    }
}

impl Plugin for TaskRejectCountPlugin {
    fn id(&self) -> &str {
        plugin_ids::TASK_REJECT_COUNT
    }

    fn as_rejected_aware(&self) -> Option<&dyn RejectedAware> {
        Some(self)
    }

    fn runtime_info(&self) -> PluginRuntimeInfo {
        PluginRuntimeInfo::new(self.id()).with_info("reject_count", self.reject_count_num())
    }
}
