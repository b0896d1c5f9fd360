//! Raises an alarm through a [`Notifier`] for every rejected submission.

use std::sync::Arc;

use crate::constants::plugin_ids;
use crate::executor::PoolContext;
use crate::notify::{AlarmKind, AlarmPayload, Notifier};
use crate::plugin::{Plugin, RejectedAware, Rejection};
use crate::task::TaskInfo;

/// Raises a reject alarm for every refused submission
pub struct TaskRejectAlarmPlugin {
    notifier: Arc<dyn Notifier>,
}

impl TaskRejectAlarmPlugin {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

impl RejectedAware for TaskRejectAlarmPlugin {
    fn before_rejected_execution(&self, ctx: &PoolContext<'_>, task: &TaskInfo, rejection: &Rejection) {
        self.notifier.notify(
            ctx.pool_id,
            AlarmKind::Reject,
            AlarmPayload::reject(task, rejection.reason, rejection.state),
        );
    }
}

impl Plugin for TaskRejectAlarmPlugin {
    fn id(&self) -> &str {
        plugin_ids::TASK_REJECT_ALARM
    }

    fn as_rejected_aware(&self) -> Option<&dyn RejectedAware> {
        Some(self)
    }
}
