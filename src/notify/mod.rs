//! # Alarm Notification
//!
//! Alarm plugins decide *when* to raise an alarm and build its payload; a
//! [`Notifier`] decides where it goes. Delivery is fire-and-forget: a notifier
//! must never block the hook that raised the alarm for long, and never fails
//! the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::RejectReason;
use crate::executor::PoolState;
use crate::task::{TaskId, TaskInfo};

/// Kind of alarm raised by a standard plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmKind {
    Timeout,
    Reject,
}

impl std::fmt::Display for AlarmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlarmKind::Timeout => write!(f, "timeout"),
            AlarmKind::Reject => write!(f, "reject"),
        }
    }
}

/// Details of a raised alarm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmPayload {
    pub task_id: TaskId,
    pub task_label: String,
    /// Execution time, for timeout alarms
    pub elapsed_ms: Option<u64>,
    /// Configured threshold, for timeout alarms
    pub threshold_ms: Option<u64>,
    /// Refusal reason, for reject alarms
    pub reject_reason: Option<RejectReason>,
    pub state: PoolState,
    pub raised_at: DateTime<Utc>,
}

impl AlarmPayload {
    pub fn timeout(task: &TaskInfo, elapsed_ms: u64, threshold_ms: u64, state: PoolState) -> Self {
        Self {
            task_id: task.id,
            task_label: task.label.clone(),
            elapsed_ms: Some(elapsed_ms),
            threshold_ms: Some(threshold_ms),
            reject_reason: None,
            state,
            raised_at: Utc::now(),
        }
    }

    pub fn reject(task: &TaskInfo, reason: RejectReason, state: PoolState) -> Self {
        Self {
            task_id: task.id,
            task_label: task.label.clone(),
            elapsed_ms: None,
            threshold_ms: None,
            reject_reason: Some(reason),
            state,
            raised_at: Utc::now(),
        }
    }
}

/// Receives alarms raised by plugins
pub trait Notifier: Send + Sync {
    fn notify(&self, pool_id: &str, kind: AlarmKind, payload: AlarmPayload);
}

/// Writes alarms to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

impl Notifier for LoggingNotifier {
    fn notify(&self, pool_id: &str, kind: AlarmKind, payload: AlarmPayload) {
        warn!(
            pool_id = %pool_id,
            kind = %kind,
            task_id = %payload.task_id,
            label = %payload.task_label,
            elapsed_ms = payload.elapsed_ms,
            threshold_ms = payload.threshold_ms,
            reject_reason = payload.reject_reason.map(|r| r.to_string()),
            active_count = payload.state.active_count,
            queue_size = payload.state.queue_size,
            "🚨 ALARM"
        );
    }
}

/// Discards alarms
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _pool_id: &str, _kind: AlarmKind, _payload: AlarmPayload) {}
}

/// An alarm as delivered over a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    pub pool_id: String,
    pub kind: AlarmKind,
    pub payload: AlarmPayload,
}

/// Forwards alarms to an async consumer over an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Alarm>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiving end consumers read alarms from
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Alarm>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, pool_id: &str, kind: AlarmKind, payload: AlarmPayload) {
        let alarm = Alarm {
            pool_id: pool_id.to_string(),
            kind,
            payload,
        };
        if self.sender.send(alarm).is_err() {
            debug!(pool_id = %pool_id, kind = %kind, "Alarm receiver dropped, alarm discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    #[tokio::test]
    async fn test_channel_notifier_delivers_alarm() {
        let (notifier, mut receiver) = ChannelNotifier::new();
        let task = Task::labeled("slow-report", || Ok(()));
        notifier.notify(
            "reports",
            AlarmKind::Timeout,
            AlarmPayload::timeout(task.info(), 120, 100, PoolState::default()),
        );

        let alarm = receiver.recv().await.expect("alarm delivered");
        assert_eq!(alarm.pool_id, "reports");
        assert_eq!(alarm.kind, AlarmKind::Timeout);
        assert_eq!(alarm.payload.task_label, "slow-report");
        assert_eq!(alarm.payload.elapsed_ms, Some(120));
    }

    #[test]
    fn test_channel_notifier_tolerates_closed_receiver() {
        let (notifier, receiver) = ChannelNotifier::new();
        drop(receiver);
        let task = Task::from_fn(|| {});
        notifier.notify(
            "pool",
            AlarmKind::Reject,
            AlarmPayload::reject(task.info(), RejectReason::QueueFull, PoolState::default()),
        );
    }

    #[test]
    fn test_payload_serializes_reason_in_snake_case() {
        let task = Task::from_fn(|| {});
        let payload = AlarmPayload::reject(task.info(), RejectReason::QueueFull, PoolState::default());
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["reject_reason"], "queue_full");
        assert!(json["elapsed_ms"].is_null());
    }
}
