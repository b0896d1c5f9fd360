//! # Closure Adapter
//!
//! Builds a plugin out of individual closures, one per hook point. The
//! capabilities of the resulting plugin follow from which closures were set,
//! so a handler that only cares about rejections never shows up in execute
//! dispatch.

use std::collections::BTreeSet;
use std::fmt;
use std::thread::Thread;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_PLUGIN_PRIORITY;
use crate::error::TaskError;
use crate::executor::PoolContext;
use crate::task::{Task, TaskInfo};

use super::{ExecuteAware, Plugin, PluginRuntimeInfo, RejectedAware, Rejection, ShutdownAware, TaskAware};

/// Individual hook methods that can be bound to a closure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPoint {
    BeforeTaskExecute,
    BeforeExecute,
    AfterExecute,
    BeforeRejectedExecution,
    BeforeShutdown,
    AfterShutdown,
    AfterTerminated,
}

type TaskHook = Box<dyn Fn(&mut Task) + Send + Sync>;
type BeforeExecuteHook = Box<dyn Fn(&PoolContext<'_>, &Thread, &TaskInfo) + Send + Sync>;
type AfterExecuteHook = Box<dyn Fn(&PoolContext<'_>, &TaskInfo, Option<&TaskError>) + Send + Sync>;
type RejectedHook = Box<dyn Fn(&PoolContext<'_>, &TaskInfo, &Rejection) + Send + Sync>;
type ContextHook = Box<dyn Fn(&PoolContext<'_>) + Send + Sync>;
type AfterShutdownHook = Box<dyn Fn(&PoolContext<'_>, &[TaskInfo]) + Send + Sync>;

/// Plugin assembled from closures
pub struct AdaptedPlugin {
    id: String,
    priority: i32,
    before_task_execute: Option<TaskHook>,
    before_execute: Option<BeforeExecuteHook>,
    after_execute: Option<AfterExecuteHook>,
    before_rejected_execution: Option<RejectedHook>,
    before_shutdown: Option<ContextHook>,
    after_shutdown: Option<AfterShutdownHook>,
    after_terminated: Option<ContextHook>,
}

impl AdaptedPlugin {
    pub fn builder(id: impl Into<String>) -> AdaptedPluginBuilder {
        AdaptedPluginBuilder {
            plugin: AdaptedPlugin {
                id: id.into(),
                priority: DEFAULT_PLUGIN_PRIORITY,
                before_task_execute: None,
                before_execute: None,
                after_execute: None,
                before_rejected_execution: None,
                before_shutdown: None,
                after_shutdown: None,
                after_terminated: None,
            },
        }
    }

    /// Hook points bound to a closure
    pub fn hook_points(&self) -> BTreeSet<HookPoint> {
        let bound = [
            (HookPoint::BeforeTaskExecute, self.before_task_execute.is_some()),
            (HookPoint::BeforeExecute, self.before_execute.is_some()),
            (HookPoint::AfterExecute, self.after_execute.is_some()),
            (
                HookPoint::BeforeRejectedExecution,
                self.before_rejected_execution.is_some(),
            ),
            (HookPoint::BeforeShutdown, self.before_shutdown.is_some()),
            (HookPoint::AfterShutdown, self.after_shutdown.is_some()),
            (HookPoint::AfterTerminated, self.after_terminated.is_some()),
        ];
        bound
            .into_iter()
            .filter_map(|(point, set)| set.then_some(point))
            .collect()
    }
}

impl fmt::Debug for AdaptedPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptedPlugin")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("hook_points", &self.hook_points())
            .finish()
    }
}

/// Builder for [`AdaptedPlugin`]
pub struct AdaptedPluginBuilder {
    plugin: AdaptedPlugin,
}

impl AdaptedPluginBuilder {
    pub fn priority(mut self, priority: i32) -> Self {
        self.plugin.priority = priority;
        self
    }

    pub fn before_task_execute<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Task) + Send + Sync + 'static,
    {
        self.plugin.before_task_execute = Some(Box::new(f));
        self
    }

    pub fn before_execute<F>(mut self, f: F) -> Self
    where
        F: Fn(&PoolContext<'_>, &Thread, &TaskInfo) + Send + Sync + 'static,
    {
        self.plugin.before_execute = Some(Box::new(f));
        self
    }

    pub fn after_execute<F>(mut self, f: F) -> Self
    where
        F: Fn(&PoolContext<'_>, &TaskInfo, Option<&TaskError>) + Send + Sync + 'static,
    {
        self.plugin.after_execute = Some(Box::new(f));
        self
    }

    pub fn before_rejected_execution<F>(mut self, f: F) -> Self
    where
        F: Fn(&PoolContext<'_>, &TaskInfo, &Rejection) + Send + Sync + 'static,
    {
        self.plugin.before_rejected_execution = Some(Box::new(f));
        self
    }

    pub fn before_shutdown<F>(mut self, f: F) -> Self
    where
        F: Fn(&PoolContext<'_>) + Send + Sync + 'static,
    {
        self.plugin.before_shutdown = Some(Box::new(f));
        self
    }

    pub fn after_shutdown<F>(mut self, f: F) -> Self
    where
        F: Fn(&PoolContext<'_>, &[TaskInfo]) + Send + Sync + 'static,
    {
        self.plugin.after_shutdown = Some(Box::new(f));
        self
    }

    pub fn after_terminated<F>(mut self, f: F) -> Self
    where
        F: Fn(&PoolContext<'_>) + Send + Sync + 'static,
    {
        self.plugin.after_terminated = Some(Box::new(f));
        self
    }

    pub fn build(self) -> AdaptedPlugin {
        self.plugin
    }
}

impl TaskAware for AdaptedPlugin {
    fn before_task_execute(&self, task: &mut Task) {
        if let Some(hook) = &self.before_task_execute {
            hook(task);
        }
    }
}

impl ExecuteAware for AdaptedPlugin {
    fn before_execute(&self, ctx: &PoolContext<'_>, worker: &Thread, task: &TaskInfo) {
        if let Some(hook) = &self.before_execute {
            hook(ctx, worker, task);
        }
    }

    fn after_execute(&self, ctx: &PoolContext<'_>, task: &TaskInfo, error: Option<&TaskError>) {
        if let Some(hook) = &self.after_execute {
            hook(ctx, task, error);
        }
    }
}

impl RejectedAware for AdaptedPlugin {
    fn before_rejected_execution(&self, ctx: &PoolContext<'_>, task: &TaskInfo, rejection: &Rejection) {
        if let Some(hook) = &self.before_rejected_execution {
            hook(ctx, task, rejection);
        }
    }
}

impl ShutdownAware for AdaptedPlugin {
    fn before_shutdown(&self, ctx: &PoolContext<'_>) {
        if let Some(hook) = &self.before_shutdown {
            hook(ctx);
        }
    }

    fn after_shutdown(&self, ctx: &PoolContext<'_>, remaining: &[TaskInfo]) {
        if let Some(hook) = &self.after_shutdown {
            hook(ctx, remaining);
        }
    }

    fn after_terminated(&self, ctx: &PoolContext<'_>) {
        if let Some(hook) = &self.after_terminated {
            hook(ctx);
        }
    }
}

impl Plugin for AdaptedPlugin {
    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn as_task_aware(&self) -> Option<&dyn TaskAware> {
        self.before_task_execute.as_ref().map(|_| self as &dyn TaskAware)
    }

    fn as_execute_aware(&self) -> Option<&dyn ExecuteAware> {
        (self.before_execute.is_some() || self.after_execute.is_some())
            .then_some(self as &dyn ExecuteAware)
    }

    fn as_rejected_aware(&self) -> Option<&dyn RejectedAware> {
        self.before_rejected_execution
            .as_ref()
            .map(|_| self as &dyn RejectedAware)
    }

    fn as_shutdown_aware(&self) -> Option<&dyn ShutdownAware> {
        (self.before_shutdown.is_some()
            || self.after_shutdown.is_some()
            || self.after_terminated.is_some())
        .then_some(self as &dyn ShutdownAware)
    }

    fn runtime_info(&self) -> PluginRuntimeInfo {
        let points: Vec<String> = self
            .hook_points()
            .into_iter()
            .map(|point| format!("{point:?}"))
            .collect();
        PluginRuntimeInfo::new(&self.id).with_info("hook_points", points.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{capabilities_of, Capability};

    #[test]
    fn test_capabilities_derive_from_bound_closures() {
        let plugin = AdaptedPlugin::builder("adapted")
            .priority(-5)
            .after_execute(|_, _, _| {})
            .after_terminated(|_| {})
            .build();

        assert_eq!(plugin.priority(), -5);
        assert_eq!(
            capabilities_of(&plugin),
            vec![Capability::ExecuteAware, Capability::ShutdownAware]
        );
        assert_eq!(
            plugin.hook_points().into_iter().collect::<Vec<_>>(),
            vec![HookPoint::AfterExecute, HookPoint::AfterTerminated]
        );
    }

    #[test]
    fn test_task_hook_runs_closure() {
        let plugin = AdaptedPlugin::builder("labeler")
            .before_task_execute(|task| task.append_label("!"))
            .build();
        let mut task = Task::labeled("hi", || Ok(()));
        plugin
            .as_task_aware()
            .expect("task aware")
            .before_task_execute(&mut task);
        assert_eq!(task.label(), "hi!");
        assert_eq!(
            plugin.runtime_info().infos.get("hook_points").map(String::as_str),
            Some("BeforeTaskExecute")
        );
    }
}
