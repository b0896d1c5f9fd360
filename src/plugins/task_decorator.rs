//! Task decoration: wraps every submitted task body with a chain of decorators.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::constants::plugin_ids;
use crate::plugin::{Plugin, PluginRuntimeInfo, TaskAware};
use crate::task::{Task, TaskBody};

/// Wraps a task body, e.g. to propagate context onto the worker thread
pub trait TaskDecorator: Send + Sync {
    fn decorate(&self, body: TaskBody) -> TaskBody;
}

impl<F> TaskDecorator for F
where
    F: Fn(TaskBody) -> TaskBody + Send + Sync,
{
    fn decorate(&self, body: TaskBody) -> TaskBody {
        self(body)
    }
}

/// Applies its decorators in insertion order; the last one added is outermost
#[derive(Default)]
pub struct TaskDecoratorPlugin {
    decorators: RwLock<Vec<Arc<dyn TaskDecorator>>>,
}

impl TaskDecoratorPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_decorator(&self, decorator: Arc<dyn TaskDecorator>) {
        self.decorators.write().push(decorator);
    }

    pub fn clear_decorators(&self) {
        self.decorators.write().clear();
    }

    pub fn decorators(&self) -> Vec<Arc<dyn TaskDecorator>> {
        self.decorators.read().clone()
    }
}

impl TaskAware for TaskDecoratorPlugin {
    fn before_task_execute(&self, task: &mut Task) {
        let decorators = self.decorators();
        if decorators.is_empty() {
            return;
        }
        task.decorate(|body| {
            decorators
                .iter()
                .fold(body, |body, decorator| decorator.decorate(body))
        });
    }
}

impl Plugin for TaskDecoratorPlugin {
    fn id(&self) -> &str {
        plugin_ids::TASK_DECORATOR
    }

    fn as_task_aware(&self) -> Option<&dyn TaskAware> {
        Some(self)
    }

    fn runtime_info(&self) -> PluginRuntimeInfo {
        PluginRuntimeInfo::new(self.id()).with_info("decorators", self.decorators.read().len())
    }
}
