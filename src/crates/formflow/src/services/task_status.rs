//! Task status changes
//!
//! Wraps [`TaskStatusEngine`] with persistence. The caller's task is only
//! touched after the store accepted the new status, so a failed write leaves
//! it exactly as it was.

use crate::error::{FormflowError, Result};
use crate::models::{NodeKind, Task, TaskStatus, WorkflowNode};
use crate::repositories::TaskRepository;
use crate::status::{CompletionPolicy, StatusTransition, TaskStatusEngine};
use crate::store::DataStore;
use std::sync::Arc;
use tracing::{error, info};

/// Applies status transitions to stored tasks
#[derive(Clone)]
pub struct TaskStatusService {
    tasks: TaskRepository,
    engine: TaskStatusEngine,
}

impl TaskStatusService {
    pub fn new(store: Arc<dyn DataStore>, policy: CompletionPolicy) -> Self {
        Self {
            tasks: TaskRepository::new(store),
            engine: TaskStatusEngine::new(policy),
        }
    }

    pub fn engine(&self) -> &TaskStatusEngine {
        &self.engine
    }

    /// Move `task` to status `key`
    pub async fn change_status(&self, task: &mut Task, key: &str) -> Result<()> {
        self.apply(task, &StatusTransition::to(key)).await
    }

    /// Apply a transition, persisting it before updating `task`
    pub async fn apply(&self, task: &mut Task, transition: &StatusTransition) -> Result<()> {
        if transition.key.is_empty() {
            return Err(FormflowError::validation("status key must not be empty"));
        }
        let change = self.engine.plan(task, transition);
        let status = TaskStatus::Object(change.status);

        let saved = self
            .tasks
            .update_status(&task.id, &status, change.completed_at)
            .await
            .map_err(|e| {
                error!(task_id = %task.id, status = %transition.key, error = %e, "Failed to persist task status");
                e
            })?;

        task.status = saved.status;
        task.completed_at = saved.completed_at;
        task.updated_at = saved.updated_at;
        info!(task_id = %task.id, status = %transition.key, "Task status changed");
        Ok(())
    }

    /// Apply the status carried by a `change-status` node
    pub async fn apply_node(&self, task: &mut Task, node: &WorkflowNode) -> Result<()> {
        let NodeKind::ChangeStatus(data) = &node.kind else {
            return Err(FormflowError::validation(format!(
                "node '{}' is a {} node, not change-status",
                node.id,
                node.type_name()
            )));
        };
        let transition = StatusTransition::from_node(data).ok_or_else(|| {
            FormflowError::validation(format!("change-status node '{}' names no status", node.id))
        })?;
        self.apply(task, &transition).await
    }
}
