//! Task status transitions
//!
//! [`TaskStatusEngine`] computes the next status object of a task. It never
//! overwrites the object: the new key is written into a copy and every other
//! key survives unless the transition carries a replacement for it. Legacy
//! rows holding a bare status string start over from `{status: key}`.

use crate::models::{ChangeStatusData, StatusObject, Task, TaskStatus, COMPLETED};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Badge color used when a status carries none
pub const DEFAULT_BADGE_COLOR: &str = "#6b7280";

/// How `completed_at` is handled when a completed task is completed again
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// Keep the first completion time
    #[default]
    PreserveFirst,
    /// Stamp every completion with the current time
    Refresh,
}

/// A requested status change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusTransition {
    pub key: String,
    pub label: Option<String>,
    pub color: Option<String>,
    /// Extra keys written into the status object
    pub extra: Map<String, Value>,
}

impl StatusTransition {
    pub fn to(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Transition described by a `change-status` node; `None` when the node
    /// names no status
    pub fn from_node(data: &ChangeStatusData) -> Option<Self> {
        let key = data.status.as_deref().filter(|k| !k.is_empty())?;
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Some(Self {
            key: key.to_string(),
            label: non_empty(&data.status_label),
            color: non_empty(&data.status_color),
            extra: Map::new(),
        })
    }
}

/// Result of applying a transition to a task
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: StatusObject,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Text and color shown for a status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub text: String,
    pub color: String,
}

impl StatusBadge {
    pub fn for_status(status: &TaskStatus) -> Self {
        match status {
            TaskStatus::Object(obj) => {
                let key = (!obj.status.is_empty()).then_some(obj.status.as_str());
                Self {
                    text: obj
                        .label
                        .as_deref()
                        .or(obj.status_label.as_deref())
                        .or(key)
                        .unwrap_or("unknown")
                        .to_string(),
                    color: obj
                        .color
                        .as_deref()
                        .or(obj.status_color.as_deref())
                        .unwrap_or(DEFAULT_BADGE_COLOR)
                        .to_string(),
                }
            }
            TaskStatus::Legacy(key) => Self {
                text: if key.is_empty() {
                    "unknown".to_string()
                } else {
                    key.clone()
                },
                color: DEFAULT_BADGE_COLOR.to_string(),
            },
        }
    }
}

/// Pure status merge rules
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskStatusEngine {
    policy: CompletionPolicy,
}

impl TaskStatusEngine {
    pub fn new(policy: CompletionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> CompletionPolicy {
        self.policy
    }

    /// Next status object of `task` with its key set to `key`
    pub fn apply_status_change(&self, task: &Task, key: &str) -> StatusObject {
        self.apply_transition(task, &StatusTransition::to(key))
    }

    /// Next status object of `task` under `transition`
    pub fn apply_transition(&self, task: &Task, transition: &StatusTransition) -> StatusObject {
        let mut next = match &task.status {
            TaskStatus::Object(obj) => obj.clone(),
            TaskStatus::Legacy(_) => StatusObject::default(),
        };
        next.status = transition.key.clone();

        if let Some(label) = &transition.label {
            if next.label.is_none() && next.status_label.is_some() {
                next.status_label = Some(label.clone());
            } else {
                next.label = Some(label.clone());
            }
        }
        if let Some(color) = &transition.color {
            if next.color.is_none() && next.status_color.is_some() {
                next.status_color = Some(color.clone());
            } else {
                next.color = Some(color.clone());
            }
        }
        for (k, v) in &transition.extra {
            next.extra.insert(k.clone(), v.clone());
        }
        next
    }

    /// `completed_at` of `task` after moving to `key` at `now`
    pub fn completed_at(
        &self,
        task: &Task,
        key: &str,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if key != COMPLETED {
            return task.completed_at;
        }
        match self.policy {
            CompletionPolicy::PreserveFirst => task.completed_at.or(Some(now)),
            CompletionPolicy::Refresh => Some(now),
        }
    }

    /// Status object and completion time after `transition`
    pub fn plan(&self, task: &Task, transition: &StatusTransition) -> StatusChange {
        StatusChange {
            status: self.apply_transition(task, transition),
            completed_at: self.completed_at(task, &transition.key, Utc::now()),
        }
    }

    pub fn badge(&self, status: &TaskStatus) -> StatusBadge {
        StatusBadge::for_status(status)
    }
}
