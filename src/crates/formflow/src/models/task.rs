//! Task records
//!
//! A [`Task`] is produced by a workflow step and assigned to a user. Its
//! `status` is an open JSON object: the engine only owns the `status` key and
//! every other key written by a step or the UI is carried along untouched.

use super::Response;
use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Status key of a finished task
pub const COMPLETED: &str = "completed";

/// Status key of a freshly created task
pub const PENDING: &str = "pending";

/// Workflow step a task was created for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStep {
    #[serde(default)]
    pub step_id: String,
    #[serde(default)]
    pub step_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskStep {
    pub fn new(step_id: impl Into<String>, step_name: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            step_name: step_name.into(),
            form_id: None,
            extra: Map::new(),
        }
    }

    pub fn with_form(mut self, form_id: impl Into<String>) -> Self {
        self.form_id = Some(form_id.into());
        self
    }
}

/// Open status object
///
/// `status` is the machine key. Display hints come in two spellings
/// (`label`/`color` and `statusLabel`/`statusColor`); any other key is kept
/// in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusObject {
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(
        rename = "statusLabel",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub status_label: Option<String>,
    #[serde(
        rename = "statusColor",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub status_color: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StatusObject {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
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
}

/// Stored task status: an open object, or a bare key on legacy rows
///
/// Decoding never fails on scalars: legacy rows holding `1`, `true` or
/// similar become a [`TaskStatus::Legacy`] key and `null` is pending.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TaskStatus {
    Object(StatusObject),
    Legacy(String),
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Object(map) => {
                let obj = serde_json::from_value(Value::Object(map)).map_err(D::Error::custom)?;
                Self::Object(obj)
            }
            Value::String(key) => Self::Legacy(key),
            Value::Null => Self::default(),
            other => Self::Legacy(other.to_string()),
        })
    }
}

impl TaskStatus {
    /// Machine status key, if any
    pub fn key(&self) -> Option<&str> {
        let key = match self {
            Self::Object(obj) => obj.status.as_str(),
            Self::Legacy(key) => key.as_str(),
        };
        (!key.is_empty()).then_some(key)
    }

    pub fn is_completed(&self) -> bool {
        self.key() == Some(COMPLETED)
    }

    pub fn as_object(&self) -> Option<&StatusObject> {
        match self {
            Self::Object(obj) => Some(obj),
            Self::Legacy(_) => None,
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Object(StatusObject::new(PENDING))
    }
}

impl From<StatusObject> for TaskStatus {
    fn from(obj: StatusObject) -> Self {
        Self::Object(obj)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key().unwrap_or("unknown"))
    }
}

/// A unit of work produced by a workflow step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub step: TaskStep,
    pub assigned_to: String,
    pub created_by: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub task_data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Linked responses, oldest first; filled by task listings, never stored
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responses: Vec<Response>,
}

impl Task {
    pub fn new(
        step: TaskStep,
        assigned_to: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workflow_id: None,
            step,
            assigned_to: assigned_to.into(),
            created_by: created_by.into(),
            status: TaskStatus::default(),
            task_data: Value::Object(Map::new()),
            due_date: None,
            completed_at: None,
            notes: None,
            created_at: now,
            updated_at: now,
            responses: Vec::new(),
        }
    }

    pub fn with_workflow(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<TaskStatus>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_object_keeps_unknown_keys() {
        let raw = json!({
            "status": "in_review",
            "statusLabel": "In review",
            "statusColor": "#f59e0b",
            "reviewer": "u-9"
        });
        let status: TaskStatus = serde_json::from_value(raw.clone()).unwrap();
        let obj = status.as_object().unwrap();
        assert_eq!(obj.status_label.as_deref(), Some("In review"));
        assert_eq!(obj.extra["reviewer"], json!("u-9"));
        assert_eq!(serde_json::to_value(&status).unwrap(), raw);
    }

    #[test]
    fn test_legacy_string_status() {
        let status: TaskStatus = serde_json::from_value(json!("completed")).unwrap();
        assert_eq!(status, TaskStatus::Legacy("completed".to_string()));
        assert!(status.is_completed());
        assert_eq!(status.to_string(), "completed");
    }

    #[test]
    fn test_step_extra_fields() {
        let step: TaskStep = serde_json::from_value(json!({
            "step_id": "n3",
            "step_name": "Fill intake",
            "form_id": "f1",
            "node_type": "fill-form"
        }))
        .unwrap();
        assert_eq!(step.form_id.as_deref(), Some("f1"));
        assert_eq!(step.extra["node_type"], json!("fill-form"));
    }

    #[test]
    fn test_scalar_status_becomes_legacy_key() {
        let numeric: TaskStatus = serde_json::from_value(json!(1)).unwrap();
        assert_eq!(numeric, TaskStatus::Legacy("1".to_string()));
        let flag: TaskStatus = serde_json::from_value(json!(true)).unwrap();
        assert_eq!(flag.key(), Some("true"));
        let missing: TaskStatus = serde_json::from_value(Value::Null).unwrap();
        assert_eq!(missing, TaskStatus::default());
    }

    #[test]
    fn test_new_task_is_pending() {
        let task = Task::new(TaskStep::new("s1", "Review"), "u1", "u2");
        assert_eq!(task.status.key(), Some(PENDING));
        assert!(task.completed_at.is_none());
        assert!(task.responses.is_empty());
        let value = serde_json::to_value(&task).unwrap();
        assert!(value.get("responses").is_none());
    }
}
