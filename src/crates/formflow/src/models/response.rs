use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A submitted form response
///
/// `data` maps field ids to submitted values and keeps insertion order, which
/// the relation label fallback relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    pub form_id: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Response {
    pub fn new(form_id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            form_id: form_id.into(),
            data,
            created_by: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn created_by(mut self, user_id: impl Into<String>) -> Self {
        self.created_by = Some(user_id.into());
        self
    }

    pub fn value(&self, field_id: &str) -> Option<&Value> {
        self.data.get(field_id)
    }
}

/// Join row linking a task to a response submitted for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task_id: String,
    pub response_id: String,
    pub created_at: DateTime<Utc>,
}

impl TaskResponse {
    pub fn new(task_id: impl Into<String>, response_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            response_id: response_id.into(),
            created_at: Utc::now(),
        }
    }
}
