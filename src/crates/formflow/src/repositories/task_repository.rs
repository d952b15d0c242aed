//! Task repository for store operations

use super::{decode_column, from_record, to_record};
use crate::error::{FormflowError, Result};
use crate::models::{Task, TaskStatus, TaskStep};
use crate::store::{parse_if_string, Collection, DataStore, Query, Record};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

/// Repository for task records
#[derive(Clone)]
pub struct TaskRepository {
    store: Arc<dyn DataStore>,
}

impl TaskRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Decode a task record
    ///
    /// `status` and `task_data` keep their raw value when they do not parse;
    /// an unusable `step` becomes an empty step holding the stored value
    /// under `extra["raw"]`.
    pub(crate) fn decode(mut record: Record) -> Result<Task> {
        decode_column(&mut record, "status");
        decode_column(&mut record, "task_data");
        if let Some(raw) = record.remove("step") {
            let step = match parse_if_string::<TaskStep>(raw.clone()) {
                Ok(step) => step,
                Err(e) => {
                    tracing::warn!(column = "step", error = %e, "Keeping undecodable step as raw");
                    let mut step = TaskStep::default();
                    step.extra.insert("raw".to_string(), raw);
                    step
                }
            };
            record.insert("step".to_string(), serde_json::to_value(step)?);
        }
        from_record(record)
    }

    fn encode(task: &Task) -> Result<Record> {
        let mut record = to_record(task)?;
        record.remove("responses");
        Ok(record)
    }

    pub async fn create(&self, task: &Task) -> Result<Task> {
        let saved = self
            .store
            .insert(Collection::Tasks, Self::encode(task)?)
            .await?;
        Self::decode(saved)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Task> {
        let record = self
            .store
            .get(Collection::Tasks, id)
            .await?
            .ok_or_else(|| FormflowError::not_found("Task", id))?;
        Self::decode(record)
    }

    /// Tasks matching `query`, in the order the store returns them
    pub async fn list(&self, query: &Query) -> Result<Vec<Task>> {
        self.store
            .list(Collection::Tasks, query)
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    /// Number of tasks matching the filters of `query`
    pub async fn count(&self, query: &Query) -> Result<u64> {
        Ok(self.store.count(Collection::Tasks, query).await?)
    }

    /// Persist a new status and completion timestamp
    pub async fn update_status(
        &self,
        id: &str,
        status: &TaskStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Task> {
        let mut patch = Record::new();
        patch.insert("status".to_string(), serde_json::to_value(status)?);
        patch.insert(
            "completed_at".to_string(),
            completed_at.map_or(Ok(Value::Null), serde_json::to_value)?,
        );
        patch.insert("updated_at".to_string(), serde_json::to_value(Utc::now())?);
        let saved = self
            .store
            .update(Collection::Tasks, id, patch)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    FormflowError::not_found("Task", id)
                } else {
                    e.into()
                }
            })?;
        Self::decode(saved)
    }

    /// Delete a task and its response links
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store
            .delete_matching(Collection::TaskResponses, &Query::new().eq("task_id", id))
            .await?;
        self.store.delete(Collection::Tasks, id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StatusObject;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_legacy_columns_are_decoded() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert(
                Collection::Tasks,
                json!({
                    "id": "t1",
                    "step": "{\"step_id\":\"n1\",\"step_name\":\"Review\"}",
                    "assigned_to": "u1",
                    "created_by": "u2",
                    "status": "{\"status\":\"pending\",\"label\":\"Waiting\"}",
                    "task_data": "{\"amount\": 12}",
                    "created_at": "2024-01-01T00:00:00Z",
                    "updated_at": "2024-01-01T00:00:00Z"
                })
                .as_object()
                .cloned()
                .unwrap(),
            )
            .await
            .unwrap();

        let task = TaskRepository::new(store).find_by_id("t1").await.unwrap();
        assert_eq!(task.step.step_name, "Review");
        assert_eq!(
            task.status,
            TaskStatus::Object(StatusObject::new("pending").with_label("Waiting"))
        );
        assert_eq!(task.task_data, json!({"amount": 12}));
    }

    #[tokio::test]
    async fn test_unparseable_columns_keep_raw_values() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert(
                Collection::Tasks,
                json!({
                    "id": "t1",
                    "step": 7,
                    "assigned_to": "u1",
                    "created_by": "u2",
                    "status": "in_progress",
                    "task_data": "{broken",
                    "created_at": "2024-01-01T00:00:00Z",
                    "updated_at": "2024-01-01T00:00:00Z"
                })
                .as_object()
                .cloned()
                .unwrap(),
            )
            .await
            .unwrap();

        let task = TaskRepository::new(store).find_by_id("t1").await.unwrap();
        assert_eq!(task.status, TaskStatus::Legacy("in_progress".to_string()));
        assert_eq!(task.task_data, json!("{broken"));
        assert!(task.step.step_name.is_empty());
        assert_eq!(task.step.extra.get("raw"), Some(&json!(7)));
    }

    #[tokio::test]
    async fn test_raw_step_survives_status_update() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert(
                Collection::Tasks,
                json!({
                    "id": "t1",
                    "step": "[\"n1\", \"Review\"]",
                    "assigned_to": "u1",
                    "created_by": "u2",
                    "status": "1",
                    "created_at": "2024-01-01T00:00:00Z",
                    "updated_at": "2024-01-01T00:00:00Z"
                })
                .as_object()
                .cloned()
                .unwrap(),
            )
            .await
            .unwrap();
        let repo = TaskRepository::new(store);

        let task = repo.find_by_id("t1").await.unwrap();
        assert_eq!(task.status, TaskStatus::Legacy("1".to_string()));
        assert_eq!(task.step.extra["raw"], json!("[\"n1\", \"Review\"]"));

        let status = TaskStatus::from(StatusObject::new("completed"));
        repo.update_status("t1", &status, None).await.unwrap();
        let again = repo.find_by_id("t1").await.unwrap();
        assert!(again.status.is_completed());
        assert_eq!(again.step.extra["raw"], json!("[\"n1\", \"Review\"]"));
    }

    #[tokio::test]
    async fn test_delete_cascades_links() {
        let store = Arc::new(MemoryStore::new());
        let repo = TaskRepository::new(store.clone());
        let task = Task::new(TaskStep::new("n1", "Fill"), "u1", "u2");
        repo.create(&task).await.unwrap();
        store
            .insert(
                Collection::TaskResponses,
                json!({"task_id": task.id, "response_id": "r1"})
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .unwrap();

        repo.delete(&task.id).await.unwrap();
        assert_eq!(store.len(Collection::TaskResponses).await, 0);
        assert!(repo.find_by_id(&task.id).await.unwrap_err().is_not_found());
    }
}
