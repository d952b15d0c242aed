//! Task-response join repository

use super::{from_record, to_record};
use crate::error::Result;
use crate::models::TaskResponse;
use crate::store::{Collection, DataStore, Query};
use std::collections::HashSet;
use std::sync::Arc;

/// Repository for task/response links
#[derive(Clone)]
pub struct TaskResponseRepository {
    store: Arc<dyn DataStore>,
}

impl TaskResponseRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Link a response to a task
    pub async fn link(&self, task_id: &str, response_id: &str) -> Result<TaskResponse> {
        let link = TaskResponse::new(task_id, response_id);
        self.store
            .insert(Collection::TaskResponses, to_record(&link)?)
            .await?;
        Ok(link)
    }

    /// Links of the given tasks
    pub async fn for_tasks(&self, task_ids: &[String]) -> Result<Vec<TaskResponse>> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = Query::new().is_in("task_id", task_ids.iter().cloned());
        self.store
            .list(Collection::TaskResponses, &query)
            .await?
            .into_iter()
            .map(from_record)
            .collect()
    }

    /// Distinct ids of tasks linked to any of `response_ids`, in link order
    pub async fn task_ids_for_responses(&self, response_ids: &[String]) -> Result<Vec<String>> {
        if response_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = Query::new().is_in("response_id", response_ids.iter().cloned());
        let links = self.store.list(Collection::TaskResponses, &query).await?;

        let mut seen = HashSet::new();
        Ok(links
            .iter()
            .filter_map(|link| link.get("task_id").and_then(|v| v.as_str()))
            .filter(|id| seen.insert(id.to_string()))
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_task_ids_are_distinct() {
        let repo = TaskResponseRepository::new(Arc::new(MemoryStore::new()));
        repo.link("t1", "r1").await.unwrap();
        repo.link("t1", "r2").await.unwrap();
        repo.link("t2", "r3").await.unwrap();

        let ids = repo
            .task_ids_for_responses(&["r1".to_string(), "r2".to_string(), "r3".to_string()])
            .await
            .unwrap();
        assert_eq!(ids, vec!["t1", "t2"]);

        let links = repo.for_tasks(&["t1".to_string()]).await.unwrap();
        assert_eq!(links.len(), 2);
        assert!(repo.task_ids_for_responses(&[]).await.unwrap().is_empty());
    }
}
