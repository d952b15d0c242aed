//! Workflow repository for store operations

use super::{decode_column, from_record, to_record};
use crate::error::{FormflowError, Result};
use crate::models::{Workflow, WorkflowGraph, WorkflowStatus};
use crate::store::{Collection, DataStore, Query, Record, SortDirection};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

/// Repository for workflow definitions
#[derive(Clone)]
pub struct WorkflowRepository {
    store: Arc<dyn DataStore>,
}

impl WorkflowRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    fn decode(mut record: Record) -> Result<Workflow> {
        decode_column(&mut record, "schema");
        from_record(record)
    }

    async fn patch(&self, id: &str, mut patch: Record) -> Result<Workflow> {
        patch.insert("updated_at".to_string(), serde_json::to_value(Utc::now())?);
        let saved = self
            .store
            .update(Collection::Workflows, id, patch)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    FormflowError::not_found("Workflow", id)
                } else {
                    e.into()
                }
            })?;
        Self::decode(saved)
    }

    pub async fn create(&self, workflow: &Workflow) -> Result<Workflow> {
        let saved = self
            .store
            .insert(Collection::Workflows, to_record(workflow)?)
            .await?;
        Self::decode(saved)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Workflow> {
        let record = self
            .store
            .get(Collection::Workflows, id)
            .await?
            .ok_or_else(|| FormflowError::not_found("Workflow", id))?;
        Self::decode(record)
    }

    /// List workflows, newest first, optionally restricted to one status
    pub async fn list(&self, status: Option<WorkflowStatus>) -> Result<Vec<Workflow>> {
        let mut query = Query::new().order_by("created_at", SortDirection::Desc);
        if let Some(status) = status {
            query = query.eq("status", status.as_str());
        }
        self.store
            .list(Collection::Workflows, &query)
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    /// Replace the stored graph
    pub async fn save_graph(&self, id: &str, graph: &WorkflowGraph) -> Result<Workflow> {
        let mut patch = Record::new();
        patch.insert("schema".to_string(), serde_json::to_value(graph)?);
        self.patch(id, patch).await
    }

    pub async fn update_status(&self, id: &str, status: WorkflowStatus) -> Result<Workflow> {
        let mut patch = Record::new();
        patch.insert("status".to_string(), json!(status));
        self.patch(id, patch).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(Collection::Workflows, id).await?;
        Ok(())
    }
}
