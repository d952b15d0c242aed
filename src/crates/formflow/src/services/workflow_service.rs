//! Workflow lifecycle
//!
//! Saving a graph runs the validator first. Blocking errors reject the save;
//! warnings hold it back until the caller saves again with `confirmed` set.

use crate::error::{FormflowError, Result};
use crate::graph::{GraphReport, NodeStats, WorkflowGraphValidator};
use crate::models::{Workflow, WorkflowGraph, WorkflowStatus};
use crate::repositories::WorkflowRepository;
use crate::store::DataStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of [`WorkflowService::save_graph`]
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved(Workflow),
    /// Nothing was written; the report lists what the user must confirm
    NeedsConfirmation(GraphReport),
}

/// Statistics of a stored workflow
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowStats {
    pub stats: NodeStats,
    /// Set when the workflow could not be loaded
    pub warning: Option<String>,
}

/// Create, edit and toggle workflows
#[derive(Clone)]
pub struct WorkflowService {
    workflows: WorkflowRepository,
    validator: WorkflowGraphValidator,
}

impl WorkflowService {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            workflows: WorkflowRepository::new(store),
            validator: WorkflowGraphValidator::new(),
        }
    }

    /// Store a new draft workflow
    pub async fn create(&self, workflow: Workflow) -> Result<Workflow> {
        if workflow.name.trim().is_empty() {
            return Err(FormflowError::validation("workflow name is required"));
        }
        let saved = self.workflows.create(&workflow).await?;
        info!(workflow_id = %saved.id, name = %saved.name, "Created workflow");
        Ok(saved)
    }

    pub async fn get(&self, id: &str) -> Result<Workflow> {
        self.workflows.find_by_id(id).await
    }

    pub async fn list(&self, status: Option<WorkflowStatus>) -> Result<Vec<Workflow>> {
        self.workflows.list(status).await
    }

    /// Validate and store a new graph for workflow `id`
    pub async fn save_graph(
        &self,
        id: &str,
        graph: &WorkflowGraph,
        confirmed: bool,
    ) -> Result<SaveOutcome> {
        let report = self.validator.validate_for_save(graph);
        if !report.ok() {
            return Err(FormflowError::validation(report.error_messages().join("; ")));
        }
        if report.needs_confirmation() && !confirmed {
            info!(
                workflow_id = %id,
                warnings = report.warnings.len(),
                "Graph save needs confirmation"
            );
            return Ok(SaveOutcome::NeedsConfirmation(report));
        }

        let saved = self.workflows.save_graph(id, graph).await?;
        info!(workflow_id = %id, nodes = graph.nodes.len(), edges = graph.edges.len(), "Saved workflow graph");
        Ok(SaveOutcome::Saved(saved))
    }

    /// Activate a draft or inactive workflow, deactivate an active one
    pub async fn toggle_status(&self, id: &str) -> Result<Workflow> {
        let workflow = self.workflows.find_by_id(id).await?;
        let next = workflow.status.toggled()?;
        let saved = self.workflows.update_status(id, next).await?;
        info!(workflow_id = %id, from = %workflow.status, to = %next, "Toggled workflow status");
        Ok(saved)
    }

    pub async fn archive(&self, id: &str) -> Result<Workflow> {
        let workflow = self.workflows.find_by_id(id).await?;
        if workflow.status == WorkflowStatus::Archived {
            return Ok(workflow);
        }
        let saved = self
            .workflows
            .update_status(id, WorkflowStatus::Archived)
            .await?;
        info!(workflow_id = %id, "Archived workflow");
        Ok(saved)
    }

    /// Node statistics of a stored workflow; load failures yield empty stats
    pub async fn stats(&self, id: &str) -> WorkflowStats {
        match self.workflows.find_by_id(id).await {
            Ok(workflow) => WorkflowStats {
                stats: self.validator.stats(&workflow.schema),
                warning: None,
            },
            Err(e) => {
                warn!(workflow_id = %id, error = %e, "Failed to load workflow for statistics");
                WorkflowStats {
                    stats: NodeStats::default(),
                    warning: Some(e.to_string()),
                }
            }
        }
    }
}
