//! Service context
//!
//! Wires one store and one configuration into every service.

use crate::config::FormflowConfig;
use crate::error::Result;
use crate::relation::RelationResolver;
use crate::repositories::{FormRepository, ResponseRepository};
use crate::services::{
    SubmissionService, TaskAggregationService, TaskStatusService, WorkflowService,
};
use crate::store::{DataStore, SqliteStore};
use std::sync::Arc;
use tracing::info;

/// Every service, sharing one store
#[derive(Clone)]
pub struct FormflowContext {
    config: FormflowConfig,
    store: Arc<dyn DataStore>,
    forms: FormRepository,
    responses: ResponseRepository,
    relations: RelationResolver,
    workflows: WorkflowService,
    task_status: TaskStatusService,
    tasks: TaskAggregationService,
    submissions: SubmissionService,
}

impl FormflowContext {
    /// Build the services over an existing store
    pub fn with_store(store: Arc<dyn DataStore>, config: FormflowConfig) -> Self {
        Self {
            forms: FormRepository::new(store.clone()),
            responses: ResponseRepository::new(store.clone()),
            relations: RelationResolver::new(store.clone()),
            workflows: WorkflowService::new(store.clone()),
            task_status: TaskStatusService::new(store.clone(), config.tasks.completion_policy),
            tasks: TaskAggregationService::new(store.clone())
                .with_max_page_size(config.tasks.max_page_size),
            submissions: SubmissionService::new(store.clone()),
            store,
            config,
        }
    }

    /// Open the configured SQLite database, run migrations and build the services
    pub async fn open(config: FormflowConfig) -> Result<Self> {
        config.validate()?;
        let store = SqliteStore::initialize(&config.database.url, config.database.max_connections)
            .await?;
        info!(url = %config.database.url, "Formflow context ready");
        Ok(Self::with_store(Arc::new(store), config))
    }

    pub fn config(&self) -> &FormflowConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DataStore> {
        &self.store
    }

    pub fn forms(&self) -> &FormRepository {
        &self.forms
    }

    pub fn responses(&self) -> &ResponseRepository {
        &self.responses
    }

    pub fn relations(&self) -> &RelationResolver {
        &self.relations
    }

    pub fn workflows(&self) -> &WorkflowService {
        &self.workflows
    }

    pub fn task_status(&self) -> &TaskStatusService {
        &self.task_status
    }

    pub fn tasks(&self) -> &TaskAggregationService {
        &self.tasks
    }

    pub fn submissions(&self) -> &SubmissionService {
        &self.submissions
    }

    /// Page size to use when the caller gives none
    pub fn default_page_size(&self) -> u32 {
        self.config.tasks.default_page_size
    }
}
