//! Services over the store
//!
//! Each service receives an `Arc<dyn DataStore>` and builds the repositories
//! it needs.

pub mod submission;
pub mod task_aggregation;
pub mod task_status;
pub mod workflow_service;

pub use submission::SubmissionService;
pub use task_aggregation::{Page, TaskAggregationService, TaskFilters};
pub use task_status::TaskStatusService;
pub use workflow_service::{SaveOutcome, WorkflowService, WorkflowStats};
