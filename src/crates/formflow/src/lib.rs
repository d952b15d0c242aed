//! # formflow
//!
//! Core of a form-and-workflow administration tool: forms that can point at
//! each other through `relation` fields, workflows drawn as graphs of typed
//! steps, and tasks whose open status object is merged as they progress.
//!
//! ## Components
//!
//! - **Models** - forms, responses, workflow graphs, tasks
//! - **RelationResolver** - labelled candidates for relation fields
//! - **WorkflowGraphValidator** - save checks and node statistics
//! - **TaskStatusEngine** - status merge rules and badges
//! - **TaskAggregationService** - a user's tasks as assignee or submitter
//! - **Store** - `DataStore` trait with in-memory and SQLite backends
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use formflow::{FormflowContext, TaskFilters};
//!
//! # async fn example() -> formflow::Result<()> {
//! let config = formflow::config::load_config().await?;
//! formflow::logging::init_tracing(&config.logging);
//!
//! let ctx = FormflowContext::open(config).await?;
//! let page = ctx
//!     .tasks()
//!     .by_assignee("user-1", 1, ctx.default_page_size(), &TaskFilters::default())
//!     .await?;
//! println!("{} of {} tasks", page.data.len(), page.total);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod graph;
pub mod logging;
pub mod models;
pub mod relation;
pub mod repositories;
pub mod services;
pub mod status;
pub mod store;

mod error;

pub use config::FormflowConfig;
pub use context::FormflowContext;
pub use graph::{GraphIssue, GraphReport, HandleSpec, NodeStats, WorkflowGraphValidator};
pub use relation::{Candidate, CandidateList, RelationFieldState, RelationResolver, RelationState};
pub use services::{
    Page, SaveOutcome, SubmissionService, TaskAggregationService, TaskFilters, TaskStatusService,
    WorkflowService,
};
pub use status::{CompletionPolicy, StatusBadge, StatusTransition, TaskStatusEngine};
pub use store::{DataStore, MemoryStore, SqliteStore, StoreError};

pub use error::{FormflowError, Result};
