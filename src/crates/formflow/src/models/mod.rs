//! Domain models
//!
//! Persisted shapes for forms, responses, workflows and tasks. Row-level
//! columns are snake_case; the embedded schema documents keep the camelCase
//! names of the editors that produce them.

mod form;
mod response;
mod task;
mod workflow;

pub use form::{
    FieldKind, FieldType, Form, FormField, FormSchema, RelationConfig, SchemaIssue, SchemaReport,
};
pub use response::{Response, TaskResponse};
pub use task::{StatusObject, Task, TaskStatus, TaskStep, COMPLETED, PENDING};
pub use workflow::{
    condition_handle_id, condition_handle_index, AssignTaskData, ChangeStatusData,
    ConditionData, ConditionRule, FillFormData, FormRef, LabelData, NodeKind, Position, RoleRef,
    Workflow, WorkflowEdge, WorkflowGraph, WorkflowNode, WorkflowStatus,
    DEFAULT_CONDITION_HANDLE,
};
