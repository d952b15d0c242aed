//! Workflow definitions
//!
//! A [`Workflow`] stores its definition as a [`WorkflowGraph`] in the
//! `schema` column. Nodes use the `{ id, type, position, data }` wire shape of
//! the graph editor; the `type`/`data` pair is decoded into the closed
//! [`NodeKind`] sum type.

use crate::error::{FormflowError, Result};
use crate::models::FieldType;
use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Source handle of a condition node without rules
pub const DEFAULT_CONDITION_HANDLE: &str = "default";

const CONDITION_HANDLE_PREFIX: &str = "condition-";

/// Handle id of the `index`-th condition branch
pub fn condition_handle_id(index: usize) -> String {
    format!("{}{}", CONDITION_HANDLE_PREFIX, index)
}

/// Branch index encoded in a `condition-{i}` handle id
pub fn condition_handle_index(handle: &str) -> Option<usize> {
    handle.strip_prefix(CONDITION_HANDLE_PREFIX)?.parse().ok()
}

/// Lifecycle status of a workflow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    #[default]
    Draft,
    Active,
    Inactive,
    Archived,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Archived => "archived",
        }
    }

    /// Status after an activate/deactivate toggle
    ///
    /// Draft and inactive workflows become active, active ones inactive.
    /// Archived is terminal.
    pub fn toggled(self) -> Result<WorkflowStatus> {
        match self {
            Self::Draft | Self::Inactive => Ok(Self::Active),
            Self::Active => Ok(Self::Inactive),
            Self::Archived => Err(FormflowError::InvalidStateTransition {
                from: self.to_string(),
                to: Self::Active.to_string(),
            }),
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A workflow definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub schema: WorkflowGraph,
    #[serde(default)]
    pub trigger_form: Option<String>,
    #[serde(default)]
    pub status: WorkflowStatus,
    #[serde(default)]
    pub active_instances: u64,
    #[serde(default)]
    pub completed_instances: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            schema: WorkflowGraph::default(),
            trigger_form: None,
            status: WorkflowStatus::Draft,
            active_instances: 0,
            completed_instances: 0,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_trigger_form(mut self, form_id: impl Into<String>) -> Self {
        self.trigger_form = Some(form_id.into());
        self
    }

    pub fn with_graph(mut self, graph: WorkflowGraph) -> Self {
        self.schema = graph;
        self
    }
}

/// Canvas position of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// `{ id, title }` reference to a form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormRef {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// `{ id, name }` reference to a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A rule on a condition node; each rule is one outgoing branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionRule {
    pub field_id: String,
    #[serde(default)]
    pub field_label: String,
    pub field_type: FieldType,
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

/// Data of `start` and `end` nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FillFormData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<FormRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub condition_rules: Vec<ConditionRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStatusData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub status_label: String,
    #[serde(default)]
    pub status_color: String,
    #[serde(default)]
    pub change_assignee: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignTaskData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleRef>,
}

/// Typed step of a workflow
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Start(LabelData),
    End(LabelData),
    FillForm(FillFormData),
    Condition(ConditionData),
    ChangeStatus(ChangeStatusData),
    AssignTask(AssignTaskData),
}

impl NodeKind {
    /// Wire name used in the `type` field
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Start(_) => "start",
            Self::End(_) => "end",
            Self::FillForm(_) => "fill-form",
            Self::Condition(_) => "condition",
            Self::ChangeStatus(_) => "change-status",
            Self::AssignTask(_) => "assign-task",
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Start(d) | Self::End(d) => d.label.as_deref(),
            Self::FillForm(d) => d.label.as_deref(),
            Self::Condition(d) => d.label.as_deref(),
            Self::ChangeStatus(d) => d.label.as_deref(),
            Self::AssignTask(d) => d.label.as_deref(),
        }
    }

    fn from_wire(node_type: &str, data: Value) -> Result<Self> {
        let data = match data {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        Ok(match node_type {
            "start" => Self::Start(serde_json::from_value(data)?),
            "end" => Self::End(serde_json::from_value(data)?),
            "fill-form" => Self::FillForm(serde_json::from_value(data)?),
            "condition" => Self::Condition(serde_json::from_value(data)?),
            "change-status" => Self::ChangeStatus(serde_json::from_value(data)?),
            "assign-task" => Self::AssignTask(serde_json::from_value(data)?),
            other => {
                return Err(FormflowError::validation(format!(
                    "unknown node type '{}'",
                    other
                )))
            }
        })
    }
}

/// A workflow step placed on the canvas
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawNode")]
pub struct WorkflowNode {
    pub id: String,
    pub position: Position,
    pub kind: NodeKind,
}

#[derive(Deserialize)]
struct RawNode {
    id: String,
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default)]
    position: Position,
    #[serde(default)]
    data: Value,
}

impl TryFrom<RawNode> for WorkflowNode {
    type Error = FormflowError;

    fn try_from(raw: RawNode) -> Result<Self> {
        Ok(Self {
            kind: NodeKind::from_wire(&raw.node_type, raw.data)?,
            id: raw.id,
            position: raw.position,
        })
    }
}

impl Serialize for WorkflowNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut node = serializer.serialize_struct("WorkflowNode", 4)?;
        node.serialize_field("id", &self.id)?;
        node.serialize_field("type", self.kind.type_name())?;
        node.serialize_field("position", &self.position)?;
        match &self.kind {
            NodeKind::Start(data) | NodeKind::End(data) => node.serialize_field("data", data)?,
            NodeKind::FillForm(data) => node.serialize_field("data", data)?,
            NodeKind::Condition(data) => node.serialize_field("data", data)?,
            NodeKind::ChangeStatus(data) => node.serialize_field("data", data)?,
            NodeKind::AssignTask(data) => node.serialize_field("data", data)?,
        }
        node.end()
    }
}

impl WorkflowNode {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            position: Position::default(),
            kind,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position { x, y };
        self
    }

    pub fn start(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Start(LabelData::default()))
    }

    pub fn end(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::End(LabelData::default()))
    }

    pub fn fill_form(id: impl Into<String>, form: Option<FormRef>) -> Self {
        Self::new(id, NodeKind::FillForm(FillFormData { label: None, form }))
    }

    pub fn condition(id: impl Into<String>, rules: Vec<ConditionRule>) -> Self {
        Self::new(
            id,
            NodeKind::Condition(ConditionData {
                label: None,
                condition_rules: rules,
            }),
        )
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Whether an edge may leave this node through `handle`
    ///
    /// Condition nodes expose one handle per rule (`condition-{i}`), or the
    /// default handle when they have no rules. Other nodes have a single
    /// unnamed handle and accept any value.
    pub fn accepts_source_handle(&self, handle: Option<&str>) -> bool {
        let NodeKind::Condition(data) = &self.kind else {
            return true;
        };
        let rules = data.condition_rules.len();
        match handle {
            Some(h) => match condition_handle_index(h) {
                Some(index) => index < rules,
                None => rules == 0 && h == DEFAULT_CONDITION_HANDLE,
            },
            None => rules == 0,
        }
    }
}

/// A directed connection between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

/// Workflow definition graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub edges: Vec<WorkflowEdge>,
}

impl WorkflowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn has_start(&self) -> bool {
        self.nodes
            .iter()
            .any(|n| matches!(n.kind, NodeKind::Start(_)))
    }

    pub fn add_node(&mut self, node: WorkflowNode) -> Result<()> {
        if self.node(&node.id).is_some() {
            return Err(FormflowError::validation(format!(
                "node id '{}' already exists",
                node.id
            )));
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Remove a node together with every edge touching it
    pub fn remove_node(&mut self, id: &str) -> Result<WorkflowNode> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| FormflowError::not_found("Node", id))?;
        self.edges.retain(|e| e.source != id && e.target != id);
        Ok(self.nodes.remove(index))
    }

    /// Add an edge from `source` (leaving through `source_handle`) to `target`
    pub fn connect(
        &mut self,
        source: &str,
        target: &str,
        source_handle: Option<&str>,
    ) -> Result<&WorkflowEdge> {
        let from = self
            .node(source)
            .ok_or_else(|| FormflowError::not_found("Node", source))?;
        if self.node(target).is_none() {
            return Err(FormflowError::not_found("Node", target));
        }
        if !from.accepts_source_handle(source_handle) {
            return Err(FormflowError::validation(format!(
                "node '{}' has no handle '{}'",
                source,
                source_handle.unwrap_or("")
            )));
        }

        let id = match source_handle {
            Some(handle) => format!("e-{}-{}-{}", source, handle, target),
            None => format!("e-{}-{}", source, target),
        };
        if self.edges.iter().any(|e| e.id == id) {
            return Err(FormflowError::validation(format!(
                "edge '{}' already exists",
                id
            )));
        }
        self.edges.push(WorkflowEdge {
            id,
            source: source.to_string(),
            target: target.to_string(),
            source_handle: source_handle.map(str::to_string),
            target_handle: None,
        });
        Ok(&self.edges[self.edges.len() - 1])
    }

    /// Replace the rules of a condition node
    ///
    /// Outgoing edges whose branch no longer exists are removed; returns how
    /// many were dropped.
    pub fn set_condition_rules(
        &mut self,
        node_id: &str,
        rules: Vec<ConditionRule>,
    ) -> Result<usize> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.id == node_id)
            .ok_or_else(|| FormflowError::not_found("Node", node_id))?;
        let NodeKind::Condition(data) = &mut node.kind else {
            return Err(FormflowError::validation(format!(
                "node '{}' is not a condition",
                node_id
            )));
        };
        data.condition_rules = rules;

        let node = node.clone();
        let before = self.edges.len();
        self.edges.retain(|e| {
            e.source != node_id || node.accepts_source_handle(e.source_handle.as_deref())
        });
        Ok(before - self.edges.len())
    }
}
