//! Workflow graph validation and statistics
//!
//! Saving a workflow is gated on [`WorkflowGraphValidator::validate_for_save`]:
//! a graph without a `start` node is rejected, every other finding is a
//! warning the user has to confirm. Nothing here mutates the graph.

use crate::models::{condition_handle_id, NodeKind, WorkflowGraph, WorkflowNode};
use crate::models::DEFAULT_CONDITION_HANDLE;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// A finding of the graph validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphIssue {
    MissingStart,
    MissingEnd,
    DuplicateNodeId(String),
    DanglingEdge { edge_id: String, node_id: String },
    InvalidHandle { edge_id: String, handle: Option<String> },
    FillFormWithoutForm { node_id: String },
    AssignTaskWithoutRole { node_id: String },
}

impl fmt::Display for GraphIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingStart => write!(f, "missing start node"),
            Self::MissingEnd => write!(f, "missing end node"),
            Self::DuplicateNodeId(id) => write!(f, "duplicate node id '{}'", id),
            Self::DanglingEdge { edge_id, node_id } => {
                write!(f, "edge '{}' references unknown node '{}'", edge_id, node_id)
            }
            Self::InvalidHandle { edge_id, handle } => write!(
                f,
                "edge '{}' leaves through unknown handle '{}'",
                edge_id,
                handle.as_deref().unwrap_or("")
            ),
            Self::FillFormWithoutForm { node_id } => {
                write!(f, "fill-form node '{}' has no form", node_id)
            }
            Self::AssignTaskWithoutRole { node_id } => {
                write!(f, "assign-task node '{}' has no role", node_id)
            }
        }
    }
}

/// Outcome of [`WorkflowGraphValidator::validate_for_save`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphReport {
    pub blocking_errors: Vec<GraphIssue>,
    pub warnings: Vec<GraphIssue>,
}

impl GraphReport {
    /// Whether the graph may be saved at all
    pub fn ok(&self) -> bool {
        self.blocking_errors.is_empty()
    }

    /// Saveable, but only after the user confirms the warnings
    pub fn needs_confirmation(&self) -> bool {
        self.ok() && !self.warnings.is_empty()
    }

    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.blocking_errors.iter().map(ToString::to_string).collect()
    }
}

/// Node counts per type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeStats {
    pub start: usize,
    pub end: usize,
    pub fill_form: usize,
    pub condition: usize,
    pub change_status: usize,
    pub assign_task: usize,
    pub edges: usize,
    pub total_nodes: usize,
}

/// An outgoing handle of a node, placed at `offset` (0..1) along its edge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandleSpec {
    pub id: String,
    pub offset: f64,
}

/// Structural checks and statistics for workflow graphs
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowGraphValidator;

impl WorkflowGraphValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check a graph before it is saved
    pub fn validate_for_save(&self, graph: &WorkflowGraph) -> GraphReport {
        let mut report = GraphReport::default();

        if !graph.has_start() {
            report.blocking_errors.push(GraphIssue::MissingStart);
        }
        if !graph
            .nodes
            .iter()
            .any(|n| matches!(n.kind, NodeKind::End(_)))
        {
            report.warnings.push(GraphIssue::MissingEnd);
        }

        let mut seen = HashSet::new();
        for node in &graph.nodes {
            if !seen.insert(node.id.as_str()) {
                report
                    .warnings
                    .push(GraphIssue::DuplicateNodeId(node.id.clone()));
            }
            match &node.kind {
                NodeKind::FillForm(data) if data.form.is_none() => {
                    report.warnings.push(GraphIssue::FillFormWithoutForm {
                        node_id: node.id.clone(),
                    });
                }
                NodeKind::AssignTask(data) if data.role.is_none() => {
                    report.warnings.push(GraphIssue::AssignTaskWithoutRole {
                        node_id: node.id.clone(),
                    });
                }
                _ => {}
            }
        }

        for edge in &graph.edges {
            for endpoint in [&edge.source, &edge.target] {
                if graph.node(endpoint).is_none() {
                    report.warnings.push(GraphIssue::DanglingEdge {
                        edge_id: edge.id.clone(),
                        node_id: endpoint.clone(),
                    });
                }
            }
            if let Some(source) = graph.node(&edge.source) {
                if !source.accepts_source_handle(edge.source_handle.as_deref()) {
                    report.warnings.push(GraphIssue::InvalidHandle {
                        edge_id: edge.id.clone(),
                        handle: edge.source_handle.clone(),
                    });
                }
            }
        }

        report
    }

    /// Count nodes per type and edges
    pub fn stats(&self, graph: &WorkflowGraph) -> NodeStats {
        let mut stats = NodeStats {
            edges: graph.edges.len(),
            total_nodes: graph.nodes.len(),
            ..NodeStats::default()
        };
        for node in &graph.nodes {
            match node.kind {
                NodeKind::Start(_) => stats.start += 1,
                NodeKind::End(_) => stats.end += 1,
                NodeKind::FillForm(_) => stats.fill_form += 1,
                NodeKind::Condition(_) => stats.condition += 1,
                NodeKind::ChangeStatus(_) => stats.change_status += 1,
                NodeKind::AssignTask(_) => stats.assign_task += 1,
            }
        }
        stats
    }

    /// Outgoing handles of a condition node with `rule_count` rules
    ///
    /// One handle per rule, spread evenly; a node without rules gets a single
    /// centered default handle.
    pub fn condition_handles(&self, rule_count: usize) -> Vec<HandleSpec> {
        if rule_count == 0 {
            return vec![HandleSpec {
                id: DEFAULT_CONDITION_HANDLE.to_string(),
                offset: 0.5,
            }];
        }
        (0..rule_count)
            .map(|i| HandleSpec {
                id: condition_handle_id(i),
                offset: (i + 1) as f64 / (rule_count + 1) as f64,
            })
            .collect()
    }

    /// Outgoing handles of any node; non-condition nodes have none
    pub fn handles_for(&self, node: &WorkflowNode) -> Vec<HandleSpec> {
        match &node.kind {
            NodeKind::Condition(data) => self.condition_handles(data.condition_rules.len()),
            _ => Vec::new(),
        }
    }
}
