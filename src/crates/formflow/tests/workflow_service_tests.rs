//! Workflow lifecycle integration tests

mod common;

use common::{memory_store, setup_sqlite_store};
use formflow::models::{
    ConditionRule, FieldType, FormRef, Workflow, WorkflowGraph, WorkflowNode, WorkflowStatus,
};
use formflow::store::{Access, Collection, StoreOp};
use formflow::{FormflowError, SaveOutcome, WorkflowService};
use serde_json::json;

fn rule(field: &str) -> ConditionRule {
    ConditionRule {
        field_id: field.to_string(),
        field_label: field.to_string(),
        field_type: FieldType::Number,
        operator: "greater_than".to_string(),
        value: json!(1000),
    }
}

fn approval_graph() -> WorkflowGraph {
    let mut graph = WorkflowGraph::new();
    graph.add_node(WorkflowNode::start("start")).unwrap();
    graph
        .add_node(WorkflowNode::fill_form(
            "request",
            Some(FormRef {
                id: "f-purchase".to_string(),
                title: "Purchase request".to_string(),
            }),
        ))
        .unwrap();
    graph
        .add_node(WorkflowNode::condition("check", vec![rule("amount"), rule("qty")]))
        .unwrap();
    graph.add_node(WorkflowNode::end("end")).unwrap();
    graph.connect("start", "request", None).unwrap();
    graph.connect("request", "check", None).unwrap();
    graph.connect("check", "end", Some("condition-0")).unwrap();
    graph.connect("check", "end", Some("condition-1")).unwrap();
    graph
}

#[tokio::test]
async fn test_start_only_graph_needs_confirmation() {
    let store = memory_store();
    let service = WorkflowService::new(store.clone());
    let workflow = service.create(Workflow::new("Purchases")).await.unwrap();
    store.clear_calls();

    let graph = WorkflowGraph {
        nodes: vec![WorkflowNode::start("start")],
        edges: vec![],
    };
    let outcome = service.save_graph(&workflow.id, &graph, false).await.unwrap();
    let SaveOutcome::NeedsConfirmation(report) = outcome else {
        panic!("expected confirmation request");
    };
    assert!(report
        .warning_messages()
        .contains(&"missing end node".to_string()));
    assert!(!store.calls_for(Collection::Workflows).contains(&StoreOp::Update));

    let outcome = service.save_graph(&workflow.id, &graph, true).await.unwrap();
    let SaveOutcome::Saved(saved) = outcome else {
        panic!("expected save after confirmation");
    };
    assert_eq!(saved.schema, graph);
}

#[tokio::test]
async fn test_graph_without_start_is_rejected() {
    let store = memory_store();
    let service = WorkflowService::new(store.clone());
    let workflow = service.create(Workflow::new("Purchases")).await.unwrap();

    let graph = WorkflowGraph {
        nodes: vec![
            WorkflowNode::fill_form("request", None),
            WorkflowNode::end("end"),
        ],
        edges: vec![],
    };
    let err = service.save_graph(&workflow.id, &graph, true).await.unwrap_err();
    match err {
        FormflowError::Validation(msg) => assert!(msg.contains("missing start node")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(service.get(&workflow.id).await.unwrap().schema.nodes.is_empty());
}

#[tokio::test]
async fn test_clean_graph_saves_directly_and_round_trips() {
    let (_dir, store) = setup_sqlite_store().await;
    let service = WorkflowService::new(store.clone());
    let workflow = service
        .create(Workflow::new("Purchases").with_trigger_form("f-purchase"))
        .await
        .unwrap();

    let graph = approval_graph();
    let outcome = service.save_graph(&workflow.id, &graph, false).await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved(_)));

    let loaded = service.get(&workflow.id).await.unwrap();
    assert_eq!(loaded.schema, graph);
    assert_eq!(loaded.trigger_form.as_deref(), Some("f-purchase"));

    let stats = service.stats(&workflow.id).await;
    assert!(stats.warning.is_none());
    assert_eq!(stats.stats.start, 1);
    assert_eq!(stats.stats.fill_form, 1);
    assert_eq!(stats.stats.condition, 1);
    assert_eq!(stats.stats.end, 1);
    assert_eq!(stats.stats.edges, 4);
    assert_eq!(stats.stats.total_nodes, 4);
}

#[tokio::test]
async fn test_removing_rules_drops_orphaned_branches() {
    let mut graph = approval_graph();
    let dropped = graph.set_condition_rules("check", vec![rule("amount")]).unwrap();
    assert_eq!(dropped, 1);
    assert!(graph
        .edges
        .iter()
        .all(|e| e.source_handle.as_deref() != Some("condition-1")));

    let store = memory_store();
    let service = WorkflowService::new(store.clone());
    let workflow = service.create(Workflow::new("Purchases")).await.unwrap();
    let outcome = service.save_graph(&workflow.id, &graph, false).await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved(_)));
}

#[tokio::test]
async fn test_toggle_and_archive() {
    let store = memory_store();
    let service = WorkflowService::new(store.clone());
    let workflow = service.create(Workflow::new("Leave")).await.unwrap();
    assert_eq!(workflow.status, WorkflowStatus::Draft);

    let active = service.toggle_status(&workflow.id).await.unwrap();
    assert_eq!(active.status, WorkflowStatus::Active);
    let inactive = service.toggle_status(&workflow.id).await.unwrap();
    assert_eq!(inactive.status, WorkflowStatus::Inactive);
    let again = service.toggle_status(&workflow.id).await.unwrap();
    assert_eq!(again.status, WorkflowStatus::Active);

    let archived = service.archive(&workflow.id).await.unwrap();
    assert_eq!(archived.status, WorkflowStatus::Archived);
    assert_eq!(
        service.archive(&workflow.id).await.unwrap().status,
        WorkflowStatus::Archived
    );

    let err = service.toggle_status(&workflow.id).await.unwrap_err();
    assert!(matches!(err, FormflowError::InvalidStateTransition { .. }));
}

#[tokio::test]
async fn test_list_by_status() {
    let store = memory_store();
    let service = WorkflowService::new(store.clone());
    let first = service.create(Workflow::new("One")).await.unwrap();
    service.create(Workflow::new("Two")).await.unwrap();
    service.toggle_status(&first.id).await.unwrap();

    let active = service.list(Some(WorkflowStatus::Active)).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, first.id);
    assert_eq!(service.list(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_blank_name_is_rejected() {
    let service = WorkflowService::new(memory_store());
    let err = service.create(Workflow::new("   ")).await.unwrap_err();
    assert!(matches!(err, FormflowError::Validation(_)));
}

#[tokio::test]
async fn test_stats_absorb_load_failures() {
    let store = memory_store();
    let service = WorkflowService::new(store.clone());

    let missing = service.stats("wf-missing").await;
    assert_eq!(missing.stats.total_nodes, 0);
    assert!(missing.warning.is_some());

    let workflow = service.create(Workflow::new("Leave")).await.unwrap();
    store.fail(Collection::Workflows, Access::Read);
    let failed = service.stats(&workflow.id).await;
    assert!(failed.warning.is_some());
}

#[tokio::test]
async fn test_unknown_workflow_is_not_found() {
    let service = WorkflowService::new(memory_store());
    let graph = approval_graph();
    let err = service.save_graph("wf-missing", &graph, false).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(service.toggle_status("wf-missing").await.unwrap_err().is_not_found());
}
