//! Property tests for the pure parts of the crate: graph validation, handle
//! layout, status merging, relation labels, schema serialization and paging.

use formflow::graph::WorkflowGraphValidator;
use formflow::models::{
    FieldKind, FormField, FormSchema, RelationConfig, StatusObject, Task, TaskStep,
    WorkflowGraph, WorkflowNode,
};
use formflow::relation::{display_value, MAX_LABEL_CHARS};
use formflow::services::Page;
use formflow::TaskStatusEngine;
use proptest::prelude::*;
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_node(index: usize) -> impl Strategy<Value = WorkflowNode> {
    (0u8..4).prop_map(move |kind| {
        let id = format!("n{}", index);
        match kind {
            0 => WorkflowNode::start(id),
            1 => WorkflowNode::end(id),
            2 => WorkflowNode::fill_form(id, None),
            _ => WorkflowNode::condition(id, Vec::new()),
        }
    })
}

fn arb_graph() -> impl Strategy<Value = WorkflowGraph> {
    (0usize..8).prop_flat_map(|len| {
        (0..len)
            .map(arb_node)
            .collect::<Vec<_>>()
            .prop_map(|nodes| WorkflowGraph {
                nodes,
                edges: Vec::new(),
            })
    })
}

fn arb_field_kind() -> impl Strategy<Value = FieldKind> {
    let options = prop::collection::vec("[a-z]{1,6}", 0..4);
    prop_oneof![
        Just(FieldKind::Text),
        Just(FieldKind::Email),
        Just(FieldKind::Number),
        Just(FieldKind::Textarea),
        options.clone().prop_map(|options| FieldKind::Select { options }),
        options.prop_map(|options| FieldKind::Radio { options }),
        Just(FieldKind::Checkbox),
        Just(FieldKind::Date),
        Just(FieldKind::Relation {
            relation_config: None
        }),
        ("f-[a-z0-9]{4}", prop::option::of("[a-z]{1,6}")).prop_map(|(form_id, display)| {
            let mut config = RelationConfig::new(form_id, "Target");
            if let Some(field) = display {
                config = config.with_display_field(field);
            }
            FieldKind::Relation {
                relation_config: Some(config),
            }
        }),
    ]
}

fn arb_schema() -> impl Strategy<Value = FormSchema> {
    prop::collection::vec((arb_field_kind(), any::<bool>(), "[A-Za-z ]{1,12}"), 0..6).prop_map(
        |fields| {
            let mut schema = FormSchema::new("Generated");
            schema.fields = fields
                .into_iter()
                .enumerate()
                .map(|(i, (kind, required, label))| {
                    let field = FormField::new(format!("field_{}", i), label, kind);
                    if required {
                        field.required()
                    } else {
                        field
                    }
                })
                .collect();
            schema
        },
    )
}

fn arb_extra() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("x_[a-z]{1,8}", "[a-z0-9]{0,8}", 0..5).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect()
    })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// Only a missing start node blocks a save.
    #[test]
    fn save_blocked_iff_start_missing(graph in arb_graph()) {
        let report = WorkflowGraphValidator::new().validate_for_save(&graph);
        prop_assert_eq!(report.ok(), graph.has_start());
    }

    /// A condition node exposes one handle per rule, or one default handle.
    #[test]
    fn condition_handles_are_spread_in_order(rules in 0usize..12) {
        let handles = WorkflowGraphValidator::new().condition_handles(rules);
        prop_assert_eq!(handles.len(), rules.max(1));
        for pair in handles.windows(2) {
            prop_assert!(pair[0].offset < pair[1].offset);
        }
        for handle in &handles {
            prop_assert!(handle.offset > 0.0 && handle.offset < 1.0);
        }
    }

    /// Changing status rewrites only the status key.
    #[test]
    fn status_change_preserves_other_keys(
        extra in arb_extra(),
        label in prop::option::of("[a-z ]{1,10}"),
        key in "[a-z_]{1,12}",
    ) {
        let mut status = StatusObject::new("pending");
        status.label = label.clone();
        status.extra = extra.clone();
        let task = Task::new(TaskStep::new("s", "Step"), "u", "u").with_status(status);

        let next = TaskStatusEngine::default().apply_status_change(&task, &key);
        prop_assert_eq!(next.status, key);
        prop_assert_eq!(next.label, label);
        prop_assert_eq!(next.extra, extra);
    }

    /// Labels never exceed the limit plus the ellipsis.
    #[test]
    fn labels_are_bounded(text in "[a-zA-Z0-9 ]{1,120}") {
        let mut data = Map::new();
        data.insert("name".to_string(), Value::String(text.clone()));
        let label = display_value("r-1", &data, Some("name"));

        prop_assert!(label.chars().count() <= MAX_LABEL_CHARS + 3);
        if text.chars().count() > MAX_LABEL_CHARS {
            prop_assert!(label.ends_with("..."));
        } else {
            prop_assert_eq!(label, text);
        }
    }

    /// Schemas survive a JSON round trip for every field type.
    #[test]
    fn schema_json_round_trip(schema in arb_schema()) {
        let json = serde_json::to_string(&schema).unwrap();
        let back: FormSchema = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, schema);
    }

    /// `total_pages` is the smallest page count holding every item.
    #[test]
    fn total_pages_covers_total(total in 0u64..10_000, size in 1u32..200) {
        let page: Page<u8> = Page::new(Vec::new(), total, 1, size);
        let size = u64::from(size);
        prop_assert!(page.total_pages * size >= total);
        if total > 0 {
            prop_assert!((page.total_pages - 1) * size < total);
        } else {
            prop_assert_eq!(page.total_pages, 0);
        }
    }
}
