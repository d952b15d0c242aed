//! Common test utilities and setup
#![allow(dead_code)]

use formflow::store::{Collection, DataStore, MemoryStore, Record, SqliteStore};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

static TEST_DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Fresh in-memory store
pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// Migrated SQLite store in a temporary directory
pub async fn setup_sqlite_store() -> (TempDir, Arc<SqliteStore>) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let counter = TEST_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    let db_path = temp_dir.path().join(format!("test_{}.db", counter));
    let url = format!("sqlite://{}", db_path.display());

    let store = SqliteStore::initialize(&url, 1)
        .await
        .expect("Failed to create test database");
    (temp_dir, Arc::new(store))
}

pub fn record(value: Value) -> Record {
    value
        .as_object()
        .cloned()
        .expect("test records must be JSON objects")
}

/// Insert a raw task row
pub async fn insert_task(
    store: &dyn DataStore,
    id: &str,
    assigned_to: &str,
    status: Value,
    step_name: &str,
    created_at: &str,
) {
    store
        .insert(
            Collection::Tasks,
            record(json!({
                "id": id,
                "step": {"step_id": format!("step-{}", id), "step_name": step_name},
                "assigned_to": assigned_to,
                "created_by": "admin",
                "status": status,
                "task_data": {},
                "created_at": created_at,
                "updated_at": created_at,
            })),
        )
        .await
        .expect("Failed to insert task");
}

/// Insert a raw response row
pub async fn insert_response(
    store: &dyn DataStore,
    id: &str,
    form_id: &str,
    created_by: &str,
    data: Value,
    created_at: &str,
) {
    store
        .insert(
            Collection::Responses,
            record(json!({
                "id": id,
                "form_id": form_id,
                "data": data,
                "created_by": created_by,
                "created_at": created_at,
            })),
        )
        .await
        .expect("Failed to insert response");
}

/// Link a response to a task
pub async fn link(store: &dyn DataStore, task_id: &str, response_id: &str) {
    store
        .insert(
            Collection::TaskResponses,
            record(json!({
                "task_id": task_id,
                "response_id": response_id,
                "created_at": "2024-01-01T00:00:00Z",
            })),
        )
        .await
        .expect("Failed to link response");
}

/// Three tasks for `alice`, one for `bob`, with two of alice's responses
/// linked to `t-2`
pub async fn seed_tasks(store: &dyn DataStore) {
    insert_task(
        store,
        "t-1",
        "alice",
        json!({"status": "pending", "label": "Waiting"}),
        "Review invoice",
        "2024-03-01T09:00:00Z",
    )
    .await;
    insert_task(
        store,
        "t-2",
        "alice",
        json!({"status": "completed"}),
        "Approve leave",
        "2024-03-02T09:00:00Z",
    )
    .await;
    insert_task(
        store,
        "t-3",
        "alice",
        json!("{\"status\":\"pending\"}"),
        "Invoice archive",
        "2024-03-03T09:00:00Z",
    )
    .await;
    insert_task(
        store,
        "t-4",
        "bob",
        json!({"status": "pending"}),
        "Review invoice",
        "2024-03-04T09:00:00Z",
    )
    .await;

    insert_response(
        store,
        "r-late",
        "f-leave",
        "carol",
        json!({"days": 3}),
        "2024-03-02T12:00:00Z",
    )
    .await;
    insert_response(
        store,
        "r-early",
        "f-leave",
        "carol",
        json!({"days": 2}),
        "2024-03-02T10:00:00Z",
    )
    .await;
    link(store, "t-2", "r-late").await;
    link(store, "t-2", "r-early").await;
}
