//! Persistence collaborator
//!
//! The core never talks to a database directly. Every component receives an
//! `Arc<dyn DataStore>`: a generic, document-oriented CRUD interface over a
//! fixed set of named collections. Two implementations ship with the crate:
//!
//! - [`MemoryStore`] - in-process collections, used by tests and embedders
//! - [`SqliteStore`] - one JSON document per row in SQLite, via sqlx

mod error;
pub mod legacy;
mod memory;
pub mod query;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use legacy::parse_if_string;
pub use memory::{Access, MemoryStore, StoreCall, StoreOp};
pub use query::{Filter, Query, Sort, SortDirection};
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stored document
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Named collections known to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Forms,
    Responses,
    Workflows,
    Tasks,
    TaskResponses,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Forms,
        Collection::Responses,
        Collection::Workflows,
        Collection::Tasks,
        Collection::TaskResponses,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forms => "forms",
            Self::Responses => "responses",
            Self::Workflows => "workflows",
            Self::Tasks => "tasks",
            Self::TaskResponses => "task_responses",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Generic CRUD interface over named collections
///
/// Records are JSON objects carrying a string `id`. `insert` assigns a fresh
/// id when the record has none. `update` is a shallow merge: top-level keys of
/// the patch replace the stored ones, other keys are kept.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Records matching `query`, sorted and paginated as requested
    async fn list(&self, collection: Collection, query: &Query) -> StoreResult<Vec<Record>>;

    /// Number of records matching the filters of `query` (pagination ignored)
    async fn count(&self, collection: Collection, query: &Query) -> StoreResult<u64>;

    /// A single record by id
    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Record>>;

    /// Store a new record and return it as persisted
    async fn insert(&self, collection: Collection, record: Record) -> StoreResult<Record>;

    /// Merge `patch` into the record with `id` and return the result
    async fn update(&self, collection: Collection, id: &str, patch: Record)
        -> StoreResult<Record>;

    /// Delete a record by id
    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()>;

    /// Delete every record matching the filters of `query`, returning the count
    async fn delete_matching(&self, collection: Collection, query: &Query) -> StoreResult<u64>;
}

/// Read the `id` field of a record
pub fn record_id(record: &Record) -> Option<&str> {
    record.get("id").and_then(|v| v.as_str())
}
