//! In-memory store
//!
//! Keeps every collection as an insertion-ordered `Vec<Record>` behind a
//! tokio `RwLock`. Each call is recorded so tests can assert which queries a
//! service issued, and collections can be switched into a failing mode to
//! exercise error paths.

use super::{record_id, Collection, DataStore, Query, Record, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Operation kind recorded in the call log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    List,
    Count,
    Get,
    Insert,
    Update,
    Delete,
    DeleteMatching,
}

impl StoreOp {
    fn access(self) -> Access {
        match self {
            StoreOp::List | StoreOp::Count | StoreOp::Get => Access::Read,
            _ => Access::Write,
        }
    }
}

/// Read or write side of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
}

/// One recorded store call
#[derive(Debug, Clone, PartialEq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub collection: Collection,
}

/// In-process [`DataStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Record>>>,
    calls: Mutex<Vec<StoreCall>>,
    failing: Mutex<HashSet<(Collection, Access)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `access` call on `collection` fail with a connection error
    pub fn fail(&self, collection: Collection, access: Access) {
        self.failing.lock().insert((collection, access));
    }

    /// Undo every [`fail`](Self::fail)
    pub fn heal(&self) {
        self.failing.lock().clear();
    }

    /// Every call made so far, oldest first
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    /// Calls made against one collection
    pub fn calls_for(&self, collection: Collection) -> Vec<StoreOp> {
        self.calls()
            .into_iter()
            .filter(|c| c.collection == collection)
            .map(|c| c.op)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Number of records currently held in `collection`
    pub async fn len(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map_or(0, Vec::len)
    }

    fn enter(&self, op: StoreOp, collection: Collection) -> StoreResult<()> {
        self.calls.lock().push(StoreCall { op, collection });
        if self.failing.lock().contains(&(collection, op.access())) {
            return Err(StoreError::Connection(format!(
                "{} is unavailable",
                collection
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn list(&self, collection: Collection, query: &Query) -> StoreResult<Vec<Record>> {
        self.enter(StoreOp::List, collection)?;
        let guard = self.collections.read().await;
        let mut records: Vec<Record> = guard
            .get(&collection)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();
        drop(guard);

        query.sort_records(&mut records);

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let records = records.into_iter().skip(offset);
        Ok(match query.limit {
            Some(limit) => records
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .collect(),
            None => records.collect(),
        })
    }

    async fn count(&self, collection: Collection, query: &Query) -> StoreResult<u64> {
        self.enter(StoreOp::Count, collection)?;
        let guard = self.collections.read().await;
        let count = guard
            .get(&collection)
            .map_or(0, |rows| rows.iter().filter(|r| query.matches(r)).count());
        Ok(count as u64)
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Record>> {
        self.enter(StoreOp::Get, collection)?;
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .and_then(|rows| rows.iter().find(|r| record_id(r) == Some(id)).cloned()))
    }

    async fn insert(&self, collection: Collection, mut record: Record) -> StoreResult<Record> {
        self.enter(StoreOp::Insert, collection)?;
        let id = match record_id(&record) {
            Some(id) => id.to_string(),
            None => {
                let id = Uuid::new_v4().to_string();
                record.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };
        record
            .entry("created_at")
            .or_insert_with(|| serde_json::json!(Utc::now()));

        let mut guard = self.collections.write().await;
        let rows = guard.entry(collection).or_default();
        if rows.iter().any(|r| record_id(r) == Some(id.as_str())) {
            return Err(StoreError::ConstraintViolation(format!(
                "{} already contains id {}",
                collection, id
            )));
        }
        rows.push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Record,
    ) -> StoreResult<Record> {
        self.enter(StoreOp::Update, collection)?;
        let mut guard = self.collections.write().await;
        let row = guard
            .get_mut(&collection)
            .and_then(|rows| rows.iter_mut().find(|r| record_id(r) == Some(id)))
            .ok_or_else(|| StoreError::not_found(format!("{}/{}", collection, id)))?;
        for (key, value) in patch {
            if key != "id" {
                row.insert(key, value);
            }
        }
        Ok(row.clone())
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
        self.enter(StoreOp::Delete, collection)?;
        let mut guard = self.collections.write().await;
        let rows = guard
            .get_mut(&collection)
            .ok_or_else(|| StoreError::not_found(format!("{}/{}", collection, id)))?;
        let before = rows.len();
        rows.retain(|r| record_id(r) != Some(id));
        if rows.len() == before {
            return Err(StoreError::not_found(format!("{}/{}", collection, id)));
        }
        Ok(())
    }

    async fn delete_matching(&self, collection: Collection, query: &Query) -> StoreResult<u64> {
        self.enter(StoreOp::DeleteMatching, collection)?;
        let mut guard = self.collections.write().await;
        let Some(rows) = guard.get_mut(&collection) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !query.matches(r));
        Ok((before - rows.len()) as u64)
    }
}
