//! SQLite store
//!
//! Stores one JSON document per row in a single `records` table keyed by
//! `(collection, id)`. Query filters are compiled to `json_extract`
//! expressions, so nested paths such as `status.status` work the same way
//! they do in [`MemoryStore`](super::MemoryStore).
//!
//! Sorting compares the stored JSON values, so timestamps order correctly
//! only while they are all written by chrono in UTC.

use super::{record_id, Collection, DataStore, Filter, Query, Record, SortDirection};
use super::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// [`DataStore`] backed by a SQLite connection pool
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `url` (e.g. `sqlite://formflow.db`), creating the file if needed
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        debug!(url = %url, "Connecting to database");
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        info!(url = %url, "Database connection established");
        Ok(Self { pool })
    }

    /// Private in-memory database, already migrated
    ///
    /// A single connection is used because every SQLite in-memory connection
    /// is its own database.
    pub async fn in_memory() -> StoreResult<Self> {
        let store = Self::connect("sqlite::memory:", 1).await?;
        store.run_migrations().await?;
        Ok(store)
    }

    /// Connect and run migrations
    pub async fn initialize(url: &str, max_connections: u32) -> StoreResult<Self> {
        let store = Self::connect(url, max_connections).await?;
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run the embedded migrations in `./migrations`
    pub async fn run_migrations(&self) -> StoreResult<()> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Perform a health check by running a simple query
    pub async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection closed");
    }
}

/// `status.status` -> `$.status.status`
fn json_path(path: &str) -> StoreResult<String> {
    let valid = !path.is_empty()
        && path.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if !valid {
        return Err(StoreError::query(format!("Invalid field path: {}", path)));
    }
    Ok(format!("$.{}", path))
}

fn push_scalar(builder: &mut QueryBuilder<'_, Sqlite>, value: &Value) -> StoreResult<()> {
    match value {
        Value::String(s) => {
            builder.push_bind(s.clone());
        }
        Value::Number(n) => match n.as_i64() {
            Some(i) => {
                builder.push_bind(i);
            }
            None => {
                let f = n
                    .as_f64()
                    .ok_or_else(|| StoreError::query(format!("Unsupported number: {}", n)))?;
                builder.push_bind(f);
            }
        },
        Value::Bool(b) => {
            builder.push_bind(i64::from(*b));
        }
        other => {
            return Err(StoreError::query(format!(
                "Only scalar values can be compared, got {}",
                other
            )))
        }
    }
    Ok(())
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn is_timestamp(value: &Value) -> bool {
    value
        .as_str()
        .map_or(false, |s| DateTime::parse_from_rfc3339(s).is_ok())
}

/// Range comparison; timestamps are compared as julian days so that
/// differently formatted RFC 3339 strings still order chronologically
fn push_range(
    builder: &mut QueryBuilder<'_, Sqlite>,
    path: &str,
    op: &'static str,
    value: &Value,
) -> StoreResult<()> {
    if is_timestamp(value) {
        builder
            .push(" AND julianday(json_extract(body, ")
            .push_bind(json_path(path)?)
            .push(")) ")
            .push(op)
            .push(" julianday(");
        push_scalar(builder, value)?;
        builder.push(")");
    } else {
        builder
            .push(" AND json_extract(body, ")
            .push_bind(json_path(path)?)
            .push(") ")
            .push(op)
            .push(" ");
        push_scalar(builder, value)?;
    }
    Ok(())
}

fn push_where(
    builder: &mut QueryBuilder<'_, Sqlite>,
    collection: Collection,
    query: &Query,
) -> StoreResult<()> {
    builder
        .push(" WHERE collection = ")
        .push_bind(collection.as_str());

    for filter in &query.filters {
        match filter {
            Filter::Eq { path, value } => {
                builder
                    .push(" AND json_extract(body, ")
                    .push_bind(json_path(path)?)
                    .push(") = ");
                push_scalar(builder, value)?;
            }
            Filter::In { path, values } => {
                if values.is_empty() {
                    builder.push(" AND 0");
                    continue;
                }
                builder
                    .push(" AND json_extract(body, ")
                    .push_bind(json_path(path)?)
                    .push(") IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        builder.push(", ");
                    }
                    push_scalar(builder, value)?;
                }
                builder.push(")");
            }
            Filter::Gte { path, value } => push_range(builder, path, ">=", value)?,
            Filter::Lte { path, value } => push_range(builder, path, "<=", value)?,
            Filter::ContainsAny { paths, needle } => {
                if paths.is_empty() {
                    builder.push(" AND 0");
                    continue;
                }
                builder.push(" AND (");
                for (i, path) in paths.iter().enumerate() {
                    if i > 0 {
                        builder.push(" OR ");
                    }
                    builder
                        .push("lower(json_extract(body, ")
                        .push_bind(json_path(path)?)
                        .push(")) LIKE ")
                        .push_bind(escape_like(needle))
                        .push(" ESCAPE '\\'");
                }
                builder.push(")");
            }
        }
    }
    Ok(())
}

fn decode(body: &str) -> StoreResult<Record> {
    Ok(serde_json::from_str(body)?)
}

#[async_trait]
impl DataStore for SqliteStore {
    async fn list(&self, collection: Collection, query: &Query) -> StoreResult<Vec<Record>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT body FROM records");
        push_where(&mut builder, collection, query)?;

        builder.push(" ORDER BY ");
        if let Some(sort) = &query.sort {
            let path = json_path(&sort.path)?;
            let direction = match sort.direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };
            builder
                .push("(json_extract(body, ")
                .push_bind(path.clone())
                .push(") IS NULL), json_extract(body, ")
                .push_bind(path)
                .push(") ")
                .push(direction)
                .push(", ");
        }
        builder.push("seq ASC");

        if query.limit.is_some() || query.offset > 0 {
            let limit = query
                .limit
                .map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
            let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);
            builder
                .push(" LIMIT ")
                .push_bind(limit)
                .push(" OFFSET ")
                .push_bind(offset);
        }

        let bodies = builder
            .build_query_scalar::<String>()
            .fetch_all(&self.pool)
            .await?;
        bodies.iter().map(|b| decode(b)).collect()
    }

    async fn count(&self, collection: Collection, query: &Query) -> StoreResult<u64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM records");
        push_where(&mut builder, collection, query)?;
        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Record>> {
        let body: Option<String> =
            sqlx::query_scalar("SELECT body FROM records WHERE collection = ? AND id = ?")
                .bind(collection.as_str())
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        body.as_deref().map(decode).transpose()
    }

    async fn insert(&self, collection: Collection, mut record: Record) -> StoreResult<Record> {
        let id = match record_id(&record) {
            Some(id) => id.to_string(),
            None => {
                let id = Uuid::new_v4().to_string();
                record.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };
        if !record.contains_key("created_at") {
            record.insert("created_at".to_string(), serde_json::to_value(Utc::now())?);
        }
        let body = serde_json::to_string(&record)?;

        sqlx::query("INSERT INTO records (collection, id, body) VALUES (?, ?, ?)")
            .bind(collection.as_str())
            .bind(&id)
            .bind(&body)
            .execute(&self.pool)
            .await?;

        Ok(record)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Record,
    ) -> StoreResult<Record> {
        let mut tx = self.pool.begin().await?;

        let body: Option<String> =
            sqlx::query_scalar("SELECT body FROM records WHERE collection = ? AND id = ?")
                .bind(collection.as_str())
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let mut record = match body {
            Some(body) => decode(&body)?,
            None => return Err(StoreError::not_found(format!("{}/{}", collection, id))),
        };
        for (key, value) in patch {
            if key != "id" {
                record.insert(key, value);
            }
        }

        sqlx::query("UPDATE records SET body = ? WHERE collection = ? AND id = ?")
            .bind(serde_json::to_string(&record)?)
            .bind(collection.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(record)
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM records WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("{}/{}", collection, id)));
        }
        Ok(())
    }

    async fn delete_matching(&self, collection: Collection, query: &Query) -> StoreResult<u64> {
        let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM records");
        push_where(&mut builder, collection, query)?;
        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_json_path_rejects_injection() {
        assert_eq!(json_path("status.status").unwrap(), "$.status.status");
        assert!(json_path("status'); DROP TABLE records; --").is_err());
        assert!(json_path("a..b").is_err());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_Off"), "%50\\%\\_off%");
    }

    #[tokio::test]
    async fn test_health_check() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert!(store.health_check().await.is_ok());
        store.close().await;
    }

    #[tokio::test]
    async fn test_nested_filters_and_sort() {
        let store = SqliteStore::in_memory().await.unwrap();
        let rows = [
            json!({"id": "t1", "status": {"status": "pending"}, "created_at": "2024-01-01T00:00:00Z"}),
            json!({"id": "t2", "status": {"status": "completed"}, "created_at": "2024-01-02T00:00:00Z"}),
            json!({"id": "t3", "status": {"status": "pending"}, "created_at": "2024-01-03T00:00:00Z"}),
            json!({"id": "t4", "status": "pending", "created_at": "2024-01-04T00:00:00Z"}),
        ];
        for row in rows {
            store.insert(Collection::Tasks, record(row)).await.unwrap();
        }

        let query = Query::new()
            .eq("status.status", "pending")
            .order_by("created_at", SortDirection::Desc);
        let found = store.list(Collection::Tasks, &query).await.unwrap();
        let ids: Vec<_> = found.iter().map(|r| record_id(r).unwrap()).collect();
        assert_eq!(ids, vec!["t3", "t1"]);
        assert_eq!(store.count(Collection::Tasks, &query).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_in_contains_and_pagination() {
        let store = SqliteStore::in_memory().await.unwrap();
        for (id, name) in [("a", "Review invoice"), ("b", "Approve leave"), ("c", "INVOICE archive")] {
            store
                .insert(
                    Collection::Tasks,
                    record(json!({"id": id, "step": {"step_name": name}})),
                )
                .await
                .unwrap();
        }

        let query = Query::new()
            .is_in("id", ["a", "b", "c"])
            .contains_any(["step.step_name", "notes"], "invoice")
            .order_by("id", SortDirection::Asc)
            .paginate(1, 1);
        let page = store.list(Collection::Tasks, &query).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(record_id(&page[0]), Some("c"));
        assert_eq!(store.count(Collection::Tasks, &query).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .insert(Collection::Tasks, record(json!({"id": "t1", "notes": "a", "assigned_to": "u1"})))
            .await
            .unwrap();

        let updated = store
            .update(Collection::Tasks, "t1", record(json!({"notes": "b"})))
            .await
            .unwrap();
        assert_eq!(updated["notes"], json!("b"));
        assert_eq!(updated["assigned_to"], json!("u1"));

        store.delete(Collection::Tasks, "t1").await.unwrap();
        assert!(store.get(Collection::Tasks, "t1").await.unwrap().is_none());
        assert!(store.delete(Collection::Tasks, "t1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_constraint_violation() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .insert(Collection::Forms, record(json!({"id": "f1"})))
            .await
            .unwrap();
        let err = store
            .insert(Collection::Forms, record(json!({"id": "f1"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn test_timestamp_range_ignores_formatting() {
        let store = SqliteStore::in_memory().await.unwrap();
        for (id, at) in [
            ("t1", "2024-03-01T23:59:59Z"),
            ("t2", "2024-03-02T00:00:00.250Z"),
            ("t3", "2024-02-29T12:00:00+00:00"),
        ] {
            store
                .insert(Collection::Tasks, record(json!({"id": id, "created_at": at})))
                .await
                .unwrap();
        }

        let query = Query::new()
            .gte("created_at", "2024-03-01T00:00:00.000Z")
            .lte("created_at", "2024-03-01T23:59:59.999Z");
        let found = store.list(Collection::Tasks, &query).await.unwrap();
        let ids: Vec<_> = found.iter().map(|r| record_id(r).unwrap()).collect();
        assert_eq!(ids, vec!["t1"]);
    }
}
