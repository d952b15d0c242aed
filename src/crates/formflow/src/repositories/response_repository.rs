//! Response repository for store operations

use super::{decode_column, from_record, to_record};
use crate::error::{FormflowError, Result};
use crate::models::Response;
use crate::store::{Collection, DataStore, Query, Record, SortDirection};
use std::sync::Arc;

/// Repository for form responses
#[derive(Clone)]
pub struct ResponseRepository {
    store: Arc<dyn DataStore>,
}

impl ResponseRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub(crate) fn decode(mut record: Record) -> Result<Response> {
        decode_column(&mut record, "data");
        from_record(record)
    }

    pub async fn create(&self, response: &Response) -> Result<Response> {
        let saved = self
            .store
            .insert(Collection::Responses, to_record(response)?)
            .await?;
        Self::decode(saved)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Response> {
        let record = self
            .store
            .get(Collection::Responses, id)
            .await?
            .ok_or_else(|| FormflowError::not_found("Response", id))?;
        Self::decode(record)
    }

    /// Raw records of a form's responses, newest first
    ///
    /// Returned undecoded so callers can skip malformed rows one by one.
    pub async fn list_records_by_form(&self, form_id: &str) -> Result<Vec<Record>> {
        let query = Query::new()
            .eq("form_id", form_id)
            .order_by("created_at", SortDirection::Desc);
        Ok(self.store.list(Collection::Responses, &query).await?)
    }

    /// Responses of a form, newest first
    pub async fn list_by_form(&self, form_id: &str) -> Result<Vec<Response>> {
        self.list_records_by_form(form_id)
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    /// Ids of every response authored by `user_id`
    pub async fn ids_by_creator(&self, user_id: &str) -> Result<Vec<String>> {
        let query = Query::new().eq("created_by", user_id);
        let records = self.store.list(Collection::Responses, &query).await?;
        Ok(records
            .iter()
            .filter_map(|r| crate::store::record_id(r).map(str::to_string))
            .collect())
    }

    /// Responses with the given ids, oldest first
    pub async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Response>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = Query::new()
            .is_in("id", ids.iter().cloned())
            .order_by("created_at", SortDirection::Asc);
        self.store
            .list(Collection::Responses, &query)
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(Collection::Responses, id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn data(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_list_by_form_newest_first() {
        let repo = ResponseRepository::new(Arc::new(MemoryStore::new()));
        let mut first = Response::new("f1", data(json!({"n": 1})));
        first.created_at = "2024-01-01T00:00:00Z".parse().unwrap();
        let mut second = Response::new("f1", data(json!({"n": 2})));
        second.created_at = "2024-01-02T00:00:00Z".parse().unwrap();
        let other = Response::new("f2", data(json!({"n": 3})));
        for r in [&first, &second, &other] {
            repo.create(r).await.unwrap();
        }

        let listed = repo.list_by_form("f1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);

        let by_id = repo
            .find_by_ids(&[second.id.clone(), first.id.clone()])
            .await
            .unwrap();
        assert_eq!(by_id[0].id, first.id);
    }

    #[tokio::test]
    async fn test_ids_by_creator() {
        let repo = ResponseRepository::new(Arc::new(MemoryStore::new()));
        let mine = Response::new("f1", data(json!({}))).created_by("u1");
        repo.create(&mine).await.unwrap();
        repo.create(&Response::new("f1", data(json!({}))).created_by("u2"))
            .await
            .unwrap();

        assert_eq!(repo.ids_by_creator("u1").await.unwrap(), vec![mine.id]);
        assert!(repo.ids_by_creator("nobody").await.unwrap().is_empty());
    }
}
