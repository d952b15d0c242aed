//! Form repository for store operations

use super::{decode_column, from_record, to_record};
use crate::error::{FormflowError, Result};
use crate::models::Form;
use crate::store::{Collection, DataStore, Query, Record, SortDirection};
use chrono::Utc;
use std::sync::Arc;

/// Repository for form records
#[derive(Clone)]
pub struct FormRepository {
    store: Arc<dyn DataStore>,
}

impl FormRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    fn decode(mut record: Record) -> Result<Form> {
        decode_column(&mut record, "schema");
        from_record(record)
    }

    /// Save a new form, rejecting schemas with duplicate field ids
    pub async fn create(&self, form: &Form) -> Result<Form> {
        let report = form.schema.validate();
        if let Some(issue) = report.errors.first() {
            return Err(FormflowError::validation(issue.to_string()));
        }
        let saved = self
            .store
            .insert(Collection::Forms, to_record(form)?)
            .await?;
        Self::decode(saved)
    }

    /// Load a form by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Form> {
        let record = self
            .store
            .get(Collection::Forms, id)
            .await?
            .ok_or_else(|| FormflowError::not_found("Form", id))?;
        Self::decode(record)
    }

    /// List all forms, newest first
    pub async fn list(&self) -> Result<Vec<Form>> {
        let query = Query::new().order_by("created_at", SortDirection::Desc);
        self.store
            .list(Collection::Forms, &query)
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    /// Persist title, description and schema of an existing form
    pub async fn update(&self, form: &Form) -> Result<Form> {
        let report = form.schema.validate();
        if let Some(issue) = report.errors.first() {
            return Err(FormflowError::validation(issue.to_string()));
        }
        let mut patch = to_record(form)?;
        patch.remove("created_at");
        patch.insert("updated_at".to_string(), serde_json::to_value(Utc::now())?);
        let saved = self
            .store
            .update(Collection::Forms, &form.id, patch)
            .await?;
        Self::decode(saved)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(Collection::Forms, id).await?;
        Ok(())
    }
}
