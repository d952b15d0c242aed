//! Repositories for store operations
//!
//! Each repository wraps an `Arc<dyn DataStore>` and converts between store
//! records and the typed models. Columns that older rows hold as serialized
//! JSON text are decoded here, once, with
//! [`parse_if_string`](crate::store::parse_if_string).

pub mod form_repository;
pub mod response_repository;
pub mod task_repository;
pub mod task_response_repository;
pub mod workflow_repository;

pub use form_repository::FormRepository;
pub use response_repository::ResponseRepository;
pub use task_repository::TaskRepository;
pub use task_response_repository::TaskResponseRepository;
pub use workflow_repository::WorkflowRepository;

use crate::error::{FormflowError, Result};
use crate::store::{parse_if_string, Record};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Serialize a model into a store record
pub(crate) fn to_record<T: Serialize>(model: &T) -> Result<Record> {
    match serde_json::to_value(model)? {
        Value::Object(record) => Ok(record),
        other => Err(FormflowError::validation(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

/// Deserialize a store record into a model
pub(crate) fn from_record<T: DeserializeOwned>(record: Record) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

/// Replace a column that may hold serialized JSON text with its decoded value
///
/// Text that does not parse is kept as-is.
pub(crate) fn decode_column(record: &mut Record, column: &str) {
    if let Some(value) = record.get_mut(column) {
        let raw = value.take();
        *value = match parse_if_string::<Value>(raw.clone()) {
            Ok(parsed) => parsed,
            Err(_) => raw,
        };
    }
}
