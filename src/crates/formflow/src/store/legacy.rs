//! Legacy column decoding
//!
//! Older records hold `step`, `status` and `task_data` as serialized JSON
//! text instead of native JSON. Repositories run those columns through
//! [`parse_if_string`] once, right after reading from the store.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode a column that may hold serialized JSON text
///
/// A string value is first parsed as JSON into `T`; when that fails the
/// original value is decoded as-is, so a bare string stays a string.
pub fn parse_if_string<T: DeserializeOwned>(value: Value) -> serde_json::Result<T> {
    if let Value::String(raw) = &value {
        if let Ok(parsed) = serde_json::from_str::<T>(raw) {
            return Ok(parsed);
        }
    }
    serde_json::from_value(value)
}
