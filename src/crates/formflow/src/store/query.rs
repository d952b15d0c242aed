//! Store queries
//!
//! A [`Query`] is a conjunction of [`Filter`]s over dotted JSON paths
//! (`status.status`, `step.step_name`), an optional sort and offset
//! pagination. The in-memory store evaluates filters with
//! [`Filter::matches`]; the SQLite store compiles them to `json_extract`.

use super::Record;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;

/// A single predicate over a record
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Value at `path` equals `value`
    Eq { path: String, value: Value },
    /// Value at `path` equals one of `values`
    In { path: String, values: Vec<Value> },
    /// Value at `path` is greater than or equal to `value`
    Gte { path: String, value: Value },
    /// Value at `path` is less than or equal to `value`
    Lte { path: String, value: Value },
    /// Case-insensitive substring match on at least one of `paths`
    ContainsAny { paths: Vec<String>, needle: String },
}

impl Filter {
    /// Evaluate the filter against a record
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::Eq { path, value } => lookup(record, path) == Some(value),
            Filter::In { path, values } => {
                lookup(record, path).map_or(false, |found| values.contains(found))
            }
            Filter::Gte { path, value } => lookup(record, path)
                .and_then(|found| compare_values(found, value))
                .map_or(false, |ord| ord != Ordering::Less),
            Filter::Lte { path, value } => lookup(record, path)
                .and_then(|found| compare_values(found, value))
                .map_or(false, |ord| ord != Ordering::Greater),
            Filter::ContainsAny { paths, needle } => {
                let needle = needle.to_lowercase();
                paths.iter().any(|path| {
                    lookup(record, path)
                        .and_then(|v| v.as_str())
                        .map_or(false, |text| text.to_lowercase().contains(&needle))
                })
            }
        }
    }

    /// Every JSON path this filter reads
    pub fn paths(&self) -> Vec<&str> {
        match self {
            Filter::Eq { path, .. }
            | Filter::In { path, .. }
            | Filter::Gte { path, .. }
            | Filter::Lte { path, .. } => vec![path.as_str()],
            Filter::ContainsAny { paths, .. } => paths.iter().map(String::as_str).collect(),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Sort specification
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub path: String,
    pub direction: SortDirection,
}

/// Filtered, sorted, paginated query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub sort: Option<Sort>,
    pub limit: Option<u64>,
    pub offset: u64,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::Eq {
            path: path.into(),
            value: value.into(),
        })
    }

    pub fn is_in<I, V>(self, path: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filter(Filter::In {
            path: path.into(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn gte(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::Gte {
            path: path.into(),
            value: value.into(),
        })
    }

    pub fn lte(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::Lte {
            path: path.into(),
            value: value.into(),
        })
    }

    pub fn contains_any<I, P>(self, paths: I, needle: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.filter(Filter::ContainsAny {
            paths: paths.into_iter().map(Into::into).collect(),
            needle: needle.into(),
        })
    }

    pub fn order_by(mut self, path: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(Sort {
            path: path.into(),
            direction,
        });
        self
    }

    pub fn paginate(mut self, limit: u64, offset: u64) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }

    /// Whether every filter accepts the record
    pub fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|f| f.matches(record))
    }

    /// Sort records in place according to `self.sort`; records missing the
    /// sort key go last regardless of direction
    pub fn sort_records(&self, records: &mut [Record]) {
        let Some(sort) = &self.sort else {
            return;
        };
        records.sort_by(|a, b| {
            match (lookup(a, &sort.path), lookup(b, &sort.path)) {
                (Some(x), Some(y)) => {
                    let ord = compare_values(x, y).unwrap_or(Ordering::Equal);
                    match sort.direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    }
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
    }
}

/// Resolve a dotted path inside a record
pub fn lookup<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = record.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Order two JSON scalars
///
/// Numbers compare numerically, strings that both parse as RFC 3339
/// timestamps compare chronologically, other strings lexicographically.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => {
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => Some(x.with_timezone(&Utc).cmp(&y.with_timezone(&Utc))),
                _ => Some(x.cmp(y)),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
