//! Cross-form relation resolution
//!
//! A `relation` field lets a user pick one response of another form. The
//! target form's schema is not known up front, so every candidate response
//! gets a label computed from its data alone:
//!
//! 1. the configured display field, when present and non-empty;
//! 2. otherwise the first non-empty value in insertion order;
//! 3. labels over [`MAX_LABEL_CHARS`] characters are cut and suffixed with `...`;
//! 4. a response with nothing usable is labelled from its id.
//!
//! Fetch failures never surface as errors here: the resolver returns an empty
//! list with a warning so the field stays renderable.

use crate::error::{FormflowError, Result};
use crate::models::{FormField, RelationConfig};
use crate::repositories::ResponseRepository;
use crate::store::{record_id, DataStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Labels longer than this many characters are truncated
pub const MAX_LABEL_CHARS: usize = 50;

const ELLIPSIS: &str = "...";
const FALLBACK_ID_CHARS: usize = 8;

/// One selectable response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Response id
    pub value: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

/// Candidates of a relation field, newest first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandidateList {
    pub candidates: Vec<Candidate>,
    /// Set when the fetch failed and the list is empty because of it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl CandidateList {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn get(&self, response_id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.value == response_id)
    }
}

/// What a relation field renders
#[derive(Debug, Clone, PartialEq)]
pub enum RelationState {
    /// The field has no target form yet
    NotConfigured,
    Loading,
    Ready(CandidateList),
}

/// String form of a submitted value, `None` for null
pub fn coerce_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| coerce_value(item).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

fn truncate(text: String) -> String {
    if text.chars().count() <= MAX_LABEL_CHARS {
        return text;
    }
    let mut cut: String = text.chars().take(MAX_LABEL_CHARS).collect();
    cut.push_str(ELLIPSIS);
    cut
}

/// Label of a response
pub fn display_value(
    response_id: &str,
    data: &Map<String, Value>,
    display_field: Option<&str>,
) -> String {
    let configured = display_field
        .and_then(|field| data.get(field))
        .and_then(coerce_value)
        .filter(|text| !text.is_empty());

    let label = configured.or_else(|| {
        data.values()
            .filter_map(coerce_value)
            .find(|text| !text.trim().is_empty())
    });

    match label {
        Some(text) => truncate(text),
        None => {
            let short: String = response_id.chars().take(FALLBACK_ID_CHARS).collect();
            format!("response {}{}", short, ELLIPSIS)
        }
    }
}

/// Candidate fetch for one relation configuration
///
/// Issued by [`RelationFieldState::begin`]; the generation lets the state
/// drop results of fetches that were overtaken by a newer one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub form_id: String,
    pub display_field: Option<String>,
    generation: u64,
}

impl FetchTicket {
    fn key(&self) -> ConfigKey {
        (self.form_id.clone(), self.display_field.clone())
    }
}

type ConfigKey = (String, Option<String>);

fn config_key(config: &RelationConfig) -> ConfigKey {
    (config.form_id.clone(), config.display_field.clone())
}

/// Local state of one relation control
///
/// The persisted value of the field is the target form id; the response the
/// user picked is kept here only.
#[derive(Debug, Clone, Default)]
pub struct RelationFieldState {
    key: Option<ConfigKey>,
    generation: u64,
    loading: bool,
    candidates: CandidateList,
    selected_response: Option<String>,
}

impl RelationFieldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fetch for `config`, invalidating any fetch still in flight
    pub fn begin(&mut self, config: &RelationConfig) -> FetchTicket {
        let key = config_key(config);
        if self.key.as_ref() != Some(&key) {
            self.candidates = CandidateList::default();
            self.selected_response = None;
        }
        self.key = Some(key);
        self.generation += 1;
        self.loading = true;
        FetchTicket {
            form_id: config.form_id.clone(),
            display_field: config.display_field.clone(),
            generation: self.generation,
        }
    }

    /// Accept the result of a fetch; returns `false` when it was stale
    pub fn complete(&mut self, ticket: &FetchTicket, list: CandidateList) -> bool {
        if ticket.generation != self.generation || self.key.as_ref() != Some(&ticket.key()) {
            debug!(
                form_id = %ticket.form_id,
                generation = ticket.generation,
                current = self.generation,
                "Discarding stale relation fetch"
            );
            return false;
        }
        let still_listed = self
            .selected_response
            .as_deref()
            .map_or(true, |id| list.get(id).is_some());
        if !still_listed {
            self.selected_response = None;
        }
        self.candidates = list;
        self.loading = false;
        true
    }

    /// Forget everything; used when the field loses its target form
    pub fn reset(&mut self) {
        self.key = None;
        self.generation += 1;
        self.loading = false;
        self.candidates = CandidateList::default();
        self.selected_response = None;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn candidates(&self) -> &CandidateList {
        &self.candidates
    }

    pub fn selected_response(&self) -> Option<&str> {
        self.selected_response.as_deref()
    }

    /// Pick a response among the loaded candidates
    pub fn select(&mut self, response_id: &str) -> Result<()> {
        if self.candidates.get(response_id).is_none() {
            return Err(FormflowError::not_found("Response", response_id));
        }
        self.selected_response = Some(response_id.to_string());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected_response = None;
    }

    pub fn state(&self) -> RelationState {
        if self.key.is_none() {
            RelationState::NotConfigured
        } else if self.loading {
            RelationState::Loading
        } else {
            RelationState::Ready(self.candidates.clone())
        }
    }
}

/// Fetches and labels candidate responses for relation fields
#[derive(Clone)]
pub struct RelationResolver {
    responses: ResponseRepository,
}

impl RelationResolver {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            responses: ResponseRepository::new(store),
        }
    }

    /// Every response of `form_id` as a labelled candidate, newest first
    pub async fn list_candidates(
        &self,
        form_id: &str,
        display_field: Option<&str>,
    ) -> CandidateList {
        let records = match self.responses.list_records_by_form(form_id).await {
            Ok(records) => records,
            Err(e) => {
                warn!(form_id = %form_id, error = %e, "Failed to fetch relation candidates");
                return CandidateList {
                    candidates: Vec::new(),
                    warning: Some(format!("could not load responses: {}", e)),
                };
            }
        };

        let mut candidates = Vec::with_capacity(records.len());
        for record in records {
            let id = record_id(&record).unwrap_or("<unknown>").to_string();
            match ResponseRepository::decode(record) {
                Ok(response) => candidates.push(Candidate {
                    label: display_value(&response.id, &response.data, display_field),
                    value: response.id,
                    created_at: response.created_at,
                }),
                Err(e) => {
                    warn!(form_id = %form_id, response_id = %id, error = %e, "Skipping malformed response");
                }
            }
        }

        debug!(form_id = %form_id, count = candidates.len(), "Resolved relation candidates");
        CandidateList {
            candidates,
            warning: None,
        }
    }

    /// Run a fetch started with [`RelationFieldState::begin`]
    pub async fn fetch(&self, ticket: &FetchTicket) -> CandidateList {
        self.list_candidates(&ticket.form_id, ticket.display_field.as_deref())
            .await
    }

    /// Load the candidates of `field` into `state`
    ///
    /// Returns the state the control should render.
    pub async fn refresh(
        &self,
        field: &FormField,
        state: &mut RelationFieldState,
    ) -> RelationState {
        let Some(config) = field.relation_config().filter(|c| !c.form_id.is_empty()) else {
            state.reset();
            return RelationState::NotConfigured;
        };
        let ticket = state.begin(config);
        let list = self.fetch(&ticket).await;
        state.complete(&ticket, list);
        state.state()
    }
}
