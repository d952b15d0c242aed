//! Response submission for `fill-form` tasks

use crate::error::{FormflowError, Result};
use crate::models::{Form, Response};
use crate::relation::coerce_value;
use crate::repositories::{
    FormRepository, ResponseRepository, TaskRepository, TaskResponseRepository,
};
use crate::store::DataStore;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

/// Stores responses and links them to the task they answer
#[derive(Clone)]
pub struct SubmissionService {
    forms: FormRepository,
    responses: ResponseRepository,
    tasks: TaskRepository,
    links: TaskResponseRepository,
}

impl SubmissionService {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            forms: FormRepository::new(store.clone()),
            responses: ResponseRepository::new(store.clone()),
            tasks: TaskRepository::new(store.clone()),
            links: TaskResponseRepository::new(store),
        }
    }

    /// Submit `data` for `form_id` as `user_id` against task `task_id`
    pub async fn submit(
        &self,
        task_id: &str,
        form_id: &str,
        data: Map<String, Value>,
        user_id: &str,
    ) -> Result<Response> {
        let task = self.tasks.find_by_id(task_id).await?;
        let expected = task.step.form_id.as_deref().ok_or_else(|| {
            FormflowError::validation(format!("task '{}' does not ask for a form", task_id))
        })?;
        if expected != form_id {
            return Err(FormflowError::validation(format!(
                "task '{}' expects form '{}', got '{}'",
                task_id, expected, form_id
            )));
        }

        let form = self.forms.find_by_id(form_id).await?;
        check_required(&form, &data)?;

        let response = Response::new(form_id, data).created_by(user_id);
        let saved = self.responses.create(&response).await?;
        self.links.link(task_id, &saved.id).await?;

        info!(task_id = %task_id, form_id = %form_id, response_id = %saved.id, "Response submitted");
        Ok(saved)
    }
}

fn check_required(form: &Form, data: &Map<String, Value>) -> Result<()> {
    let missing: Vec<&str> = form
        .schema
        .fields
        .iter()
        .filter(|field| field.required)
        .filter(|field| {
            data.get(&field.id)
                .and_then(coerce_value)
                .map_or(true, |text| text.trim().is_empty())
        })
        .map(|field| field.label.as_str())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(FormflowError::validation(format!(
            "required fields missing: {}",
            missing.join(", ")
        )))
    }
}
