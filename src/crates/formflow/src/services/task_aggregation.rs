//! Task listings for one user
//!
//! Two views over the task collection:
//!
//! - **assignee**: tasks assigned to the user;
//! - **submitter**: tasks the user submitted responses for, found through the
//!   task/response join.
//!
//! Both apply the same filters, sort newest first, paginate with 1-indexed
//! pages and attach each task's linked responses, oldest first.

use crate::error::{FormflowError, Result};
use crate::models::{Response, Task};
use crate::repositories::{ResponseRepository, TaskRepository, TaskResponseRepository};
use crate::store::{DataStore, Query, SortDirection};
use chrono::{NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Largest page size accepted unless configured otherwise
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    /// Number of items matching the filters, across all pages
    pub total: u64,
    /// 1-indexed page number
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: u64, page: u32, page_size: u32) -> Self {
        let size = u64::from(page_size.max(1));
        Self {
            data,
            total,
            page,
            page_size,
            total_pages: (total + size - 1) / size,
        }
    }

    pub fn empty(page: u32, page_size: u32) -> Self {
        Self::new(Vec::new(), 0, page, page_size)
    }
}

/// Filters shared by both task views; all present filters must match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFilters {
    /// Exact match on `status.status`
    pub status: Option<String>,
    /// Case-insensitive substring of the step name or the notes
    pub search: Option<String>,
    /// Tasks created on or after the start of this day (UTC)
    pub date_from: Option<NaiveDate>,
    /// Tasks created on or before the end of this day (UTC)
    pub date_to: Option<NaiveDate>,
}

impl TaskFilters {
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn created_between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    fn apply(&self, mut query: Query) -> Query {
        if let Some(status) = self.status.as_deref().filter(|s| !s.is_empty()) {
            query = query.eq("status.status", status);
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.contains_any(["step.step_name", "notes"], search);
        }
        if let Some(start) = self.date_from.and_then(|d| d.and_hms_opt(0, 0, 0)) {
            query = query.gte("created_at", utc_text(start));
        }
        if let Some(end) = self.date_to.and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999)) {
            query = query.lte("created_at", utc_text(end));
        }
        query
    }
}

fn utc_text(at: NaiveDateTime) -> String {
    Utc.from_utc_datetime(&at)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Paginated task views joined with their responses
#[derive(Clone)]
pub struct TaskAggregationService {
    tasks: TaskRepository,
    links: TaskResponseRepository,
    responses: ResponseRepository,
    max_page_size: u32,
}

impl TaskAggregationService {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            tasks: TaskRepository::new(store.clone()),
            links: TaskResponseRepository::new(store.clone()),
            responses: ResponseRepository::new(store),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }

    fn check_page(&self, page: u32, page_size: u32) -> Result<u32> {
        if page == 0 {
            return Err(FormflowError::validation("page must be at least 1"));
        }
        if page_size == 0 {
            return Err(FormflowError::validation("page size must be at least 1"));
        }
        Ok(page_size.min(self.max_page_size))
    }

    /// Tasks assigned to `user_id`
    pub async fn by_assignee(
        &self,
        user_id: &str,
        page: u32,
        page_size: u32,
        filters: &TaskFilters,
    ) -> Result<Page<Task>> {
        let page_size = self.check_page(page, page_size)?;
        let query = filters.apply(Query::new().eq("assigned_to", user_id));
        debug!(user_id = %user_id, page, page_size, "Listing tasks by assignee");
        self.fetch_page(query, page, page_size).await
    }

    /// Tasks `user_id` submitted at least one response for
    pub async fn by_submitter(
        &self,
        user_id: &str,
        page: u32,
        page_size: u32,
        filters: &TaskFilters,
    ) -> Result<Page<Task>> {
        let page_size = self.check_page(page, page_size)?;

        let response_ids = self.responses.ids_by_creator(user_id).await?;
        let task_ids = self.links.task_ids_for_responses(&response_ids).await?;
        if task_ids.is_empty() {
            debug!(user_id = %user_id, "User has no submitted tasks");
            return Ok(Page::empty(page, page_size));
        }

        let query = filters.apply(Query::new().is_in("id", task_ids));
        debug!(user_id = %user_id, page, page_size, "Listing tasks by submitter");
        self.fetch_page(query, page, page_size).await
    }

    async fn fetch_page(&self, query: Query, page: u32, page_size: u32) -> Result<Page<Task>> {
        let total = self.tasks.count(&query).await?;
        let offset = u64::from(page - 1) * u64::from(page_size);
        let query = query
            .order_by("created_at", SortDirection::Desc)
            .paginate(u64::from(page_size), offset);

        let mut tasks = self.tasks.list(&query).await?;
        self.attach_responses(&mut tasks).await?;
        Ok(Page::new(tasks, total, page, page_size))
    }

    /// Fill `responses` of every task, oldest first
    async fn attach_responses(&self, tasks: &mut [Task]) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        let task_ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
        let links = self.links.for_tasks(&task_ids).await?;
        if links.is_empty() {
            return Ok(());
        }

        let mut owners: HashMap<String, Vec<String>> = HashMap::new();
        for link in &links {
            owners
                .entry(link.response_id.clone())
                .or_default()
                .push(link.task_id.clone());
        }
        let response_ids: Vec<String> = owners.keys().cloned().collect();

        let mut by_task: HashMap<String, Vec<Response>> = HashMap::new();
        for response in self.responses.find_by_ids(&response_ids).await? {
            if let Some(task_ids) = owners.get(&response.id) {
                for task_id in task_ids {
                    by_task
                        .entry(task_id.clone())
                        .or_default()
                        .push(response.clone());
                }
            }
        }

        for task in tasks.iter_mut() {
            task.responses = by_task.remove(&task.id).unwrap_or_default();
        }
        Ok(())
    }
}
