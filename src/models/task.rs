use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

/// Input structure for creating a task.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateTaskInput {
    /// The title of the task.
    /// Must be between 8 and 60 characters.
    #[validate(length(min = 8, max = 60))]
    pub title: String,

    /// An optional description for the task.
    /// Maximum length of 200 characters if provided.
    #[validate(length(max = 200))]
    pub description: Option<String>,
}

/// Input structure for a full update of a task's mutable fields.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateTaskInput {
    #[validate(length(min = 8, max = 60))]
    pub title: String,

    #[validate(length(max = 200))]
    pub description: Option<String>,

    /// Omitted means `false`; this is a full replace, not a patch.
    #[serde(default)]
    pub done: bool,
}

/// Optional body of the status endpoint. Without it the flag is toggled.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusInput {
    pub done: bool,
}

/// Represents a task entity as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    /// The user who created the task. Never changes after creation.
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub done: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new, not yet persisted `Task` owned by `owner_id`.
    /// Sets `done` to `false` and both timestamps to the current time.
    pub fn new(input: CreateTaskInput, owner_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title: input.title,
            description: input.description,
            done: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Conjunctive filters for listing a user's tasks. `None` means "don't filter".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
    pub done: Option<bool>,
    /// Inclusive upper bound on `created_at`.
    pub created_before: Option<DateTime<Utc>>,
    /// Inclusive lower bound on `created_at`.
    pub created_after: Option<DateTime<Utc>>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(title) = &self.title {
            if !task.title.to_lowercase().contains(&title.to_lowercase()) {
                return false;
            }
        }
        if let Some(done) = self.done {
            if task.done != done {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if task.created_at > before {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if task.created_at < after {
                return false;
            }
        }
        true
    }
}

/// 1-based offset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_PAGE_SIZE: u32 = 10;
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// Builds a request, replacing non-positive values with the defaults and
    /// capping the page size.
    pub fn new(page: i64, page_size: i64) -> Self {
        let page = if page > 0 {
            page.min(u32::MAX as i64) as u32
        } else {
            Self::DEFAULT_PAGE
        };
        let page_size = if page_size > 0 {
            page_size.min(Self::MAX_PAGE_SIZE as i64) as u32
        } else {
            Self::DEFAULT_PAGE_SIZE
        };
        Self { page, page_size }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }

    pub fn limit(&self) -> u64 {
        self.page_size as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

/// Raw query string of `GET /tasks`. Every field is kept as text so that a
/// bad value can be handled per field instead of failing extraction.
#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub title: Option<String>,
    pub done: Option<String>,
    pub created_before: Option<String>,
    pub created_after: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl TaskListQuery {
    /// Splits the query into filters and pagination.
    ///
    /// Bad pagination values fall back to defaults; a bad `done` or date is
    /// rejected, since ignoring it would widen the result set.
    pub fn into_parts(self) -> Result<(TaskFilter, PageRequest), AppError> {
        let done = match non_empty(self.done).as_deref() {
            None => None,
            Some("true") => Some(true),
            Some("false") => Some(false),
            Some(other) => {
                return Err(AppError::BadRequest(format!(
                    "done must be true or false, got {:?}",
                    other
                )))
            }
        };

        let filter = TaskFilter {
            title: non_empty(self.title),
            done,
            created_before: parse_instant("created_before", non_empty(self.created_before))?,
            created_after: parse_instant("created_after", non_empty(self.created_after))?,
        };

        let page = PageRequest::new(
            parse_number(self.page).unwrap_or(PageRequest::DEFAULT_PAGE as i64),
            parse_number(self.page_size).unwrap_or(PageRequest::DEFAULT_PAGE_SIZE as i64),
        );

        Ok((filter, page))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_number(value: Option<String>) -> Option<i64> {
    value.and_then(|v| v.trim().parse().ok())
}

fn parse_instant(
    field: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, AppError> {
    value
        .map(|raw| {
            parse_rfc3339(raw.trim()).ok_or_else(|| {
                AppError::BadRequest(format!("{} must be an RFC 3339 timestamp", field))
            })
        })
        .transpose()
}

fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    let parse = |text: &str| {
        DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|instant| instant.with_timezone(&Utc))
    };
    parse(raw).or_else(|| {
        // An unencoded `+` in a query string decodes to a space.
        let (instant, offset) = raw.rsplit_once(' ')?;
        parse(&format!("{}+{}", instant, offset))
    })
}
