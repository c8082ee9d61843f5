//! Persistence seams.
//!
//! The services talk to [`TaskStore`] and [`UserStore`] only. Store methods
//! report absence as `None` or as an affected-row count of zero; deciding that
//! absence means "not found" is left to the services.
//!
//! Two implementations exist: [`memory`] keeps everything in process and backs
//! the test suite and database-less runs, [`postgres`] is the production store.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{PageRequest, Task, TaskFilter, User};

pub use memory::{InMemoryTaskStore, InMemoryUserStore};
pub use postgres::{PgTaskStore, PgUserStore};

/// The three mutable fields of a task, replaced together.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskChanges {
    pub title: String,
    pub description: Option<String>,
    pub done: bool,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persists a task built by `Task::new`.
    async fn insert(&self, task: Task) -> Result<Task, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, AppError>;

    /// Replaces title, description and done; refreshes `updated_at`.
    async fn update(&self, id: Uuid, changes: TaskChanges) -> Result<Option<Task>, AppError>;

    /// Sets only the done flag; refreshes `updated_at`.
    async fn set_done(&self, id: Uuid, done: bool) -> Result<Option<Task>, AppError>;

    /// Returns the number of removed tasks (0 or 1).
    async fn delete(&self, id: Uuid) -> Result<u64, AppError>;

    /// One page of `owner_id`'s tasks matching `filter`, newest first, plus the
    /// size of the whole filtered set.
    async fn list(
        &self,
        owner_id: Uuid,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> Result<(Vec<Task>, u64), AppError>;

    async fn delete_all_by_owner(&self, owner_id: Uuid) -> Result<u64, AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persists a user. A taken email or username is reported as
    /// `AppError::Conflict`; this is the authoritative uniqueness check.
    async fn insert(&self, user: User) -> Result<User, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn exists_by_email(&self, email: &str) -> Result<bool, AppError>;

    async fn exists_by_username(&self, username: &str) -> Result<bool, AppError>;

    /// Replaces username and password hash; refreshes `updated_at`.
    async fn update_credentials(
        &self,
        id: Uuid,
        username: &str,
        password_hash: &str,
    ) -> Result<Option<User>, AppError>;

    /// Overwrites the refresh-token slot. An empty string revokes.
    async fn set_refresh_token(&self, id: Uuid, token: &str) -> Result<Option<User>, AppError>;

    /// Replaces the slot with `next` only while it still holds `current`,
    /// which must be non-empty. Returns whether the swap happened.
    async fn swap_refresh_token(
        &self,
        id: Uuid,
        current: &str,
        next: &str,
    ) -> Result<bool, AppError>;

    /// Returns the number of removed users (0 or 1).
    async fn delete(&self, id: Uuid) -> Result<u64, AppError>;
}
