use std::sync::Arc;

use uuid::Uuid;

use crate::error::AppError;
use crate::models::{CreateTaskInput, PageRequest, Task, TaskFilter, UpdateTaskInput};
use crate::response::Page;
use crate::store::{TaskChanges, TaskStore};

/// Task operations on top of a [`TaskStore`].
///
/// Absence is translated into `NotFound` here. Ownership is checked with
/// [`TaskService::owned_by`] before any mutation reaches the store.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, owner_id: Uuid, input: CreateTaskInput) -> Result<Task, AppError> {
        self.store.insert(Task::new(input, owner_id)).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Task, AppError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(task_not_found)
    }

    /// Loads a task and fails with `Forbidden` unless `caller` owns it.
    pub async fn owned_by(&self, caller: Uuid, id: Uuid) -> Result<Task, AppError> {
        let task = self.get(id).await?;
        if task.owner_id != caller {
            return Err(AppError::Forbidden(
                "You are not allowed to access this task".into(),
            ));
        }
        Ok(task)
    }

    pub async fn update(&self, id: Uuid, input: UpdateTaskInput) -> Result<Task, AppError> {
        let changes = TaskChanges {
            title: input.title,
            description: input.description,
            done: input.done,
        };
        self.store
            .update(id, changes)
            .await?
            .ok_or_else(task_not_found)
    }

    pub async fn change_status(&self, id: Uuid, done: bool) -> Result<Task, AppError> {
        self.store
            .set_done(id, done)
            .await?
            .ok_or_else(task_not_found)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        match self.store.delete(id).await? {
            0 => Err(task_not_found()),
            _ => Ok(()),
        }
    }

    pub async fn list(
        &self,
        owner_id: Uuid,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> Result<Page<Task>, AppError> {
        let (items, total) = self.store.list(owner_id, filter, page).await?;
        Ok(Page {
            items,
            total,
            page_index: page.page,
            page_size: page.page_size,
        })
    }

    pub async fn delete_all_by_owner(&self, owner_id: Uuid) -> Result<u64, AppError> {
        self.store.delete_all_by_owner(owner_id).await
    }
}

fn task_not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}
