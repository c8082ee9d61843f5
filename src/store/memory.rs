use std::cmp::Reverse;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{TaskChanges, TaskStore, UserStore};
use crate::error::AppError;
use crate::models::{PageRequest, Task, TaskFilter, User};

/// Process-local task store.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, task: Task) -> Result<Task, AppError> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(AppError::Conflict("Task already exists".into()));
        }
        tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn update(&self, id: Uuid, changes: TaskChanges) -> Result<Option<Task>, AppError> {
        let mut tasks = self.tasks.write().await;
        Ok(tasks.get_mut(&id).map(|task| {
            task.title = changes.title;
            task.description = changes.description;
            task.done = changes.done;
            task.updated_at = Utc::now();
            task.clone()
        }))
    }

    async fn set_done(&self, id: Uuid, done: bool) -> Result<Option<Task>, AppError> {
        let mut tasks = self.tasks.write().await;
        Ok(tasks.get_mut(&id).map(|task| {
            task.done = done;
            task.updated_at = Utc::now();
            task.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<u64, AppError> {
        Ok(self.tasks.write().await.remove(&id).map_or(0, |_| 1))
    }

    async fn list(
        &self,
        owner_id: Uuid,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> Result<(Vec<Task>, u64), AppError> {
        let tasks = self.tasks.read().await;
        let mut matching: Vec<&Task> = tasks
            .values()
            .filter(|task| task.owner_id == owner_id && filter.matches(task))
            .collect();
        matching.sort_by_key(|task| Reverse((task.created_at, task.id)));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect();
        Ok((items, total))
    }

    async fn delete_all_by_owner(&self, owner_id: Uuid) -> Result<u64, AppError> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|_, task| task.owner_id != owner_id);
        Ok((before - tasks.len()) as u64)
    }
}

/// Process-local user store. Uniqueness of email and username is enforced
/// under the write lock, mirroring the database constraints.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: User) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email already exists".into()));
        }
        if users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict("Username already exists".into()));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, AppError> {
        Ok(self.users.read().await.values().any(|u| u.email == email))
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, AppError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .any(|u| u.username == username))
    }

    async fn update_credentials(
        &self,
        id: Uuid,
        username: &str,
        password_hash: &str,
    ) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.id != id && u.username == username) {
            return Err(AppError::Conflict("Username already exists".into()));
        }
        Ok(users.get_mut(&id).map(|user| {
            user.username = username.to_string();
            user.password_hash = password_hash.to_string();
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn set_refresh_token(&self, id: Uuid, token: &str) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|user| {
            user.refresh_token = token.to_string();
            user.clone()
        }))
    }

    async fn swap_refresh_token(
        &self,
        id: Uuid,
        current: &str,
        next: &str,
    ) -> Result<bool, AppError> {
        let mut users = self.users.write().await;
        match users.get_mut(&id) {
            Some(user) if !current.is_empty() && user.refresh_token == current => {
                user.refresh_token = next.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<u64, AppError> {
        Ok(self.users.write().await.remove(&id).map_or(0, |_| 1))
    }
}
