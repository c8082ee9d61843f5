use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{TaskChanges, TaskStore, UserStore};
use crate::error::AppError;
use crate::models::{PageRequest, Task, TaskFilter, User};

const TASK_COLUMNS: &str = "id, owner_id, title, description, done, created_at, updated_at";
const USER_COLUMNS: &str =
    "id, username, email, password_hash, refresh_token, created_at, updated_at";

/// Opens the connection pool. Acquiring a connection is bounded by the same
/// limit as the store calls.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
    timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(timeout)
        .connect(database_url)
        .await
}

/// Applies the embedded schema migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Runs a query under `limit`; elapsing becomes `ServiceUnavailable`.
async fn bounded<T, F>(limit: Duration, query: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    Ok(tokio::time::timeout(limit, query).await??)
}

/// Escapes the `LIKE` metacharacters so a title filter is a plain substring.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, owner_id: Uuid, filter: &TaskFilter) {
    builder.push(" WHERE owner_id = ").push_bind(owner_id);
    if let Some(title) = &filter.title {
        builder
            .push(" AND title ILIKE ")
            .push_bind(format!("%{}%", escape_like(title)))
            .push(" ESCAPE '\\'");
    }
    if let Some(done) = filter.done {
        builder.push(" AND done = ").push_bind(done);
    }
    if let Some(before) = filter.created_before {
        builder.push(" AND created_at <= ").push_bind(before);
    }
    if let Some(after) = filter.created_after {
        builder.push(" AND created_at >= ").push_bind(after);
    }
}

#[derive(Debug, Clone)]
pub struct PgTaskStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgTaskStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn insert(&self, task: Task) -> Result<Task, AppError> {
        let sql = format!(
            "INSERT INTO tasks ({TASK_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {TASK_COLUMNS}"
        );
        let query = sqlx::query_as::<_, Task>(&sql)
            .bind(task.id)
            .bind(task.owner_id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.done)
            .bind(task.created_at)
            .bind(task.updated_at)
            .fetch_one(&self.pool);
        bounded(self.timeout, query).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");
        let query = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&self.pool);
        bounded(self.timeout, query).await
    }

    async fn update(&self, id: Uuid, changes: TaskChanges) -> Result<Option<Task>, AppError> {
        let sql = format!(
            "UPDATE tasks SET title = $1, description = $2, done = $3, updated_at = NOW() \
             WHERE id = $4 RETURNING {TASK_COLUMNS}"
        );
        let query = sqlx::query_as::<_, Task>(&sql)
            .bind(changes.title)
            .bind(changes.description)
            .bind(changes.done)
            .bind(id)
            .fetch_optional(&self.pool);
        bounded(self.timeout, query).await
    }

    async fn set_done(&self, id: Uuid, done: bool) -> Result<Option<Task>, AppError> {
        let sql = format!(
            "UPDATE tasks SET done = $1, updated_at = NOW() WHERE id = $2 RETURNING {TASK_COLUMNS}"
        );
        let query = sqlx::query_as::<_, Task>(&sql)
            .bind(done)
            .bind(id)
            .fetch_optional(&self.pool);
        bounded(self.timeout, query).await
    }

    async fn delete(&self, id: Uuid) -> Result<u64, AppError> {
        let query = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool);
        Ok(bounded(self.timeout, query).await?.rows_affected())
    }

    async fn list(
        &self,
        owner_id: Uuid,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> Result<(Vec<Task>, u64), AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks");
        push_filters(&mut count, owner_id, filter);
        let total: i64 = bounded(
            self.timeout,
            count.build_query_scalar::<i64>().fetch_one(&self.pool),
        )
        .await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {TASK_COLUMNS} FROM tasks"));
        push_filters(&mut select, owner_id, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let items = bounded(
            self.timeout,
            select.build_query_as::<Task>().fetch_all(&self.pool),
        )
        .await?;

        Ok((items, total.max(0) as u64))
    }

    async fn delete_all_by_owner(&self, owner_id: Uuid) -> Result<u64, AppError> {
        let query = sqlx::query("DELETE FROM tasks WHERE owner_id = $1")
            .bind(owner_id)
            .execute(&self.pool);
        Ok(bounded(self.timeout, query).await?.rows_affected())
    }
}

#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgUserStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: User) -> Result<User, AppError> {
        // Unique violations map to Conflict through `From<sqlx::Error>`.
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {USER_COLUMNS}"
        );
        let query = sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.refresh_token)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool);
        bounded(self.timeout, query).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let query = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool);
        bounded(self.timeout, query).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let query = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool);
        bounded(self.timeout, query).await
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, AppError> {
        let query =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool);
        bounded(self.timeout, query).await
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, AppError> {
        let query =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool);
        bounded(self.timeout, query).await
    }

    async fn update_credentials(
        &self,
        id: Uuid,
        username: &str,
        password_hash: &str,
    ) -> Result<Option<User>, AppError> {
        let sql = format!(
            "UPDATE users SET username = $1, password_hash = $2, updated_at = NOW() \
             WHERE id = $3 RETURNING {USER_COLUMNS}"
        );
        let query = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .bind(password_hash)
            .bind(id)
            .fetch_optional(&self.pool);
        bounded(self.timeout, query).await
    }

    async fn set_refresh_token(&self, id: Uuid, token: &str) -> Result<Option<User>, AppError> {
        let sql = format!(
            "UPDATE users SET refresh_token = $1 WHERE id = $2 RETURNING {USER_COLUMNS}"
        );
        let query = sqlx::query_as::<_, User>(&sql)
            .bind(token)
            .bind(id)
            .fetch_optional(&self.pool);
        bounded(self.timeout, query).await
    }

    async fn swap_refresh_token(
        &self,
        id: Uuid,
        current: &str,
        next: &str,
    ) -> Result<bool, AppError> {
        let query = sqlx::query(
            "UPDATE users SET refresh_token = $1 \
             WHERE id = $2 AND refresh_token = $3 AND refresh_token <> ''",
        )
        .bind(next)
        .bind(id)
        .bind(current)
        .execute(&self.pool);
        Ok(bounded(self.timeout, query).await?.rows_affected() == 1)
    }

    async fn delete(&self, id: Uuid) -> Result<u64, AppError> {
        let query = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool);
        Ok(bounded(self.timeout, query).await?.rows_affected())
    }
}
