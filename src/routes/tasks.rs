use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{CreateTaskInput, StatusInput, TaskListQuery, UpdateTaskInput},
    response::ApiResponse,
    services::{TaskService, UserService},
};
use actix_web::{delete, get, post, put, web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

/// Retrieves one page of the authenticated user's tasks.
///
/// Tasks are ordered by creation date, newest first. All filters are
/// optional and combine with AND.
///
/// ## Query Parameters:
/// - `title`: case-insensitive substring of the title.
/// - `done`: `true` or `false`.
/// - `created_before` / `created_after`: inclusive RFC 3339 bounds. A `+`
///   offset sent unencoded arrives as a space and is read back as `+`.
/// - `page` (default 1), `page_size` (default 10, at most 100). Values that
///   are missing, not numbers or not positive fall back to the defaults.
///
/// ## Responses:
/// - `200 OK`: body is `{items, total, page_index, page_size}`.
/// - `400 Bad Request`: malformed `done` or date.
/// - `401 Unauthorized`: missing or invalid bearer token.
#[get("")]
pub async fn get_tasks(
    tasks: web::Data<TaskService>,
    caller: AuthenticatedUser,
    query_params: web::Query<TaskListQuery>,
) -> Result<HttpResponse, AppError> {
    let (filter, page) = query_params.into_inner().into_parts()?;
    let page = tasks.list(caller.0, &filter, page).await?;
    Ok(ApiResponse::ok(page, "Tasks found").into_response())
}

/// Creates a new task owned by the authenticated user.
///
/// ## Request Body:
/// - `title`: 8 to 60 characters.
/// - `description` (optional): at most 200 characters.
///
/// ## Responses:
/// - `201 Created`: body is the new task, with `done` false.
/// - `400 Bad Request`: the body failed validation.
/// - `401 Unauthorized`: the caller's account no longer exists.
#[post("")]
pub async fn create_task(
    tasks: web::Data<TaskService>,
    users: web::Data<UserService>,
    caller: AuthenticatedUser,
    task_data: web::Json<CreateTaskInput>,
) -> Result<HttpResponse, AppError> {
    task_data.validate()?;
    users.ensure_exists(caller.0).await?;
    let task = tasks.create(caller.0, task_data.into_inner()).await?;
    Ok(ApiResponse::created(task, "Task created").into_response())
}

/// Retrieves a specific task by its ID.
///
/// ## Responses:
/// - `200 OK`: the task.
/// - `400 Bad Request`: the id is not a UUID.
/// - `403 Forbidden`: the task belongs to someone else.
/// - `404 Not Found`: no such task.
#[get("/{id}")]
pub async fn get_task(
    tasks: web::Data<TaskService>,
    caller: AuthenticatedUser,
    task_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let task = tasks.owned_by(caller.0, parse_id(&task_id)?).await?;
    Ok(ApiResponse::ok(task, "Task found").into_response())
}

/// Replaces title, description and done of a task the caller owns.
/// An omitted `done` means `false`.
#[put("/{id}")]
pub async fn update_task(
    tasks: web::Data<TaskService>,
    caller: AuthenticatedUser,
    task_id: web::Path<String>,
    task_data: web::Json<UpdateTaskInput>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&task_id)?;
    task_data.validate()?;
    tasks.owned_by(caller.0, id).await?;
    let task = tasks.update(id, task_data.into_inner()).await?;
    Ok(ApiResponse::ok(task, "Task updated").into_response())
}

/// Deletes a task the caller owns and returns it one last time.
#[delete("/{id}")]
pub async fn delete_task(
    tasks: web::Data<TaskService>,
    caller: AuthenticatedUser,
    task_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let task = tasks.owned_by(caller.0, parse_id(&task_id)?).await?;
    tasks.delete(task.id).await?;
    Ok(ApiResponse::ok(task, "Task deleted").into_response())
}

/// Sets or toggles the done flag.
///
/// With a `{"done": bool}` body the flag is set to that value; with an empty
/// body it is flipped.
#[put("/{id}/status/done")]
pub async fn change_status(
    tasks: web::Data<TaskService>,
    caller: AuthenticatedUser,
    task_id: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&task_id)?;
    let requested = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        let input: StatusInput = serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Body invalid: {}", e)))?;
        Some(input.done)
    };

    let task = tasks.owned_by(caller.0, id).await?;
    let task = tasks
        .change_status(id, requested.unwrap_or(!task.done))
        .await?;
    Ok(ApiResponse::ok(task, "Task status changed").into_response())
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest("Id invalid".into()))
}
