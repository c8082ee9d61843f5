use crate::{
    auth::{AuthenticatedUser, RefreshRequest},
    error::AppError,
    models::{LoginRequest, RegisterRequest, UpdateUserRequest},
    response::ApiResponse,
    services::UserService,
};
use actix_web::{delete, get, post, put, web, HttpResponse};
use validator::Validate;

/// Register a new user
///
/// Creates the account and opens its first session.
///
/// ## Responses:
/// - `201 Created`: body is `{access_token, refresh_token}`.
/// - `400 Bad Request`: a field failed validation; body lists the failures.
/// - `409 Conflict`: the email or username is taken.
#[post("/register")]
pub async fn register(
    users: web::Data<UserService>,
    register_data: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    register_data.validate()?;
    let tokens = users.register(register_data.into_inner()).await?;
    Ok(ApiResponse::created(tokens, "User created").into_response())
}

/// Login user
///
/// Checks the credentials and rotates the refresh slot, which signs out any
/// session opened earlier.
///
/// ## Responses:
/// - `200 OK`: body is `{access_token, refresh_token}`.
/// - `401 Unauthorized`: unknown email or wrong password.
#[post("/login")]
pub async fn login(
    users: web::Data<UserService>,
    login_data: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    login_data.validate()?;
    let tokens = users.login(login_data.into_inner()).await?;
    Ok(ApiResponse::ok(tokens, "Login success").into_response())
}

/// Exchange the current refresh token for a new pair.
#[post("/refresh")]
pub async fn refresh(
    users: web::Data<UserService>,
    refresh_data: web::Json<RefreshRequest>,
) -> Result<HttpResponse, AppError> {
    refresh_data.validate()?;
    let tokens = users.refresh(&refresh_data.refresh_token).await?;
    Ok(ApiResponse::ok(tokens, "Token refreshed").into_response())
}

/// The caller's own profile.
#[get("")]
pub async fn me(
    users: web::Data<UserService>,
    caller: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let profile = users.profile(caller.0).await?;
    Ok(ApiResponse::ok(profile, "User found").into_response())
}

#[put("")]
pub async fn update(
    users: web::Data<UserService>,
    caller: AuthenticatedUser,
    update_data: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, AppError> {
    update_data.validate()?;
    let profile = users.update(caller.0, update_data.into_inner()).await?;
    Ok(ApiResponse::ok(profile, "User updated").into_response())
}

/// Delete the caller's account together with all of their tasks.
///
/// ## Responses:
/// - `200 OK`: account and tasks are gone.
/// - `503 Service Unavailable`: the tasks were removed but the account could
///   not be; repeating the request is safe.
#[delete("")]
pub async fn delete(
    users: web::Data<UserService>,
    caller: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    users.delete_account(caller.0).await?;
    Ok(ApiResponse::ok("", "User deleted").into_response())
}

#[put("/revoke")]
pub async fn revoke(
    users: web::Data<UserService>,
    caller: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    users.revoke(caller.0).await?;
    Ok(ApiResponse::ok("", "Refresh token revoked").into_response())
}
