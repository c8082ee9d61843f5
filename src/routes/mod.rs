pub mod health;
pub mod tasks;
pub mod users;

use actix_cors::Cors;
use actix_web::{http::header, web};

use crate::error::AppError;

/// Route table of the `/api/v1` scope.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .service(
            web::scope("/users")
                .service(users::register)
                .service(users::login)
                .service(users::refresh)
                .service(users::revoke)
                .service(users::me)
                .service(users::update)
                .service(users::delete),
        )
        .service(
            web::scope("/tasks")
                .service(tasks::get_tasks)
                .service(tasks::create_task)
                .service(tasks::change_status)
                .service(tasks::get_task)
                .service(tasks::update_task)
                .service(tasks::delete_task),
        );
}

/// Malformed or mistyped JSON bodies get the same envelope as every other
/// bad request.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Body invalid: {}", err)).into()
    })
}

/// Query strings that cannot be deserialized at all, such as a repeated
/// `page`, get the same envelope as any other bad request.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Query invalid: {}", err)).into()
    })
}

/// CORS for browser clients. `*` allows any origin.
pub fn cors_policy(allowed_origins: &[String]) -> Cors {
    let cors = allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| match origin.as_str() {
            "*" => cors.allow_any_origin(),
            origin => cors.allowed_origin(origin),
        });

    cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ])
        .supports_credentials()
        .max_age(3600)
}
