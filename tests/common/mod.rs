#![allow(dead_code)]

use std::sync::Arc;

use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::header,
    middleware::Logger,
    test, web, App, Error,
};
use chrono::Duration;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use todolist::{
    auth::{AuthMiddleware, PasswordCodec, TokenPair, TokenService},
    response::ApiResponse,
    routes::{self, health},
    services::{TaskService, UserService},
    store::{InMemoryTaskStore, InMemoryUserStore},
};
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret";

pub fn token_service() -> TokenService {
    TokenService::new(TEST_SECRET, Duration::hours(24), Duration::days(7)).unwrap()
}

/// Fresh services over empty in-memory stores, with a cheap bcrypt cost.
pub fn services() -> (web::Data<TaskService>, web::Data<UserService>) {
    let tasks = TaskService::new(Arc::new(InMemoryTaskStore::new()));
    let users = UserService::new(
        Arc::new(InMemoryUserStore::new()),
        tasks.clone(),
        token_service(),
        PasswordCodec::new(4),
    );
    (web::Data::new(tasks), web::Data::new(users))
}

/// The application as `main` builds it, minus CORS.
pub async fn init_app(
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error> {
    let (tasks, users) = services();
    test::init_service(
        App::new()
            .app_data(tasks)
            .app_data(users)
            .wrap(Logger::default())
            .service(health::health)
            .service(
                web::scope("/api/v1")
                    .wrap(AuthMiddleware::new(token_service()))
                    .configure(routes::config),
            ),
    )
    .await
}

/// Status code plus parsed envelope of a response.
pub async fn send<S, B>(app: &S, req: Request) -> (u16, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let bytes = test::read_body(resp).await;
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub fn body_of<T: DeserializeOwned>(envelope: Value) -> T {
    serde_json::from_value::<ApiResponse<T>>(envelope).unwrap().body
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

/// Registers `username` with `<username>@example.com` / `password123`.
pub async fn register<S, B>(app: &S, username: &str) -> TokenPair
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/v1/users/register")
        .set_json(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "password123"
        }))
        .to_request();
    let (status, envelope) = send(app, req).await;
    assert_eq!(status, 201, "registration failed: {}", envelope);
    body_of(envelope)
}

pub fn user_id(tokens: &TokenPair) -> Uuid {
    token_service().verify(&tokens.access_token).unwrap()
}

/// Creates a task and returns its JSON representation.
pub async fn create_task<S, B>(app: &S, token: &str, title: &str) -> Value
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/v1/tasks")
        .insert_header(bearer(token))
        .set_json(json!({ "title": title }))
        .to_request();
    let (status, envelope) = send(app, req).await;
    assert_eq!(status, 201, "task creation failed: {}", envelope);
    envelope["body"].clone()
}
