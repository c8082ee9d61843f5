mod common;

use actix_web::test;
use common::{bearer, body_of, create_task, init_app, register, send, user_id};
use pretty_assertions::assert_eq;
use serde_json::json;
use todolist::auth::TokenPair;
use todolist::models::UserProfile;

#[actix_rt::test]
async fn test_register_and_login_flow() {
    let app = init_app().await;
    let registered = register(&app, "integration_user").await;

    let req = test::TestRequest::post()
        .uri("/api/v1/users/login")
        .set_json(json!({
            "email": "integration_user@example.com",
            "password": "password123"
        }))
        .to_request();
    let (status, envelope) = send(&app, req).await;
    assert_eq!(status, 200, "login failed: {}", envelope);
    assert_eq!(envelope["status"], true);
    assert_eq!(envelope["code"], 200);

    let logged_in: TokenPair = body_of(envelope);
    assert_eq!(user_id(&logged_in), user_id(&registered));

    let req = test::TestRequest::get()
        .uri("/api/v1/users")
        .insert_header(bearer(&logged_in.access_token))
        .to_request();
    let (status, envelope) = send(&app, req).await;
    assert_eq!(status, 200);
    let profile: UserProfile = body_of(envelope);
    assert_eq!(profile.id, user_id(&registered));
    assert_eq!(profile.username, "integration_user");
}

#[actix_rt::test]
async fn test_duplicate_registration_is_conflict() {
    let app = init_app().await;
    register(&app, "first_user").await;

    let req = test::TestRequest::post()
        .uri("/api/v1/users/register")
        .set_json(json!({
            "username": "second_user",
            "email": "first_user@example.com",
            "password": "password123"
        }))
        .to_request();
    let (status, envelope) = send(&app, req).await;
    assert_eq!(status, 409);
    assert_eq!(envelope["status"], false);
    assert_eq!(envelope["message"], "Email already exists");

    // The rejected registration created nothing: its username is still free.
    register(&app, "second_user").await;
}

#[actix_rt::test]
async fn test_registration_validation() {
    let app = init_app().await;
    let req = test::TestRequest::post()
        .uri("/api/v1/users/register")
        .set_json(json!({
            "username": "has space",
            "email": "not-an-email",
            "password": "short"
        }))
        .to_request();
    let (status, envelope) = send(&app, req).await;

    assert_eq!(status, 400);
    assert_eq!(envelope["message"], "Inputs invalid");
    let failures: Vec<String> = serde_json::from_value(envelope["body"].clone()).unwrap();
    assert!(failures.contains(&"username failed on excludespace".to_string()));
    assert!(failures.contains(&"email failed on email".to_string()));
    assert!(failures.contains(&"password failed on length".to_string()));
}

#[actix_rt::test]
async fn test_malformed_json_is_bad_request() {
    let app = init_app().await;
    let req = test::TestRequest::post()
        .uri("/api/v1/users/login")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let (status, envelope) = send(&app, req).await;

    assert_eq!(status, 400);
    assert_eq!(envelope["status"], false);
}

#[actix_rt::test]
async fn test_wrong_password_is_unauthorized() {
    let app = init_app().await;
    register(&app, "login_user").await;

    let req = test::TestRequest::post()
        .uri("/api/v1/users/login")
        .set_json(json!({
            "email": "login_user@example.com",
            "password": "password999"
        }))
        .to_request();
    let (status, envelope) = send(&app, req).await;
    assert_eq!(status, 401);
    assert_eq!(envelope["message"], "Login invalid");
}

#[actix_rt::test]
async fn test_protected_routes_need_a_token() {
    let app = init_app().await;

    let missing = test::TestRequest::get().uri("/api/v1/tasks").to_request();
    assert_eq!(send(&app, missing).await.0, 401);

    let garbage = test::TestRequest::get()
        .uri("/api/v1/tasks")
        .insert_header(bearer("not.a.token"))
        .to_request();
    assert_eq!(send(&app, garbage).await.0, 401);

    let wrong_scheme = test::TestRequest::get()
        .uri("/api/v1/users")
        .insert_header(("Authorization", "Basic dXNlcjpwYXNz"))
        .to_request();
    assert_eq!(send(&app, wrong_scheme).await.0, 401);
}

#[actix_rt::test]
async fn test_refresh_rotates_and_revoke_ends_the_session() {
    let app = init_app().await;
    let first = register(&app, "refresh_user").await;

    let refresh = |token: &str| {
        test::TestRequest::post()
            .uri("/api/v1/users/refresh")
            .set_json(json!({ "refresh_token": token }))
            .to_request()
    };

    let (status, envelope) = send(&app, refresh(&first.refresh_token)).await;
    assert_eq!(status, 200, "refresh failed: {}", envelope);
    let second: TokenPair = body_of(envelope);
    assert_ne!(second.refresh_token, first.refresh_token);

    // The first refresh token was superseded by the rotation.
    assert_eq!(send(&app, refresh(&first.refresh_token)).await.0, 401);

    let revoke = test::TestRequest::put()
        .uri("/api/v1/users/revoke")
        .insert_header(bearer(&second.access_token))
        .to_request();
    assert_eq!(send(&app, revoke).await.0, 200);
    assert_eq!(send(&app, refresh(&second.refresh_token)).await.0, 401);

    // Access tokens live on until they expire.
    let me = test::TestRequest::get()
        .uri("/api/v1/users")
        .insert_header(bearer(&second.access_token))
        .to_request();
    assert_eq!(send(&app, me).await.0, 200);
}

#[actix_rt::test]
async fn test_update_user() {
    let app = init_app().await;
    let tokens = register(&app, "old_name").await;
    register(&app, "taken_name").await;

    let update = |username: &str| {
        test::TestRequest::put()
            .uri("/api/v1/users")
            .insert_header(bearer(&tokens.access_token))
            .set_json(json!({ "username": username, "password": "brand-new-pass" }))
            .to_request()
    };

    assert_eq!(send(&app, update("taken_name")).await.0, 409);

    let (status, envelope) = send(&app, update("new_name")).await;
    assert_eq!(status, 200);
    let profile: UserProfile = body_of(envelope);
    assert_eq!(profile.username, "new_name");

    let login = test::TestRequest::post()
        .uri("/api/v1/users/login")
        .set_json(json!({ "email": "old_name@example.com", "password": "brand-new-pass" }))
        .to_request();
    assert_eq!(send(&app, login).await.0, 200);
}

#[test_log::test(actix_rt::test)]
async fn test_delete_account_cascades_to_own_tasks_only() {
    let app = init_app().await;
    let leaving = register(&app, "leaving_user").await;
    let staying = register(&app, "staying_user").await;

    create_task(&app, &leaving.access_token, "Leaving user's first").await;
    create_task(&app, &leaving.access_token, "Leaving user's second").await;
    let kept = create_task(&app, &staying.access_token, "Staying user's task").await;

    let delete = || {
        test::TestRequest::delete()
            .uri("/api/v1/users")
            .insert_header(bearer(&leaving.access_token))
            .to_request()
    };
    assert_eq!(send(&app, delete()).await.0, 200);

    // The access token still verifies, but there is nothing left behind it.
    let me = test::TestRequest::get()
        .uri("/api/v1/users")
        .insert_header(bearer(&leaving.access_token))
        .to_request();
    assert_eq!(send(&app, me).await.0, 404);

    let list = test::TestRequest::get()
        .uri("/api/v1/tasks")
        .insert_header(bearer(&leaving.access_token))
        .to_request();
    let (_, envelope) = send(&app, list).await;
    assert_eq!(envelope["body"]["total"], 0);

    let list = test::TestRequest::get()
        .uri("/api/v1/tasks")
        .insert_header(bearer(&staying.access_token))
        .to_request();
    let (_, envelope) = send(&app, list).await;
    assert_eq!(envelope["body"]["total"], 1);
    assert_eq!(envelope["body"]["items"][0]["id"], kept["id"]);
}

#[actix_rt::test]
async fn test_deleted_account_cannot_create_tasks() {
    let app = init_app().await;
    let tokens = register(&app, "departed_user").await;

    let delete = test::TestRequest::delete()
        .uri("/api/v1/users")
        .insert_header(bearer(&tokens.access_token))
        .to_request();
    assert_eq!(send(&app, delete).await.0, 200);

    let create = test::TestRequest::post()
        .uri("/api/v1/tasks")
        .insert_header(bearer(&tokens.access_token))
        .set_json(json!({ "title": "Written after leaving" }))
        .to_request();
    let (status, envelope) = send(&app, create).await;
    assert_eq!(status, 401);
    assert_eq!(envelope["status"], false);
    assert_eq!(envelope["message"], "Account no longer exists");

    let list = test::TestRequest::get()
        .uri("/api/v1/tasks")
        .insert_header(bearer(&tokens.access_token))
        .to_request();
    let (_, envelope) = send(&app, list).await;
    assert_eq!(envelope["body"]["total"], 0);
}
