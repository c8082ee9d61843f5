mod common;

use std::collections::HashSet;

use actix_web::test;
use common::{bearer, body_of, create_task, init_app, register, send, user_id};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use todolist::models::Task;
use todolist::response::Page;

#[actix_rt::test]
async fn test_create_toggle_and_filter_flow() {
    let app = init_app().await;
    let tokens = register(&app, "flow_user").await;

    let short = test::TestRequest::post()
        .uri("/api/v1/tasks")
        .insert_header(bearer(&tokens.access_token))
        .set_json(json!({ "title": "short" }))
        .to_request();
    assert_eq!(send(&app, short).await.0, 400);

    let req = test::TestRequest::post()
        .uri("/api/v1/tasks")
        .insert_header(bearer(&tokens.access_token))
        .set_json(json!({ "title": "Buy groceries", "description": "Milk and bread" }))
        .to_request();
    let (status, envelope) = send(&app, req).await;
    assert_eq!(status, 201);
    let task: Task = body_of(envelope);
    assert!(!task.done);
    assert_eq!(task.owner_id, user_id(&tokens));
    assert_eq!(task.description.as_deref(), Some("Milk and bread"));

    create_task(&app, &tokens.access_token, "Another open task").await;

    let toggle = test::TestRequest::put()
        .uri(&format!("/api/v1/tasks/{}/status/done", task.id))
        .insert_header(bearer(&tokens.access_token))
        .to_request();
    let (status, envelope) = send(&app, toggle).await;
    assert_eq!(status, 200);
    assert_eq!(envelope["body"]["done"], true);

    let done_only = test::TestRequest::get()
        .uri("/api/v1/tasks?done=true")
        .insert_header(bearer(&tokens.access_token))
        .to_request();
    let (status, envelope) = send(&app, done_only).await;
    assert_eq!(status, 200);
    let page: Page<Task> = body_of(envelope);
    assert_eq!(page.total, 1);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, task.id);
}

#[actix_rt::test]
async fn test_status_can_be_set_explicitly() {
    let app = init_app().await;
    let tokens = register(&app, "status_user").await;
    let task = create_task(&app, &tokens.access_token, "Set status task").await;
    let uri = format!("/api/v1/tasks/{}/status/done", task["id"].as_str().unwrap());

    for expected in [false, true, true] {
        let req = test::TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(&tokens.access_token))
            .set_json(json!({ "done": expected }))
            .to_request();
        let (status, envelope) = send(&app, req).await;
        assert_eq!(status, 200);
        assert_eq!(envelope["body"]["done"], expected);
    }

    let bad = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer(&tokens.access_token))
        .insert_header(("content-type", "application/json"))
        .set_payload(r#"{"done":"maybe"}"#)
        .to_request();
    assert_eq!(send(&app, bad).await.0, 400);
}

#[actix_rt::test]
async fn test_update_is_a_full_replace() {
    let app = init_app().await;
    let tokens = register(&app, "update_user").await;
    let task = create_task(&app, &tokens.access_token, "Original title").await;
    let uri = format!("/api/v1/tasks/{}", task["id"].as_str().unwrap());

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer(&tokens.access_token))
        .set_json(json!({
            "title": "Replaced title",
            "description": "Now described",
            "done": true
        }))
        .to_request();
    let (status, envelope) = send(&app, req).await;
    assert_eq!(status, 200);
    assert_eq!(envelope["body"]["title"], "Replaced title");
    assert_eq!(envelope["body"]["done"], true);

    // Omitted fields are reset, not kept.
    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer(&tokens.access_token))
        .set_json(json!({ "title": "Title only now" }))
        .to_request();
    let (_, envelope) = send(&app, req).await;
    assert_eq!(envelope["body"]["done"], false);
    assert_eq!(envelope["body"]["description"], Value::Null);
    assert_eq!(envelope["body"]["created_at"], task["created_at"]);
}

#[actix_rt::test]
async fn test_non_owner_is_forbidden() {
    let app = init_app().await;
    let owner = register(&app, "owner_user").await;
    let intruder = register(&app, "intruder_user").await;
    let task = create_task(&app, &owner.access_token, "Private task here").await;
    let uri = format!("/api/v1/tasks/{}", task["id"].as_str().unwrap());

    let requests = vec![
        test::TestRequest::get().uri(&uri),
        test::TestRequest::put()
            .uri(&uri)
            .set_json(json!({ "title": "Hijacked title" })),
        test::TestRequest::delete().uri(&uri),
        test::TestRequest::put().uri(&format!("{}/status/done", uri)),
    ];
    for req in requests {
        let req = req.insert_header(bearer(&intruder.access_token)).to_request();
        let (status, envelope) = send(&app, req).await;
        assert_eq!(status, 403);
        assert_eq!(envelope["body"], "");
    }

    // Nothing changed for the owner.
    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(bearer(&owner.access_token))
        .to_request();
    let (status, envelope) = send(&app, req).await;
    assert_eq!(status, 200);
    assert_eq!(envelope["body"]["title"], "Private task here");
    assert_eq!(envelope["body"]["done"], false);
}

#[actix_rt::test]
async fn test_bad_and_missing_ids() {
    let app = init_app().await;
    let tokens = register(&app, "id_user").await;

    let bad = test::TestRequest::get()
        .uri("/api/v1/tasks/not-a-uuid")
        .insert_header(bearer(&tokens.access_token))
        .to_request();
    let (status, envelope) = send(&app, bad).await;
    assert_eq!(status, 400);
    assert_eq!(envelope["message"], "Id invalid");

    let missing = test::TestRequest::delete()
        .uri(&format!("/api/v1/tasks/{}", uuid::Uuid::new_v4()))
        .insert_header(bearer(&tokens.access_token))
        .to_request();
    assert_eq!(send(&app, missing).await.0, 404);
}

#[actix_rt::test]
async fn test_delete_returns_the_task_once() {
    let app = init_app().await;
    let tokens = register(&app, "delete_user").await;
    let task = create_task(&app, &tokens.access_token, "Short lived task").await;
    let uri = format!("/api/v1/tasks/{}", task["id"].as_str().unwrap());

    let delete = || {
        test::TestRequest::delete()
            .uri(&uri)
            .insert_header(bearer(&tokens.access_token))
            .to_request()
    };
    let (status, envelope) = send(&app, delete()).await;
    assert_eq!(status, 200);
    assert_eq!(envelope["body"]["id"], task["id"]);
    assert_eq!(send(&app, delete()).await.0, 404);
}

#[actix_rt::test]
async fn test_pages_cover_the_set_exactly_once() {
    let app = init_app().await;
    let tokens = register(&app, "paging_user").await;
    for i in 0..23 {
        create_task(&app, &tokens.access_token, &format!("Paged task {:02}", i)).await;
    }

    let mut seen: Vec<Task> = Vec::new();
    for page in 1..=4 {
        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/tasks?page={}&page_size=10", page))
            .insert_header(bearer(&tokens.access_token))
            .to_request();
        let (status, envelope) = send(&app, req).await;
        assert_eq!(status, 200);
        let body: Page<Task> = body_of(envelope);
        assert_eq!(body.total, 23);
        assert_eq!(body.page_index, page);
        assert_eq!(body.page_size, 10);
        seen.extend(body.items);
    }

    assert_eq!(seen.len(), 23);
    let unique: HashSet<_> = seen.iter().map(|task| task.id).collect();
    assert_eq!(unique.len(), 23);
    assert!(seen
        .windows(2)
        .all(|pair| (pair[0].created_at, pair[0].id) > (pair[1].created_at, pair[1].id)));
}

#[actix_rt::test]
async fn test_list_filters_and_bad_query_values() {
    let app = init_app().await;
    let tokens = register(&app, "filter_user").await;
    let other = register(&app, "other_filter_user").await;
    create_task(&app, &tokens.access_token, "Buy GROCERIES today").await;
    create_task(&app, &tokens.access_token, "Clean the kitchen").await;
    create_task(&app, &other.access_token, "Buy groceries too").await;

    let list = |query: &str| {
        test::TestRequest::get()
            .uri(&format!("/api/v1/tasks{}", query))
            .insert_header(bearer(&tokens.access_token))
            .to_request()
    };

    let (_, envelope) = send(&app, list("?title=groceries")).await;
    let page: Page<Task> = body_of(envelope);
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].title, "Buy GROCERIES today");

    // Non-numeric and non-positive paging falls back to the defaults.
    let (status, envelope) = send(&app, list("?page=abc&page_size=0")).await;
    assert_eq!(status, 200);
    let page: Page<Task> = body_of(envelope);
    assert_eq!((page.page_index, page.page_size, page.total), (1, 10, 2));

    assert_eq!(send(&app, list("?done=maybe")).await.0, 400);
    assert_eq!(send(&app, list("?created_before=yesterday")).await.0, 400);

    // A raw `+` in the query decodes to a space; the offset still parses.
    let (status, envelope) = send(&app, list("?created_after=2000-01-01T00:00:00+02:00")).await;
    assert_eq!(status, 200);
    assert_eq!(envelope["body"]["total"], 2);

    let (status, envelope) = send(
        &app,
        list("?created_after=2100-01-01T00:00:00Z&created_before=2000-01-01T00:00:00Z"),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(envelope["body"]["total"], 0);
}

#[actix_rt::test]
async fn test_undecodable_query_is_an_enveloped_bad_request() {
    let app = init_app().await;
    let tokens = register(&app, "query_user").await;

    let req = test::TestRequest::get()
        .uri("/api/v1/tasks?page=1&page=2")
        .insert_header(bearer(&tokens.access_token))
        .to_request();
    let (status, envelope) = send(&app, req).await;
    assert_eq!(status, 400);
    assert_eq!(envelope["status"], false);
    assert_eq!(envelope["code"], 400);
    assert!(envelope["message"]
        .as_str()
        .unwrap()
        .starts_with("Query invalid"));
}
