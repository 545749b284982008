use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use recipe_api::{AppState, PoolConfig, build_router, memory_engine};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn app() -> axum::Router {
    let engine = memory_engine(PoolConfig::default())
        .await
        .expect("memory engine should start");
    build_router(AppState::new(Arc::new(engine)))
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("response expected");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should be readable");

    if body.is_empty() {
        return (status, Value::Null);
    }

    let json = serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn send_json(
    app: &axum::Router,
    method: Method,
    uri: &str,
    payload: Value,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request should build");
    send(app, request).await
}

async fn send_empty(app: &axum::Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    send(app, request).await
}

async fn create_toast(app: &axum::Router) -> i64 {
    let (status, body) = send_json(
        app,
        Method::POST,
        "/create-recipe",
        json!({ "name": "Toast", "description": "Simple", "photo": "" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_i64().expect("created response should have id")
}

#[tokio::test]
async fn create_then_read_back() {
    let app = app().await;

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/create-recipe",
        json!({ "name": "Toast", "description": "Simple", "photo": "" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "data": { "id": 1, "outcome": "created" } }));

    let (status, fetched) = send_empty(&app, Method::GET, "/recipe/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        fetched["data"],
        json!({ "id": 1, "name": "Toast", "description": "Simple", "photo": "" })
    );

    let (status, all) = send_empty(&app, Method::GET, "/all-recipes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn patch_updates_subset_and_reports_missing() {
    let app = app().await;
    let id = create_toast(&app).await;

    let (status, body) = send_json(
        &app,
        Method::PATCH,
        &format!("/patch-recipe/{id}"),
        json!({ "name": "Toast v2" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "updated");

    let (_, fetched) = send_empty(&app, Method::GET, &format!("/recipe/{id}")).await;
    assert_eq!(fetched["data"]["name"], "Toast v2");
    assert_eq!(fetched["data"]["description"], "Simple");

    let (status, body) = send_json(
        &app,
        Method::PATCH,
        "/patch-recipe/99",
        json!({ "name": "Ghost" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let (_, all) = send_empty(&app, Method::GET, "/all-recipes").await;
    assert_eq!(all["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn patch_validation_errors() {
    let app = app().await;
    let id = create_toast(&app).await;
    let uri = format!("/patch-recipe/{id}");

    let (status, body) = send_json(&app, Method::PATCH, &uri, json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "invalid_intent");

    let (status, body) = send_json(&app, Method::PATCH, &uri, json!({ "calories": "300" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "invalid_field");
    assert!(body["error"].as_str().unwrap_or_default().contains("calories"));

    let (status, body) = send_json(&app, Method::PATCH, &uri, json!({ "name": 7 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "invalid_intent");
}

#[tokio::test]
async fn put_on_missing_id_creates_with_new_id() {
    let app = app().await;
    create_toast(&app).await;

    let (status, body) = send_json(
        &app,
        Method::PUT,
        "/update-recipe/50",
        json!({ "name": "Bagel", "description": "Chewy", "photo": "bagel.png" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["outcome"], "created_fallback");
    assert_eq!(body["data"]["requested_id"], 50);
    let new_id = body["data"]["id"].as_i64().expect("fallback should carry id");
    assert_ne!(new_id, 50);

    let (status, body) = send_json(
        &app,
        Method::PUT,
        &format!("/update-recipe/{new_id}"),
        json!({ "name": "Bagel", "description": "Toasted", "photo": "bagel.png" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "data": { "id": new_id, "outcome": "updated" } }));
}

#[tokio::test]
async fn put_requires_every_field() {
    let app = app().await;
    let id = create_toast(&app).await;

    let (status, body) = send_json(
        &app,
        Method::PUT,
        &format!("/update-recipe/{id}"),
        json!({ "name": "Toast" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "invalid_intent");
}

#[tokio::test]
async fn delete_twice() {
    let app = app().await;
    let id = create_toast(&app).await;
    let uri = format!("/delete-recipe/{id}");

    let (status, body) = send_empty(&app, Method::DELETE, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "deleted");

    let (status, _) = send_empty(&app, Method::DELETE, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_empty(&app, Method::GET, &format!("/recipe/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_integer_id_is_rejected_by_extractor() {
    let app = app().await;
    let (status, _) = send_empty(&app, Method::GET, "/recipe/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn healthcheck_reports_ok() {
    let app = app().await;
    let (status, body) = send_empty(&app, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "data": { "message": "ok" } }));
}
