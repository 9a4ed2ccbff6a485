mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::app::{spawn_test_app, spawn_test_app_without_service_key};
use common::auth::{bearer, new_user_token, service_headers};
use common::fixtures::{content_item, sample_catalog_json, seed_catalog};
use common::http::{assert_json_error, assert_status_ok_json, call};

#[tokio::test]
async fn it_internal_routes_require_service_key() {
    let app = spawn_test_app().await;

    let (status, body) = call(&app.app, Method::PUT, "/api/internal/catalog", Some(json!([])), &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_json_error(&body, "AUTH_UNAUTHORIZED");

    let (status, _) = call(
        &app.app,
        Method::PUT,
        "/api/internal/catalog",
        Some(json!([])),
        &[("x-service-key", "wrong-key".to_string())],
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // a user token is not a service credential
    let (_, token) = new_user_token(&app);
    let (status, _) = call(
        &app.app,
        Method::PUT,
        "/api/internal/catalog",
        Some(json!([])),
        &bearer(&token),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn it_internal_api_disabled_without_configured_key() {
    let app = spawn_test_app_without_service_key().await;

    let (status, body) = call(
        &app.app,
        Method::PUT,
        "/api/internal/catalog",
        Some(sample_catalog_json()),
        &service_headers(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_json_error(&body, "FORBIDDEN");
}

#[tokio::test]
async fn it_catalog_replacement_is_visible_immediately() {
    let app = spawn_test_app().await;
    seed_catalog(app.state.store());
    let (_, token) = new_user_token(&app);

    // warm the cache
    let (_, body) = call(&app.app, Method::GET, "/api/content", None, &bearer(&token)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 10);

    let replacement = json!([content_item("n1", "Zig Comptime", "Systems", "hackernews")]);
    let (status, body) = call(
        &app.app,
        Method::PUT,
        "/api/internal/catalog",
        Some(replacement),
        &service_headers(),
    )
    .await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["items"], 1);

    let (_, body) = call(&app.app, Method::GET, "/api/content", None, &bearer(&token)).await;
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], "n1");
}

#[tokio::test]
async fn it_invalid_catalog_is_rejected_and_old_catalog_kept() {
    let app = spawn_test_app().await;
    seed_catalog(app.state.store());

    let duplicate = json!([
        content_item("d1", "One", "AI", "reddit"),
        content_item("d1", "Two", "AI", "reddit"),
    ]);
    let (status, body) = call(
        &app.app,
        Method::PUT,
        "/api/internal/catalog",
        Some(duplicate),
        &service_headers(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "INVALID_CATALOG");

    assert_eq!(app.state.store().list_content_items().unwrap().len(), 10);
}

#[tokio::test]
async fn it_subscription_sync_validates_user_id() {
    let app = spawn_test_app().await;

    let (status, body) = call(
        &app.app,
        Method::PUT,
        "/api/internal/subscriptions/bad%20id",
        Some(json!({ "isPro": true })),
        &service_headers(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "VALIDATION_ERROR");

    let (status, body) = call(
        &app.app,
        Method::PUT,
        "/api/internal/subscriptions/user-1",
        Some(json!({ "planName": "pro" })),
        &service_headers(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "INVALID_REQUEST_BODY");
}
