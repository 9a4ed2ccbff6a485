mod common;

use axum::http::{Method, StatusCode};

use common::app::spawn_test_app;
use common::http::{call, request, response_json};

#[tokio::test]
async fn it_health_live_and_ready() {
    let app = spawn_test_app().await;

    let live = request(&app.app, Method::GET, "/health/live", None, &[]).await;
    let (live_status, _, _) = response_json(live).await;
    assert_eq!(live_status, StatusCode::OK);

    let ready = request(&app.app, Method::GET, "/health/ready", None, &[]).await;
    let (ready_status, _, _) = response_json(ready).await;
    assert_eq!(ready_status, StatusCode::OK);
}

#[tokio::test]
async fn it_health_database_is_ok() {
    let app = spawn_test_app().await;

    let (status, body) = call(&app.app, Method::GET, "/health/database", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["healthy"], true);
    assert_eq!(body["schemaVersion"], 2);
}

#[tokio::test]
async fn it_health_reports_status_and_request_id() {
    let app = spawn_test_app().await;

    let resp = request(
        &app.app,
        Method::GET,
        "/health",
        None,
        &[("x-request-id", "health-probe-1".to_string())],
    )
    .await;
    let (status, headers, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(headers["x-request-id"], "health-probe-1");
}

#[tokio::test]
async fn it_unknown_route_is_json_404() {
    let app = spawn_test_app().await;

    let (status, body) = call(&app.app, Method::GET, "/api/nope", None, &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    common::http::assert_json_error(&body, "NOT_FOUND");
}
