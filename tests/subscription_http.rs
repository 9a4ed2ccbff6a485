mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;

use common::app::spawn_test_app;
use common::auth::{bearer, new_user_token, service_headers};
use common::http::{assert_json_error, assert_status_ok_json, call};

#[tokio::test]
async fn it_new_user_is_on_free_plan() {
    let app = spawn_test_app().await;
    let (_, token) = new_user_token(&app);

    let (status, body) = call(&app.app, Method::GET, "/api/subscription", None, &bearer(&token)).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["plan"], "free");
    assert_eq!(body["data"]["status"], "free");
    assert_eq!(body["data"]["planName"], "free");

    let features = body["data"]["features"].as_array().unwrap();
    assert_eq!(features.len(), 8);
    let quizzes = features.iter().find(|f| f["feature"] == "quizzes").unwrap();
    assert_eq!(quizzes["limit"], 10);
    assert_eq!(quizzes["remaining"], 10);
    let ai = features.iter().find(|f| f["feature"] == "ai_explanations").unwrap();
    assert_eq!(ai["hasFeature"], false);
    assert_eq!(ai["canUse"], false);
}

#[tokio::test]
async fn it_pro_only_feature_requires_upgrade() {
    let app = spawn_test_app().await;
    let (_, token) = new_user_token(&app);

    let (status, body) = call(
        &app.app,
        Method::POST,
        "/api/subscription/features/ai_explanations/usage",
        None,
        &bearer(&token),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_json_error(&body, "UPGRADE_REQUIRED");
}

#[tokio::test]
async fn it_unknown_feature_is_bad_request() {
    let app = spawn_test_app().await;
    let (_, token) = new_user_token(&app);

    let (status, body) = call(
        &app.app,
        Method::GET,
        "/api/subscription/features/teleportation",
        None,
        &bearer(&token),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "UNKNOWN_FEATURE");
}

#[tokio::test]
async fn it_flashcard_usage_is_metered() {
    let app = spawn_test_app().await;
    let (_, token) = new_user_token(&app);

    for expected_remaining in [49, 48] {
        let (status, body) = call(
            &app.app,
            Method::POST,
            "/api/subscription/features/flashcards/usage",
            None,
            &bearer(&token),
        )
        .await;
        assert_status_ok_json(status, &body);
        assert_eq!(body["data"]["remaining"], expected_remaining);
    }

    let (_, body) = call(
        &app.app,
        Method::GET,
        "/api/subscription/features/flashcards",
        None,
        &bearer(&token),
    )
    .await;
    assert_eq!(body["data"]["used"], 2);
}

#[tokio::test]
async fn it_synced_pro_plan_unlocks_everything() {
    let app = spawn_test_app().await;
    let (user_id, token) = new_user_token(&app);

    let period_end = Utc::now() + Duration::days(30);
    let (status, body) = call(
        &app.app,
        Method::PUT,
        &format!("/api/internal/subscriptions/{user_id}"),
        Some(json!({ "isPro": true, "planName": "Pro Monthly", "currentPeriodEnd": period_end })),
        &service_headers(),
    )
    .await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["plan"], "pro");
    assert_eq!(body["data"]["planName"], "Pro Monthly");

    let (status, body) = call(
        &app.app,
        Method::POST,
        "/api/subscription/features/ai_explanations/usage",
        None,
        &bearer(&token),
    )
    .await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["canUse"], true);
    assert!(body["data"]["limit"].is_null());
    assert!(body["data"]["remaining"].is_null());
}

#[tokio::test]
async fn it_lapsed_pro_plan_reads_as_expired() {
    let app = spawn_test_app().await;
    let (user_id, token) = new_user_token(&app);

    let period_end = Utc::now() - Duration::days(1);
    call(
        &app.app,
        Method::PUT,
        &format!("/api/internal/subscriptions/{user_id}"),
        Some(json!({ "isPro": true, "currentPeriodEnd": period_end })),
        &service_headers(),
    )
    .await;

    let (_, body) = call(&app.app, Method::GET, "/api/subscription", None, &bearer(&token)).await;
    assert_eq!(body["data"]["plan"], "free");
    assert_eq!(body["data"]["status"], "expired");
    assert!(body["data"]["expiredAt"].is_string());

    let (status, _) = call(
        &app.app,
        Method::POST,
        "/api/subscription/features/offline_mode/usage",
        None,
        &bearer(&token),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
}
