use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use serde::Serialize;

use crate::auth::AuthUser;
use crate::progression::entitlements::{
    feature_access, usage_period, Feature, FeatureAccess, Plan, SubscriptionStatus,
};
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_subscription))
        .route("/features/:feature", get(get_feature))
        .route("/features/:feature/usage", post(record_usage))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionView {
    plan: Plan,
    plan_name: String,
    #[serde(flatten)]
    status: SubscriptionStatus,
    usage_period: String,
    features: Vec<FeatureAccess>,
}

fn parse_feature(raw: &str) -> Result<Feature, AppError> {
    Ok(raw.parse::<Feature>()?)
}

async fn get_subscription(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let now = Utc::now();
    let subscription = state.store().get_subscription(&auth.user_id)?;
    let status = subscription.status(now);

    Ok(ok(SubscriptionView {
        plan: status.plan(),
        plan_name: subscription.plan_name.clone(),
        usage_period: usage_period(now),
        features: Feature::ALL
            .iter()
            .map(|f| feature_access(&subscription, *f, now))
            .collect(),
        status,
    }))
}

async fn get_feature(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(feature): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let feature = parse_feature(&feature)?;
    let subscription = state.store().get_subscription(&auth.user_id)?;
    Ok(ok(feature_access(&subscription, feature, Utc::now())))
}

/// Counts one use of a metered feature. Over-quota and out-of-plan requests
/// answer 402 so clients can show an upgrade prompt.
async fn record_usage(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(feature): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let feature = parse_feature(&feature)?;
    let now = Utc::now();
    let subscription = state
        .store()
        .consume_usage(&auth.user_id, feature, now)?;
    tracing::debug!(user_id = %auth.user_id, %feature, "Feature usage recorded");
    Ok(ok(feature_access(&subscription, feature, now)))
}
