//! Service-to-service endpoints, authenticated with `x-service-key`.

use axum::extract::{Path, State};
use axum::routing::put;
use axum::Router;
use chrono::Utc;
use serde::Serialize;

use crate::auth::ServiceAuth;
use crate::extractors::JsonBody;
use crate::progression::entitlements::{Plan, SubscriptionStatus};
use crate::progression::types::ContentItem;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::store::operations::subscriptions::SubscriptionSync;
use crate::validation::validate_id;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscriptions/:user_id", put(sync_subscription))
        .route("/catalog", put(replace_catalog))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncedSubscription {
    user_id: String,
    plan: Plan,
    plan_name: String,
    #[serde(flatten)]
    status: SubscriptionStatus,
}

/// Billing webhook relay: stores what the billing provider reports.
async fn sync_subscription(
    _service: ServiceAuth,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    JsonBody(sync): JsonBody<SubscriptionSync>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    validate_id(&user_id).map_err(|m| AppError::bad_request("VALIDATION_ERROR", m))?;

    let now = Utc::now();
    let subscription = state.store().sync_subscription(&user_id, &sync, now)?;
    let status = subscription.status(now);

    Ok(ok(SyncedSubscription {
        user_id,
        plan: status.plan(),
        plan_name: subscription.plan_name,
        status,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogReplaced {
    items: usize,
}

async fn replace_catalog(
    _service: ServiceAuth,
    State(state): State<AppState>,
    JsonBody(items): JsonBody<Vec<ContentItem>>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let count = state.store().replace_catalog(&items)?;
    state.invalidate_catalog().await;
    Ok(ok(CatalogReplaced { items: count }))
}
