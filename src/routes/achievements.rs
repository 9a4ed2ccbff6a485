use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use serde::Serialize;

use crate::auth::AuthUser;
use crate::progression::achievements::{self, Achievement};
use crate::progression::engine::ProgressUpdate;
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_achievements))
        .route("/evaluate", post(evaluate))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AchievementList {
    achievements: Vec<Achievement>,
    unlocked_count: usize,
    total: usize,
}

async fn list_achievements(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let progress = state.engine().get_progress(&auth.user_id)?;
    let list = achievements::with_user_state(state.engine().catalog(), &progress);
    let unlocked_count = list.iter().filter(|a| a.unlocked).count();
    Ok(ok(AchievementList {
        total: list.len(),
        unlocked_count,
        achievements: list,
    }))
}

async fn evaluate(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let update: ProgressUpdate = state
        .engine()
        .evaluate_achievements(&auth.user_id, Utc::now())?;
    Ok(ok(update))
}
