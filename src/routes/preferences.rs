use axum::extract::State;
use axum::routing::get;
use axum::Router;

use crate::auth::AuthUser;
use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::validation::{sanitize_preferences, RawPreferences};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_preferences).put(replace_preferences))
}

async fn get_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let preferences = state.store().get_preferences(&auth.user_id)?;
    Ok(ok(preferences))
}

/// Full replacement. Malformed entries are dropped rather than rejected.
async fn replace_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(raw): JsonBody<RawPreferences>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let preferences = sanitize_preferences(&raw);
    state
        .store()
        .set_preferences(&auth.user_id, &preferences)?;
    tracing::info!(
        user_id = %auth.user_id,
        topics = preferences.favorite_topics.len(),
        "Preferences updated"
    );
    Ok(ok(preferences))
}
