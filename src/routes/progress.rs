use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::extractors::JsonBody;
use crate::progression::engine::{ProgressUpdate, QuizCompletion};
use crate::progression::entitlements::Feature;
use crate::progression::leveling::{self, LevelProgress};
use crate::progression::types::UserProgress;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::store::StoreError;
use crate::validation::{validate_id, validate_quiz_completion};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_progress))
        .route("/quizzes", post(complete_quiz))
        .route("/flashcards", post(complete_flashcard))
        .route("/levels", get(level_table))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressView {
    #[serde(flatten)]
    progress: UserProgress,
    level_progress: LevelProgress,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionView {
    #[serde(flatten)]
    update: ProgressUpdate,
    leveled_up: bool,
    level_progress: LevelProgress,
}

impl From<ProgressUpdate> for CompletionView {
    fn from(update: ProgressUpdate) -> Self {
        Self {
            leveled_up: update.leveled_up(),
            level_progress: leveling::level_progress(update.progress.total_xp),
            update,
        }
    }
}

async fn get_progress(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let progress = state.engine().get_progress(&auth.user_id)?;
    Ok(ok(ProgressView {
        level_progress: leveling::level_progress(progress.total_xp),
        progress,
    }))
}

/// Runs `record` under the monthly quota of `feature`.
///
/// Repeats of an already completed item never count. A unit consumed for an
/// activity that ends up not recorded as a first completion (the write
/// failed, or a concurrent request completed it first) is refunded.
fn record_with_quota<F>(
    state: &AppState,
    user_id: &str,
    feature: Feature,
    already_completed: bool,
    record: F,
) -> Result<ProgressUpdate, AppError>
where
    F: FnOnce() -> Result<ProgressUpdate, StoreError>,
{
    if already_completed {
        return Ok(record()?);
    }

    state.store().consume_usage(user_id, feature, Utc::now())?;
    let result = record();
    if !matches!(&result, Ok(update) if update.first_completion) {
        if let Err(e) = state.store().refund_usage(user_id, feature, Utc::now()) {
            tracing::error!(user_id, %feature, error = %e, "Failed to refund feature usage");
        }
    }
    Ok(result?)
}

async fn complete_quiz(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(quiz): JsonBody<QuizCompletion>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    validate_quiz_completion(&quiz).map_err(|m| AppError::bad_request("VALIDATION_ERROR", m))?;

    let progress = state.engine().get_progress(&auth.user_id)?;
    let already = progress.completed_quiz_ids.contains(&quiz.quiz_id);
    let update = record_with_quota(&state, &auth.user_id, Feature::Quizzes, already, || {
        state.engine().record_quiz(&auth.user_id, &quiz, Utc::now())
    })?;
    Ok(ok(CompletionView::from(update)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlashcardCompletion {
    flashcard_id: String,
}

async fn complete_flashcard(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<FlashcardCompletion>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    validate_id(&req.flashcard_id).map_err(|m| AppError::bad_request("VALIDATION_ERROR", m))?;

    let progress = state.engine().get_progress(&auth.user_id)?;
    let already = progress.completed_flashcard_ids.contains(&req.flashcard_id);
    let update = record_with_quota(&state, &auth.user_id, Feature::Flashcards, already, || {
        state
            .engine()
            .record_flashcard(&auth.user_id, &req.flashcard_id, Utc::now())
    })?;
    Ok(ok(CompletionView::from(update)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LevelTable {
    thresholds: Vec<u64>,
    max_table_level: u32,
    xp_per_level_beyond_table: u64,
}

async fn level_table() -> impl axum::response::IntoResponse {
    ok(LevelTable {
        thresholds: leveling::LEVEL_THRESHOLDS.to_vec(),
        max_table_level: leveling::MAX_TABLE_LEVEL,
        xp_per_level_beyond_table: leveling::XP_PER_LEVEL_BEYOND_TABLE,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::broadcast;

    use super::*;
    use crate::config::Config;
    use crate::progression::types::UserProgress;
    use crate::store::Store;

    fn state() -> (AppState, tempfile::TempDir) {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(Store::open(tmp.path().join("quota.sled").to_str().unwrap()).unwrap());
        let (tx, _) = broadcast::channel(1);
        (AppState::new(store, &Config::from_env(), tx), tmp)
    }

    fn used(state: &AppState, feature: Feature) -> u32 {
        let sub = state.store().get_subscription("u1").unwrap();
        sub.counters_at(Utc::now())
            .get(feature.as_str())
            .copied()
            .unwrap_or(0)
    }

    fn update(first_completion: bool) -> ProgressUpdate {
        ProgressUpdate {
            progress: UserProgress::new("u1"),
            xp_awarded: 0,
            previous_level: 1,
            first_completion,
            unlocked: Vec::new(),
        }
    }

    #[test]
    fn failed_record_does_not_spend_quota() {
        let (state, _tmp) = state();
        let result = record_with_quota(&state, "u1", Feature::Quizzes, false, || {
            Err(StoreError::CasRetryExhausted {
                entity: "progress".to_string(),
                key: "u1".to_string(),
                attempts: 20,
            })
        });
        let err = result.err().expect("record error propagates");
        assert_eq!(err.status, axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(used(&state, Feature::Quizzes), 0);
    }

    #[test]
    fn first_completion_spends_one_unit() {
        let (state, _tmp) = state();
        record_with_quota(&state, "u1", Feature::Flashcards, false, || Ok(update(true))).unwrap();
        assert_eq!(used(&state, Feature::Flashcards), 1);
    }

    #[test]
    fn lost_race_to_completion_is_refunded() {
        let (state, _tmp) = state();
        record_with_quota(&state, "u1", Feature::Quizzes, false, || Ok(update(false))).unwrap();
        assert_eq!(used(&state, Feature::Quizzes), 0);
    }

    #[test]
    fn known_repeat_skips_the_quota() {
        let (state, _tmp) = state();
        record_with_quota(&state, "u1", Feature::Quizzes, true, || Ok(update(false))).unwrap();
        assert_eq!(used(&state, Feature::Quizzes), 0);
    }
}
