use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::{extract::State, Router};
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;

use crate::auth::AuthUser;
use crate::progression::types::{ProgressEvent, ProgressEventKind};
use crate::response::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/events", get(sse_handler))
}

fn event_name(kind: &ProgressEventKind) -> &'static str {
    match kind {
        ProgressEventKind::XpAwarded { .. } => "xp_awarded",
        ProgressEventKind::LevelUp { .. } => "level_up",
        ProgressEventKind::AchievementUnlocked { .. } => "achievement_unlocked",
    }
}

fn to_sse_event(event: &ProgressEvent) -> Option<Event> {
    let json = serde_json::to_string(event).ok()?;
    Some(Event::default().event(event_name(&event.kind)).data(json))
}

/// Streams the caller's own XP, level-up and badge events.
pub async fn sse_handler(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let slot = state
        .try_acquire_sse_slot()
        .ok_or_else(|| AppError::too_many_requests("Too many SSE connections"))?;

    let mut shutdown_rx = state.shutdown_rx();
    let mut events = state.engine().subscribe();
    let user_id = auth.user_id;
    tracing::debug!(%user_id, "SSE stream opened");

    let stream = async_stream::stream! {
        let _slot = slot;
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) if event.user_id == user_id => {
                        if let Some(sse) = to_sse_event(&event) {
                            yield Ok(sse);
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(%user_id, skipped, "SSE subscriber lagged, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = shutdown_rx.recv() => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    ))
}
