use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::constants::{FLASHCARD_XP, PERFECT_QUIZ_BONUS_XP, QUIZ_XP_PER_CORRECT_ANSWER};
use crate::progression::achievements::{self, Achievement};
use crate::progression::types::{ProgressEvent, ProgressEventKind, UnlockEvent, UserProgress};
use crate::store::{Store, StoreError};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizCompletion {
    pub quiz_id: String,
    pub correct_answers: u32,
    pub total_questions: u32,
}

impl QuizCompletion {
    pub fn score_percent(&self) -> u8 {
        if self.total_questions == 0 {
            return 0;
        }
        let correct = u64::from(self.correct_answers.min(self.total_questions));
        ((correct * 100) / u64::from(self.total_questions)) as u8
    }

    pub fn xp(&self) -> u64 {
        let correct = u64::from(self.correct_answers.min(self.total_questions));
        let bonus = if self.score_percent() == 100 {
            PERFECT_QUIZ_BONUS_XP
        } else {
            0
        };
        correct * QUIZ_XP_PER_CORRECT_ANSWER + bonus
    }
}

/// Result of one progression update.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub progress: UserProgress,
    /// Activity XP plus achievement rewards granted by this update.
    pub xp_awarded: u64,
    pub previous_level: u32,
    pub first_completion: bool,
    pub unlocked: Vec<UnlockEvent>,
}

impl ProgressUpdate {
    pub fn leveled_up(&self) -> bool {
        self.progress.level > self.previous_level
    }
}

struct Delta {
    activity_xp: u64,
    previous_xp: u64,
    previous_level: u32,
    first_completion: bool,
    unlocked: Vec<UnlockEvent>,
}

/// Applies learning activity to persisted progress and announces the
/// resulting XP, level and badge changes to realtime subscribers.
pub struct ProgressionEngine {
    store: Arc<Store>,
    catalog: Vec<Achievement>,
    events: broadcast::Sender<ProgressEvent>,
}

impl ProgressionEngine {
    pub fn new(store: Arc<Store>) -> Self {
        Self::with_catalog(store, achievements::default_catalog())
    }

    pub fn with_catalog(store: Arc<Store>, catalog: Vec<Achievement>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            catalog,
            events,
        }
    }

    pub fn catalog(&self) -> &[Achievement] {
        &self.catalog
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    pub fn get_progress(&self, user_id: &str) -> Result<UserProgress, StoreError> {
        Ok(self
            .store
            .get_progress(user_id)?
            .unwrap_or_else(|| UserProgress::new(user_id)))
    }

    /// Quiz XP is granted on the first completion of a quiz id only; later
    /// attempts can still raise the stored best score.
    pub fn record_quiz(
        &self,
        user_id: &str,
        quiz: &QuizCompletion,
        now: DateTime<Utc>,
    ) -> Result<ProgressUpdate, StoreError> {
        let score = quiz.score_percent();
        self.apply(user_id, now, |progress| {
            let first = progress.completed_quiz_ids.insert(quiz.quiz_id.clone());
            progress.record_quiz_score(&quiz.quiz_id, score);
            let xp = if first { quiz.xp() } else { 0 };
            (xp, first)
        })
    }

    pub fn record_flashcard(
        &self,
        user_id: &str,
        flashcard_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ProgressUpdate, StoreError> {
        self.apply(user_id, now, |progress| {
            let first = progress
                .completed_flashcard_ids
                .insert(flashcard_id.to_string());
            let xp = if first { FLASHCARD_XP } else { 0 };
            (xp, first)
        })
    }

    /// Re-runs badge evaluation without any new activity. Safe to repeat.
    pub fn evaluate_achievements(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ProgressUpdate, StoreError> {
        let catalog = &self.catalog;
        let (progress, delta) = self.store.update_progress(user_id, |progress| {
            let previous_xp = progress.total_xp;
            let previous_level = progress.level;
            let unlocked = achievements::evaluate_and_apply(progress, catalog, now);
            if !unlocked.is_empty() {
                progress.updated_at = now;
            }
            Ok::<_, StoreError>(Delta {
                activity_xp: 0,
                previous_xp,
                previous_level,
                first_completion: false,
                unlocked,
            })
        })?;
        Ok(self.finish(user_id, progress, delta, now))
    }

    fn apply<F>(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        mut activity: F,
    ) -> Result<ProgressUpdate, StoreError>
    where
        F: FnMut(&mut UserProgress) -> (u64, bool),
    {
        let catalog = &self.catalog;
        let (progress, delta) = self.store.update_progress(user_id, |progress| {
            let previous_xp = progress.total_xp;
            let previous_level = progress.level;
            let (activity_xp, first_completion) = activity(progress);
            progress.add_xp(activity_xp);
            progress.record_activity(now.date_naive());
            let unlocked = achievements::evaluate_and_apply(progress, catalog, now);
            progress.updated_at = now;
            Ok::<_, StoreError>(Delta {
                activity_xp,
                previous_xp,
                previous_level,
                first_completion,
                unlocked,
            })
        })?;
        Ok(self.finish(user_id, progress, delta, now))
    }

    fn finish(
        &self,
        user_id: &str,
        progress: UserProgress,
        delta: Delta,
        now: DateTime<Utc>,
    ) -> ProgressUpdate {
        let xp_awarded = progress.total_xp.saturating_sub(delta.previous_xp);
        let update = ProgressUpdate {
            progress,
            xp_awarded,
            previous_level: delta.previous_level,
            first_completion: delta.first_completion,
            unlocked: delta.unlocked,
        };

        tracing::info!(
            user_id,
            activity_xp = delta.activity_xp,
            xp_awarded,
            level = update.progress.level,
            unlocked = update.unlocked.len(),
            "Progress updated"
        );
        self.publish(user_id, &update, now);
        update
    }

    fn publish(&self, user_id: &str, update: &ProgressUpdate, now: DateTime<Utc>) {
        // no receivers is fine
        let emit = |kind| {
            let _ = self.events.send(ProgressEvent {
                user_id: user_id.to_string(),
                kind,
                at: now,
            });
        };

        if update.xp_awarded > 0 {
            emit(ProgressEventKind::XpAwarded {
                amount: update.xp_awarded,
                total_xp: update.progress.total_xp,
            });
        }
        if update.leveled_up() {
            emit(ProgressEventKind::LevelUp {
                from: update.previous_level,
                to: update.progress.level,
            });
        }
        for event in &update.unlocked {
            if let Some(entry) = achievements::find(&self.catalog, &event.achievement_id) {
                emit(ProgressEventKind::AchievementUnlocked {
                    achievement_id: entry.id.clone(),
                    name: entry.name.clone(),
                    xp_reward: entry.xp_reward,
                });
            }
        }
    }
}
