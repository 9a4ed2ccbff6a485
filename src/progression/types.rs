use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::progression::leveling;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockEvent {
    pub achievement_id: String,
    pub unlocked_at: DateTime<Utc>,
}

/// Per-user progression snapshot. `level` is always derived from `total_xp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub user_id: String,
    pub total_xp: u64,
    pub level: u32,
    #[serde(default)]
    pub completed_quiz_ids: BTreeSet<String>,
    #[serde(default)]
    pub completed_flashcard_ids: BTreeSet<String>,
    /// Best score (percent) per quiz. Only ever raised.
    #[serde(default)]
    pub quiz_scores: BTreeMap<String, u8>,
    #[serde(default)]
    pub streak_days: u32,
    #[serde(default)]
    pub longest_streak: u32,
    pub last_active_date: Option<NaiveDate>,
    #[serde(default)]
    pub achievements: Vec<UnlockEvent>,
    pub updated_at: DateTime<Utc>,
}

impl UserProgress {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            total_xp: 0,
            level: leveling::calculate_level(0),
            completed_quiz_ids: BTreeSet::new(),
            completed_flashcard_ids: BTreeSet::new(),
            quiz_scores: BTreeMap::new(),
            streak_days: 0,
            longest_streak: 0,
            last_active_date: None,
            achievements: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Adds XP and re-derives the level. Returns the level before the change.
    pub fn add_xp(&mut self, amount: u64) -> u32 {
        let previous = self.level;
        self.total_xp = self.total_xp.saturating_add(amount);
        self.level = leveling::calculate_level(self.total_xp);
        previous
    }

    pub fn has_unlocked(&self, achievement_id: &str) -> bool {
        self.achievements
            .iter()
            .any(|e| e.achievement_id == achievement_id)
    }

    pub fn has_perfect_quiz(&self) -> bool {
        self.quiz_scores.values().any(|score| *score >= 100)
    }

    pub fn record_quiz_score(&mut self, quiz_id: &str, score_percent: u8) {
        let best = self.quiz_scores.entry(quiz_id.to_string()).or_insert(0);
        *best = (*best).max(score_percent.min(100));
    }

    /// Updates the daily streak for activity on `date`.
    ///
    /// Same day keeps the streak, the following day extends it, any gap
    /// restarts it at 1. Activity dated before the last active day is ignored.
    pub fn record_activity(&mut self, date: NaiveDate) {
        match self.last_active_date {
            Some(last) if last == date => {}
            Some(last) if date < last => return,
            Some(last) if last.succ_opt() == Some(date) => {
                self.streak_days = self.streak_days.saturating_add(1);
            }
            _ => self.streak_days = 1,
        }
        self.last_active_date = Some(date);
        self.longest_streak = self.longest_streak.max(self.streak_days);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Validated favorite topics and source restrictions.
///
/// Built through [`crate::validation::sanitize_preferences`]; entries are
/// trimmed, non-empty and unique ignoring case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default)]
    pub favorite_topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

impl UserPreferences {
    pub fn with_topics<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            favorite_topics: crate::validation::normalize_terms(topics),
            sources: None,
        }
    }

    pub fn has_topics(&self) -> bool {
        !self.favorite_topics.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProgressEventKind {
    #[serde(rename_all = "camelCase")]
    XpAwarded { amount: u64, total_xp: u64 },
    #[serde(rename_all = "camelCase")]
    LevelUp { from: u32, to: u32 },
    #[serde(rename_all = "camelCase")]
    AchievementUnlocked {
        achievement_id: String,
        name: String,
        xp_reward: u64,
    },
}

/// Progression change pushed to realtime subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub user_id: String,
    #[serde(flatten)]
    pub kind: ProgressEventKind,
    pub at: DateTime<Utc>,
}
