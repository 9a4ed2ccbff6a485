//! Badge catalog and unlock evaluation.
//!
//! Every condition reads only fields that never decrease (completed sets,
//! longest streak, best quiz scores, total XP), so once a condition holds it
//! keeps holding. Unlocks are recorded on the progress snapshot itself, which
//! makes re-evaluation of the same snapshot a no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::progression::types::{UnlockEvent, UserProgress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum UnlockCondition {
    QuizzesCompleted(u32),
    FlashcardsCompleted(u32),
    StreakDays(u32),
    PerfectQuiz,
    TotalXp(u64),
    LevelReached(u32),
}

impl UnlockCondition {
    pub fn is_met(&self, progress: &UserProgress) -> bool {
        match *self {
            Self::QuizzesCompleted(n) => progress.completed_quiz_ids.len() >= n as usize,
            Self::FlashcardsCompleted(n) => progress.completed_flashcard_ids.len() >= n as usize,
            Self::StreakDays(n) => progress.longest_streak >= n,
            Self::PerfectQuiz => progress.has_perfect_quiz(),
            Self::TotalXp(n) => progress.total_xp >= n,
            Self::LevelReached(n) => progress.level >= n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub xp_reward: u64,
    pub unlock_condition: UnlockCondition,
    #[serde(default)]
    pub unlocked: bool,
    #[serde(default)]
    pub unlocked_at: Option<DateTime<Utc>>,
}

impl Achievement {
    fn new(id: &str, name: &str, description: &str, xp_reward: u64, cond: UnlockCondition) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            xp_reward,
            unlock_condition: cond,
            unlocked: false,
            unlocked_at: None,
        }
    }
}

pub fn default_catalog() -> Vec<Achievement> {
    use UnlockCondition::*;

    vec![
        // Quizzes
        Achievement::new("first_quiz", "First Steps", "Complete your first quiz", 50, QuizzesCompleted(1)),
        Achievement::new("quiz_explorer", "Quiz Explorer", "Complete 10 quizzes", 150, QuizzesCompleted(10)),
        Achievement::new("quiz_master", "Quiz Master", "Complete 50 quizzes", 500, QuizzesCompleted(50)),
        Achievement::new("perfect_score", "Flawless", "Score 100% on a quiz", 100, PerfectQuiz),
        // Flashcards
        Achievement::new("flashcard_rookie", "Card Shark", "Review 10 flashcards", 50, FlashcardsCompleted(10)),
        Achievement::new("flashcard_scholar", "Scholar", "Review 100 flashcards", 250, FlashcardsCompleted(100)),
        // Streaks
        Achievement::new("streak_3", "On Fire", "Learn 3 days in a row", 75, StreakDays(3)),
        Achievement::new("streak_7", "Week Warrior", "Learn 7 days in a row", 200, StreakDays(7)),
        Achievement::new("streak_30", "Unstoppable", "Learn 30 days in a row", 1000, StreakDays(30)),
        // Milestones
        Achievement::new("level_5", "Rising Star", "Reach level 5", 100, LevelReached(5)),
        Achievement::new("xp_10k", "Tech Titan", "Earn 10,000 XP", 500, TotalXp(10_000)),
    ]
}

/// Ids of catalog entries whose condition holds and that are not yet
/// unlocked, in catalog order. Pure; does not touch `progress`.
pub fn evaluate(progress: &UserProgress, catalog: &[Achievement]) -> Vec<String> {
    catalog
        .iter()
        .filter(|a| !progress.has_unlocked(&a.id))
        .filter(|a| a.unlock_condition.is_met(progress))
        .map(|a| a.id.clone())
        .collect()
}

/// Unlocks every achievement whose condition holds and grants its reward once.
///
/// Rewards of one pass are summed before the level is re-derived. Passes
/// repeat because XP and level badges can be satisfied by earlier rewards;
/// the loop ends after the first pass that unlocks nothing.
pub fn evaluate_and_apply(
    progress: &mut UserProgress,
    catalog: &[Achievement],
    now: DateTime<Utc>,
) -> Vec<UnlockEvent> {
    let mut unlocked = Vec::new();

    loop {
        let newly = evaluate(progress, catalog);
        if newly.is_empty() {
            break;
        }

        let mut reward_sum = 0u64;
        for id in &newly {
            let Some(entry) = catalog.iter().find(|a| &a.id == id) else {
                continue;
            };
            reward_sum = reward_sum.saturating_add(entry.xp_reward);
            let event = UnlockEvent {
                achievement_id: entry.id.clone(),
                unlocked_at: now,
            };
            progress.achievements.push(event.clone());
            unlocked.push(event);
        }
        progress.add_xp(reward_sum);
    }

    unlocked
}

/// Catalog annotated with the user's unlock state, for display.
pub fn with_user_state(catalog: &[Achievement], progress: &UserProgress) -> Vec<Achievement> {
    catalog
        .iter()
        .map(|a| {
            let mut entry = a.clone();
            if let Some(event) = progress
                .achievements
                .iter()
                .find(|e| e.achievement_id == a.id)
            {
                entry.unlocked = true;
                entry.unlocked_at = Some(event.unlocked_at);
            }
            entry
        })
        .collect()
}

pub fn find<'a>(catalog: &'a [Achievement], id: &str) -> Option<&'a Achievement> {
    catalog.iter().find(|a| a.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress_with_quizzes(n: usize) -> UserProgress {
        let mut p = UserProgress::new("u1");
        for i in 0..n {
            p.completed_quiz_ids.insert(format!("q{i}"));
        }
        p
    }

    #[test]
    fn first_quiz_unlocks_once() {
        let catalog = default_catalog();
        let mut p = progress_with_quizzes(1);
        let now = Utc::now();

        let first = evaluate_and_apply(&mut p, &catalog, now);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].achievement_id, "first_quiz");
        assert_eq!(p.total_xp, 50);

        let snapshot = p.clone();
        let second = evaluate_and_apply(&mut p, &catalog, now);
        assert!(second.is_empty());
        assert_eq!(p, snapshot);
    }

    #[test]
    fn same_pass_rewards_are_summed_before_level_recalc() {
        let catalog = vec![
            Achievement::new("a", "A", "", 60, UnlockCondition::QuizzesCompleted(1)),
            Achievement::new("b", "B", "", 60, UnlockCondition::QuizzesCompleted(1)),
        ];
        let mut p = progress_with_quizzes(1);
        let events = evaluate_and_apply(&mut p, &catalog, Utc::now());
        let ids: Vec<_> = events.iter().map(|e| e.achievement_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(p.total_xp, 120);
        assert_eq!(p.level, 2);
    }

    #[test]
    fn rewards_can_cascade_into_xp_badges() {
        let catalog = vec![
            Achievement::new("xp", "XP", "", 10, UnlockCondition::TotalXp(100)),
            Achievement::new("quiz", "Quiz", "", 100, UnlockCondition::QuizzesCompleted(1)),
        ];
        let mut p = progress_with_quizzes(1);
        let events = evaluate_and_apply(&mut p, &catalog, Utc::now());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].achievement_id, "quiz");
        assert_eq!(events[1].achievement_id, "xp");
        assert_eq!(p.total_xp, 110);
        assert!(evaluate(&p, &catalog).is_empty());
    }

    #[test]
    fn streak_badge_survives_streak_reset() {
        let catalog = default_catalog();
        let mut p = UserProgress::new("u1");
        p.streak_days = 1;
        p.longest_streak = 7;
        let ids = evaluate(&p, &catalog);
        assert!(ids.contains(&"streak_3".to_string()));
        assert!(ids.contains(&"streak_7".to_string()));
        assert!(!ids.contains(&"streak_30".to_string()));
    }

    #[test]
    fn perfect_quiz_condition() {
        let mut p = UserProgress::new("u1");
        assert!(!UnlockCondition::PerfectQuiz.is_met(&p));
        p.record_quiz_score("q1", 100);
        assert!(UnlockCondition::PerfectQuiz.is_met(&p));
    }

    #[test]
    fn user_state_marks_unlocked_entries() {
        let catalog = default_catalog();
        let mut p = progress_with_quizzes(1);
        let now = Utc::now();
        evaluate_and_apply(&mut p, &catalog, now);

        let view = with_user_state(&catalog, &p);
        let first = view.iter().find(|a| a.id == "first_quiz").unwrap();
        assert!(first.unlocked);
        assert_eq!(first.unlocked_at, Some(now));
        assert!(view.iter().filter(|a| a.unlocked).count() == 1);
    }

    #[test]
    fn condition_serializes_tagged() {
        let json = serde_json::to_value(UnlockCondition::StreakDays(7)).unwrap();
        assert_eq!(json["type"], "streakDays");
        assert_eq!(json["value"], 7);
    }
}
