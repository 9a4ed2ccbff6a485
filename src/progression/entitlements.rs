//! Subscription plans, feature entitlements and monthly usage quotas.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    DailyQuests,
    Flashcards,
    Quizzes,
    TrendingFeed,
    AiExplanations,
    AdvancedAnalytics,
    CustomTopics,
    OfflineMode,
}

impl Feature {
    pub const ALL: [Feature; 8] = [
        Feature::DailyQuests,
        Feature::Flashcards,
        Feature::Quizzes,
        Feature::TrendingFeed,
        Feature::AiExplanations,
        Feature::AdvancedAnalytics,
        Feature::CustomTopics,
        Feature::OfflineMode,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DailyQuests => "daily_quests",
            Self::Flashcards => "flashcards",
            Self::Quizzes => "quizzes",
            Self::TrendingFeed => "trending_feed",
            Self::AiExplanations => "ai_explanations",
            Self::AdvancedAnalytics => "advanced_analytics",
            Self::CustomTopics => "custom_topics",
            Self::OfflineMode => "offline_mode",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase().replace('-', "_");
        Feature::ALL
            .into_iter()
            .find(|f| f.as_str() == needle)
            .ok_or_else(|| GateError::UnknownFeature(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plan::Free => f.write_str("free"),
            Plan::Pro => f.write_str("pro"),
        }
    }
}

/// Monthly allowance per feature. `None` means unlimited.
pub fn plan_limit(plan: Plan, feature: Feature) -> Option<u32> {
    match (plan, feature) {
        (Plan::Pro, _) => None,
        (Plan::Free, Feature::Flashcards) => Some(50),
        (Plan::Free, Feature::Quizzes) => Some(10),
        (Plan::Free, _) => None,
    }
}

pub fn has_feature(plan: Plan, feature: Feature) -> bool {
    match plan {
        Plan::Pro => true,
        Plan::Free => matches!(
            feature,
            Feature::DailyQuests | Feature::Flashcards | Feature::Quizzes | Feature::TrendingFeed
        ),
    }
}

/// Counter entries are keyed by feature name; unknown keys are ignored.
pub fn usage_of(feature: Feature, counters: &BTreeMap<String, u32>) -> u32 {
    counters.get(feature.as_str()).copied().unwrap_or(0)
}

pub fn can_use_feature(plan: Plan, feature: Feature, counters: &BTreeMap<String, u32>) -> bool {
    if !has_feature(plan, feature) {
        return false;
    }
    match plan_limit(plan, feature) {
        None => true,
        Some(limit) => usage_of(feature, counters) < limit,
    }
}

/// Remaining allowance; `None` when unlimited, `Some(0)` when not included.
pub fn remaining_usage(
    plan: Plan,
    feature: Feature,
    counters: &BTreeMap<String, u32>,
) -> Option<u32> {
    if !has_feature(plan, feature) {
        return Some(0);
    }
    plan_limit(plan, feature).map(|limit| limit.saturating_sub(usage_of(feature, counters)))
}

/// Returns the counters with `feature` incremented by one.
///
/// Fails without touching `counters` when the feature is outside the plan or
/// its monthly allowance is used up.
pub fn increment_usage(
    plan: Plan,
    feature: Feature,
    counters: &BTreeMap<String, u32>,
) -> Result<BTreeMap<String, u32>, GateError> {
    if !has_feature(plan, feature) {
        return Err(GateError::FeatureNotIncluded { feature, plan });
    }
    let used = usage_of(feature, counters);
    if let Some(limit) = plan_limit(plan, feature) {
        if used >= limit {
            return Err(GateError::QuotaExceeded {
                feature,
                limit,
                used,
            });
        }
    }

    let mut next = counters.clone();
    next.insert(feature.as_str().to_string(), used.saturating_add(1));
    Ok(next)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("monthly limit of {limit} reached for {feature} ({used} used); upgrade to Pro for unlimited access")]
    QuotaExceeded {
        feature: Feature,
        limit: u32,
        used: u32,
    },
    #[error("{feature} is not included in the {plan} plan; upgrade to Pro to unlock it")]
    FeatureNotIncluded { feature: Feature, plan: Plan },
    #[error("unknown feature: {0}")]
    UnknownFeature(String),
}

pub fn usage_period(now: DateTime<Utc>) -> String {
    now.format("%Y-%m").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SubscriptionStatus {
    Free,
    #[serde(rename_all = "camelCase")]
    Pro { period_end: Option<DateTime<Utc>> },
    #[serde(rename_all = "camelCase")]
    Expired { expired_at: DateTime<Utc> },
}

impl SubscriptionStatus {
    pub fn plan(&self) -> Plan {
        match self {
            SubscriptionStatus::Pro { .. } => Plan::Pro,
            _ => Plan::Free,
        }
    }
}

/// Stored billing state as last reported by the billing provider.
///
/// Expiry and the monthly usage reset are both applied when reading, so no
/// background job has to rewrite stale records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionState {
    pub is_pro: bool,
    pub plan_name: String,
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub usage_counters: BTreeMap<String, u32>,
    #[serde(default)]
    pub usage_period: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for SubscriptionState {
    fn default() -> Self {
        Self {
            is_pro: false,
            plan_name: "free".to_string(),
            current_period_end: None,
            usage_counters: BTreeMap::new(),
            usage_period: None,
            updated_at: None,
        }
    }
}

impl SubscriptionState {
    pub fn status(&self, now: DateTime<Utc>) -> SubscriptionStatus {
        if !self.is_pro {
            return SubscriptionStatus::Free;
        }
        match self.current_period_end {
            Some(end) if end <= now => SubscriptionStatus::Expired { expired_at: end },
            end => SubscriptionStatus::Pro { period_end: end },
        }
    }

    pub fn effective_plan(&self, now: DateTime<Utc>) -> Plan {
        self.status(now).plan()
    }

    /// Counters of the current calendar month; a stale month reads as empty.
    pub fn counters_at(&self, now: DateTime<Utc>) -> BTreeMap<String, u32> {
        match &self.usage_period {
            Some(period) if *period == usage_period(now) => self.usage_counters.clone(),
            _ => BTreeMap::new(),
        }
    }

    /// Consumes one unit of `feature`, rolling the usage period if needed.
    pub fn consume(&mut self, feature: Feature, now: DateTime<Utc>) -> Result<(), GateError> {
        let plan = self.effective_plan(now);
        let counters = increment_usage(plan, feature, &self.counters_at(now))?;
        self.usage_counters = counters;
        self.usage_period = Some(usage_period(now));
        self.updated_at = Some(now);
        Ok(())
    }

    /// Returns one unit of `feature` consumed in the current period.
    /// Returns false when there is nothing to give back.
    pub fn refund(&mut self, feature: Feature, now: DateTime<Utc>) -> bool {
        if self.usage_period.as_deref() != Some(usage_period(now).as_str()) {
            return false;
        }
        match self.usage_counters.get_mut(feature.as_str()) {
            Some(used) if *used > 0 => {
                *used -= 1;
                self.updated_at = Some(now);
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureAccess {
    pub feature: Feature,
    pub has_feature: bool,
    pub can_use: bool,
    pub used: u32,
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
}

pub fn feature_access(state: &SubscriptionState, feature: Feature, now: DateTime<Utc>) -> FeatureAccess {
    let plan = state.effective_plan(now);
    let counters = state.counters_at(now);
    FeatureAccess {
        feature,
        has_feature: has_feature(plan, feature),
        can_use: can_use_feature(plan, feature, &counters),
        used: usage_of(feature, &counters),
        limit: if has_feature(plan, feature) {
            plan_limit(plan, feature)
        } else {
            Some(0)
        },
        remaining: remaining_usage(plan, feature, &counters),
    }
}
