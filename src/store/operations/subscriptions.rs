use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::progression::entitlements::{Feature, GateError, SubscriptionState};
use crate::store::keys;
use crate::store::{Store, StoreError};

/// Billing-provider view of a subscription. Usage counters are owned by
/// this service and survive a sync.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSync {
    pub is_pro: bool,
    #[serde(default)]
    pub plan_name: Option<String>,
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum UsageError {
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Store {
    pub fn get_subscription(&self, user_id: &str) -> Result<SubscriptionState, StoreError> {
        let key = keys::subscription_key(user_id);
        match self.subscriptions.get(key.as_bytes())? {
            Some(raw) => Self::deserialize(&raw),
            None => Ok(SubscriptionState::default()),
        }
    }

    pub fn sync_subscription(
        &self,
        user_id: &str,
        sync: &SubscriptionSync,
        now: DateTime<Utc>,
    ) -> Result<SubscriptionState, StoreError> {
        let key = keys::subscription_key(user_id);
        let (state, ()) = Self::cas_update(
            &self.subscriptions,
            "subscription",
            &key,
            SubscriptionState::default,
            |state| {
                state.is_pro = sync.is_pro;
                state.plan_name = match (&sync.plan_name, sync.is_pro) {
                    (Some(name), _) if !name.trim().is_empty() => name.trim().to_string(),
                    (_, true) => "pro".to_string(),
                    (_, false) => "free".to_string(),
                };
                state.current_period_end = sync.current_period_end;
                state.updated_at = Some(now);
                Ok::<_, StoreError>(())
            },
        )?;
        tracing::info!(
            user_id,
            is_pro = state.is_pro,
            plan = %state.plan_name,
            "Subscription synced"
        );
        Ok(state)
    }

    /// Consumes one unit of `feature`. A rejected increment leaves the stored
    /// counters untouched.
    pub fn consume_usage(
        &self,
        user_id: &str,
        feature: Feature,
        now: DateTime<Utc>,
    ) -> Result<SubscriptionState, UsageError> {
        let key = keys::subscription_key(user_id);
        let (state, ()) = Self::cas_update(
            &self.subscriptions,
            "subscription",
            &key,
            SubscriptionState::default,
            |state| state.consume(feature, now).map_err(UsageError::from),
        )?;
        Ok(state)
    }

    /// Gives back a unit taken by [`Store::consume_usage`] whose activity was
    /// not recorded. Writes nothing when there is no unit to return.
    pub fn refund_usage(
        &self,
        user_id: &str,
        feature: Feature,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let key = keys::subscription_key(user_id);
        if self.subscriptions.get(key.as_bytes())?.is_none() {
            return Ok(false);
        }
        let (_, refunded) = Self::cas_update(
            &self.subscriptions,
            "subscription",
            &key,
            SubscriptionState::default,
            |state| Ok::<_, StoreError>(state.refund(feature, now)),
        )?;
        if refunded {
            tracing::info!(user_id, %feature, "Feature usage refunded");
        }
        Ok(refunded)
    }
}
