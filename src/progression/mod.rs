//! User progression and content personalization.
//!
//! `leveling`, `achievements`, `personalization` and `entitlements` are pure
//! and synchronous; `engine` wires the first two to the store.

pub mod achievements;
pub mod engine;
pub mod entitlements;
pub mod leveling;
pub mod personalization;
pub mod types;
