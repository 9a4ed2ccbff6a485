pub mod catalog;
pub mod preferences;
pub mod progress;
pub mod subscriptions;
