pub const PROGRESS: &str = "progress";
pub const PREFERENCES: &str = "preferences";
pub const SUBSCRIPTIONS: &str = "subscriptions";
pub const CONTENT_ITEMS: &str = "content_items";
pub const META: &str = "meta";
