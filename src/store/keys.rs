pub fn progress_key(user_id: &str) -> String {
    user_id.to_string()
}

pub fn preferences_key(user_id: &str) -> String {
    user_id.to_string()
}

pub fn subscription_key(user_id: &str) -> String {
    user_id.to_string()
}

/// Catalog entries are keyed by position so a prefix scan yields catalog order.
pub fn content_item_key(position: usize) -> String {
    format!("item:{:010}", position)
}

pub fn content_item_prefix() -> &'static str {
    "item:"
}
