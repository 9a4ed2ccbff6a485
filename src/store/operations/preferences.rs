use crate::progression::types::UserPreferences;
use crate::store::keys;
use crate::store::{Store, StoreError};

impl Store {
    /// Users who never saved preferences get the empty default.
    pub fn get_preferences(&self, user_id: &str) -> Result<UserPreferences, StoreError> {
        let key = keys::preferences_key(user_id);
        match self.preferences.get(key.as_bytes())? {
            Some(raw) => Self::deserialize(&raw),
            None => Ok(UserPreferences::default()),
        }
    }

    pub fn set_preferences(
        &self,
        user_id: &str,
        preferences: &UserPreferences,
    ) -> Result<(), StoreError> {
        let key = keys::preferences_key(user_id);
        self.preferences
            .insert(key.as_bytes(), Self::serialize(preferences)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn preferences_default_then_replace() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("prefs").to_str().unwrap()).unwrap();

        assert_eq!(store.get_preferences("u1").unwrap(), UserPreferences::default());

        let prefs = UserPreferences::with_topics(["Rust", "AI"]);
        store.set_preferences("u1", &prefs).unwrap();
        assert_eq!(store.get_preferences("u1").unwrap(), prefs);
        assert!(store.get_preferences("u2").unwrap().favorite_topics.is_empty());
    }
}
