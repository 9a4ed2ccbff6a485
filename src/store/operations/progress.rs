use crate::progression::types::UserProgress;
use crate::store::keys;
use crate::store::{Store, StoreError};

impl Store {
    pub fn get_progress(&self, user_id: &str) -> Result<Option<UserProgress>, StoreError> {
        let key = keys::progress_key(user_id);
        match self.progress.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Atomically mutates a user's progress, starting from a fresh record
    /// when none exists yet.
    pub fn update_progress<R, E, F>(&self, user_id: &str, mutate: F) -> Result<(UserProgress, R), E>
    where
        E: From<StoreError>,
        F: FnMut(&mut UserProgress) -> Result<R, E>,
    {
        let key = keys::progress_key(user_id);
        Self::cas_update(
            &self.progress,
            "progress",
            &key,
            || UserProgress::new(user_id),
            mutate,
        )
    }
}
