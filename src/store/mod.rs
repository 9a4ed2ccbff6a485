pub mod keys;
pub mod migrate;
pub mod operations;
pub mod trees;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use thiserror::Error;

use crate::constants::MAX_CAS_RETRIES;

#[derive(Debug)]
pub struct Store {
    db: Db,
    pub progress: sled::Tree,
    pub preferences: sled::Tree,
    pub subscriptions: sled::Tree,
    pub content_items: sled::Tree,
    pub meta: sled::Tree,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("CAS retry exhausted after {attempts} attempts: entity={entity}, key={key}")]
    CasRetryExhausted {
        entity: String,
        key: String,
        attempts: u32,
    },
    #[error("migration error at version {version}: {message}")]
    Migration { version: u32, message: String },
}

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        let progress = db.open_tree(trees::PROGRESS)?;
        let preferences = db.open_tree(trees::PREFERENCES)?;
        let subscriptions = db.open_tree(trees::SUBSCRIPTIONS)?;
        let content_items = db.open_tree(trees::CONTENT_ITEMS)?;
        let meta = db.open_tree(trees::META)?;

        Ok(Self {
            db,
            progress,
            preferences,
            subscriptions,
            content_items,
            meta,
        })
    }

    pub fn run_migrations(&self) -> Result<(), StoreError> {
        migrate::run(self)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Read-modify-write of one JSON value with compare-and-swap.
    ///
    /// `mutate` may run several times when another writer wins the race; it
    /// always starts from the freshly read value. An `Err` from `mutate`
    /// aborts without writing.
    pub(crate) fn cas_update<T, R, E, I, F>(
        tree: &sled::Tree,
        entity: &str,
        key: &str,
        init: I,
        mut mutate: F,
    ) -> Result<(T, R), E>
    where
        T: Serialize + DeserializeOwned,
        E: From<StoreError>,
        I: Fn() -> T,
        F: FnMut(&mut T) -> Result<R, E>,
    {
        for attempt in 1..=MAX_CAS_RETRIES {
            let current = tree.get(key.as_bytes()).map_err(StoreError::from)?;
            let mut value: T = match &current {
                Some(raw) => Self::deserialize(raw)?,
                None => init(),
            };

            let result = mutate(&mut value)?;
            let bytes = Self::serialize(&value)?;

            let swapped = tree
                .compare_and_swap(key.as_bytes(), current.as_ref(), Some(bytes))
                .map_err(StoreError::from)?;
            match swapped {
                Ok(()) => return Ok((value, result)),
                Err(_) => {
                    tracing::debug!(entity, key, attempt, "CAS conflict, retrying");
                }
            }
        }

        Err(StoreError::CasRetryExhausted {
            entity: entity.to_string(),
            key: key.to_string(),
            attempts: MAX_CAS_RETRIES,
        }
        .into())
    }
}
