use crate::progression::leveling;
use crate::progression::types::UserProgress;
use crate::store::{Store, StoreError};

const VERSION_KEY: &str = "_meta:version";

type MigrationFn = fn(&Store) -> Result<(), StoreError>;

fn migrations() -> Vec<(&'static str, MigrationFn)> {
    vec![
        ("001_initial", m001_initial),
        ("002_progress_level_backfill", m002_progress_level_backfill),
    ]
}

/// Applies every pending migration.
///
/// - Each migration must be idempotent: the process may crash after a migration ran but before its version was stored.
/// - The version is persisted right after each successful migration.
/// - Forward only: `set_version` refuses downgrades.
pub fn run(store: &Store) -> Result<(), StoreError> {
    let current = get_current_version(store)?;

    for (index, (name, func)) in migrations().iter().enumerate() {
        let version = (index + 1) as u32;
        if version > current {
            tracing::info!(version, name, "Running migration");
            func(store)?;
            set_version(store, version)?;
            tracing::info!(version, name, "Migration complete");
        } else {
            tracing::debug!(version, name, "Migration already applied, skipping");
        }
    }

    Ok(())
}

pub fn get_current_version(store: &Store) -> Result<u32, StoreError> {
    match store.meta.get(VERSION_KEY.as_bytes())? {
        Some(raw) => {
            let bytes: [u8; 4] = raw.as_ref().try_into().map_err(|_| StoreError::Migration {
                version: 0,
                message: format!("malformed version marker ({} bytes)", raw.len()),
            })?;
            Ok(u32::from_be_bytes(bytes))
        }
        None => Ok(0),
    }
}

pub fn set_version(store: &Store, version: u32) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    if version < current {
        return Err(StoreError::Migration {
            version,
            message: format!("Refuse to downgrade from {} to {}", current, version),
        });
    }

    store
        .meta
        .insert(VERSION_KEY.as_bytes(), &version.to_be_bytes())?;
    Ok(())
}

fn m001_initial(_store: &Store) -> Result<(), StoreError> {
    Ok(())
}

/// Re-derives `level` from `total_xp` for records written by imports or
/// older builds whose level table differed.
fn m002_progress_level_backfill(store: &Store) -> Result<(), StoreError> {
    let mut fixed = 0usize;
    for item in store.progress.iter() {
        let (key, value) = item?;
        let mut progress: UserProgress = Store::deserialize(&value)?;
        let expected = leveling::calculate_level(progress.total_xp);
        if progress.level != expected {
            progress.level = expected;
            store.progress.insert(key, Store::serialize(&progress)?)?;
            fixed += 1;
        }
    }
    if fixed > 0 {
        tracing::info!(fixed, "Backfilled progress levels");
    }
    Ok(())
}
