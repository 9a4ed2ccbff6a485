//! XP → level mapping.
//!
//! Levels 1..=10 come from a fixed threshold table. Past the last threshold
//! one more level is reached every [`XP_PER_LEVEL_BEYOND_TABLE`] XP, so the
//! mapping is total over `u64`.

use serde::Serialize;

pub const LEVEL_THRESHOLDS: [u64; 10] = [0, 100, 250, 500, 1000, 2000, 4000, 8000, 16000, 32000];

pub const MAX_TABLE_LEVEL: u32 = LEVEL_THRESHOLDS.len() as u32;

pub const XP_PER_LEVEL_BEYOND_TABLE: u64 = 16000;

const LAST_THRESHOLD: u64 = LEVEL_THRESHOLDS[LEVEL_THRESHOLDS.len() - 1];

pub fn calculate_level(xp: u64) -> u32 {
    if xp >= LAST_THRESHOLD {
        let extra = (xp - LAST_THRESHOLD) / XP_PER_LEVEL_BEYOND_TABLE;
        return MAX_TABLE_LEVEL.saturating_add(u32::try_from(extra).unwrap_or(u32::MAX));
    }

    let reached = LEVEL_THRESHOLDS
        .iter()
        .take_while(|threshold| xp >= **threshold)
        .count();
    reached.max(1) as u32
}

/// XP still missing for the next tabulated level; 0 once the table is exhausted.
pub fn xp_to_next_level(xp: u64) -> u64 {
    let level = calculate_level(xp);
    if level >= MAX_TABLE_LEVEL {
        return 0;
    }
    LEVEL_THRESHOLDS[level as usize].saturating_sub(xp)
}

/// XP at which `level` starts.
pub fn level_floor_xp(level: u32) -> u64 {
    let level = level.max(1);
    if level <= MAX_TABLE_LEVEL {
        LEVEL_THRESHOLDS[(level - 1) as usize]
    } else {
        let extra = u64::from(level - MAX_TABLE_LEVEL);
        LAST_THRESHOLD.saturating_add(extra.saturating_mul(XP_PER_LEVEL_BEYOND_TABLE))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub level: u32,
    pub total_xp: u64,
    pub current_level_xp: u64,
    pub next_level_xp: Option<u64>,
    pub xp_to_next_level: u64,
    pub progress_percent: f64,
}

pub fn level_progress(xp: u64) -> LevelProgress {
    let level = calculate_level(xp);
    let current_level_xp = level_floor_xp(level);
    let next_level_xp = if level < MAX_TABLE_LEVEL {
        Some(LEVEL_THRESHOLDS[level as usize])
    } else {
        None
    };

    let progress_percent = match next_level_xp {
        Some(next) => {
            let span = next.saturating_sub(current_level_xp).max(1) as f64;
            let done = xp.saturating_sub(current_level_xp) as f64;
            ((done / span) * 100.0).clamp(0.0, 100.0)
        }
        None => 100.0,
    };

    LevelProgress {
        level,
        total_xp: xp,
        current_level_xp,
        next_level_xp,
        xp_to_next_level: xp_to_next_level(xp),
        progress_percent,
    }
}
