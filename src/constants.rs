/// Maximum compare-and-swap attempts per update
pub const MAX_CAS_RETRIES: u32 = 20;

/// XP per correct quiz answer
pub const QUIZ_XP_PER_CORRECT_ANSWER: u64 = 10;

/// Bonus XP for a perfect quiz
pub const PERFECT_QUIZ_BONUS_XP: u64 = 25;

/// XP for the first review of a flashcard
pub const FLASHCARD_XP: u64 = 5;

/// Favorite topics kept per user; extras are dropped
pub const MAX_FAVORITE_TOPICS: usize = 50;

/// Maximum characters of one topic or source
pub const MAX_TERM_CHARS: usize = 100;

/// Maximum items in one catalog replacement
pub const MAX_CATALOG_ITEMS: usize = 5_000;

/// Upper bound for `maxItems` on the feed
pub const MAX_FEED_ITEMS: usize = 100;

/// Default catalog cache TTL in seconds
pub const DEFAULT_CATALOG_CACHE_TTL_SECS: u64 = 600;
