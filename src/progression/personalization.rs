//! Preference-based content filtering and ranking.
//!
//! A topic matches an item when, ignoring case, the topic occurs inside the
//! item's category or title, or the category or title occurs inside the
//! topic. The second direction lets broad topics pick up short titles but
//! also means a one-letter topic matches almost everything.

use serde::{Deserialize, Serialize};

use crate::progression::types::{ContentItem, UserPreferences};

/// Feed size the fallback backfill tops up to (capped by `max_items`).
pub const MIN_FEED_SIZE: usize = 4;

pub const DEFAULT_FEED_SIZE: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedOptions {
    pub max_items: usize,
    pub sort_by_relevance: bool,
    pub include_fallback: bool,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_FEED_SIZE,
            sort_by_relevance: true,
            include_fallback: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    #[serde(flatten)]
    pub item: ContentItem,
    pub relevance: usize,
    pub matched_topics: Vec<String>,
    pub is_fallback: bool,
}

fn lowered_terms(topics: &[String]) -> Vec<(String, &str)> {
    topics
        .iter()
        .filter_map(|t| {
            let trimmed = t.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some((trimmed.to_lowercase(), t.as_str()))
            }
        })
        .collect()
}

/// An empty field is contained in every term; stored catalogs never carry
/// one because blank titles and categories are rejected on replacement.
fn term_matches(term: &str, field: &str) -> bool {
    field.contains(term) || term.contains(field)
}

/// Topics (original spelling) that match `item`.
pub fn matched_topics(item: &ContentItem, topics: &[String]) -> Vec<String> {
    let category = item.category.trim().to_lowercase();
    let title = item.title.trim().to_lowercase();

    lowered_terms(topics)
        .into_iter()
        .filter(|(term, _)| term_matches(term, &category) || term_matches(term, &title))
        .map(|(_, original)| original.to_string())
        .collect()
}

pub fn relevance_score(item: &ContentItem, topics: &[String]) -> usize {
    matched_topics(item, topics).len()
}

/// Items matching at least one topic, in catalog order. No usable topics
/// means no filtering.
pub fn filter_by_preferences(items: &[ContentItem], topics: &[String]) -> Vec<ContentItem> {
    if lowered_terms(topics).is_empty() {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|item| relevance_score(item, topics) > 0)
        .cloned()
        .collect()
}

/// Stable sort by descending relevance; equal scores keep catalog order.
pub fn sort_by_relevance(items: &[ContentItem], topics: &[String]) -> Vec<ContentItem> {
    let mut scored: Vec<(usize, &ContentItem)> = items
        .iter()
        .map(|item| (relevance_score(item, topics), item))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, item)| item.clone()).collect()
}

fn source_allowed(item: &ContentItem, sources: Option<&[String]>) -> bool {
    match sources {
        Some(list) if !list.is_empty() => list
            .iter()
            .any(|s| s.trim().eq_ignore_ascii_case(item.source.trim())),
        _ => true,
    }
}

/// Filter, rank, truncate and backfill `items` for one user.
pub fn personalize(
    items: &[ContentItem],
    preferences: &UserPreferences,
    options: &FeedOptions,
) -> Vec<FeedEntry> {
    let sources = preferences.sources.as_deref();
    let pool: Vec<&ContentItem> = items
        .iter()
        .filter(|item| source_allowed(item, sources))
        .collect();
    let topics = &preferences.favorite_topics;

    if lowered_terms(topics).is_empty() {
        return pool
            .into_iter()
            .take(options.max_items)
            .map(|item| FeedEntry {
                item: item.clone(),
                relevance: 0,
                matched_topics: Vec::new(),
                is_fallback: false,
            })
            .collect();
    }

    let mut matched: Vec<(usize, FeedEntry)> = pool
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let hits = matched_topics(item, topics);
            if hits.is_empty() {
                return None;
            }
            Some((
                idx,
                FeedEntry {
                    item: (*item).clone(),
                    relevance: hits.len(),
                    matched_topics: hits,
                    is_fallback: false,
                },
            ))
        })
        .collect();

    if options.sort_by_relevance {
        matched.sort_by(|a, b| b.1.relevance.cmp(&a.1.relevance));
    }
    matched.truncate(options.max_items);

    let slots = options.max_items.min(MIN_FEED_SIZE);
    if options.include_fallback && matched.len() < slots {
        let taken: Vec<usize> = matched.iter().map(|(idx, _)| *idx).collect();
        let backfill: Vec<(usize, FeedEntry)> = pool
            .iter()
            .enumerate()
            .filter(|(idx, _)| !taken.contains(idx))
            .take(slots - matched.len())
            .map(|(idx, item)| {
                (
                    idx,
                    FeedEntry {
                        item: (*item).clone(),
                        relevance: 0,
                        matched_topics: Vec::new(),
                        is_fallback: true,
                    },
                )
            })
            .collect();
        tracing::debug!(
            matched = matched.len(),
            backfilled = backfill.len(),
            "Feed backfilled with unmatched items"
        );
        matched.extend(backfill);
    }

    matched.into_iter().map(|(_, entry)| entry).collect()
}

pub fn get_personalized_content(
    items: &[ContentItem],
    preferences: &UserPreferences,
    options: &FeedOptions,
) -> Vec<ContentItem> {
    personalize(items, preferences, options)
        .into_iter()
        .map(|entry| entry.item)
        .collect()
}
