use axum::extract::State;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::constants::MAX_FEED_ITEMS;
use crate::extractors::QueryParams;
use crate::progression::personalization::{self, FeedEntry, FeedOptions};
use crate::progression::types::ContentItem;
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_content))
        .route("/feed", get(personalized_feed))
}

async fn list_content(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let items = state.catalog().await?;
    Ok(ok(items.to_vec()))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum FeedSort {
    #[default]
    Relevance,
    Catalog,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedQuery {
    max_items: Option<usize>,
    sort: Option<FeedSort>,
    fallback: Option<bool>,
}

impl FeedQuery {
    fn options(&self) -> FeedOptions {
        let defaults = FeedOptions::default();
        FeedOptions {
            max_items: self
                .max_items
                .unwrap_or(defaults.max_items)
                .clamp(1, MAX_FEED_ITEMS),
            sort_by_relevance: self.sort.unwrap_or_default() == FeedSort::Relevance,
            include_fallback: self.fallback.unwrap_or(defaults.include_fallback),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedView {
    items: Vec<FeedEntry>,
    personalized: bool,
    matched_count: usize,
    options: FeedOptions,
}

async fn personalized_feed(
    auth: AuthUser,
    State(state): State<AppState>,
    QueryParams(query): QueryParams<FeedQuery>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let options = query.options();
    let preferences = state.store().get_preferences(&auth.user_id)?;
    let catalog = state.catalog().await?;
    let items: &[ContentItem] = &catalog;

    let entries = personalization::personalize(items, &preferences, &options);
    let matched_count = entries.iter().filter(|e| e.relevance > 0).count();

    Ok(ok(FeedView {
        personalized: preferences.has_topics(),
        matched_count,
        items: entries,
        options,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_query_defaults_and_clamping() {
        let options = FeedQuery::default().options();
        assert_eq!(options, FeedOptions::default());

        let q = FeedQuery {
            max_items: Some(10_000),
            sort: Some(FeedSort::Catalog),
            fallback: Some(false),
        };
        let options = q.options();
        assert_eq!(options.max_items, MAX_FEED_ITEMS);
        assert!(!options.sort_by_relevance);
        assert!(!options.include_fallback);

        let zero = FeedQuery {
            max_items: Some(0),
            ..FeedQuery::default()
        };
        assert_eq!(zero.options().max_items, 1);
    }
}
