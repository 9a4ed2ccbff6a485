use std::collections::HashSet;

use thiserror::Error;

use crate::constants::MAX_CATALOG_ITEMS;
use crate::progression::types::ContentItem;
use crate::store::keys;
use crate::store::{Store, StoreError};
use crate::validation::validate_id;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog has {count} items, at most {max} allowed")]
    TooLarge { count: usize, max: usize },
    #[error("duplicate content id: {0}")]
    DuplicateId(String),
    #[error("invalid item at index {index}: {reason}")]
    InvalidItem { index: usize, reason: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn check_items(items: &[ContentItem]) -> Result<(), CatalogError> {
    if items.len() > MAX_CATALOG_ITEMS {
        return Err(CatalogError::TooLarge {
            count: items.len(),
            max: MAX_CATALOG_ITEMS,
        });
    }
    let mut seen = HashSet::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        validate_id(&item.id).map_err(|reason| CatalogError::InvalidItem {
            index,
            reason: reason.to_string(),
        })?;
        if item.title.trim().is_empty() {
            return Err(CatalogError::InvalidItem {
                index,
                reason: "title must not be empty".to_string(),
            });
        }
        if item.category.trim().is_empty() {
            return Err(CatalogError::InvalidItem {
                index,
                reason: "category must not be empty".to_string(),
            });
        }
        if !seen.insert(item.id.as_str()) {
            return Err(CatalogError::DuplicateId(item.id.clone()));
        }
    }
    Ok(())
}

impl Store {
    /// Content items in catalog order.
    pub fn list_content_items(&self) -> Result<Vec<ContentItem>, StoreError> {
        let mut items = Vec::new();
        for entry in self.content_items.scan_prefix(keys::content_item_prefix()) {
            let (_, value) = entry?;
            items.push(Self::deserialize(&value)?);
        }
        Ok(items)
    }

    /// Replaces the whole catalog in one atomic batch.
    pub fn replace_catalog(&self, items: &[ContentItem]) -> Result<usize, CatalogError> {
        check_items(items)?;

        let mut batch = sled::Batch::default();
        for key in self.content_items.iter().keys() {
            batch.remove(key.map_err(StoreError::from)?);
        }
        for (position, item) in items.iter().enumerate() {
            batch.insert(
                keys::content_item_key(position).as_bytes(),
                Self::serialize(item)?,
            );
        }
        self.content_items
            .apply_batch(batch)
            .map_err(StoreError::from)?;

        tracing::info!(items = items.len(), "Content catalog replaced");
        Ok(items.len())
    }
}
