//! Catalog cache eviction (every 10 minutes).

use crate::state::CatalogCache;

pub async fn run(cache: &CatalogCache) {
    tracing::debug!("Cache cleanup worker tick");

    let evicted = cache.evict_expired().await;
    if evicted > 0 {
        tracing::info!(
            evicted,
            ttl_secs = cache.ttl().as_secs(),
            "Cache cleanup: evicted expired catalog entries"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::cache::TtlCache;

    #[tokio::test]
    async fn expired_catalog_is_evicted() {
        let cache: CatalogCache = TtlCache::new(Duration::ZERO);
        cache.insert("catalog", Arc::new(Vec::new())).await;
        run(&cache).await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn fresh_catalog_survives() {
        let cache: CatalogCache = TtlCache::new(Duration::from_secs(600));
        cache.insert("catalog", Arc::new(Vec::new())).await;
        run(&cache).await;
        assert_eq!(cache.len().await, 1);
    }
}
