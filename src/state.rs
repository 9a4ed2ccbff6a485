use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use crate::cache::TtlCache;
use crate::config::Config;
use crate::middleware::rate_limit::RateLimiter;
use crate::progression::engine::ProgressionEngine;
use crate::progression::types::ContentItem;
use crate::store::{Store, StoreError};

pub type CatalogCache = TtlCache<&'static str, Arc<Vec<ContentItem>>>;

const CATALOG_CACHE_KEY: &str = "catalog";

#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
    engine: Arc<ProgressionEngine>,
    catalog_cache: Arc<CatalogCache>,
    /// Bumped by every invalidation; fills started before a bump are discarded.
    catalog_generation: Arc<AtomicU64>,
    rate_limit: Arc<RateLimiter>,
    config: Arc<Config>,
    shutdown_tx: broadcast::Sender<()>,
    sse_connections: Arc<AtomicUsize>,
    started_at: Instant,
}

/// Held for the lifetime of one SSE stream; releases its slot on drop.
pub struct SseSlot {
    counter: Arc<AtomicUsize>,
}

impl Drop for SseSlot {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

impl AppState {
    pub fn new(store: Arc<Store>, config: &Config, shutdown_tx: broadcast::Sender<()>) -> Self {
        let engine = Arc::new(ProgressionEngine::new(store.clone()));
        let rate_limit = Arc::new(RateLimiter::new(&config.rate_limit));
        let catalog_cache = Arc::new(TtlCache::new(Duration::from_secs(
            config.catalog_cache_ttl_secs,
        )));

        Self {
            store,
            engine,
            catalog_cache,
            catalog_generation: Arc::new(AtomicU64::new(0)),
            rate_limit,
            config: Arc::new(config.clone()),
            shutdown_tx,
            sse_connections: Arc::new(AtomicUsize::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn engine(&self) -> &ProgressionEngine {
        &self.engine
    }

    pub fn catalog_cache(&self) -> &Arc<CatalogCache> {
        &self.catalog_cache
    }

    /// Cache-aside read of the content catalog.
    pub async fn catalog(&self) -> Result<Arc<Vec<ContentItem>>, StoreError> {
        if let Some(items) = self.catalog_cache.get(&CATALOG_CACHE_KEY).await {
            return Ok(items);
        }
        let generation = self.catalog_generation.load(Ordering::Acquire);
        let items = Arc::new(self.store.list_content_items()?);
        self.fill_catalog(generation, items.clone()).await;
        Ok(items)
    }

    /// Caches `items` read at `generation`. If an invalidation ran since, the
    /// entry is dropped again so a catalog read before a replacement cannot
    /// outlive it.
    async fn fill_catalog(&self, generation: u64, items: Arc<Vec<ContentItem>>) {
        let count = items.len();
        self.catalog_cache.insert(CATALOG_CACHE_KEY, items).await;
        if self.catalog_generation.load(Ordering::Acquire) != generation {
            self.catalog_cache.invalidate(&CATALOG_CACHE_KEY).await;
            tracing::debug!(items = count, "Discarded catalog fill that raced an invalidation");
            return;
        }
        tracing::debug!(items = count, "Catalog cache refilled");
    }

    pub async fn invalidate_catalog(&self) {
        self.catalog_generation.fetch_add(1, Ordering::AcqRel);
        self.catalog_cache.invalidate_all().await;
    }

    pub fn rate_limit(&self) -> &Arc<RateLimiter> {
        &self.rate_limit
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Reserves an SSE slot, or `None` when `MAX_SSE_CONNECTIONS` are open.
    pub fn try_acquire_sse_slot(&self) -> Option<SseSlot> {
        let max = self.config.max_sse_connections;
        self.sse_connections
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |open| {
                (open < max).then_some(open + 1)
            })
            .ok()
            .map(|_| SseSlot {
                counter: self.sse_connections.clone(),
            })
    }

    pub fn open_sse_connections(&self) -> usize {
        self.sse_connections.load(Ordering::Acquire)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
