//! # Provider Cache
//! Memoizes expensive provider lookups keyed by [`CacheKey`].
//!
//! - First access computes and stores; later accesses return the stored value,
//!   stored failures included. There is no explicit invalidation.
//! - Concurrent calls for the same key are coalesced: one computation runs,
//!   the other callers await its value.
//! - Bounded by `max_entries`; an optional TTL can be configured.

use std::future::Future;
use std::time::Duration;

use metrics::counter;
use moka::future::Cache;

use crate::config::CacheSettings;
use crate::location::CacheKey;

pub struct ProviderCache<V> {
    inner: Cache<CacheKey, V>,
}

impl<V> ProviderCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(settings: &CacheSettings) -> Self {
        let mut builder = Cache::builder().max_capacity(settings.max_entries.max(1));
        if let Some(ttl) = settings.ttl_secs.filter(|s| *s > 0) {
            builder = builder.time_to_live(Duration::from_secs(ttl));
        }
        Self {
            inner: builder.build(),
        }
    }

    /// Return the stored value for `key`, running `compute` only on a miss.
    pub async fn get_or_compute<F>(&self, key: CacheKey, compute: F) -> V
    where
        F: Future<Output = V>,
    {
        let entry = self.inner.entry(key).or_insert_with(compute).await;
        let kind = key.kind().as_str();
        if entry.is_fresh() {
            tracing::debug!(%key, "provider cache miss");
            counter!("signal_cache_misses_total", "kind" => kind).increment(1);
        } else {
            tracing::debug!(%key, "provider cache hit");
            counter!("signal_cache_hits_total", "kind" => kind).increment(1);
        }
        entry.into_value()
    }
}
