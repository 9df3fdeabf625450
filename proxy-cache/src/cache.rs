//! A bounded in-memory response cache with selectable eviction policy and
//! per-entry hit-count expiry.

use hashbrown::HashMap;
use tracing::{debug, info, warn};

use crate::policy::EvictionPolicy;

/// A cached response: the exact header bytes and body bytes the origin sent
/// (captured before the proxy stamps its own `X-Cached-By-Proxy` header),
/// plus the number of reads remaining before expiry.
#[derive(Debug, Clone)]
struct CacheEntry {
    headers: Vec<u8>,
    body: Vec<u8>,
    remaining_hits: i64,
}

/// Bounded key→entry store. `key` is the client's request-line, used
/// verbatim. Every operation here is non-suspending, so a caller sharing
/// this behind `Arc<tokio::sync::Mutex<_>>` holds the lock for O(1)
/// amortized time per operation.
pub struct ResponseCache {
    entries: HashMap<String, CacheEntry>,
    /// Recency order: index 0 is least-recently-used, the last index is
    /// most-recently-used. Kept as a parallel `Vec` (rather than pulling in
    /// an ordered-map crate) since `size_limit` is expected to stay small.
    order: Vec<String>,
    size_limit: usize,
    policy: EvictionPolicy,
    hit_ttl: i64,
}

impl ResponseCache {
    pub fn new(size_limit: usize, policy: EvictionPolicy, hit_ttl: i64) -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
            size_limit,
            policy,
            hit_ttl,
        }
    }

    /// `true` iff `key` is present and unexpired. An entry found with zero
    /// remaining hits is evicted as a side effect and counted as a miss.
    pub fn has(&mut self, key: &str) -> bool {
        let Some(entry) = self.entries.get(key) else {
            debug!(key, "cache miss (no entry)");
            return false;
        };

        if entry.remaining_hits == 0 {
            info!(key, "cache entry expired, removing");
            self.remove(key);
            return false;
        }

        debug!(key, remaining_hits = entry.remaining_hits, "cache hit");
        true
    }

    /// Returns the cached `(headers, body)` bytes for `key`, decrementing its
    /// remaining hit count and marking it most-recently-used. Callers must
    /// have just observed `has(key) == true`.
    pub fn get(&mut self, key: &str) -> Option<(Vec<u8>, Vec<u8>)> {
        let entry = self.entries.get_mut(key)?;

        if entry.remaining_hits > 0 {
            entry.remaining_hits -= 1;
        }
        let response = (entry.headers.clone(), entry.body.clone());

        self.order.retain(|existing| existing != key);
        self.order.push(key.to_string());

        Some(response)
    }

    /// Caches `(headers, body)` under `key` with a fresh hit count. No-op
    /// when `size_limit == 0` (caching disabled). Evicts once first if the
    /// store is already at capacity.
    pub fn put(&mut self, key: String, headers: Vec<u8>, body: Vec<u8>) {
        if self.size_limit == 0 {
            debug!("cache size limit is 0, response will not be cached");
            return;
        }

        if self.entries.len() >= self.size_limit && !self.entries.contains_key(&key) {
            info!("cache size limit reached, applying eviction policy");
            self.evict();
        }

        info!(key = key.as_str(), hit_ttl = self.hit_ttl, "caching response");
        self.order.retain(|existing| existing != &key);
        self.order.push(key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                headers,
                body,
                remaining_hits: self.hit_ttl,
            },
        );
    }

    /// Drops `key` unconditionally.
    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.order.retain(|existing| existing != key);
    }

    /// Applies the configured eviction policy once.
    pub fn evict(&mut self) {
        match self.policy {
            EvictionPolicy::Entire => {
                debug!("eviction policy: entire, clearing entire cache");
                self.entries.clear();
                self.order.clear();
            }
            EvictionPolicy::Lru => {
                if let Some(oldest) = self.order.first().cloned() {
                    self.entries.remove(&oldest);
                    self.order.remove(0);
                    debug!(key = oldest.as_str(), "eviction policy: lru, removed");
                }
            }
            EvictionPolicy::None => {
                warn!("eviction policy is 'none', skipping cache update");
            }
        }
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }
}
