//! Keyed, TTL-bounded response cache shared by the sources.
//!
//! Entries are whole [`RawData`] snapshots keyed by a SHA-256 of the source
//! id and query parameters. Replacing an entry is a single map/tree insert,
//! so readers see either the old or the new snapshot.

mod sled_store;

use crate::signal::RawData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

pub use sled_store::SledCache;

/// A cached snapshot and how long ago it was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    pub data: RawData,
    pub age: Duration,
}

/// Cache capability injected into sources. Store failures are logged by the
/// implementation and surface as misses; they never fail a run.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Option<CacheHit>;
    fn put(&self, key: &str, value: &RawData);
}

/// Stored form of an entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Entry {
    pub stored_at: DateTime<Utc>,
    pub data: RawData,
}

impl Entry {
    pub(crate) fn into_hit(self, now: DateTime<Utc>) -> CacheHit {
        // Clock skew can make an entry look stored in the future
        let age = (now - self.stored_at).to_std().unwrap_or(Duration::ZERO);
        CacheHit { data: self.data, age }
    }
}

/// Process-local cache, used by tests and when the disk cache is disabled.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert with an explicit store time.
    pub fn put_at(&self, key: &str, value: &RawData, stored_at: DateTime<Utc>) {
        match self.entries.write() {
            | Ok(mut map) => {
                map.insert(key.to_string(), Entry { stored_at, data: value.clone() });
            }
            | Err(e) => log::warn!("memory cache lock poisoned: {}", e),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<CacheHit> {
        let map = self.entries.read().ok()?;
        map.get(key).cloned().map(|e| e.into_hit(Utc::now()))
    }

    fn put(&self, key: &str, value: &RawData) {
        self.put_at(key, value, Utc::now());
    }
}

/// Utility to build a cache key from arbitrary strings (source, coin, period, etc.)
pub fn build_key(parts: &[&str]) -> String {
    use sha2::{Digest, Sha256};
    let concat = parts.join("|");
    let mut hasher = Sha256::new();
    hasher.update(concat.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{MomentumReading, Payload};

    fn sample() -> RawData {
        RawData::new(
            "momentum",
            Payload::Momentum(MomentumReading {
                scope: "MARKET".into(),
                price_change_pct: 1.5,
                volume_ratio: 1.0,
                price: None,
                market_cap: None,
            }),
        )
    }

    #[test]
    fn test_build_key_is_stable_and_distinct() {
        let a = build_key(&["news", "BTC", "24h"]);
        assert_eq!(a, build_key(&["news", "BTC", "24h"]));
        assert_ne!(a, build_key(&["news", "ETH", "24h"]));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_memory_cache_get_put() {
        let cache = MemoryCache::new();
        assert!(cache.get("k").is_none());
        let data = sample();
        cache.put("k", &data);
        let hit = cache.get("k").unwrap();
        assert_eq!(hit.data, data);
        assert!(hit.age < Duration::from_secs(5));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_memory_cache_age() {
        let cache = MemoryCache::new();
        cache.put_at("k", &sample(), Utc::now() - chrono::Duration::seconds(400));
        let hit = cache.get("k").unwrap();
        assert!(hit.age >= Duration::from_secs(400));
    }

    #[test]
    fn test_future_entry_has_zero_age() {
        let cache = MemoryCache::new();
        cache.put_at("k", &sample(), Utc::now() + chrono::Duration::seconds(60));
        assert_eq!(cache.get("k").unwrap().age, Duration::ZERO);
    }
}
