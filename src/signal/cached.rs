//! TTL cache in front of a source.

use super::{RawData, SignalSource};
use crate::cache::{build_key, Cache};
use crate::utils::error::FetchError;
use crate::utils::types::AnalysisQuery;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Serves fresh cache entries without touching the network and stores every
/// successful fetch. With `serve_stale` a failed fetch falls back to an
/// expired entry; the entry's `fetched_at` tells the reporter how old it is.
pub struct CachedSource {
    inner: Arc<dyn SignalSource>,
    cache: Arc<dyn Cache>,
    serve_stale: bool,
}

impl CachedSource {
    pub fn new(inner: Arc<dyn SignalSource>, cache: Arc<dyn Cache>, serve_stale: bool) -> Self {
        Self { inner, cache, serve_stale }
    }

    pub fn key(&self, query: &AnalysisQuery) -> String {
        let [coin, period] = query.cache_parts();
        build_key(&[self.inner.id(), &coin, &period])
    }
}

#[async_trait]
impl SignalSource for CachedSource {
    fn id(&self) -> &'static str {
        self.inner.id()
    }

    fn cache_ttl(&self) -> Duration {
        self.inner.cache_ttl()
    }

    async fn fetch(&self, query: &AnalysisQuery) -> Result<RawData, FetchError> {
        let key = self.key(query);
        let cached = self.cache.get(&key);

        if let Some(hit) = &cached {
            if hit.age < self.inner.cache_ttl() {
                log::debug!("{}: cache hit ({}s old)", self.id(), hit.age.as_secs());
                metrics::counter!("cryptopulse_cache_hits_total", "source" => self.id()).increment(1);
                return Ok(hit.data.clone());
            }
        }

        match self.inner.fetch(query).await {
            | Ok(data) => {
                self.cache.put(&key, &data);
                Ok(data)
            }
            | Err(err) => match cached {
                | Some(hit) if self.serve_stale => {
                    log::warn!(
                        "{}: fetch failed ({}), serving cached data {}s old",
                        self.id(),
                        err,
                        hit.age.as_secs()
                    );
                    Ok(hit.data)
                }
                | _ => Err(err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::signal::{IndexReading, Payload};
    use crate::utils::types::Period;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl SignalSource for Counting {
        fn id(&self) -> &'static str {
            "fear_greed"
        }
        fn cache_ttl(&self) -> Duration {
            Duration::from_secs(300)
        }
        async fn fetch(&self, _q: &AnalysisQuery) -> Result<RawData, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::Timeout);
            }
            Ok(reading(50.0 + n as f64))
        }
    }

    fn reading(value: f64) -> RawData {
        RawData::new(
            "fear_greed",
            Payload::Index(IndexReading {
                value,
                label: String::new(),
                timestamp: None,
                time_until_update: None,
                history: vec![],
            }),
        )
    }

    fn value(raw: &RawData) -> f64 {
        match &raw.payload {
            | Payload::Index(r) => r.value,
            | other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_hit_within_ttl_skips_fetch() {
        let inner = Arc::new(Counting { calls: AtomicUsize::new(0), fail: false });
        let cache = Arc::new(MemoryCache::new());
        let src = CachedSource::new(inner.clone(), cache, false);
        let q = AnalysisQuery::new(None, Period::Day);

        let first = src.fetch(&q).await.unwrap();
        let second = src.fetch(&q).await.unwrap();
        assert_eq!(value(&first), value(&second));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        // Different query, different key
        src.fetch(&AnalysisQuery::new(Some("BTC"), Period::Day)).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_refetches() {
        let inner = Arc::new(Counting { calls: AtomicUsize::new(0), fail: false });
        let cache = Arc::new(MemoryCache::new());
        let src = CachedSource::new(inner.clone(), cache.clone(), false);
        let q = AnalysisQuery::new(None, Period::Day);

        cache.put_at(&src.key(&q), &reading(10.0), Utc::now() - chrono::Duration::seconds(301));
        let got = src.fetch(&q).await.unwrap();
        assert_eq!(value(&got), 50.0);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_served_only_when_enabled() {
        let q = AnalysisQuery::new(None, Period::Day);
        for serve_stale in [false, true] {
            let inner = Arc::new(Counting { calls: AtomicUsize::new(0), fail: true });
            let cache = Arc::new(MemoryCache::new());
            let src = CachedSource::new(inner, cache.clone(), serve_stale);
            cache.put_at(&src.key(&q), &reading(10.0), Utc::now() - chrono::Duration::hours(2));

            let got = src.fetch(&q).await;
            if serve_stale {
                assert_eq!(value(&got.unwrap()), 10.0);
            } else {
                assert_eq!(got, Err(FetchError::Timeout));
            }
        }
    }
}
