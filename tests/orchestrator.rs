//! Orchestrator runs over mocked and fake sources: timeouts, retries, cache
//! behavior and degraded reports.

use async_trait::async_trait;
use chrono::Utc;
use cryptopulse::analysis::WeightMap;
use cryptopulse::cache::{Cache, MemoryCache};
use cryptopulse::engine::{RetryPolicy, SentimentOrchestrator};
use cryptopulse::signal::{CachedSource, IndexReading, MomentumReading, Payload, RawData, SignalSource};
use cryptopulse::utils::error::FetchError;
use cryptopulse::{AnalysisQuery, Period};
use mockall::{mock, Sequence};
use std::sync::Arc;
use std::time::{Duration, Instant};

mock! {
    pub Source {}

    #[async_trait]
    impl SignalSource for Source {
        fn id(&self) -> &'static str;
        fn cache_ttl(&self) -> Duration;
        async fn fetch(&self, query: &AnalysisQuery) -> Result<RawData, FetchError>;
    }
}

fn index(value: f64) -> RawData {
    RawData::new(
        "fear_greed",
        Payload::Index(IndexReading {
            value,
            label: "Greed".into(),
            timestamp: None,
            time_until_update: None,
            history: vec![],
        }),
    )
}

fn momentum(change: f64, ratio: f64) -> RawData {
    RawData::new(
        "momentum",
        Payload::Momentum(MomentumReading {
            scope: "MARKET".into(),
            price_change_pct: change,
            volume_ratio: ratio,
            price: None,
            market_cap: None,
        }),
    )
}

fn mock_source(id: &'static str) -> MockSource {
    let mut source = MockSource::new();
    source.expect_id().return_const(id);
    source.expect_cache_ttl().return_const(Duration::from_secs(60));
    source
}

fn weights() -> WeightMap {
    [("fear_greed", 0.4), ("news", 0.4), ("momentum", 0.2)].into_iter().collect()
}

fn orchestrator(sources: Vec<Arc<dyn SignalSource>>) -> SentimentOrchestrator {
    SentimentOrchestrator::new(sources, weights())
        .with_timeouts(Duration::from_secs(2), Duration::from_secs(4), Duration::from_secs(2))
        .with_retry(RetryPolicy::new(1, Duration::from_millis(10)))
}

/// Sleeps before answering.
struct Slow {
    id: &'static str,
    delay: Duration,
}

#[async_trait]
impl SignalSource for Slow {
    fn id(&self) -> &'static str {
        self.id
    }

    fn cache_ttl(&self) -> Duration {
        Duration::from_secs(60)
    }

    async fn fetch(&self, _query: &AnalysisQuery) -> Result<RawData, FetchError> {
        tokio::time::sleep(self.delay).await;
        Ok(index(90.0))
    }
}

#[tokio::test]
async fn test_degraded_report_renormalizes() {
    let mut fng = mock_source("fear_greed");
    fng.expect_fetch().times(1).returning(|_| Ok(index(72.0)));
    let mut news = mock_source("news");
    news.expect_fetch().times(1).returning(|_| Err(FetchError::Timeout));
    let mut mom = mock_source("momentum");
    mom.expect_fetch().times(1).returning(|_| Ok(momentum(10.0, 1.0)));

    let sources: Vec<Arc<dyn SignalSource>> = vec![Arc::new(news), Arc::new(mom), Arc::new(fng)];
    let report = orchestrator(sources).analyze(&AnalysisQuery::new(None, Period::Day)).await.unwrap();

    // 72 * 2/3 + 65 * 1/3
    assert_eq!(report.composite_score, 69.7);
    assert_eq!(report.classification, "Greed");
    assert!(report.degraded);
    assert_eq!(report.missing_sources, vec!["news".to_string()]);
    assert_eq!(report.meta.errors.get("news").map(String::as_str), Some("request timed out"));

    let ids: Vec<&str> = report.components.iter().map(|c| c.component.source_id.as_str()).collect();
    assert_eq!(ids, vec!["fear_greed", "news", "momentum"]);
    let news = report.component("news").unwrap();
    assert!(!news.component.available);
    assert_eq!(news.effective_weight, 0.0);
    let total: f64 = report.components.iter().map(|c| c.effective_weight).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_per_fetch_timeout() {
    let mut fng = mock_source("fear_greed");
    fng.expect_fetch().returning(|_| Ok(index(40.0)));
    let sources: Vec<Arc<dyn SignalSource>> =
        vec![Arc::new(fng), Arc::new(Slow { id: "news", delay: Duration::from_secs(5) })];
    let orch = orchestrator(sources).with_timeouts(
        Duration::from_millis(100),
        Duration::from_secs(4),
        Duration::from_secs(2),
    );

    let started = Instant::now();
    let report = orch.analyze(&AnalysisQuery::default()).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(report.composite_score, 40.0);
    assert_eq!(report.missing_sources, vec!["news".to_string()]);
}

#[tokio::test]
async fn test_run_budget_bounds_everything() {
    let sources: Vec<Arc<dyn SignalSource>> = vec![
        Arc::new(Slow { id: "fear_greed", delay: Duration::from_secs(5) }),
        Arc::new(Slow { id: "momentum", delay: Duration::from_secs(5) }),
    ];
    let orch = orchestrator(sources).with_timeouts(
        Duration::from_secs(10),
        Duration::from_millis(200),
        Duration::from_millis(100),
    );

    let started = Instant::now();
    let report = orch.analyze(&AnalysisQuery::default()).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(report.composite_score, 50.0);
    assert_eq!(report.classification, "Neutral");
    assert_eq!(report.missing_sources.len(), 2);
}

#[tokio::test]
async fn test_budget_counts_from_start_of_setup() {
    let sources: Vec<Arc<dyn SignalSource>> =
        vec![Arc::new(Slow { id: "fear_greed", delay: Duration::from_secs(5) })];
    let orch = orchestrator(sources).with_timeouts(
        Duration::from_secs(10),
        Duration::from_millis(300),
        Duration::from_millis(300),
    );

    // Setup has already spent most of the budget
    let started = tokio::time::Instant::now();
    tokio::time::sleep(Duration::from_millis(250)).await;

    let called = Instant::now();
    let report = orch.analyze_since(&AnalysisQuery::default(), started).await.unwrap();
    assert!(called.elapsed() < Duration::from_millis(200), "{:?}", called.elapsed());
    assert_eq!(report.missing_sources, vec!["fear_greed".to_string()]);
    assert_eq!(report.composite_score, 50.0);
}

#[tokio::test]
async fn test_rate_limit_retried_once() {
    let mut seq = Sequence::new();
    let mut fng = mock_source("fear_greed");
    fng.expect_fetch().times(1).in_sequence(&mut seq).returning(|_| Err(FetchError::RateLimited));
    fng.expect_fetch().times(1).in_sequence(&mut seq).returning(|_| Ok(index(81.0)));

    let report = orchestrator(vec![Arc::new(fng)]).analyze(&AnalysisQuery::default()).await.unwrap();
    assert!(!report.degraded);
    assert_eq!(report.composite_score, 81.0);
    assert_eq!(report.classification, "Extreme Greed");
}

#[tokio::test]
async fn test_second_rate_limit_gives_up() {
    let mut fng = mock_source("fear_greed");
    fng.expect_fetch().times(2).returning(|_| Err(FetchError::RateLimited));
    let mut mom = mock_source("momentum");
    mom.expect_fetch().returning(|_| Ok(momentum(-20.0, 0.0)));

    let report = orchestrator(vec![Arc::new(fng), Arc::new(mom)])
        .analyze(&AnalysisQuery::default())
        .await
        .unwrap();
    assert_eq!(report.missing_sources, vec!["fear_greed".to_string()]);
    assert_eq!(report.meta.errors.get("fear_greed").map(String::as_str), Some("rate limited by upstream"));
    // 0.6 * 0 + 0.4 * 30
    assert_eq!(report.composite_score, 12.0);
    assert_eq!(report.classification, "Extreme Fear");
}

#[tokio::test]
async fn test_other_errors_not_retried() {
    let mut fng = mock_source("fear_greed");
    fng.expect_fetch().times(1).returning(|_| Err(FetchError::NotFound));

    let report = orchestrator(vec![Arc::new(fng)]).analyze(&AnalysisQuery::default()).await.unwrap();
    assert!(report.degraded);
    assert_eq!(report.composite_score, 50.0);
}

#[tokio::test]
async fn test_cache_hit_skips_network() {
    let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());
    let mut fng = mock_source("fear_greed");
    fng.expect_fetch().times(1).returning(|_| Ok(index(30.0)));
    let cached: Arc<dyn SignalSource> = Arc::new(CachedSource::new(Arc::new(fng), cache, false));

    let orch = orchestrator(vec![cached]);
    let query = AnalysisQuery::new(Some("btc"), Period::Day);
    let first = orch.analyze(&query).await.unwrap();
    let second = orch.analyze(&query).await.unwrap();
    assert_eq!(first.composite_score, 30.0);
    assert_eq!(second.composite_score, 30.0);
    assert_eq!(second.classification, "Fear");
}

#[tokio::test]
async fn test_expired_entry_refetched() {
    let cache = Arc::new(MemoryCache::new());
    let mut fng = mock_source("fear_greed");
    fng.expect_fetch().times(1).returning(|_| Ok(index(64.0)));
    let source = CachedSource::new(Arc::new(fng), cache.clone(), false);

    let query = AnalysisQuery::default();
    cache.put_at(&source.key(&query), &index(10.0), Utc::now() - chrono::Duration::minutes(10));

    let report = orchestrator(vec![Arc::new(source)]).analyze(&query).await.unwrap();
    assert_eq!(report.composite_score, 64.0);
}

#[tokio::test]
async fn test_stale_entry_served_on_failure() {
    let cache = Arc::new(MemoryCache::new());
    let mut fng = mock_source("fear_greed");
    fng.expect_fetch().times(1).returning(|_| Err(FetchError::NetworkUnavailable("offline".into())));
    let source = CachedSource::new(Arc::new(fng), cache.clone(), true);

    let query = AnalysisQuery::default();
    let mut old = index(22.0);
    old.fetched_at = Utc::now() - chrono::Duration::minutes(10);
    cache.put_at(&source.key(&query), &old, old.fetched_at);

    let report = orchestrator(vec![Arc::new(source)]).analyze(&query).await.unwrap();
    assert!(!report.degraded);
    assert_eq!(report.composite_score, 22.0);
    let staleness = report.component("fear_greed").unwrap().component.staleness_secs.unwrap();
    assert!(staleness >= 600, "staleness {staleness}");
}

#[tokio::test]
async fn test_weight_override_errors_reported() {
    let mut fng = mock_source("fear_greed");
    fng.expect_fetch().returning(|_| Ok(index(50.0)));
    let config = cryptopulse::config::Config::default();
    let orch = SentimentOrchestrator::from_config(&config, vec![Arc::new(fng)], Some("fng:0.5,bogus:1"));

    let report = orch.analyze(&AnalysisQuery::default()).await.unwrap();
    assert!(report.meta.errors.get("weights").unwrap().contains("bogus"));
    assert_eq!(orch.weights().get("fear_greed"), Some(0.5));
}
