//! SentimentOrchestrator: fans a query out to every source concurrently and
//! turns whatever comes back in time into a composite report.

use super::retry::{with_retry, RetryPolicy};
use crate::analysis::{composite, normalize_at, resolve_weights, ComponentScore, SentimentReport, WeightMap};
use crate::config::Config;
use crate::signal::SignalSource;
use crate::utils::error::{Error, FetchError, Result, WeightError};
use crate::utils::types::{source_priority, AnalysisMode, AnalysisQuery, KNOWN_SOURCES};
use chrono::Utc;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, timeout_at, Instant};

pub struct SentimentOrchestrator {
    sources: Vec<Arc<dyn SignalSource>>,
    weights: WeightMap,
    weight_errors: Vec<WeightError>,
    quick_sources: Vec<String>,
    fetch_timeout: Duration,
    full_budget: Duration,
    quick_budget: Duration,
    retry: RetryPolicy,
}

impl SentimentOrchestrator {
    /// Orchestrator with the default timeouts and retry policy.
    pub fn new(sources: Vec<Arc<dyn SignalSource>>, weights: WeightMap) -> Self {
        Self {
            sources,
            weights,
            weight_errors: Vec::new(),
            quick_sources: vec![crate::utils::types::FEAR_GREED.to_string()],
            fetch_timeout: Duration::from_secs(10),
            full_budget: Duration::from_secs(15),
            quick_budget: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }

    /// Weights are the configured ones merged with `weight_override`
    /// (e.g. `news:0.5,fng:0.3`); rejected entries are kept for the report.
    pub fn from_config(
        config: &Config,
        sources: Vec<Arc<dyn SignalSource>>,
        weight_override: Option<&str>,
    ) -> Self {
        let (weights, weight_errors) =
            resolve_weights(&config.sentiment.weights, weight_override, &KNOWN_SOURCES);
        let s = &config.sentiment;
        Self {
            weight_errors,
            quick_sources: s.quick_sources.clone(),
            fetch_timeout: Duration::from_secs(s.fetch_timeout_secs),
            full_budget: Duration::from_secs(s.full_budget_secs),
            quick_budget: Duration::from_secs(s.quick_budget_secs),
            retry: RetryPolicy::from_config(config),
            ..Self::new(sources, weights)
        }
    }

    pub fn with_timeouts(mut self, fetch: Duration, full_budget: Duration, quick_budget: Duration) -> Self {
        self.fetch_timeout = fetch;
        self.full_budget = full_budget;
        self.quick_budget = quick_budget;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_quick_sources(mut self, ids: Vec<String>) -> Self {
        self.quick_sources = ids;
        self
    }

    pub fn weights(&self) -> &WeightMap {
        &self.weights
    }

    fn selected(&self, mode: AnalysisMode) -> Vec<Arc<dyn SignalSource>> {
        self.sources
            .iter()
            .filter(|s| match mode {
                | AnalysisMode::Full => true,
                | AnalysisMode::Quick => self.quick_sources.iter().any(|id| id == s.id()),
            })
            .cloned()
            .collect()
    }

    fn budget(&self, mode: AnalysisMode) -> Duration {
        match mode {
            | AnalysisMode::Full => self.full_budget,
            | AnalysisMode::Quick => self.quick_budget,
        }
    }

    /// Run one analysis. Source failures degrade the report; only an empty
    /// source selection is an error.
    pub async fn analyze(&self, query: &AnalysisQuery) -> Result<SentimentReport> {
        self.analyze_since(query, Instant::now()).await
    }

    /// Like [`analyze`](Self::analyze), with the end-to-end budget counted
    /// from `started` so setup work before the fetches (source selection)
    /// spends the same budget.
    pub async fn analyze_since(&self, query: &AnalysisQuery, started: Instant) -> Result<SentimentReport> {
        let sources = self.selected(query.mode);
        if sources.is_empty() {
            return Err(Error::NoSourcesConfigured);
        }

        let deadline = started + self.budget(query.mode);
        let fetch_timeout = self.fetch_timeout;
        let retry = self.retry;
        log::info!(
            "Analyzing {} sources ({} mode, period {}, coin {})",
            sources.len(),
            query.mode,
            query.period,
            query.coin_filter.as_deref().unwrap_or("all")
        );

        let fetches = sources.into_iter().map(|source| async move {
            let started = Instant::now();
            let src = &source;
            let attempt = with_retry(source.id(), &retry, move || async move {
                timeout(fetch_timeout, src.fetch(query)).await.unwrap_or(Err(FetchError::Timeout))
            });
            let result = timeout_at(deadline, attempt).await.unwrap_or(Err(FetchError::Timeout));

            let outcome = match &result {
                | Ok(_) => "ok",
                | Err(e) => e.kind(),
            };
            metrics::counter!("cryptopulse_fetch_total", "source" => source.id(), "outcome" => outcome)
                .increment(1);
            metrics::histogram!("cryptopulse_fetch_duration_seconds", "source" => source.id())
                .record(started.elapsed().as_secs_f64());
            (source, result)
        });
        let results = join_all(fetches).await;

        let now = Utc::now();
        let mut errors = BTreeMap::new();
        let mut components: Vec<ComponentScore> = results
            .into_iter()
            .map(|(source, result)| {
                let id = source.id();
                let weight = self.weights.get(id).unwrap_or_else(|| {
                    log::debug!("{} has no declared weight", id);
                    0.0
                });
                match result {
                    | Ok(raw) => {
                        let staleness = (now - raw.fetched_at).num_seconds().max(0) as u64;
                        let normalized = normalize_at(&raw, now);
                        log::debug!("{}: score {:.1}", id, normalized.score);
                        ComponentScore::from_normalized(id, normalized, weight).with_staleness(staleness)
                    }
                    | Err(err) => {
                        log::warn!("{} unavailable: {}", id, err);
                        errors.insert(id.to_string(), err.to_string());
                        ComponentScore::unavailable(id, weight, &err)
                    }
                }
            })
            .collect();
        components.sort_by(|a, b| source_priority(&a.source_id).cmp(&source_priority(&b.source_id)));

        if !self.weight_errors.is_empty() {
            let joined = self.weight_errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ");
            errors.insert("weights".to_string(), joined);
        }

        let result = composite(components, &self.weights);
        metrics::gauge!("cryptopulse_composite_score").set(result.score);
        if result.degraded {
            log::warn!("Degraded run, missing: {}", result.missing_sources.join(", "));
        }
        log::info!("Composite score {:.1} ({})", result.score, result.classification);

        Ok(SentimentReport::build(result, query, errors, now))
    }
}
