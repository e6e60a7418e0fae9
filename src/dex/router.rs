//! RouteFinder: quotes every aggregator that serves the chain and ranks the
//! answers.

use super::{GasPricing, NormalizedQuote, QuoteSource, SwapParams};
use crate::analysis::{composite, direct_rank, inverted_rank, ComponentScore, WeightMap};
use crate::config::Config;
use crate::engine::{with_retry, RetryPolicy};
use crate::utils::error::{Error, FetchError};
use crate::Result;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, timeout_at, Instant};

pub const ROUTE_FACTORS: [&str; 4] = ["output", "gas", "reliability", "freshness"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteAnalysis {
    pub quote: NormalizedQuote,
    pub rank: usize,
    /// 0-100
    pub score: f64,
    pub reliability: f64,
    pub recommendation: String,
    pub savings_vs_worst: Decimal,
    pub savings_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteComparison {
    pub params: SwapParams,
    /// Best first
    pub routes: Vec<RouteAnalysis>,
    pub total_quotes: usize,
    /// Percent between best and worst output
    pub price_spread: f64,
    pub recommendation: String,
    pub trade_size_usd: Option<f64>,
    pub size_recommendation: Option<String>,
    pub degraded: bool,
    pub missing_sources: Vec<String>,
    pub errors: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl RouteComparison {
    pub fn best(&self) -> Option<&RouteAnalysis> {
        self.routes.first()
    }
}

pub struct RouteFinder {
    sources: Vec<Arc<dyn QuoteSource>>,
    pricing: GasPricing,
    weights: WeightMap,
    quote_timeout: Duration,
    budget: Duration,
    retry: RetryPolicy,
}

impl RouteFinder {
    pub fn new(sources: Vec<Arc<dyn QuoteSource>>, pricing: GasPricing) -> Self {
        Self {
            sources,
            pricing,
            weights: [("output", 0.6), ("gas", 0.2), ("reliability", 0.1), ("freshness", 0.1)].into_iter().collect(),
            quote_timeout: Duration::from_secs(10),
            budget: Duration::from_secs(15),
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(config: &Config, sources: Vec<Arc<dyn QuoteSource>>, pricing: GasPricing) -> Self {
        let (weights, errors) = WeightMap::sanitize(&config.dex.weights, &ROUTE_FACTORS);
        for err in &errors {
            log::warn!("dex.weights: {}", err);
        }
        Self {
            weights,
            quote_timeout: Duration::from_secs(config.dex.quote_timeout_secs),
            budget: Duration::from_secs(config.dex.budget_secs),
            retry: RetryPolicy::from_config(config),
            ..Self::new(sources, pricing)
        }
    }

    pub fn with_timeouts(mut self, quote_timeout: Duration, budget: Duration) -> Self {
        self.quote_timeout = quote_timeout;
        self.budget = budget;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn compare(&self, params: &SwapParams) -> Result<RouteComparison> {
        let sources: Vec<_> = self.sources.iter().filter(|s| s.supports_chain(params.chain_id)).cloned().collect();
        if sources.is_empty() {
            return Err(Error::DexError(format!("no aggregator serves chain {}", params.chain)));
        }
        log::info!(
            "Quoting {} {} -> {} on {} across {} aggregators",
            params.amount,
            params.from_token,
            params.to_token,
            params.chain,
            sources.len()
        );

        let deadline = Instant::now() + self.budget;
        let quote_timeout = self.quote_timeout;
        let retry = self.retry;
        let fetches = sources.into_iter().map(|source| async move {
            let src = &source;
            let attempt = with_retry(source.name(), &retry, move || async move {
                timeout(quote_timeout, src.quote(params)).await.unwrap_or(Err(FetchError::Timeout))
            });
            let result = timeout_at(deadline, attempt).await.unwrap_or(Err(FetchError::Timeout));
            let outcome = match &result {
                | Ok(_) => "ok",
                | Err(e) => e.kind(),
            };
            metrics::counter!("cryptopulse_quote_total", "source" => source.name(), "outcome" => outcome)
                .increment(1);
            (source, result)
        });
        let results = join_all(fetches).await;

        let now = Utc::now();
        let mut quotes = Vec::new();
        let mut errors = BTreeMap::new();
        for (source, result) in results {
            match result.and_then(|raw| NormalizedQuote::from_raw(raw, params, &self.pricing, now)) {
                | Ok(quote) => quotes.push((quote, source.reliability())),
                | Err(err) => {
                    log::warn!("{} quote unavailable: {}", source.name(), err);
                    errors.insert(source.name().to_string(), err.to_string());
                }
            }
        }
        if quotes.is_empty() {
            let detail = errors.iter().map(|(k, v)| format!("{k}: {v}")).collect::<Vec<_>>().join("; ");
            return Err(Error::DexError(format!("no quotes available ({detail})")));
        }

        let routes = rank_quotes(quotes, &self.weights, now);
        let price_spread = price_spread(&routes);
        let trade_size_usd = trade_size_usd(params, &routes, &self.pricing);
        Ok(RouteComparison {
            params: params.clone(),
            total_quotes: routes.len(),
            recommendation: overall_recommendation(price_spread),
            size_recommendation: trade_size_usd.map(size_recommendation),
            trade_size_usd,
            price_spread,
            routes,
            degraded: !errors.is_empty(),
            missing_sources: errors.keys().cloned().collect(),
            errors,
            timestamp: now,
        })
    }
}

/// Score each quote with the compositor over output, gas, reliability and
/// freshness, then sort best first. Ties keep input order.
pub fn rank_quotes(quotes: Vec<(NormalizedQuote, f64)>, weights: &WeightMap, now: DateTime<Utc>) -> Vec<RouteAnalysis> {
    if quotes.is_empty() {
        return Vec::new();
    }
    let rates: Vec<f64> = quotes.iter().map(|(q, _)| q.effective_rate_f64()).collect();
    let gas: Vec<f64> = quotes.iter().map(|(q, _)| q.gas_cost_usd).collect();
    let output_scores = direct_rank(&rates);
    let gas_scores = inverted_rank(&gas);

    let mut routes: Vec<RouteAnalysis> = quotes
        .into_iter()
        .enumerate()
        .map(|(i, (quote, reliability))| {
            let freshness = if quote.is_expired_at(now) { 0.0 } else { 100.0 };
            let components = vec![
                ComponentScore::new("output", output_scores[i], 0.6),
                ComponentScore::new("gas", gas_scores[i], 0.2),
                ComponentScore::new("reliability", reliability * 100.0, 0.1),
                ComponentScore::new("freshness", freshness, 0.1),
            ];
            let score = composite(components, weights).score;
            RouteAnalysis {
                quote,
                rank: 0,
                score,
                reliability,
                recommendation: String::new(),
                savings_vs_worst: Decimal::ZERO,
                savings_pct: 0.0,
            }
        })
        .collect();
    routes.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let worst = routes.iter().map(|r| r.quote.output_amount).min().unwrap_or(Decimal::ZERO);
    for (i, route) in routes.iter_mut().enumerate() {
        route.rank = i + 1;
        route.savings_vs_worst = route.quote.output_amount - worst;
        if worst > Decimal::ZERO {
            route.savings_pct = (route.savings_vs_worst / worst * Decimal::ONE_HUNDRED).to_f64().unwrap_or(0.0);
        }
        route.recommendation = route_recommendation(route.score, i == 0).to_string();
    }
    routes
}

pub fn route_recommendation(score: f64, is_best: bool) -> &'static str {
    match (is_best, score) {
        | (true, s) if s >= 90.0 => "BEST CHOICE - Optimal price and efficiency",
        | (true, s) if s >= 80.0 => "RECOMMENDED - Strong overall value",
        | (true, _) => "BEST AVAILABLE - Consider waiting for better rates",
        | (false, s) if s >= 85.0 => "Good alternative with competitive pricing",
        | (false, s) if s >= 70.0 => "Acceptable but not optimal",
        | (false, _) => "Not recommended - significantly worse than best",
    }
}

/// Percent by which the best-ranked output beats the worst output.
pub fn price_spread(routes: &[RouteAnalysis]) -> f64 {
    let Some(best) = routes.first() else { return 0.0 };
    let worst = routes.iter().map(|r| r.quote.output_amount).min().unwrap_or(Decimal::ZERO);
    if worst <= Decimal::ZERO {
        return 0.0;
    }
    ((best.quote.output_amount - worst) / worst * Decimal::ONE_HUNDRED).to_f64().unwrap_or(0.0)
}

pub fn overall_recommendation(spread: f64) -> String {
    if spread < 0.1 {
        "All sources offer similar rates. Choose based on preference.".to_string()
    } else if spread < 1.0 {
        format!("Best route saves {:.2}%. Worth optimizing.", spread)
    } else {
        format!("Significant spread ({:.2}%). Use best route.", spread)
    }
}

pub fn size_recommendation(trade_size_usd: f64) -> String {
    let text = if trade_size_usd < 1_000.0 {
        "Small trade: Use direct quote. Gas optimization savings may not exceed complexity cost."
    } else if trade_size_usd < 10_000.0 {
        "Medium trade: Compare routes and consider multi-hop if savings exceed 0.3%."
    } else if trade_size_usd < 100_000.0 {
        "Large trade: Analyze split orders across 2-3 venues. Multi-hop routes likely beneficial."
    } else {
        "Whale trade: Use split orders + MEV protection. Consider private transactions or OTC."
    };
    text.to_string()
}

/// Dollar size of the trade when one side is a dollar stable or ETH.
pub fn trade_size_usd(params: &SwapParams, routes: &[RouteAnalysis], pricing: &GasPricing) -> Option<f64> {
    let amount = params.amount.to_f64()?;
    if super::tokens::is_usd_stable(&params.from_token) {
        Some(amount)
    } else if matches!(params.from_token.as_str(), "ETH" | "WETH") {
        Some(amount * pricing.eth_price_usd)
    } else if super::tokens::is_usd_stable(&params.to_token) {
        routes.first().and_then(|r| r.quote.output_amount.to_f64())
    } else {
        None
    }
}
