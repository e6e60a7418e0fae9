//! Sentiment sources: Fear & Greed index, news keyword sentiment, market momentum.
//!
//! Every source implements [`SignalSource`] and hands back a [`RawData`]
//! snapshot or a [`FetchError`]. Sources never retry; that is the
//! orchestrator's job.

pub mod cached;
pub mod fear_greed;
pub mod http;
pub mod keywords;
pub mod momentum;
pub mod news;

use crate::cache::Cache;
use crate::config::Config;
use crate::utils::error::FetchError;
use crate::utils::types::{AnalysisQuery, FEAR_GREED, MOMENTUM, NEWS};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub use cached::CachedSource;
pub use fear_greed::FearGreedSource;
pub use momentum::MomentumSource;
pub use news::{select_news_source, AggregatorNewsSource, RssNewsSource};

/// Capability implemented by every sentiment source.
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// Stable identifier, used as the weight-map key.
    fn id(&self) -> &'static str;

    /// How long a successful response may be served from cache.
    fn cache_ttl(&self) -> Duration;

    async fn fetch(&self, query: &AnalysisQuery) -> Result<RawData, FetchError>;
}

/// One source's snapshot for one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawData {
    pub source_id: String,
    pub fetched_at: DateTime<Utc>,
    pub payload: Payload,
}

impl RawData {
    pub fn new(source_id: &str, payload: Payload) -> Self {
        Self { source_id: source_id.to_string(), fetched_at: Utc::now(), payload }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Index(IndexReading),
    Articles(ArticleSet),
    Momentum(MomentumReading),
}

/// A 0-100 index value such as the Fear & Greed index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexReading {
    pub value: f64,
    pub label: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub time_until_update: Option<u64>,
    /// Older values, most recent first. Empty unless more than one was requested.
    #[serde(default)]
    pub history: Vec<IndexPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexPoint {
    pub value: f64,
    pub label: String,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Positive,
    Negative,
    Neutral,
}

/// A scored news article. `score` is in [-1, 1].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    pub title: String,
    pub summary: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
    pub score: f64,
    pub tone: Tone,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ArticleSet {
    pub articles: Vec<Article>,
}

impl ArticleSet {
    pub fn count(&self, tone: Tone) -> usize {
        self.articles.iter().filter(|a| a.tone == tone).count()
    }

    /// Titles of the `n` strongest articles of a tone, strongest first.
    pub fn top_titles(&self, tone: Tone, n: usize) -> Vec<String> {
        let mut picked: Vec<&Article> = self.articles.iter().filter(|a| a.tone == tone).collect();
        picked.sort_by(|a, b| b.score.abs().total_cmp(&a.score.abs()));
        picked.into_iter().take(n).map(|a| a.title.clone()).collect()
    }
}

/// Price change and volume activity for one coin or the whole market.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MomentumReading {
    /// Upper-case coin symbol, or "MARKET" for the BTC/ETH blend
    pub scope: String,
    /// Price change over the query period, in percent
    pub price_change_pct: f64,
    /// 24h volume over market cap relative to a 3% baseline, capped at 2
    pub volume_ratio: f64,
    pub price: Option<f64>,
    pub market_cap: Option<f64>,
}

/// Build the named sentiment sources, each behind the shared cache when one
/// is given. The news implementation is chosen by probing the aggregator.
pub async fn build_sources(
    config: &Config,
    ids: &[String],
    cache: Option<Arc<dyn Cache>>,
) -> crate::Result<Vec<Arc<dyn SignalSource>>> {
    let mut sources: Vec<Arc<dyn SignalSource>> = Vec::new();
    for id in ids {
        let source: Arc<dyn SignalSource> = match id.as_str() {
            | FEAR_GREED => Arc::new(FearGreedSource::from_config(config)?),
            | NEWS => select_news_source(config).await?,
            | MOMENTUM => Arc::new(MomentumSource::from_config(config)?),
            | other => {
                log::warn!("Skipping unknown sentiment source '{}'", other);
                continue;
            }
        };
        let source = match &cache {
            | Some(cache) => Arc::new(CachedSource::new(
                source,
                cache.clone(),
                config.sentiment.serve_stale_on_error,
            )) as Arc<dyn SignalSource>,
            | None => source,
        };
        sources.push(source);
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str, score: f64, tone: Tone) -> Article {
        Article {
            title: title.to_string(),
            summary: String::new(),
            source: "test".to_string(),
            published_at: None,
            score,
            tone,
        }
    }

    #[test]
    fn test_article_set_counts_and_top() {
        let set = ArticleSet {
            articles: vec![
                article("a", 0.2, Tone::Positive),
                article("b", 0.9, Tone::Positive),
                article("c", -0.4, Tone::Negative),
                article("d", 0.0, Tone::Neutral),
            ],
        };
        assert_eq!(set.count(Tone::Positive), 2);
        assert_eq!(set.count(Tone::Neutral), 1);
        assert_eq!(set.top_titles(Tone::Positive, 3), vec!["b", "a"]);
        assert_eq!(set.top_titles(Tone::Negative, 3), vec!["c"]);
    }

    #[test]
    fn test_raw_data_serde_tagging() {
        let raw = RawData::new(
            FEAR_GREED,
            Payload::Index(IndexReading {
                value: 72.0,
                label: "Greed".into(),
                timestamp: None,
                time_until_update: None,
                history: vec![],
            }),
        );
        let json = serde_json::to_value(&raw).unwrap();
        assert_eq!(json["payload"]["kind"], "index");
        let back: RawData = serde_json::from_value(json).unwrap();
        assert_eq!(back, raw);
    }
}
