//! News sentiment: RSS feeds or a news aggregator API, keyword scored.
//!
//! Both implementations answer as source `news`; [`select_news_source`]
//! picks the aggregator when it is enabled and answers a probe, the direct
//! RSS feeds otherwise.

use super::keywords::{mentions_coin, score_text, tone};
use super::{http, Article, ArticleSet, Payload, RawData, SignalSource};
use crate::config::Config;
use crate::utils::error::FetchError;
use crate::utils::types::{AnalysisQuery, NEWS};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const SUMMARY_MAX_CHARS: usize = 500;
const DEDUP_PREFIX_CHARS: usize = 50;

/// An article before filtering and scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct RawArticle {
    pub title: String,
    pub summary: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
}

static ITEM_RE: Lazy<Regex> = Lazy::new(|| pattern(r"(?s)<item\b[^>]*>(.*?)</item>"));
static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?s)<title\b[^>]*>\s*(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?\s*</title>"));
static DESC_RE: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?s)<description\b[^>]*>\s*(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?\s*</description>")
});
static PUBDATE_RE: Lazy<Regex> = Lazy::new(|| pattern(r"(?s)<pubDate>\s*(.*?)\s*</pubDate>"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| pattern(r"<[^>]+>"));
static SPACE_RE: Lazy<Regex> = Lazy::new(|| pattern(r"\s+"));

fn pattern(re: &str) -> Regex {
    Regex::new(re).unwrap_or_else(|e| unreachable!("invalid built-in pattern: {e}"))
}

/// Strip tags, decode the common entities and collapse whitespace.
pub fn clean_text(html: &str) -> String {
    let stripped = TAG_RE.replace_all(html, " ");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#8217;", "'")
        .replace("&amp;", "&");
    SPACE_RE.replace_all(&decoded, " ").trim().to_string()
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        | Some((idx, _)) => s[..idx].to_string(),
        | None => s.to_string(),
    }
}

/// Parse up to `max_items` `<item>` entries of an RSS document.
pub fn parse_rss(xml: &str, source: &str, max_items: usize) -> Vec<RawArticle> {
    ITEM_RE
        .captures_iter(xml)
        .filter_map(|item| {
            let body = item.get(1)?.as_str();
            let title = clean_text(TITLE_RE.captures(body)?.get(1)?.as_str());
            if title.is_empty() {
                return None;
            }
            let summary = DESC_RE
                .captures(body)
                .and_then(|c| c.get(1))
                .map(|m| truncate_chars(&clean_text(m.as_str()), SUMMARY_MAX_CHARS))
                .unwrap_or_default();
            let published_at = PUBDATE_RE
                .captures(body)
                .and_then(|c| c.get(1))
                .and_then(|m| DateTime::parse_from_rfc2822(m.as_str()).ok())
                .map(|dt| dt.with_timezone(&Utc));
            Some(RawArticle { title, summary, source: source.to_string(), published_at })
        })
        .take(max_items)
        .collect()
}

/// Period cutoff, de-duplication, coin filter and keyword scoring.
///
/// Articles without a publication time are kept. When the coin filter matches
/// nothing the unfiltered set is used.
pub fn score_articles(raw: Vec<RawArticle>, query: &AnalysisQuery, now: DateTime<Utc>) -> ArticleSet {
    let window = chrono::Duration::from_std(query.period.duration()).unwrap_or_else(|_| chrono::Duration::days(7));
    let cutoff = now - window;

    let mut seen = HashSet::new();
    let recent: Vec<RawArticle> = raw
        .into_iter()
        .filter(|a| a.published_at.map_or(true, |t| t >= cutoff))
        .filter(|a| seen.insert(a.title.to_lowercase().chars().take(DEDUP_PREFIX_CHARS).collect::<String>()))
        .collect();

    let selected = match query.coin_filter.as_deref() {
        | Some(coin) => {
            let matching: Vec<RawArticle> = recent
                .iter()
                .filter(|a| mentions_coin(&format!("{} {}", a.title, a.summary), coin))
                .cloned()
                .collect();
            if matching.is_empty() {
                log::debug!("no articles mention {}, using all {} articles", coin, recent.len());
                recent
            } else {
                matching
            }
        }
        | None => recent,
    };

    let articles = selected
        .into_iter()
        .map(|a| {
            let score = score_text(&format!("{} {}", a.title, a.summary));
            Article {
                title: a.title,
                summary: a.summary,
                source: a.source,
                published_at: a.published_at,
                score,
                tone: tone(score),
            }
        })
        .collect();
    ArticleSet { articles }
}

fn feed_name(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| url.to_string())
}

/// Direct RSS feeds.
pub struct RssNewsSource {
    client: Client,
    feeds: Vec<String>,
    max_items_per_feed: usize,
    ttl: Duration,
}

impl RssNewsSource {
    pub fn new(feeds: Vec<String>, timeout: Duration) -> crate::Result<Self> {
        Ok(Self {
            client: http::client(timeout)?,
            feeds,
            max_items_per_feed: 30,
            ttl: Duration::from_secs(120),
        })
    }

    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let cfg = &config.sources.news;
        let mut source = Self::new(cfg.feeds.clone(), config.fetch_timeout())?;
        source.max_items_per_feed = cfg.max_items_per_feed;
        source.ttl = Duration::from_secs(cfg.ttl_secs);
        Ok(source)
    }

    async fn fetch_feed(&self, url: &str) -> Result<Vec<RawArticle>, FetchError> {
        let xml = http::get_text(self.client.get(url)).await?;
        let items = parse_rss(&xml, &feed_name(url), self.max_items_per_feed);
        log::debug!("{} articles from {}", items.len(), url);
        Ok(items)
    }
}

#[async_trait]
impl SignalSource for RssNewsSource {
    fn id(&self) -> &'static str {
        NEWS
    }

    fn cache_ttl(&self) -> Duration {
        self.ttl
    }

    async fn fetch(&self, query: &AnalysisQuery) -> Result<RawData, FetchError> {
        let results = join_all(self.feeds.iter().map(|url| self.fetch_feed(url))).await;

        let mut raw = Vec::new();
        let mut last_err = None;
        let mut any_ok = self.feeds.is_empty();
        for (url, result) in self.feeds.iter().zip(results) {
            match result {
                | Ok(items) => {
                    any_ok = true;
                    raw.extend(items);
                }
                | Err(e) => {
                    log::warn!("RSS feed {} failed: {}", url, e);
                    last_err = Some(e);
                }
            }
        }
        if !any_ok {
            if let Some(err) = last_err {
                return Err(err);
            }
        }

        let set = score_articles(raw, query, Utc::now());
        Ok(RawData::new(NEWS, Payload::Articles(set)))
    }
}

#[derive(Debug, Deserialize)]
struct AggregatorResponse {
    #[serde(rename = "Response", default)]
    response: Option<String>,
    #[serde(rename = "Message", default)]
    message: Option<String>,
    #[serde(rename = "Data", default)]
    data: Option<Vec<AggregatorArticle>>,
}

#[derive(Debug, Deserialize)]
struct AggregatorArticle {
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    published_on: Option<i64>,
    #[serde(default)]
    source: Option<String>,
}

/// CryptoCompare-style news API.
pub struct AggregatorNewsSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    ttl: Duration,
}

impl AggregatorNewsSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> crate::Result<Self> {
        Ok(Self {
            client: http::client(timeout)?,
            base_url: base_url.into(),
            api_key: None,
            ttl: Duration::from_secs(120),
        })
    }

    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let cfg = &config.sources.news;
        let mut source = Self::new(cfg.aggregator.base_url.clone(), config.fetch_timeout())?;
        source.api_key = cfg.aggregator.api_key.clone();
        source.ttl = Duration::from_secs(cfg.ttl_secs);
        Ok(source)
    }

    fn request(&self) -> Result<reqwest::RequestBuilder, FetchError> {
        let url = http::join_url(&self.base_url, "data/v2/news/")?;
        let mut req = self.client.get(url).query(&[("lang", "EN")]);
        if let Some(key) = &self.api_key {
            req = req.header("authorization", format!("Apikey {key}"));
        }
        Ok(req)
    }

    /// Reachability check with a short timeout.
    pub async fn probe(&self, timeout: Duration) -> bool {
        let Ok(req) = self.request() else {
            return false;
        };
        match req.timeout(timeout).send().await {
            | Ok(resp) => resp.status().is_success(),
            | Err(e) => {
                log::debug!("news aggregator probe failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl SignalSource for AggregatorNewsSource {
    fn id(&self) -> &'static str {
        NEWS
    }

    fn cache_ttl(&self) -> Duration {
        self.ttl
    }

    async fn fetch(&self, query: &AnalysisQuery) -> Result<RawData, FetchError> {
        let body: AggregatorResponse = http::get_json(self.request()?).await?;
        if body.response.as_deref() == Some("Error") {
            return Err(FetchError::MalformedResponse(
                body.message.unwrap_or_else(|| "news aggregator error".to_string()),
            ));
        }
        let data = body
            .data
            .ok_or_else(|| FetchError::MalformedResponse("missing Data array".into()))?;

        let raw = data
            .into_iter()
            .map(|a| RawArticle {
                title: clean_text(&a.title),
                summary: truncate_chars(&clean_text(&a.body), SUMMARY_MAX_CHARS),
                source: a.source.unwrap_or_else(|| "aggregator".to_string()),
                published_at: a.published_on.and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
            })
            .collect();

        let set = score_articles(raw, query, Utc::now());
        Ok(RawData::new(NEWS, Payload::Articles(set)))
    }
}

/// Pick the news implementation: the aggregator when enabled and reachable,
/// the RSS feeds otherwise.
pub async fn select_news_source(config: &Config) -> crate::Result<Arc<dyn SignalSource>> {
    let agg_cfg = &config.sources.news.aggregator;
    if agg_cfg.enabled {
        let aggregator = AggregatorNewsSource::from_config(config)?;
        if aggregator.probe(Duration::from_millis(agg_cfg.probe_timeout_ms)).await {
            log::info!("Using news aggregator at {}", agg_cfg.base_url);
            return Ok(Arc::new(aggregator));
        }
        log::info!("News aggregator unreachable, falling back to RSS feeds");
    }
    Ok(Arc::new(RssNewsSource::from_config(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::types::Period;
    use crate::signal::Tone;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss><channel><title>Feed</title>
<item>
  <title><![CDATA[Bitcoin surges after ETF approval]]></title>
  <description><![CDATA[<p>Analysts are <b>bullish</b> &amp; optimistic.</p>]]></description>
  <pubDate>Mon, 06 Nov 2023 10:00:00 +0000</pubDate>
</item>
<item>
  <title>Exchange hack sparks crash</title>
  <description>Funds drained.</description>
  <pubDate>Mon, 06 Nov 2023 09:00:00 +0000</pubDate>
</item>
<item>
  <title>Solana upgrade goes live</title>
</item>
</channel></rss>"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 11, 6, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_rss() {
        let items = parse_rss(FEED, "feed", 30);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].title, "Bitcoin surges after ETF approval");
        assert_eq!(items[0].summary, "Analysts are bullish & optimistic.");
        assert_eq!(items[0].published_at, Some(Utc.with_ymd_and_hms(2023, 11, 6, 10, 0, 0).unwrap()));
        assert_eq!(items[2].summary, "");
        assert_eq!(items[2].published_at, None);

        assert_eq!(parse_rss(FEED, "feed", 1).len(), 1);
    }

    #[test]
    fn test_truncate_summary() {
        let long = "x".repeat(800);
        assert_eq!(truncate_chars(&long, SUMMARY_MAX_CHARS).len(), 500);
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn test_score_articles_cutoff_and_dedupe() {
        let mut raw = parse_rss(FEED, "feed", 30);
        raw.push(RawArticle {
            title: "BITCOIN SURGES AFTER ETF APPROVAL".into(),
            summary: String::new(),
            source: "other".into(),
            published_at: None,
        });
        raw.push(RawArticle {
            title: "Old news".into(),
            summary: String::new(),
            source: "other".into(),
            published_at: Some(now() - chrono::Duration::hours(30)),
        });

        let set = score_articles(raw, &AnalysisQuery::new(None, Period::Day), now());
        let titles: Vec<_> = set.articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Bitcoin surges after ETF approval", "Exchange hack sparks crash", "Solana upgrade goes live"]
        );
        assert_eq!(set.articles[0].tone, Tone::Positive);
        assert_eq!(set.articles[1].tone, Tone::Negative);

        // 1h window keeps only undated articles
        let set = score_articles(parse_rss(FEED, "feed", 30), &AnalysisQuery::new(None, Period::Hour), now());
        assert_eq!(set.articles.len(), 1);
    }

    #[test]
    fn test_coin_filter_with_fallback() {
        let q = AnalysisQuery::new(Some("SOL"), Period::Day);
        let set = score_articles(parse_rss(FEED, "feed", 30), &q, now());
        assert_eq!(set.articles.len(), 1);
        assert_eq!(set.articles[0].title, "Solana upgrade goes live");

        let q = AnalysisQuery::new(Some("DOGE"), Period::Day);
        let set = score_articles(parse_rss(FEED, "feed", 30), &q, now());
        assert_eq!(set.articles.len(), 3);
    }

    #[test]
    fn test_feed_name() {
        assert_eq!(feed_name("https://www.coindesk.com/arc/outboundfeeds/rss/"), "coindesk.com");
        assert_eq!(feed_name("nonsense"), "nonsense");
    }
}
