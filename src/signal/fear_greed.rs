//! Alternative.me Fear & Greed index.

use super::http::{self, as_f64};
use super::{IndexPoint, IndexReading, Payload, RawData, SignalSource};
use crate::config::Config;
use crate::utils::error::FetchError;
use crate::utils::types::{AnalysisQuery, FEAR_GREED};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct FngResponse {
    #[serde(default)]
    data: Vec<FngEntry>,
    #[serde(default)]
    metadata: Option<FngMetadata>,
}

#[derive(Debug, Deserialize)]
struct FngMetadata {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FngEntry {
    value: serde_json::Value,
    #[serde(default)]
    value_classification: String,
    #[serde(default)]
    timestamp: Option<serde_json::Value>,
    #[serde(default)]
    time_until_update: Option<serde_json::Value>,
}

fn as_time(v: Option<&serde_json::Value>) -> Option<DateTime<Utc>> {
    let secs = v.and_then(as_f64)? as i64;
    Utc.timestamp_opt(secs, 0).single()
}

pub struct FearGreedSource {
    client: Client,
    base_url: String,
    ttl: Duration,
    limit: u32,
}

impl FearGreedSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> crate::Result<Self> {
        Ok(Self {
            client: http::client(timeout)?,
            base_url: base_url.into(),
            ttl: Duration::from_secs(300),
            limit: 1,
        })
    }

    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let cfg = &config.sources.fear_greed;
        Ok(Self::new(cfg.base_url.clone(), config.fetch_timeout())?
            .with_ttl(Duration::from_secs(cfg.ttl_secs))
            .with_history(cfg.history_limit))
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_history(mut self, limit: u32) -> Self {
        self.limit = limit.max(1);
        self
    }

    fn parse(body: FngResponse) -> Result<IndexReading, FetchError> {
        if let Some(err) = body.metadata.and_then(|m| m.error).filter(|e| !e.is_empty()) {
            return Err(FetchError::MalformedResponse(format!("upstream error: {err}")));
        }
        let mut points = body.data.iter().map(|entry| -> Result<IndexPoint, FetchError> {
            let value = as_f64(&entry.value).ok_or_else(|| {
                FetchError::MalformedResponse(format!("non-numeric index value {}", entry.value))
            })?;
            Ok(IndexPoint {
                value,
                label: entry.value_classification.clone(),
                timestamp: as_time(entry.timestamp.as_ref()),
            })
        });
        let current: IndexPoint = points
            .next()
            .ok_or_else(|| FetchError::MalformedResponse("empty index data".into()))??;
        let history = points.collect::<Result<Vec<_>, FetchError>>()?;
        let time_until_update = body
            .data
            .first()
            .and_then(|e| e.time_until_update.as_ref())
            .and_then(as_f64)
            .map(|s| s as u64);

        Ok(IndexReading {
            value: current.value,
            label: current.label,
            timestamp: current.timestamp,
            time_until_update,
            history,
        })
    }
}

#[async_trait]
impl SignalSource for FearGreedSource {
    fn id(&self) -> &'static str {
        FEAR_GREED
    }

    fn cache_ttl(&self) -> Duration {
        self.ttl
    }

    async fn fetch(&self, _query: &AnalysisQuery) -> Result<RawData, FetchError> {
        let url = http::join_url(&self.base_url, "fng/")?;
        let limit = self.limit.to_string();
        let body: FngResponse =
            http::get_json(self.client.get(url).query(&[("limit", limit.as_str())])).await?;
        let reading = Self::parse(body)?;
        log::debug!("fear & greed index {} ({})", reading.value, reading.label);
        Ok(RawData::new(FEAR_GREED, Payload::Index(reading)))
    }
}
