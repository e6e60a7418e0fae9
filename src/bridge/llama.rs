//! DefiLlama bridge listings: daily volume, chain coverage and locked value.

use crate::config::BridgeConfig;
use crate::signal::http;
use crate::utils::error::FetchError;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct BridgesResponse {
    #[serde(default)]
    bridges: Vec<BridgeEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BridgeEntry {
    id: Value,
    #[serde(default)]
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    volume_prev_day: Option<f64>,
    #[serde(default, rename = "volumePrev2Day")]
    volume_prev2_day: Option<f64>,
    #[serde(default)]
    chains: Vec<String>,
    /// A chain name, a list of them, or `false`
    #[serde(default)]
    destination_chain: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailResponse {
    #[serde(default)]
    current_chain_tvls: Value,
    #[serde(default)]
    tokens: Value,
}

/// Numeric members of a JSON object. Anything else is skipped.
fn numeric_map(v: &Value) -> BTreeMap<String, f64> {
    v.as_object()
        .map(|obj| obj.iter().filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n))).collect())
        .unwrap_or_default()
}

fn chain_list(v: &Value) -> Vec<String> {
    match v {
        | Value::String(s) if !s.is_empty() && s != "false" => vec![s.clone()],
        | Value::Array(items) => items.iter().filter_map(|c| c.as_str().map(str::to_string)).collect(),
        | _ => Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeInfo {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub volume_prev_day: f64,
    pub volume_prev2_day: f64,
    pub chains: Vec<String>,
    pub destination_chains: Vec<String>,
}

impl BridgeInfo {
    fn from_entry(entry: BridgeEntry) -> Self {
        let id = match &entry.id {
            | Value::String(s) => s.clone(),
            | other => other.to_string(),
        };
        Self {
            id,
            display_name: entry.display_name.filter(|d| !d.is_empty()).unwrap_or_else(|| entry.name.clone()),
            name: entry.name,
            volume_prev_day: entry.volume_prev_day.unwrap_or(0.0),
            volume_prev2_day: entry.volume_prev2_day.unwrap_or(0.0),
            chains: entry.chains,
            destination_chains: chain_list(&entry.destination_chain),
        }
    }

    /// Day-over-day volume change in percent, `None` without a prior day.
    pub fn volume_change_pct(&self) -> Option<f64> {
        (self.volume_prev2_day > 0.0)
            .then(|| (self.volume_prev_day - self.volume_prev2_day) / self.volume_prev2_day * 100.0)
    }

    /// Source and destination chains, deduplicated and sorted.
    pub fn all_chains(&self) -> Vec<String> {
        self.chains.iter().chain(&self.destination_chains).cloned().collect::<BTreeSet<_>>().into_iter().collect()
    }

    pub fn touches(&self, chain: &str) -> bool {
        self.chains.iter().chain(&self.destination_chains).any(|c| c.eq_ignore_ascii_case(chain))
    }

    fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.display_name.eq_ignore_ascii_case(name) || self.id == name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeTvl {
    pub bridge_id: String,
    pub total_tvl: f64,
    pub tvl_by_chain: BTreeMap<String, f64>,
    pub tvl_by_token: BTreeMap<String, f64>,
    pub fetched_at: DateTime<Utc>,
}

/// Bridges by 24h volume, optionally narrowed to one chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeListing {
    pub chain: Option<String>,
    /// Matches before the limit was applied
    pub total: usize,
    pub bridges: Vec<BridgeInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TvlEntry {
    pub bridge: String,
    /// `None` when the detail fetch failed
    pub tvl: Option<BridgeTvl>,
}

/// Highest locked value first; failed lookups trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TvlRanking {
    pub entries: Vec<TvlEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeDetail {
    pub bridge: BridgeInfo,
    pub tvl: Option<BridgeTvl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainList {
    pub chains: Vec<String>,
}

/// Every chain any bridge touches, sorted.
pub fn all_chains(bridges: &[BridgeInfo]) -> Vec<String> {
    bridges.iter().flat_map(BridgeInfo::all_chains).collect::<BTreeSet<_>>().into_iter().collect()
}

pub struct DefiLlamaClient {
    client: Client,
    base_url: String,
}

impl DefiLlamaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> crate::Result<Self> {
        Ok(Self { client: http::client(timeout)?, base_url: base_url.into() })
    }

    pub fn from_config(config: &BridgeConfig) -> crate::Result<Self> {
        Self::new(config.stats_base_url.clone(), Duration::from_secs(config.stats_timeout_secs))
    }

    /// Every listed bridge, highest 24h volume first.
    pub async fn bridges(&self) -> Result<Vec<BridgeInfo>, FetchError> {
        let url = http::join_url(&self.base_url, "bridges")?;
        let body: BridgesResponse = http::get_json(self.client.get(url)).await?;
        let mut bridges: Vec<BridgeInfo> = body.bridges.into_iter().map(BridgeInfo::from_entry).collect();
        bridges.sort_by(|a, b| b.volume_prev_day.total_cmp(&a.volume_prev_day));
        log::debug!("DefiLlama listed {} bridges", bridges.len());
        Ok(bridges)
    }

    pub async fn tvl(&self, bridge_id: &str) -> Result<BridgeTvl, FetchError> {
        let url = http::join_url(&self.base_url, &format!("bridge/{bridge_id}"))?;
        let body: DetailResponse = http::get_json(self.client.get(url)).await?;
        let tvl_by_chain = numeric_map(&body.current_chain_tvls);
        Ok(BridgeTvl {
            bridge_id: bridge_id.to_string(),
            total_tvl: tvl_by_chain.values().sum(),
            tvl_by_chain,
            tvl_by_token: numeric_map(&body.tokens),
            fetched_at: Utc::now(),
        })
    }

    pub async fn listing(&self, chain: Option<&str>, limit: usize) -> Result<BridgeListing, FetchError> {
        let mut bridges = self.bridges().await?;
        if let Some(chain) = chain {
            bridges.retain(|b| b.touches(chain));
        }
        let total = bridges.len();
        bridges.truncate(limit);
        Ok(BridgeListing { chain: chain.map(str::to_string), total, bridges })
    }

    /// Locked value of the `limit` busiest bridges, fetched concurrently.
    pub async fn tvl_ranking(&self, limit: usize) -> Result<TvlRanking, FetchError> {
        let mut bridges = self.bridges().await?;
        bridges.truncate(limit);
        let lookups = bridges.iter().map(|b| async move {
            let tvl = match self.tvl(&b.id).await {
                | Ok(tvl) => Some(tvl),
                | Err(e) => {
                    log::warn!("TVL for {} unavailable: {}", b.display_name, e);
                    None
                }
            };
            TvlEntry { bridge: b.display_name.clone(), tvl }
        });
        let mut entries = join_all(lookups).await;
        let total = |e: &TvlEntry| e.tvl.as_ref().map_or(f64::NEG_INFINITY, |t| t.total_tvl);
        entries.sort_by(|a, b| total(b).total_cmp(&total(a)));
        Ok(TvlRanking { entries })
    }

    /// Listing entry and locked value of one bridge, matched by name, display
    /// name or id. `None` when no bridge matches.
    pub async fn detail(&self, name: &str) -> Result<Option<BridgeDetail>, FetchError> {
        let Some(bridge) = self.bridges().await?.into_iter().find(|b| b.is_named(name)) else {
            return Ok(None);
        };
        let tvl = match self.tvl(&bridge.id).await {
            | Ok(tvl) => Some(tvl),
            | Err(e) => {
                log::warn!("TVL for {} unavailable: {}", bridge.display_name, e);
                None
            }
        };
        Ok(Some(BridgeDetail { bridge, tvl }))
    }

    pub async fn chains(&self) -> Result<ChainList, FetchError> {
        Ok(ChainList { chains: all_chains(&self.bridges().await?) })
    }
}
