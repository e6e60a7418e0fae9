//! Common types used throughout cryptopulse.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Source id of the Alternative.me Fear & Greed index
pub const FEAR_GREED: &str = "fear_greed";
/// Source id of the news sentiment source (RSS or aggregator)
pub const NEWS: &str = "news";
/// Source id of the CoinGecko market momentum source
pub const MOMENTUM: &str = "momentum";

/// The sentiment sources this crate knows how to build.
pub const KNOWN_SOURCES: [&str; 3] = [FEAR_GREED, NEWS, MOMENTUM];

/// Report ordering: the known sources first in a fixed order, then anything
/// else alphabetically.
pub fn source_priority(source_id: &str) -> (usize, &str) {
    let rank = KNOWN_SOURCES
        .iter()
        .position(|s| *s == source_id)
        .unwrap_or(KNOWN_SOURCES.len());
    (rank, source_id)
}

/// Look-back window for a sentiment analysis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum Period {
    #[serde(rename = "1h")]
    #[value(name = "1h")]
    Hour,
    #[serde(rename = "4h")]
    #[value(name = "4h")]
    FourHours,
    #[default]
    #[serde(rename = "24h")]
    #[value(name = "24h", alias = "1d")]
    Day,
    #[serde(rename = "7d")]
    #[value(name = "7d")]
    Week,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            | Period::Hour => "1h",
            | Period::FourHours => "4h",
            | Period::Day => "24h",
            | Period::Week => "7d",
        }
    }

    /// Length of the window; articles older than this are dropped.
    pub fn duration(&self) -> Duration {
        let hours = match self {
            | Period::Hour => 1,
            | Period::FourHours => 4,
            | Period::Day => 24,
            | Period::Week => 24 * 7,
        };
        Duration::from_secs(hours * 3600)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            | "1h" => Ok(Period::Hour),
            | "4h" => Ok(Period::FourHours),
            | "24h" | "1d" => Ok(Period::Day),
            | "7d" => Ok(Period::Week),
            | other => Err(crate::Error::InvalidArgument(format!("Unknown period: {other}"))),
        }
    }
}

/// Full runs query every configured source; quick runs a configured subset
/// under a tighter budget.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    #[default]
    Full,
    Quick,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            | AnalysisMode::Full => f.write_str("full"),
            | AnalysisMode::Quick => f.write_str("quick"),
        }
    }
}

/// Query descriptor handed to every source in a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisQuery {
    /// Upper-case coin symbol, e.g. "BTC"
    pub coin_filter: Option<String>,
    pub period: Period,
    pub detailed: bool,
    pub mode: AnalysisMode,
}

impl AnalysisQuery {
    pub fn new(coin_filter: Option<&str>, period: Period) -> Self {
        Self {
            coin_filter: coin_filter
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty()),
            period,
            ..Self::default()
        }
    }

    pub fn quick(mut self) -> Self {
        self.mode = AnalysisMode::Quick;
        self
    }

    pub fn detailed(mut self, detailed: bool) -> Self {
        self.detailed = detailed;
        self
    }

    /// Parts identifying this query in cache keys.
    pub fn cache_parts(&self) -> [String; 2] {
        [
            self.coin_filter.clone().unwrap_or_else(|| "*".to_string()),
            self.period.as_str().to_string(),
        ]
    }
}

/// Rendering of a report on stdout or in an exported file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}
