//! Market momentum from CoinGecko price change and volume activity.

use super::{http, MomentumReading, Payload, RawData, SignalSource};
use crate::config::Config;
use crate::utils::error::FetchError;
use crate::utils::types::{AnalysisQuery, Period, MOMENTUM};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Daily volume / market cap considered normal activity.
const BASELINE_TURNOVER: f64 = 0.03;
const MAX_VOLUME_RATIO: f64 = 2.0;
const BTC_SHARE: f64 = 0.7;
const ETH_SHARE: f64 = 0.3;

const COIN_IDS: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("SOL", "solana"),
    ("XRP", "ripple"),
    ("ADA", "cardano"),
    ("DOGE", "dogecoin"),
    ("DOT", "polkadot"),
    ("LINK", "chainlink"),
    ("AVAX", "avalanche-2"),
    ("MATIC", "matic-network"),
    ("BNB", "binancecoin"),
    ("LTC", "litecoin"),
    ("ATOM", "cosmos"),
    ("UNI", "uniswap"),
    ("ARB", "arbitrum"),
];

/// CoinGecko id for a symbol; unknown symbols are tried lower-cased.
pub fn coin_id(symbol: &str) -> String {
    let upper = symbol.to_uppercase();
    COIN_IDS
        .iter()
        .find(|(sym, _)| *sym == upper)
        .map(|(_, id)| id.to_string())
        .unwrap_or_else(|| symbol.to_lowercase())
}

#[derive(Debug, Clone, Deserialize)]
struct MarketRow {
    id: String,
    #[serde(default)]
    current_price: Option<f64>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    total_volume: Option<f64>,
    #[serde(default)]
    price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    price_change_percentage_1h_in_currency: Option<f64>,
    #[serde(default)]
    price_change_percentage_24h_in_currency: Option<f64>,
    #[serde(default)]
    price_change_percentage_7d_in_currency: Option<f64>,
}

impl MarketRow {
    fn change(&self, period: Period) -> f64 {
        let pick = match period {
            | Period::Hour => self.price_change_percentage_1h_in_currency,
            | Period::FourHours | Period::Day => self.price_change_percentage_24h_in_currency,
            | Period::Week => self.price_change_percentage_7d_in_currency,
        };
        pick.or(self.price_change_percentage_24h).unwrap_or(0.0)
    }

    fn volume_ratio(&self) -> f64 {
        volume_ratio(self.total_volume.unwrap_or(0.0), self.market_cap.unwrap_or(0.0))
    }
}

/// `(volume / market_cap) / 3%`, capped at 2. A zero market cap reads as normal activity.
pub fn volume_ratio(volume: f64, market_cap: f64) -> f64 {
    if market_cap <= 0.0 {
        return 1.0;
    }
    ((volume / market_cap) / BASELINE_TURNOVER).min(MAX_VOLUME_RATIO)
}

pub struct MomentumSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    ttl: Duration,
}

impl MomentumSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> crate::Result<Self> {
        Ok(Self {
            client: http::client(timeout)?,
            base_url: base_url.into(),
            api_key: None,
            ttl: Duration::from_secs(60),
        })
    }

    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let cfg = &config.sources.momentum;
        let mut source = Self::new(cfg.base_url.clone(), config.fetch_timeout())?;
        source.api_key = cfg.api_key.clone();
        source.ttl = Duration::from_secs(cfg.ttl_secs);
        Ok(source)
    }

    async fn markets(&self, ids: &str) -> Result<Vec<MarketRow>, FetchError> {
        let url = http::join_url(&self.base_url, "coins/markets")?;
        let mut req = self.client.get(url).query(&[
            ("vs_currency", "usd"),
            ("ids", ids),
            ("order", "market_cap_desc"),
            ("sparkline", "false"),
            ("price_change_percentage", "1h,24h,7d"),
        ]);
        if let Some(key) = &self.api_key {
            req = req.header("x-cg-demo-api-key", key);
        }
        http::get_json(req).await
    }

    fn coin_reading(symbol: &str, row: &MarketRow, period: Period) -> MomentumReading {
        MomentumReading {
            scope: symbol.to_uppercase(),
            price_change_pct: row.change(period),
            volume_ratio: row.volume_ratio(),
            price: row.current_price,
            market_cap: row.market_cap,
        }
    }

    /// BTC/ETH price blend. Turnover is read from BTC alone. BTC is required;
    /// without ETH the BTC change stands alone.
    fn market_reading(rows: &[MarketRow], period: Period) -> Result<MomentumReading, FetchError> {
        let btc = rows
            .iter()
            .find(|r| r.id == "bitcoin")
            .ok_or_else(|| FetchError::MalformedResponse("bitcoin missing from market data".into()))?;
        let change = match rows.iter().find(|r| r.id == "ethereum") {
            | Some(eth) => btc.change(period) * BTC_SHARE + eth.change(period) * ETH_SHARE,
            | None => btc.change(period),
        };
        Ok(MomentumReading {
            scope: "MARKET".to_string(),
            price_change_pct: change,
            volume_ratio: btc.volume_ratio(),
            price: btc.current_price,
            market_cap: btc.market_cap,
        })
    }
}

#[async_trait]
impl SignalSource for MomentumSource {
    fn id(&self) -> &'static str {
        MOMENTUM
    }

    fn cache_ttl(&self) -> Duration {
        self.ttl
    }

    async fn fetch(&self, query: &AnalysisQuery) -> Result<RawData, FetchError> {
        if let Some(symbol) = query.coin_filter.as_deref() {
            let id = coin_id(symbol);
            let rows = self.markets(&id).await?;
            if let Some(row) = rows.iter().find(|r| r.id == id) {
                let reading = Self::coin_reading(symbol, row, query.period);
                return Ok(RawData::new(MOMENTUM, Payload::Momentum(reading)));
            }
            log::info!("No market data for {}, using overall market momentum", symbol);
        }

        let rows = self.markets("bitcoin,ethereum").await?;
        let reading = Self::market_reading(&rows, query.period)?;
        Ok(RawData::new(MOMENTUM, Payload::Momentum(reading)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn row(id: &str, change_24h: f64, volume: f64, mcap: f64) -> MarketRow {
        MarketRow {
            id: id.to_string(),
            current_price: Some(100.0),
            market_cap: Some(mcap),
            total_volume: Some(volume),
            price_change_percentage_24h: Some(change_24h),
            price_change_percentage_1h_in_currency: Some(0.5),
            price_change_percentage_24h_in_currency: Some(change_24h),
            price_change_percentage_7d_in_currency: None,
        }
    }

    #[test]
    fn test_coin_id() {
        assert_eq!(coin_id("avax"), "avalanche-2");
        assert_eq!(coin_id("BTC"), "bitcoin");
        assert_eq!(coin_id("PEPE"), "pepe");
    }

    #[test]
    fn test_volume_ratio() {
        assert!((volume_ratio(3.0, 100.0) - 1.0).abs() < 1e-12);
        assert_eq!(volume_ratio(50.0, 100.0), 2.0);
        assert_eq!(volume_ratio(50.0, 0.0), 1.0);
    }

    #[test]
    fn test_period_field_selection() {
        let r = row("bitcoin", 4.0, 3.0, 100.0);
        assert_eq!(r.change(Period::Hour), 0.5);
        assert_eq!(r.change(Period::FourHours), 4.0);
        // 7d missing falls back to the plain 24h change
        assert_eq!(r.change(Period::Week), 4.0);
    }

    #[test]
    fn test_market_blend() {
        let rows = vec![row("bitcoin", 10.0, 3.0, 100.0), row("ethereum", -10.0, 6.0, 100.0)];
        let m = MomentumSource::market_reading(&rows, Period::Day).unwrap();
        assert!((m.price_change_pct - 4.0).abs() < 1e-9);
        // ETH turns over twice as much but only BTC volume counts
        assert!((m.volume_ratio - 1.0).abs() < 1e-9);
        assert_eq!(m.scope, "MARKET");

        let only_btc = vec![row("bitcoin", 2.0, 3.0, 100.0)];
        let m = MomentumSource::market_reading(&only_btc, Period::Day).unwrap();
        assert_eq!(m.price_change_pct, 2.0);

        assert_matches!(
            MomentumSource::market_reading(&[], Period::Day),
            Err(FetchError::MalformedResponse(_))
        );
    }
}
