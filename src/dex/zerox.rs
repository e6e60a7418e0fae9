//! 0x swap API quotes.

use super::{QuoteSource, RawQuote, SwapParams, DEFAULT_GAS_ESTIMATE};
use crate::config::AggregatorConfig;
use crate::signal::http::{self, as_f64, as_integer_string};
use crate::utils::error::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const CHAINS: [u64; 3] = [1, 137, 42161];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    buy_amount: Option<Value>,
    estimated_gas: Option<Value>,
    /// Wei
    gas_price: Option<Value>,
    estimated_price_impact: Option<Value>,
    #[serde(default)]
    sources: Vec<LiquiditySource>,
}

#[derive(Debug, Deserialize)]
struct LiquiditySource {
    name: Option<String>,
    proportion: Option<Value>,
}

pub struct ZeroExClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ZeroExClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> crate::Result<Self> {
        Ok(Self { client: http::client(timeout)?, base_url: base_url.to_string(), api_key })
    }

    pub fn from_config(config: &AggregatorConfig, timeout: Duration) -> crate::Result<Self> {
        Self::new(&config.base_url, config.api_key.clone(), timeout)
    }

    fn parse(body: QuoteResponse) -> Result<RawQuote, FetchError> {
        let output_base_units = body
            .buy_amount
            .as_ref()
            .and_then(as_integer_string)
            .ok_or_else(|| FetchError::MalformedResponse("0x: missing buyAmount".into()))?;
        let gas_estimate =
            body.estimated_gas.as_ref().and_then(as_f64).map(|g| g as u64).unwrap_or(DEFAULT_GAS_ESTIMATE);
        let gas_price_gwei = body.gas_price.as_ref().and_then(as_f64).map(|wei| wei / 1e9);
        let price_impact = body.estimated_price_impact.as_ref().and_then(as_f64).unwrap_or(0.0);
        let protocols = body
            .sources
            .into_iter()
            .filter(|s| s.proportion.as_ref().and_then(as_f64).unwrap_or(0.0) > 0.0)
            .map(|s| s.name.unwrap_or_else(|| "Unknown".to_string()))
            .collect();

        Ok(RawQuote { source: "0x", output_base_units, gas_estimate, gas_price_gwei, price_impact, protocols })
    }
}

#[async_trait]
impl QuoteSource for ZeroExClient {
    fn name(&self) -> &'static str {
        "0x"
    }

    fn reliability(&self) -> f64 {
        0.90
    }

    fn supports_chain(&self, chain_id: u64) -> bool {
        CHAINS.contains(&chain_id)
    }

    async fn quote(&self, params: &SwapParams) -> Result<RawQuote, FetchError> {
        let url = http::join_url(&self.base_url, "swap/v1/quote")?;
        let amount = params.amount_base_units()?;
        let mut req = self.client.get(url).query(&[
            ("sellToken", params.from_address.as_str()),
            ("buyToken", params.to_address.as_str()),
            ("sellAmount", amount.as_str()),
        ]);
        if let Some(key) = &self.api_key {
            req = req.header("0x-api-key", key);
        }
        let body: QuoteResponse = http::get_json(req).await?;
        Self::parse(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_quote() {
        let body: QuoteResponse = serde_json::from_value(json!({
            "buyAmount": "2499100000",
            "estimatedGas": "136000",
            "gasPrice": "25000000000",
            "estimatedPriceImpact": "0.12",
            "sources": [
                {"name": "Uniswap_V3", "proportion": "0.7"},
                {"name": "Curve", "proportion": "0.3"},
                {"name": "Balancer", "proportion": "0"}
            ]
        }))
        .unwrap();
        let raw = ZeroExClient::parse(body).unwrap();
        assert_eq!(raw.output_base_units, "2499100000");
        assert_eq!(raw.gas_estimate, 136_000);
        assert_eq!(raw.gas_price_gwei, Some(25.0));
        assert!((raw.price_impact - 0.12).abs() < 1e-12);
        assert_eq!(raw.protocols, vec!["Uniswap_V3", "Curve"]);
    }

    #[test]
    fn test_chain_support() {
        let client = ZeroExClient::new("https://api.0x.org", None, Duration::from_secs(1)).unwrap();
        assert!(client.supports_chain(137));
        assert!(!client.supports_chain(10));
    }
}
