//! Paraswap `/prices` quotes.

use super::{QuoteSource, RawQuote, SwapParams, DEFAULT_GAS_ESTIMATE};
use crate::config::AggregatorConfig;
use crate::signal::http::{self, as_f64, as_integer_string};
use crate::utils::error::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const CHAINS: [u64; 4] = [1, 137, 42161, 10];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PricesResponse {
    price_route: Option<PriceRoute>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceRoute {
    dest_amount: Option<Value>,
    gas_cost: Option<Value>,
    /// Percent
    price_impact: Option<Value>,
    #[serde(default)]
    best_route: Vec<BestRoute>,
}

#[derive(Debug, Deserialize)]
struct BestRoute {
    #[serde(default)]
    swaps: Vec<Swap>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Swap {
    #[serde(default)]
    swap_exchanges: Vec<SwapExchange>,
}

#[derive(Debug, Deserialize)]
struct SwapExchange {
    exchange: Option<String>,
}

pub struct ParaswapClient {
    client: Client,
    base_url: String,
}

impl ParaswapClient {
    pub fn new(base_url: &str, timeout: Duration) -> crate::Result<Self> {
        Ok(Self { client: http::client(timeout)?, base_url: base_url.to_string() })
    }

    pub fn from_config(config: &AggregatorConfig, timeout: Duration) -> crate::Result<Self> {
        Self::new(&config.base_url, timeout)
    }

    fn parse(body: PricesResponse) -> Result<RawQuote, FetchError> {
        let route = match (body.price_route, body.error) {
            | (Some(route), _) => route,
            | (None, Some(err)) => return Err(FetchError::MalformedResponse(format!("paraswap: {err}"))),
            | (None, None) => return Err(FetchError::MalformedResponse("paraswap: missing priceRoute".into())),
        };
        let output_base_units = route
            .dest_amount
            .as_ref()
            .and_then(as_integer_string)
            .ok_or_else(|| FetchError::MalformedResponse("paraswap: missing destAmount".into()))?;
        let gas_estimate =
            route.gas_cost.as_ref().and_then(as_f64).map(|g| g as u64).unwrap_or(DEFAULT_GAS_ESTIMATE);
        let price_impact = route.price_impact.as_ref().and_then(as_f64).unwrap_or(0.0) / 100.0;
        let protocols = route
            .best_route
            .into_iter()
            .flat_map(|r| r.swaps)
            .flat_map(|s| s.swap_exchanges)
            .filter_map(|e| e.exchange)
            .collect();

        Ok(RawQuote {
            source: "Paraswap",
            output_base_units,
            gas_estimate,
            gas_price_gwei: None,
            price_impact,
            protocols,
        })
    }
}

#[async_trait]
impl QuoteSource for ParaswapClient {
    fn name(&self) -> &'static str {
        "Paraswap"
    }

    fn reliability(&self) -> f64 {
        0.92
    }

    fn supports_chain(&self, chain_id: u64) -> bool {
        CHAINS.contains(&chain_id)
    }

    async fn quote(&self, params: &SwapParams) -> Result<RawQuote, FetchError> {
        let url = http::join_url(&self.base_url, "prices")?;
        let amount = params.amount_base_units()?;
        let src_decimals = params.from_decimals().to_string();
        let dest_decimals = params.to_decimals().to_string();
        let network = params.chain_id.to_string();
        let req = self.client.get(url).query(&[
            ("srcToken", params.from_address.as_str()),
            ("destToken", params.to_address.as_str()),
            ("amount", amount.as_str()),
            ("srcDecimals", src_decimals.as_str()),
            ("destDecimals", dest_decimals.as_str()),
            ("side", "SELL"),
            ("network", network.as_str()),
        ]);
        let body: PricesResponse = http::get_json(req).await?;
        Self::parse(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_prices() {
        let body: PricesResponse = serde_json::from_value(json!({
            "priceRoute": {
                "destAmount": "2498000000",
                "gasCost": "210000",
                "priceImpact": "0.35",
                "bestRoute": [{
                    "percent": 100,
                    "swaps": [{"swapExchanges": [{"exchange": "UniswapV3"}, {"exchange": "SushiSwap"}]}]
                }]
            }
        }))
        .unwrap();
        let raw = ParaswapClient::parse(body).unwrap();
        assert_eq!(raw.output_base_units, "2498000000");
        assert_eq!(raw.gas_estimate, 210_000);
        assert!((raw.price_impact - 0.0035).abs() < 1e-12);
        assert_eq!(raw.protocols, vec!["UniswapV3", "SushiSwap"]);
    }

    #[test]
    fn test_parse_error_body() {
        let body: PricesResponse = serde_json::from_value(json!({"error": "No routes found"})).unwrap();
        match ParaswapClient::parse(body) {
            | Err(FetchError::MalformedResponse(msg)) => assert!(msg.contains("No routes found")),
            | other => panic!("unexpected {:?}", other),
        }
    }
}
