//! 1inch swap API v6 quotes.

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
struct QuoteResponse {
    dst_amount: Option<Value>,
    #[serde(alias = "estimatedGas")]
    gas: Option<Value>,
    /// routes → hops → pools, each pool with a `name`
    #[serde(default)]
    protocols: Vec<Vec<Vec<Value>>>,
}

pub struct OneInchClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OneInchClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> crate::Result<Self> {
        Ok(Self { client: http::client(timeout)?, base_url: base_url.to_string(), api_key })
    }

    pub fn from_config(config: &AggregatorConfig, timeout: Duration) -> crate::Result<Self> {
        Self::new(&config.base_url, config.api_key.clone(), timeout)
    }

    fn parse(body: QuoteResponse) -> Result<RawQuote, FetchError> {
        let output_base_units = body
            .dst_amount
            .as_ref()
            .and_then(as_integer_string)
            .ok_or_else(|| FetchError::MalformedResponse("1inch: missing dstAmount".into()))?;
        let gas_estimate = body.gas.as_ref().and_then(as_f64).map(|g| g as u64).unwrap_or(DEFAULT_GAS_ESTIMATE);
        let protocols = body
            .protocols
            .iter()
            .flatten()
            .flatten()
            .filter_map(|pool| pool.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect();

        Ok(RawQuote {
            source: "1inch",
            output_base_units,
            gas_estimate,
            gas_price_gwei: None,
            price_impact: 0.0,
            protocols,
        })
    }
}

#[async_trait]
impl QuoteSource for OneInchClient {
    fn name(&self) -> &'static str {
        "1inch"
    }

    fn reliability(&self) -> f64 {
        0.95
    }

    fn supports_chain(&self, chain_id: u64) -> bool {
        CHAINS.contains(&chain_id)
    }

    async fn quote(&self, params: &SwapParams) -> Result<RawQuote, FetchError> {
        let url = http::join_url(&self.base_url, &format!("{}/quote", params.chain_id))?;
        let amount = params.amount_base_units()?;
        let mut req = self.client.get(url).query(&[
            ("src", params.from_address.as_str()),
            ("dst", params.to_address.as_str()),
            ("amount", amount.as_str()),
            ("includeProtocols", "true"),
            ("includeGas", "true"),
        ]);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let body: QuoteResponse = http::get_json(req).await?;
        Self::parse(body)
    }
}
