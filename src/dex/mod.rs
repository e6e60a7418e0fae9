//! DEX aggregator quotes and route ranking.
//!
//! Each aggregator client returns a [`RawQuote`] in base units; pricing it in
//! tokens and dollars happens once, here, so every source is normalized the
//! same way.

mod oneinch;
mod paraswap;
pub mod router;
pub mod tokens;
mod zerox;

use crate::config::{AggregatorConfig, DexConfig};
use crate::utils::error::FetchError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub use oneinch::OneInchClient;
pub use paraswap::ParaswapClient;
pub use router::{RouteAnalysis, RouteComparison, RouteFinder};
pub use zerox::ZeroExClient;

/// Seconds a quote is considered executable.
pub const QUOTE_VALIDITY_SECS: i64 = 30;
/// Used when an aggregator leaves out its gas estimate.
pub const DEFAULT_GAS_ESTIMATE: u64 = 150_000;

/// A swap request with symbols (or raw addresses) already validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapParams {
    pub from_token: String,
    pub to_token: String,
    pub amount: Decimal,
    pub chain: String,
    pub chain_id: u64,
    pub from_address: String,
    pub to_address: String,
}

impl SwapParams {
    pub fn new(from_token: &str, to_token: &str, amount: Decimal, chain: &str) -> crate::Result<Self> {
        if amount <= Decimal::ZERO {
            return Err(crate::Error::InvalidArgument(format!("amount must be positive, got {}", amount)));
        }
        let chain_id = tokens::chain_id(chain)?;
        let chain = chain.trim().to_lowercase();
        Ok(Self {
            from_address: tokens::resolve_address(from_token, &chain)?,
            to_address: tokens::resolve_address(to_token, &chain)?,
            from_token: from_token.trim().to_uppercase(),
            to_token: to_token.trim().to_uppercase(),
            amount,
            chain,
            chain_id,
        })
    }

    pub fn from_decimals(&self) -> u32 {
        tokens::decimals(&self.from_token)
    }

    pub fn to_decimals(&self) -> u32 {
        tokens::decimals(&self.to_token)
    }

    /// Sell amount in the input token's base units.
    pub fn amount_base_units(&self) -> Result<String, FetchError> {
        to_base_units(self.amount, self.from_decimals())
            .ok_or_else(|| FetchError::MalformedResponse(format!("amount {} out of range", self.amount)))
    }
}

/// ETH price and gas price used to turn gas units into dollars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GasPricing {
    pub eth_price_usd: f64,
    pub gas_price_gwei: f64,
}

impl GasPricing {
    pub fn from_config(config: &DexConfig) -> Self {
        Self { eth_price_usd: config.eth_price_usd, gas_price_gwei: config.gas_price_gwei }
    }

    pub fn gas_cost_usd(&self, gas: u64, gas_price_gwei: f64) -> f64 {
        gas as f64 * gas_price_gwei / 1e9 * self.eth_price_usd
    }
}

/// What an aggregator said, before pricing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawQuote {
    pub source: &'static str,
    /// Output amount in the output token's base units
    pub output_base_units: String,
    pub gas_estimate: u64,
    /// Gas price the aggregator quoted against, if it reported one
    pub gas_price_gwei: Option<f64>,
    /// Fraction, 0.01 = 1%
    pub price_impact: f64,
    pub protocols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedQuote {
    pub source: String,
    pub input_token: String,
    pub output_token: String,
    pub input_amount: Decimal,
    pub output_amount: Decimal,
    pub price: Decimal,
    pub price_impact: f64,
    pub gas_estimate: u64,
    pub gas_price_gwei: f64,
    pub gas_cost_usd: f64,
    /// Output per unit input after subtracting the gas cost
    pub effective_rate: Decimal,
    pub route: Vec<String>,
    pub protocols: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub valid_for_secs: i64,
}

impl NormalizedQuote {
    pub fn from_raw(
        raw: RawQuote,
        params: &SwapParams,
        pricing: &GasPricing,
        now: DateTime<Utc>,
    ) -> Result<Self, FetchError> {
        let output_amount = from_base_units(&raw.output_base_units, params.to_decimals()).ok_or_else(|| {
            FetchError::MalformedResponse(format!("{}: bad output amount '{}'", raw.source, raw.output_base_units))
        })?;
        let input_amount = params.amount;
        let price = output_amount.checked_div(input_amount).unwrap_or(Decimal::ZERO);

        let gas_price_gwei = raw.gas_price_gwei.unwrap_or(pricing.gas_price_gwei);
        let gas_cost_usd = pricing.gas_cost_usd(raw.gas_estimate, gas_price_gwei);
        let gas_in_output = Decimal::from_f64(gas_cost_usd).unwrap_or(Decimal::ZERO);
        let effective_rate = (output_amount - gas_in_output).checked_div(input_amount).unwrap_or(Decimal::ZERO);

        let mut protocols = raw.protocols;
        protocols.sort();
        protocols.dedup();
        if protocols.is_empty() {
            protocols.push("Various".to_string());
        }

        Ok(Self {
            source: raw.source.to_string(),
            input_token: params.from_token.clone(),
            output_token: params.to_token.clone(),
            input_amount,
            output_amount,
            price,
            price_impact: raw.price_impact,
            gas_estimate: raw.gas_estimate,
            gas_price_gwei,
            gas_cost_usd,
            effective_rate,
            route: vec![params.from_token.clone(), params.to_token.clone()],
            protocols,
            timestamp: now,
            valid_for_secs: QUOTE_VALIDITY_SECS,
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        (now - self.timestamp).num_seconds() > self.valid_for_secs
    }

    pub fn effective_rate_f64(&self) -> f64 {
        self.effective_rate.to_f64().unwrap_or(0.0)
    }
}

/// One DEX aggregator's quote endpoint.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Historical reliability in [0, 1]
    fn reliability(&self) -> f64 {
        0.85
    }

    fn supports_chain(&self, chain_id: u64) -> bool;

    async fn quote(&self, params: &SwapParams) -> Result<RawQuote, FetchError>;
}

/// Builds the enabled aggregator clients from configuration.
pub struct DexFactory;

impl DexFactory {
    pub fn create_source(name: &str, config: &DexConfig) -> crate::Result<Arc<dyn QuoteSource>> {
        let timeout = Duration::from_secs(config.quote_timeout_secs);
        match name.to_lowercase().as_str() {
            | "1inch" | "oneinch" => Ok(Arc::new(OneInchClient::from_config(&config.oneinch, timeout)?)),
            | "paraswap" => Ok(Arc::new(ParaswapClient::from_config(&config.paraswap, timeout)?)),
            | "0x" | "zerox" => Ok(Arc::new(ZeroExClient::from_config(&config.zerox, timeout)?)),
            | _ => Err(crate::Error::DexError(format!("Unsupported DEX aggregator: {}", name))),
        }
    }

    pub fn create_sources(config: &DexConfig) -> crate::Result<Vec<Arc<dyn QuoteSource>>> {
        let entries: [(&str, &AggregatorConfig); 3] =
            [("1inch", &config.oneinch), ("paraswap", &config.paraswap), ("0x", &config.zerox)];
        let mut sources = Vec::new();
        for (name, agg) in entries {
            if agg.enabled {
                sources.push(Self::create_source(name, config)?);
            } else {
                log::debug!("{} disabled in config", name);
            }
        }
        Ok(sources)
    }
}

/// `amount × 10^decimals`, truncated. `None` on overflow.
pub fn to_base_units(amount: Decimal, decimals: u32) -> Option<String> {
    let scale = Decimal::from_i128_with_scale(10i128.checked_pow(decimals)?, 0);
    amount.checked_mul(scale).map(|v| v.trunc().to_string())
}

/// Integer string in base units back to a token amount.
pub fn from_base_units(raw: &str, decimals: u32) -> Option<Decimal> {
    let value: i128 = raw.trim().parse().ok()?;
    Decimal::try_from_i128_with_scale(value, decimals).ok().map(|d| d.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn params() -> SwapParams {
        SwapParams::new("eth", "usdc", dec!(1), "ethereum").unwrap()
    }

    #[test]
    fn test_swap_params_resolve() {
        let p = params();
        assert_eq!(p.from_token, "ETH");
        assert_eq!(p.chain_id, 1);
        assert_eq!(p.to_address, "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
        assert_eq!(p.amount_base_units().unwrap(), "1000000000000000000");
    }

    #[test]
    fn test_swap_params_reject_bad_input() {
        assert!(SwapParams::new("ETH", "USDC", dec!(0), "ethereum").is_err());
        assert!(SwapParams::new("ETH", "NOPE", dec!(1), "ethereum").is_err());
        assert!(SwapParams::new("ETH", "USDC", dec!(1), "fantom").is_err());
    }

    #[test]
    fn test_base_unit_conversion() {
        assert_eq!(to_base_units(dec!(1.5), 6).unwrap(), "1500000");
        assert_eq!(to_base_units(dec!(0.1234567), 6).unwrap(), "123456");
        assert_eq!(from_base_units("2500123456", 6).unwrap(), dec!(2500.123456));
        assert_eq!(from_base_units("1000000000000000000", 18).unwrap(), dec!(1));
        assert!(from_base_units("12abc", 6).is_none());
    }

    #[test]
    fn test_normalize_quote() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let pricing = GasPricing { eth_price_usd: 2500.0, gas_price_gwei: 30.0 };
        let raw = RawQuote {
            source: "1inch",
            output_base_units: "2500000000".into(),
            gas_estimate: 150_000,
            gas_price_gwei: None,
            price_impact: 0.0,
            protocols: vec!["UNISWAP_V3".into(), "UNISWAP_V3".into()],
        };
        let q = NormalizedQuote::from_raw(raw, &params(), &pricing, now).unwrap();
        assert_eq!(q.output_amount, dec!(2500));
        assert_eq!(q.price, dec!(2500));
        // 150k gas at 30 gwei = 0.0045 ETH = $11.25
        assert!((q.gas_cost_usd - 11.25).abs() < 1e-9);
        assert!((q.effective_rate_f64() - 2488.75).abs() < 1e-6);
        assert_eq!(q.protocols, vec!["UNISWAP_V3"]);
        assert!(!q.is_expired_at(now + chrono::Duration::seconds(30)));
        assert!(q.is_expired_at(now + chrono::Duration::seconds(31)));
    }

    #[test]
    fn test_normalize_rejects_garbage_amount() {
        let raw = RawQuote {
            source: "0x",
            output_base_units: "lots".into(),
            gas_estimate: 1,
            gas_price_gwei: None,
            price_impact: 0.0,
            protocols: vec![],
        };
        let pricing = GasPricing { eth_price_usd: 1.0, gas_price_gwei: 1.0 };
        let err = NormalizedQuote::from_raw(raw, &params(), &pricing, Utc::now()).unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse(_)));
    }

    #[test]
    fn test_factory() {
        let config = DexConfig::default();
        assert_eq!(DexFactory::create_source("1inch", &config).unwrap().name(), "1inch");
        assert_eq!(DexFactory::create_source("ZeroX", &config).unwrap().name(), "0x");
        assert!(matches!(DexFactory::create_source("uniswap", &config), Err(crate::Error::DexError(_))));

        let mut config = DexConfig::default();
        config.paraswap.enabled = false;
        let names: Vec<_> = DexFactory::create_sources(&config).unwrap().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["1inch", "0x"]);
    }
}
