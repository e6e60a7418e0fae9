//! Rank bridge fee estimates for one transfer.

use super::{BridgeAdapter, FeeEstimate};
use crate::analysis::{composite, inverted_rank, ComponentScore, WeightMap};
use crate::config::BridgeConfig;
use crate::utils::error::Error;
use crate::Result;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEstimate {
    #[serde(flatten)]
    pub estimate: FeeEstimate,
    pub rank: usize,
    pub score: f64,
    pub fee_score: f64,
    pub speed_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeComparison {
    pub source_chain: String,
    pub dest_chain: String,
    pub token: String,
    pub amount: Decimal,
    /// Best first
    pub estimates: Vec<RankedEstimate>,
    pub cheapest: String,
    pub fastest: String,
}

impl BridgeComparison {
    pub fn best(&self) -> Option<&RankedEstimate> {
        self.estimates.first()
    }
}

/// Estimate with every adapter that covers both chains and rank by the
/// weighted fee and speed scores.
pub fn compare_bridges(
    adapters: &[Arc<dyn BridgeAdapter>],
    source_chain: &str,
    dest_chain: &str,
    token: &str,
    amount: Decimal,
    config: &BridgeConfig,
) -> Result<BridgeComparison> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidArgument(format!("amount must be positive, got {}", amount)));
    }
    if source_chain.eq_ignore_ascii_case(dest_chain) {
        return Err(Error::InvalidArgument("source and destination chains are the same".to_string()));
    }

    let estimates: Vec<FeeEstimate> = adapters
        .iter()
        .filter(|a| a.supports(source_chain, dest_chain))
        .map(|a| a.estimate(source_chain, dest_chain, token, amount))
        .collect();
    if estimates.is_empty() {
        return Err(Error::BridgeError(format!(
            "no bridge supports {} -> {}",
            source_chain.to_lowercase(),
            dest_chain.to_lowercase()
        )));
    }
    log::debug!("{} bridges cover {} -> {}", estimates.len(), source_chain, dest_chain);

    let fees: Vec<f64> = estimates.iter().map(|e| e.total_fee.to_f64().unwrap_or(f64::MAX)).collect();
    let minutes: Vec<f64> = estimates.iter().map(|e| e.estimated_minutes as f64).collect();
    let fee_scores = inverted_rank(&fees);
    let speed_scores = inverted_rank(&minutes);
    let weights: WeightMap = [("fee", config.fee_weight), ("speed", config.speed_weight)].into_iter().collect();

    let cheapest = estimates
        .iter()
        .min_by(|a, b| a.total_fee.cmp(&b.total_fee))
        .map(|e| e.bridge.clone())
        .unwrap_or_default();
    let fastest = estimates
        .iter()
        .min_by_key(|e| e.estimated_minutes)
        .map(|e| e.bridge.clone())
        .unwrap_or_default();

    let mut ranked: Vec<RankedEstimate> = estimates
        .into_iter()
        .enumerate()
        .map(|(i, estimate)| {
            let components = vec![
                ComponentScore::new("fee", fee_scores[i], config.fee_weight),
                ComponentScore::new("speed", speed_scores[i], config.speed_weight),
            ];
            RankedEstimate {
                estimate,
                rank: 0,
                score: composite(components, &weights).score,
                fee_score: fee_scores[i],
                speed_score: speed_scores[i],
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    for (i, r) in ranked.iter_mut().enumerate() {
        r.rank = i + 1;
    }

    Ok(BridgeComparison {
        source_chain: source_chain.to_lowercase(),
        dest_chain: dest_chain.to_lowercase(),
        token: token.to_uppercase(),
        amount,
        estimates: ranked,
        cheapest,
        fastest,
    })
}
