//! Cross-chain bridge fee comparison and DefiLlama bridge statistics.

mod adapters;
pub mod compare;
pub mod llama;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use adapters::{AcrossAdapter, LayerZeroAdapter, StargateAdapter, WormholeAdapter};
pub use compare::{compare_bridges, BridgeComparison, RankedEstimate};
pub use llama::{BridgeDetail, BridgeInfo, BridgeListing, BridgeTvl, ChainList, DefiLlamaClient, TvlEntry, TvlRanking};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeEstimate {
    pub bridge: String,
    pub source_chain: String,
    pub dest_chain: String,
    pub token: String,
    pub amount: Decimal,
    pub bridge_fee: Decimal,
    pub gas_fee_source: Decimal,
    pub gas_fee_dest: Decimal,
    pub total_fee: Decimal,
    pub estimated_minutes: u32,
}

/// A bridge's fee model and chain coverage.
pub trait BridgeAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Chain name to the bridge's own chain id
    fn chain_ids(&self) -> &'static [(&'static str, u32)];

    fn supports(&self, source_chain: &str, dest_chain: &str) -> bool {
        let ids = self.chain_ids();
        let has = |chain: &str| ids.iter().any(|(name, _)| name.eq_ignore_ascii_case(chain));
        has(source_chain) && has(dest_chain)
    }

    fn estimate(&self, source_chain: &str, dest_chain: &str, token: &str, amount: Decimal) -> FeeEstimate;
}

/// Every built-in adapter.
pub fn all_adapters() -> Vec<Arc<dyn BridgeAdapter>> {
    vec![
        Arc::new(WormholeAdapter),
        Arc::new(LayerZeroAdapter),
        Arc::new(StargateAdapter),
        Arc::new(AcrossAdapter),
    ]
}

/// Case-insensitive lookup by bridge name.
pub fn adapter(name: &str) -> Option<Arc<dyn BridgeAdapter>> {
    all_adapters().into_iter().find(|a| a.name().eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry() {
        assert_eq!(all_adapters().len(), 4);
        assert_eq!(adapter("STARGATE").unwrap().name(), "Stargate");
        assert!(adapter("hop").is_none());
    }

    #[test]
    fn test_supports_is_symmetric_on_coverage() {
        let across = adapter("across").unwrap();
        assert!(across.supports("ethereum", "zksync"));
        assert!(!across.supports("ethereum", "solana"));
        let wormhole = adapter("wormhole").unwrap();
        assert!(wormhole.supports("Solana", "ethereum"));
    }
}
