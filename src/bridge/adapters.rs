//! Simplified fee models. Gas figures are flat estimates in the bridged token.

use super::{BridgeAdapter, FeeEstimate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

struct FeeModel {
    rate: Decimal,
    gas_source: Decimal,
    gas_dest: Decimal,
    minutes: u32,
    /// Destination gas is covered by the relayer and left out of the total
    relayer_pays_dest: bool,
}

impl FeeModel {
    fn apply(&self, bridge: &str, source_chain: &str, dest_chain: &str, token: &str, amount: Decimal) -> FeeEstimate {
        let bridge_fee = amount * self.rate;
        let mut total_fee = bridge_fee + self.gas_source;
        if !self.relayer_pays_dest {
            total_fee += self.gas_dest;
        }
        FeeEstimate {
            bridge: bridge.to_string(),
            source_chain: source_chain.to_lowercase(),
            dest_chain: dest_chain.to_lowercase(),
            token: token.to_uppercase(),
            amount,
            bridge_fee,
            gas_fee_source: self.gas_source,
            gas_fee_dest: self.gas_dest,
            total_fee,
            estimated_minutes: self.minutes,
        }
    }
}

const LAYERZERO_CHAINS: &[(&str, u32)] = &[
    ("ethereum", 101),
    ("bsc", 102),
    ("avalanche", 106),
    ("polygon", 109),
    ("arbitrum", 110),
    ("optimism", 111),
    ("fantom", 112),
    ("base", 184),
];

pub struct WormholeAdapter;

impl BridgeAdapter for WormholeAdapter {
    fn name(&self) -> &'static str {
        "Wormhole"
    }

    fn chain_ids(&self) -> &'static [(&'static str, u32)] {
        &[
            ("ethereum", 2),
            ("solana", 1),
            ("bsc", 4),
            ("polygon", 5),
            ("avalanche", 6),
            ("fantom", 10),
            ("arbitrum", 23),
            ("optimism", 24),
            ("base", 30),
        ]
    }

    fn estimate(&self, source_chain: &str, dest_chain: &str, token: &str, amount: Decimal) -> FeeEstimate {
        FeeModel { rate: dec!(0.001), gas_source: dec!(0.005), gas_dest: dec!(0.002), minutes: 15, relayer_pays_dest: false }
            .apply(self.name(), source_chain, dest_chain, token, amount)
    }
}

pub struct LayerZeroAdapter;

impl BridgeAdapter for LayerZeroAdapter {
    fn name(&self) -> &'static str {
        "LayerZero"
    }

    fn chain_ids(&self) -> &'static [(&'static str, u32)] {
        LAYERZERO_CHAINS
    }

    fn estimate(&self, source_chain: &str, dest_chain: &str, token: &str, amount: Decimal) -> FeeEstimate {
        FeeModel { rate: dec!(0.0006), gas_source: dec!(0.008), gas_dest: dec!(0.003), minutes: 3, relayer_pays_dest: false }
            .apply(self.name(), source_chain, dest_chain, token, amount)
    }
}

/// Runs on LayerZero, so shares its chain table.
pub struct StargateAdapter;

impl BridgeAdapter for StargateAdapter {
    fn name(&self) -> &'static str {
        "Stargate"
    }

    fn chain_ids(&self) -> &'static [(&'static str, u32)] {
        LAYERZERO_CHAINS
    }

    fn estimate(&self, source_chain: &str, dest_chain: &str, token: &str, amount: Decimal) -> FeeEstimate {
        FeeModel { rate: dec!(0.0006), gas_source: dec!(0.01), gas_dest: dec!(0.005), minutes: 2, relayer_pays_dest: false }
            .apply(self.name(), source_chain, dest_chain, token, amount)
    }
}

pub struct AcrossAdapter;

impl BridgeAdapter for AcrossAdapter {
    fn name(&self) -> &'static str {
        "Across"
    }

    fn chain_ids(&self) -> &'static [(&'static str, u32)] {
        &[("ethereum", 1), ("optimism", 10), ("arbitrum", 42161), ("polygon", 137), ("base", 8453), ("zksync", 324)]
    }

    fn estimate(&self, source_chain: &str, dest_chain: &str, token: &str, amount: Decimal) -> FeeEstimate {
        FeeModel { rate: dec!(0.0004), gas_source: dec!(0.006), gas_dest: dec!(0), minutes: 1, relayer_pays_dest: true }
            .apply(self.name(), source_chain, dest_chain, token, amount)
    }
}
