//! Chain ids, token address tables and decimals.

use crate::utils::error::Error;
use crate::Result;

/// Placeholder address the aggregators use for a chain's native coin.
pub const NATIVE: &str = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";

const ETHEREUM: &[(&str, &str)] = &[
    ("ETH", NATIVE),
    ("WETH", "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
    ("USDC", "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
    ("USDT", "0xdAC17F958D2ee523a2206206994597C13D831ec7"),
    ("DAI", "0x6B175474E89094C44Da98b954EedeAC495271d0F"),
    ("WBTC", "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599"),
];

const ARBITRUM: &[(&str, &str)] = &[
    ("ETH", NATIVE),
    ("WETH", "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1"),
    ("USDC", "0xaf88d065e77c8cC2239327C5EDb3A432268e5831"),
    ("USDT", "0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9"),
];

const POLYGON: &[(&str, &str)] = &[
    ("MATIC", NATIVE),
    ("WMATIC", "0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270"),
    ("USDC", "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174"),
    ("USDT", "0xc2132D05D31c914a87C6611C10748AEb04B58e8F"),
];

pub const SUPPORTED_CHAINS: [(&str, u64); 4] =
    [("ethereum", 1), ("arbitrum", 42161), ("polygon", 137), ("optimism", 10)];

pub fn chain_id(chain: &str) -> Result<u64> {
    let chain = chain.trim().to_lowercase();
    SUPPORTED_CHAINS
        .iter()
        .find(|(name, _)| *name == chain)
        .map(|(_, id)| *id)
        .ok_or_else(|| {
            let names: Vec<&str> = SUPPORTED_CHAINS.iter().map(|(n, _)| *n).collect();
            Error::InvalidArgument(format!("unsupported chain '{}' (expected one of {})", chain, names.join(", ")))
        })
}

fn table(chain: &str) -> &'static [(&'static str, &'static str)] {
    match chain {
        | "ethereum" => ETHEREUM,
        | "arbitrum" => ARBITRUM,
        | "polygon" => POLYGON,
        | _ => &[],
    }
}

fn is_address(s: &str) -> bool {
    s.len() == 42 && s.starts_with("0x") && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Symbol lookup per chain; a raw 42-char `0x` address passes through.
pub fn resolve_address(symbol: &str, chain: &str) -> Result<String> {
    let upper = symbol.trim().to_uppercase();
    let chain = chain.trim().to_lowercase();
    if let Some((_, addr)) = table(&chain).iter().find(|(s, _)| *s == upper) {
        return Ok((*addr).to_string());
    }
    if is_address(symbol.trim()) {
        return Ok(symbol.trim().to_string());
    }
    Err(Error::InvalidArgument(format!("Unknown token: {} on {}", symbol, chain)))
}

/// Dollar stables carry 6 decimals, WBTC 8, everything else 18.
pub fn decimals(symbol: &str) -> u32 {
    let upper = symbol.to_uppercase();
    if upper.contains("USD") {
        6
    } else if upper == "WBTC" {
        8
    } else {
        18
    }
}

pub fn is_usd_stable(symbol: &str) -> bool {
    let upper = symbol.to_uppercase();
    upper.contains("USD") || upper == "DAI"
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[rstest]
    #[case("ethereum", 1)]
    #[case("Arbitrum", 42161)]
    #[case("polygon", 137)]
    #[case("optimism", 10)]
    fn test_chain_ids(#[case] chain: &str, #[case] id: u64) {
        assert_eq!(chain_id(chain).unwrap(), id);
    }

    #[test]
    fn test_unknown_chain() {
        assert_matches!(chain_id("solana"), Err(Error::InvalidArgument(_)));
    }

    #[test]
    fn test_resolve_symbols() {
        assert_eq!(resolve_address("usdc", "ethereum").unwrap(), "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
        assert_eq!(resolve_address("ETH", "arbitrum").unwrap(), NATIVE);
        assert_eq!(resolve_address("WMATIC", "polygon").unwrap(), "0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270");
    }

    #[test]
    fn test_raw_address_passes_through() {
        let addr = "0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984";
        assert_eq!(resolve_address(addr, "ethereum").unwrap(), addr);
        assert_eq!(resolve_address(addr, "optimism").unwrap(), addr);
    }

    #[test]
    fn test_unknown_token() {
        assert_matches!(resolve_address("PEPE", "ethereum"), Err(Error::InvalidArgument(msg)) if msg.contains("PEPE"));
        assert_matches!(resolve_address("0x1234", "ethereum"), Err(Error::InvalidArgument(_)));
        // No table for optimism
        assert!(resolve_address("USDC", "optimism").is_err());
    }

    #[rstest]
    #[case("USDC", 6)]
    #[case("usdt", 6)]
    #[case("WBTC", 8)]
    #[case("ETH", 18)]
    #[case("DAI", 18)]
    fn test_decimals(#[case] symbol: &str, #[case] expected: u32) {
        assert_eq!(decimals(symbol), expected);
    }
}
