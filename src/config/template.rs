//! Configuration template generation

use crate::config::Config;
use crate::utils::error::Result;
use std::fs;
use std::path::Path;

/// Commented default configuration written by `cryptopulse init`
pub const COMMENTED_TEMPLATE: &str = r#"# cryptopulse configuration
# This is a template configuration file with all available options.
# Uncomment and modify the values as needed.

version = "0.1.0"

[app]
# Log level when CRYPTOPULSE_LOG is not set (error, warn, info, debug, trace)
log_level = "info"

# Cache upstream responses on disk
cache_enabled = true

# Cache directory (defaults to the platform cache dir, or CRYPTOPULSE_CACHE_DIR)
# cache_dir = "/var/cache/cryptopulse"

# Output format when --format is not given (table, json, csv)
default_format = "table"

[sentiment]
# Sources queried in a full run, and in a --quick run
sources = ["fear_greed", "news", "momentum"]
quick_sources = ["fear_greed"]

# End-to-end budget of a run, in seconds
full_budget_secs = 15
quick_budget_secs = 5

# Timeout of a single upstream fetch, in seconds
fetch_timeout_secs = 10

# Answer a failed fetch from an expired cache entry
serve_stale_on_error = false

[sentiment.weights]
# Declared weights; renormalized over the sources that answered
fear_greed = 0.4
momentum = 0.2
news = 0.4

[sources.fear_greed]
base_url = "https://api.alternative.me"
ttl_secs = 300
# Daily values requested; the first one is the current index
history_limit = 1

[sources.news]
feeds = [
    "https://cointelegraph.com/rss",
    "https://www.coindesk.com/arc/outboundfeeds/rss/",
    "https://decrypt.co/feed",
]
ttl_secs = 120
max_items_per_feed = 30

[sources.news.aggregator]
# Used instead of the RSS feeds when it answers the startup probe
enabled = true
base_url = "https://min-api.cryptocompare.com"
probe_timeout_ms = 1500
# api_key = ""  # or CRYPTOCOMPARE_API_KEY

[sources.momentum]
base_url = "https://api.coingecko.com/api/v3"
ttl_secs = 60
# api_key = ""  # or COINGECKO_API_KEY

[retry]
# A rate-limited fetch is retried once after this delay
rate_limit_delay_ms = 1000
max_retries = 1

[dex]
default_chain = "ethereum"
eth_price_usd = 2500.0
gas_price_gwei = 30.0
quote_timeout_secs = 10
budget_secs = 15

[dex.weights]
freshness = 0.1
gas = 0.2
output = 0.6
reliability = 0.1

[dex.oneinch]
enabled = true
base_url = "https://api.1inch.dev/swap/v6.0"
# api_key = ""  # or ONEINCH_API_KEY

[dex.paraswap]
enabled = true
base_url = "https://apiv5.paraswap.io"

[dex.zerox]
enabled = true
base_url = "https://api.0x.org"
# api_key = ""  # or ZEROX_API_KEY

[bridge]
# Ranking weights over total fee and transfer time
fee_weight = 0.7
speed_weight = 0.3
# Volume and TVL listings for bridge-stats
stats_base_url = "https://bridges.llama.fi"
stats_timeout_secs = 30
"#;

/// Generate a default configuration file at the specified path
pub fn generate_config_template<P: AsRef<Path>>(path: P) -> Result<()> {
    Config::default().save(path)
}

/// Generate a configuration file with comments explaining each field
pub fn generate_commented_config_template<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, COMMENTED_TEMPLATE)?;
    Ok(())
}
