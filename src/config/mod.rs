//! Configuration for cryptopulse

mod template;

use crate::utils::error::{Error, Result};
use crate::utils::types::{OutputFormat, FEAR_GREED, KNOWN_SOURCES, MOMENTUM, NEWS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use template::{generate_commented_config_template, generate_config_template, COMMENTED_TEMPLATE};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Configuration file version
    #[serde(default = "default_version")]
    pub version: String,

    /// Logging, cache location and output defaults
    #[serde(default)]
    pub app: AppConfig,

    /// Composite sentiment: weights, mode budgets and timeouts
    #[serde(default)]
    pub sentiment: SentimentConfig,

    /// Endpoints and cache TTLs of the sentiment sources
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Rate-limit retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// DEX aggregator quotes and route ranking
    #[serde(default)]
    pub dex: DexConfig,

    /// Bridge fee comparison
    #[serde(default)]
    pub bridge: BridgeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Log level used when CRYPTOPULSE_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable the on-disk response cache
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Cache directory; defaults to the platform cache dir
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Output format when --format is not given
    #[serde(default)]
    pub default_format: OutputFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentConfig {
    /// Declared weight per source id. Need not sum to 1.
    #[serde(default = "default_sentiment_weights")]
    pub weights: BTreeMap<String, f64>,

    /// Sources queried in full mode
    #[serde(default = "default_full_sources")]
    pub sources: Vec<String>,

    /// Sources queried in quick mode
    #[serde(default = "default_quick_sources")]
    pub quick_sources: Vec<String>,

    /// End-to-end budget of a full run
    #[serde(default = "default_full_budget_secs")]
    pub full_budget_secs: u64,

    /// End-to-end budget of a quick run
    #[serde(default = "default_quick_budget_secs")]
    pub quick_budget_secs: u64,

    /// Independent timeout of a single fetch
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Answer a failed fetch from an expired cache entry when one exists
    #[serde(default)]
    pub serve_stale_on_error: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SourcesConfig {
    #[serde(default)]
    pub fear_greed: FearGreedConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub momentum: MomentumConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FearGreedConfig {
    #[serde(default = "default_fng_url")]
    pub base_url: String,
    #[serde(default = "default_fng_ttl")]
    pub ttl_secs: u64,
    /// Number of daily index values requested; the first is the current one
    #[serde(default = "default_fng_history")]
    pub history_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsConfig {
    #[serde(default = "default_news_feeds")]
    pub feeds: Vec<String>,
    #[serde(default = "default_news_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_items_per_feed")]
    pub max_items_per_feed: usize,
    #[serde(default)]
    pub aggregator: NewsAggregatorConfig,
}

/// CryptoCompare-style news API, preferred over RSS when reachable
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsAggregatorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_news_aggregator_url")]
    pub base_url: String,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MomentumConfig {
    #[serde(default = "default_coingecko_url")]
    pub base_url: String,
    #[serde(default = "default_momentum_ttl")]
    pub ttl_secs: u64,
    /// Sent as `x-cg-demo-api-key`
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Delay before the single retry of a rate-limited fetch
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,
    /// Retries after a RateLimited failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DexConfig {
    #[serde(default = "default_chain")]
    pub default_chain: String,
    /// ETH/USD used to price gas when not given on the command line
    #[serde(default = "default_eth_price")]
    pub eth_price_usd: f64,
    #[serde(default = "default_gas_price_gwei")]
    pub gas_price_gwei: f64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub quote_timeout_secs: u64,
    #[serde(default = "default_full_budget_secs")]
    pub budget_secs: u64,
    /// Ranking weights over output, gas, reliability and freshness
    #[serde(default = "default_route_weights")]
    pub weights: BTreeMap<String, f64>,
    #[serde(default = "default_oneinch")]
    pub oneinch: AggregatorConfig,
    #[serde(default = "default_paraswap")]
    pub paraswap: AggregatorConfig,
    #[serde(default = "default_zerox")]
    pub zerox: AggregatorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    #[serde(default = "default_fee_weight")]
    pub fee_weight: f64,
    #[serde(default = "default_speed_weight")]
    pub speed_weight: f64,
    /// DefiLlama bridges API used by `bridge-stats`
    #[serde(default = "default_bridge_stats_url")]
    pub stats_base_url: String,
    #[serde(default = "default_bridge_stats_timeout_secs")]
    pub stats_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            app: AppConfig::default(),
            sentiment: SentimentConfig::default(),
            sources: SourcesConfig::default(),
            retry: RetryConfig::default(),
            dex: DexConfig::default(),
            bridge: BridgeConfig::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            cache_enabled: true,
            cache_dir: None,
            default_format: OutputFormat::Table,
        }
    }
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            weights: default_sentiment_weights(),
            sources: default_full_sources(),
            quick_sources: default_quick_sources(),
            full_budget_secs: default_full_budget_secs(),
            quick_budget_secs: default_quick_budget_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            serve_stale_on_error: false,
        }
    }
}

impl Default for FearGreedConfig {
    fn default() -> Self {
        Self {
            base_url: default_fng_url(),
            ttl_secs: default_fng_ttl(),
            history_limit: default_fng_history(),
        }
    }
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            feeds: default_news_feeds(),
            ttl_secs: default_news_ttl(),
            max_items_per_feed: default_items_per_feed(),
            aggregator: NewsAggregatorConfig::default(),
        }
    }
}

impl Default for NewsAggregatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_news_aggregator_url(),
            probe_timeout_ms: default_probe_timeout_ms(),
            api_key: None,
        }
    }
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self { base_url: default_coingecko_url(), ttl_secs: default_momentum_ttl(), api_key: None }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { rate_limit_delay_ms: default_rate_limit_delay_ms(), max_retries: default_max_retries() }
    }
}

impl Default for DexConfig {
    fn default() -> Self {
        Self {
            default_chain: default_chain(),
            eth_price_usd: default_eth_price(),
            gas_price_gwei: default_gas_price_gwei(),
            quote_timeout_secs: default_fetch_timeout_secs(),
            budget_secs: default_full_budget_secs(),
            weights: default_route_weights(),
            oneinch: default_oneinch(),
            paraswap: default_paraswap(),
            zerox: default_zerox(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            fee_weight: default_fee_weight(),
            speed_weight: default_speed_weight(),
            stats_base_url: default_bridge_stats_url(),
            stats_timeout_secs: default_bridge_stats_timeout_secs(),
        }
    }
}

// --------- Helper default functions for serde ---------
fn default_version() -> String {
    "0.1.0".to_string()
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_sentiment_weights() -> BTreeMap<String, f64> {
    BTreeMap::from([
        (FEAR_GREED.to_string(), 0.40),
        (NEWS.to_string(), 0.40),
        (MOMENTUM.to_string(), 0.20),
    ])
}
fn default_full_sources() -> Vec<String> {
    KNOWN_SOURCES.iter().map(|s| s.to_string()).collect()
}
fn default_quick_sources() -> Vec<String> {
    vec![FEAR_GREED.to_string()]
}
fn default_full_budget_secs() -> u64 {
    15
}
fn default_quick_budget_secs() -> u64 {
    5
}
fn default_fetch_timeout_secs() -> u64 {
    10
}
fn default_fng_url() -> String {
    "https://api.alternative.me".to_string()
}
fn default_fng_ttl() -> u64 {
    300
}
fn default_fng_history() -> u32 {
    1
}
fn default_news_feeds() -> Vec<String> {
    vec![
        "https://cointelegraph.com/rss".to_string(),
        "https://www.coindesk.com/arc/outboundfeeds/rss/".to_string(),
        "https://decrypt.co/feed".to_string(),
    ]
}
fn default_news_ttl() -> u64 {
    120
}
fn default_items_per_feed() -> usize {
    30
}
fn default_news_aggregator_url() -> String {
    "https://min-api.cryptocompare.com".to_string()
}
fn default_probe_timeout_ms() -> u64 {
    1_500
}
fn default_coingecko_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}
fn default_momentum_ttl() -> u64 {
    60
}
fn default_rate_limit_delay_ms() -> u64 {
    1_000
}
fn default_max_retries() -> u32 {
    1
}
fn default_chain() -> String {
    "ethereum".to_string()
}
fn default_eth_price() -> f64 {
    2500.0
}
fn default_gas_price_gwei() -> f64 {
    30.0
}
fn default_route_weights() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("output".to_string(), 0.6),
        ("gas".to_string(), 0.2),
        ("reliability".to_string(), 0.1),
        ("freshness".to_string(), 0.1),
    ])
}
fn default_oneinch() -> AggregatorConfig {
    AggregatorConfig { enabled: true, base_url: "https://api.1inch.dev/swap/v6.0".to_string(), api_key: None }
}
fn default_paraswap() -> AggregatorConfig {
    AggregatorConfig { enabled: true, base_url: "https://apiv5.paraswap.io".to_string(), api_key: None }
}
fn default_zerox() -> AggregatorConfig {
    AggregatorConfig { enabled: true, base_url: "https://api.0x.org".to_string(), api_key: None }
}
fn default_fee_weight() -> f64 {
    0.7
}
fn default_speed_weight() -> f64 {
    0.3
}
fn default_bridge_stats_url() -> String {
    "https://bridges.llama.fi".to_string()
}
fn default_bridge_stats_timeout_secs() -> u64 {
    30
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref(),
        Some("yaml") | Some("yml")
    )
}

impl Config {
    /// Serialize default config to TOML string
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Self::default())
            .map_err(|e| Error::ConfigError(format!("Failed to serialize default config: {}", e)))
    }

    /// Parse configuration text. YAML when `yaml` is set, TOML otherwise.
    pub fn parse(content: &str, yaml: bool) -> Result<Self> {
        if yaml {
            serde_yaml::from_str(content)
                .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))
        } else {
            toml::from_str(content)
                .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))
        }
    }

    /// Load configuration from a specific file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = crate::utils::read_file(path).map_err(|e| Error::ConfigError(format!("{:#}", e)))?;
        let mut cfg = Self::parse(&content, is_yaml(path))?;
        cfg.merge_env()?;
        Ok(cfg)
    }

    /// Save the configuration to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml(path) {
            serde_yaml::to_string(self)
                .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?
        } else {
            toml::to_string_pretty(self)
                .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }
        std::fs::write(path, content)
            .map_err(|e| Error::ConfigError(format!("Failed to write config file {:?}: {}", path, e)))?;
        Ok(())
    }

    /// Validate the configuration for required fields and reasonable values.
    ///
    /// Weight maps are not checked here: bad entries are dropped with a
    /// warning when the weights are resolved for a run.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(Error::ConfigError("Config version must be set (e.g., '0.1.0')".to_string()));
        }
        let s = &self.sentiment;
        if s.full_budget_secs == 0 || s.quick_budget_secs == 0 {
            return Err(Error::ConfigError("sentiment budgets must be > 0".to_string()));
        }
        if s.fetch_timeout_secs == 0 {
            return Err(Error::ConfigError("sentiment.fetch_timeout_secs must be > 0".to_string()));
        }
        for id in s.sources.iter().chain(s.quick_sources.iter()) {
            if !KNOWN_SOURCES.contains(&id.as_str()) {
                return Err(Error::ConfigError(format!("Unknown sentiment source '{}'", id)));
            }
        }
        for (name, url) in [
            ("sources.fear_greed.base_url", &self.sources.fear_greed.base_url),
            ("sources.momentum.base_url", &self.sources.momentum.base_url),
            ("sources.news.aggregator.base_url", &self.sources.news.aggregator.base_url),
            ("dex.oneinch.base_url", &self.dex.oneinch.base_url),
            ("dex.paraswap.base_url", &self.dex.paraswap.base_url),
            ("dex.zerox.base_url", &self.dex.zerox.base_url),
            ("bridge.stats_base_url", &self.bridge.stats_base_url),
        ] {
            url::Url::parse(url)
                .map_err(|e| Error::ConfigError(format!("{} is not a valid URL ({}): {}", name, url, e)))?;
        }
        if self.sources.fear_greed.history_limit == 0 {
            return Err(Error::ConfigError("sources.fear_greed.history_limit must be > 0".to_string()));
        }
        if self.dex.eth_price_usd <= 0.0 || self.dex.gas_price_gwei < 0.0 {
            return Err(Error::ConfigError(
                "dex.eth_price_usd must be > 0 and dex.gas_price_gwei >= 0".to_string(),
            ));
        }
        if self.dex.quote_timeout_secs == 0 || self.dex.budget_secs == 0 {
            return Err(Error::ConfigError("dex timeouts must be > 0".to_string()));
        }
        if self.bridge.fee_weight < 0.0 || self.bridge.speed_weight < 0.0 {
            return Err(Error::ConfigError("bridge weights cannot be negative".to_string()));
        }
        if self.bridge.stats_timeout_secs == 0 {
            return Err(Error::ConfigError("bridge.stats_timeout_secs must be > 0".to_string()));
        }
        Ok(())
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        // Try to load from current directory
        if Path::new("config.toml").exists() {
            return Self::from_file("config.toml");
        }

        // Try to load from user config directory
        if let Some(path) = crate::utils::user_config_file() {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        // Return default config if no config file found
        let mut config = Self::default();
        config.merge_env()?;
        Ok(config)
    }

    /// Merge environment variables into the configuration
    pub fn merge_env(&mut self) -> Result<()> {
        if let Ok(dir) = env::var("CRYPTOPULSE_CACHE_DIR") {
            self.app.cache_dir = Some(PathBuf::from(dir));
        }

        if let Ok(level) = env::var("CRYPTOPULSE_LOG_LEVEL") {
            self.app.log_level = level;
        }

        if let Ok(key) = env::var("ONEINCH_API_KEY") {
            self.dex.oneinch.api_key = Some(key);
        }

        if let Ok(key) = env::var("ZEROX_API_KEY") {
            self.dex.zerox.api_key = Some(key);
        }

        if let Ok(key) = env::var("COINGECKO_API_KEY") {
            self.sources.momentum.api_key = Some(key);
        }

        if let Ok(key) = env::var("CRYPTOCOMPARE_API_KEY") {
            self.sources.news.aggregator.api_key = Some(key);
        }

        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.sentiment.fetch_timeout_secs)
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.retry.rate_limit_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sentiment.weights.get(FEAR_GREED), Some(&0.40));
        assert_eq!(config.sentiment.quick_sources, vec![FEAR_GREED.to_string()]);
        assert_eq!(config.sentiment.full_budget_secs, 15);
        assert_eq!(config.sentiment.quick_budget_secs, 5);
        assert!(!config.sentiment.serve_stale_on_error);
        assert_eq!(config.retry.rate_limit_delay_ms, 1_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_save_and_load_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.sources.fear_greed.base_url = "http://127.0.0.1:9000".to_string();
        config.sentiment.weights.insert(NEWS.to_string(), 0.5);

        config.save(&config_path).unwrap();

        let loaded_config = Config::from_file(&config_path).unwrap();
        assert_eq!(loaded_config, config);
    }

    #[test]
    #[serial]
    fn test_yaml_round_trip() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut config = Config::default();
        config.bridge.fee_weight = 0.9;
        config.save(&config_path).unwrap();

        let loaded = Config::from_file(&config_path).unwrap();
        assert_eq!(loaded.bridge.fee_weight, 0.9);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let cfg = Config::parse("[sentiment]\nquick_sources = [\"momentum\"]\n", false).unwrap();
        assert_eq!(cfg.sentiment.quick_sources, vec![MOMENTUM.to_string()]);
        assert_eq!(cfg.sentiment.weights, default_sentiment_weights());
        assert_eq!(cfg.sources.news.ttl_secs, 120);
    }

    #[test]
    fn test_validate_rejects_unknown_source() {
        let mut cfg = Config::default();
        cfg.sentiment.quick_sources.push("twitter".to_string());
        assert!(matches!(cfg.validate(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut cfg = Config::default();
        cfg.dex.paraswap.base_url = "not a url".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_load_reads_user_config_dir() {
        let temp_dir = tempdir().unwrap();
        let mut config = Config::default();
        config.sentiment.fetch_timeout_secs = 3;
        config.save(temp_dir.path().join("cryptopulse").join("config.toml")).unwrap();

        temp_env::with_var("XDG_CONFIG_HOME", Some(temp_dir.path()), || {
            assert_eq!(Config::load().unwrap().sentiment.fetch_timeout_secs, 3);
        });
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let temp_dir = tempdir().unwrap();
        let err = Config::from_file(temp_dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(&err, Error::ConfigError(msg) if msg.contains("Failed to read file")));
    }

    #[test]
    #[serial]
    fn test_merge_env() {
        temp_env::with_vars(
            vec![
                ("CRYPTOPULSE_CACHE_DIR", Some("/tmp/cp-cache")),
                ("ONEINCH_API_KEY", Some("test_key")),
                ("COINGECKO_API_KEY", Some("cg_key")),
            ],
            || {
                let mut config = Config::default();
                config.merge_env().unwrap();

                assert_eq!(config.app.cache_dir, Some(PathBuf::from("/tmp/cp-cache")));
                assert_eq!(config.dex.oneinch.api_key, Some("test_key".to_string()));
                assert_eq!(config.sources.momentum.api_key, Some("cg_key".to_string()));
            },
        );
    }
}
