//! Command-line interface for cryptopulse

pub mod format;

use crate::bridge::{all_adapters, compare_bridges, DefiLlamaClient};
use crate::cache::{Cache, SledCache};
use crate::config::{self, Config};
use crate::dex::{DexFactory, GasPricing, RouteFinder, SwapParams};
use crate::engine::SentimentOrchestrator;
use crate::signal::build_sources;
use crate::utils::types::{AnalysisQuery, OutputFormat, Period};
use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use format::{render, Render};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Main CLI structure using clap derive
#[derive(Debug, Parser)]
#[command(name = "cryptopulse", author, version)]
#[command(about = "Crypto market sentiment, DEX route ranking and bridge fee comparison", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML or YAML) [default: ./config.toml, then the user config dir]
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format [default: from config, else table]
    #[arg(short, long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write the result to FILE instead of stdout
    #[arg(short, long, global = true, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print Prometheus metrics to stderr after the run
    #[arg(long, global = true)]
    pub metrics: bool,

    /// Skip the on-disk response cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Print the default configuration to stdout and exit
    #[arg(long)]
    pub print_default_config: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Composite market sentiment from the configured sources
    Sentiment {
        /// Restrict news and momentum to one coin (e.g. BTC)
        #[arg(long, value_name = "SYMBOL")]
        coin: Option<String>,

        /// Look-back period
        #[arg(short, long, value_enum, default_value_t = Period::Day)]
        period: Period,

        /// Include per-source details
        #[arg(short, long)]
        detailed: bool,

        /// Weight overrides, e.g. "news:0.5,fng:0.3"
        #[arg(short, long, value_name = "SPEC")]
        weights: Option<String>,

        /// Fast run over the quick source subset
        #[arg(short, long)]
        quick: bool,
    },

    /// Rank DEX aggregator routes for a swap
    Routes {
        /// Token to sell (symbol or 0x address)
        #[arg(long, value_name = "TOKEN")]
        from: String,

        /// Token to buy (symbol or 0x address)
        #[arg(long, value_name = "TOKEN")]
        to: String,

        /// Amount of the sell token
        #[arg(short, long)]
        amount: Decimal,

        /// ethereum, arbitrum, polygon or optimism [default: from config]
        #[arg(long)]
        chain: Option<String>,

        /// ETH/USD used to price gas
        #[arg(long, value_name = "USD")]
        eth_price: Option<f64>,

        /// Gas price in gwei
        #[arg(long, value_name = "GWEI")]
        gas_price: Option<f64>,
    },

    /// Compare bridge fees between two chains
    Bridges {
        /// Source chain
        #[arg(short, long)]
        source: String,

        /// Destination chain
        #[arg(short, long)]
        dest: String,

        /// Token to bridge
        #[arg(short, long, default_value = "USDC")]
        token: String,

        /// Amount to bridge
        #[arg(short, long)]
        amount: Decimal,
    },

    /// Bridge volume, TVL and chain coverage from DefiLlama
    BridgeStats {
        #[command(subcommand)]
        view: StatsView,
    },

    /// Write a configuration file (to --output, default config.toml)
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,

        /// Write the commented template instead of the bare defaults
        #[arg(long)]
        commented: bool,
    },

    /// Check the configuration file for errors
    CheckConfig,
}

/// Views of the DefiLlama bridge listings
#[derive(Debug, Subcommand)]
pub enum StatsView {
    /// Bridges ranked by 24h volume
    List {
        /// Only bridges touching this chain
        #[arg(long)]
        chain: Option<String>,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Locked value of the busiest bridges
    Tvl {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Volume, chains and TVL of one bridge (name or id)
    Detail { bridge: String },

    /// Every chain with bridge activity
    Chains,
}

/// Resolve the configuration. An explicit file is read when it exists and
/// falls back to defaults plus environment when it does not; without one the
/// search runs ./config.toml, then the user config dir, then defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        | Some(path) if path.exists() => {
            Config::from_file(path).with_context(|| format!("Failed to load configuration {}", path.display()))?
        }
        | Some(_) => {
            let mut config = Config::default();
            config.merge_env()?;
            config
        }
        | None => Config::load().context("Failed to load configuration")?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn open_cache(config: &Config, disabled: bool) -> Option<Arc<dyn Cache>> {
    if disabled || !config.app.cache_enabled {
        return None;
    }
    match SledCache::open_default(config.app.cache_dir.as_deref()) {
        | Ok(cache) => Some(Arc::new(cache)),
        | Err(e) => {
            log::warn!("Cache unavailable, fetching live: {}", e);
            None
        }
    }
}

impl Cli {
    /// Execute the parsed command.
    pub async fn execute(self) -> Result<()> {
        if self.print_default_config {
            print!("{}", Config::default_toml()?);
            return Ok(());
        }
        let Some(command) = &self.command else {
            Cli::command().print_help()?;
            return Ok(());
        };

        match command {
            | Commands::Init { force, commented } => return self.handle_init(*force, *commented),
            | Commands::CheckConfig => return self.handle_check_config(),
            | _ => {}
        }

        let config = load_config(self.config.as_deref())?;
        let level = if self.verbose { "debug" } else { config.app.log_level.as_str() };
        crate::utils::init_logging(level);
        if self.metrics {
            crate::metrics::init()?;
        }
        if let Some(path) = self.config.as_ref().filter(|p| !p.exists()) {
            log::warn!("Configuration file '{}' not found, using defaults", path.display());
        }
        let format = self.format.unwrap_or(config.app.default_format);

        let rendered = match command {
            | Commands::Sentiment { coin, period, detailed, weights, quick } => {
                let mut query = AnalysisQuery::new(coin.as_deref(), *period).detailed(*detailed);
                if *quick {
                    query = query.quick();
                }
                let ids = if *quick { &config.sentiment.quick_sources } else { &config.sentiment.sources };
                let started = tokio::time::Instant::now();
                let cache = open_cache(&config, self.no_cache);
                let sources = build_sources(&config, ids, cache).await?;
                let orchestrator = SentimentOrchestrator::from_config(&config, sources, weights.as_deref());
                let report = orchestrator.analyze_since(&query, started).await?;
                self.emit(&report, format)?
            }
            | Commands::Routes { from, to, amount, chain, eth_price, gas_price } => {
                let chain = chain.clone().unwrap_or_else(|| config.dex.default_chain.clone());
                let params = SwapParams::new(from, to, *amount, &chain)?;
                let mut pricing = GasPricing::from_config(&config.dex);
                if let Some(p) = eth_price {
                    pricing.eth_price_usd = *p;
                }
                if let Some(g) = gas_price {
                    pricing.gas_price_gwei = *g;
                }
                if pricing.eth_price_usd <= 0.0 || pricing.gas_price_gwei < 0.0 {
                    bail!("--eth-price must be > 0 and --gas-price >= 0");
                }
                let sources = DexFactory::create_sources(&config.dex)?;
                let comparison = RouteFinder::from_config(&config, sources, pricing).compare(&params).await?;
                self.emit(&comparison, format)?
            }
            | Commands::Bridges { source, dest, token, amount } => {
                let comparison = compare_bridges(&all_adapters(), source, dest, token, *amount, &config.bridge)?;
                self.emit(&comparison, format)?
            }
            | Commands::BridgeStats { view } => {
                let client = DefiLlamaClient::from_config(&config.bridge)?;
                match view {
                    | StatsView::List { chain, limit } => {
                        let listing =
                            client.listing(chain.as_deref(), *limit).await.context("DefiLlama request failed")?;
                        if listing.bridges.is_empty() {
                            bail!("No bridges found{}", chain.as_ref().map(|c| format!(" for {c}")).unwrap_or_default());
                        }
                        self.emit(&listing, format)?
                    }
                    | StatsView::Tvl { limit } => {
                        let ranking = client.tvl_ranking(*limit).await.context("DefiLlama request failed")?;
                        self.emit(&ranking, format)?
                    }
                    | StatsView::Detail { bridge } => {
                        match client.detail(bridge).await.context("DefiLlama request failed")? {
                            | Some(detail) => self.emit(&detail, format)?,
                            | None => bail!("Bridge not found: {}", bridge),
                        }
                    }
                    | StatsView::Chains => {
                        let chains = client.chains().await.context("DefiLlama request failed")?;
                        self.emit(&chains, format)?
                    }
                }
            }
            | Commands::Init { .. } | Commands::CheckConfig => None,
        };

        if let Some(text) = rendered {
            println!("{}", text);
        }
        if self.metrics {
            eprint!("{}", crate::metrics::render());
        }
        Ok(())
    }

    /// Render and either write to `--output` (returning `None`) or hand the
    /// text back for stdout.
    fn emit<R: Render>(&self, value: &R, format: OutputFormat) -> Result<Option<String>> {
        let text = render(value, format)?;
        match &self.output {
            | Some(path) => {
                crate::utils::write_file(path, format!("{text}\n"))?;
                log::info!("Wrote {} output to {}", format_name(format), path.display());
                Ok(None)
            }
            | None => Ok(Some(text)),
        }
    }

    fn handle_init(&self, force: bool, commented: bool) -> Result<()> {
        let output = self.output.clone().unwrap_or_else(|| PathBuf::from("config.toml"));
        if output.exists() && !force {
            bail!("File already exists: {}. Use --force to overwrite.", output.display());
        }
        if commented {
            config::generate_commented_config_template(&output)?;
            println!("Generated commented configuration at: {}", output.display());
        } else {
            config::generate_config_template(&output)?;
            println!("Generated configuration at: {}", output.display());
        }
        Ok(())
    }

    fn handle_check_config(&self) -> Result<()> {
        let path = self.config.clone().unwrap_or_else(|| PathBuf::from("config.toml"));
        println!("Checking configuration file: {}", path.display());
        if !path.exists() {
            bail!("Configuration file not found: {}", path.display());
        }
        let config = load_config(Some(path.as_path()))?;
        println!("✓ Configuration is valid");
        println!("\nConfiguration summary:");
        println!("  Sentiment sources: {}", config.sentiment.sources.join(", "));
        println!("  Quick sources: {}", config.sentiment.quick_sources.join(", "));
        let weights: Vec<String> = config.sentiment.weights.iter().map(|(k, v)| format!("{k}={v}")).collect();
        println!("  Weights: {}", weights.join(", "));
        println!(
            "  Cache: {}",
            if config.app.cache_enabled {
                config.app.cache_dir.as_ref().map(|d| d.display().to_string()).unwrap_or_else(|| "default".into())
            } else {
                "disabled".into()
            }
        );
        let aggregators: Vec<&str> = [("1inch", &config.dex.oneinch), ("paraswap", &config.dex.paraswap), ("0x", &config.dex.zerox)]
            .iter()
            .filter(|(_, a)| a.enabled)
            .map(|(n, _)| *n)
            .collect();
        println!("  DEX aggregators: {}", aggregators.join(", "));
        Ok(())
    }
}

fn format_name(format: OutputFormat) -> &'static str {
    match format {
        | OutputFormat::Table => "table",
        | OutputFormat::Json => "json",
        | OutputFormat::Csv => "csv",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    #[serial]
    fn test_load_config_search_order() {
        let dir = tempdir().unwrap();
        let user_file = dir.path().join("cryptopulse").join("config.toml");
        std::fs::create_dir_all(user_file.parent().unwrap()).unwrap();
        std::fs::write(&user_file, "[sentiment]\nfetch_timeout_secs = 3\n").unwrap();

        temp_env::with_var("XDG_CONFIG_HOME", Some(dir.path()), || {
            // No --config: falls through to the user config dir
            assert_eq!(load_config(None).unwrap().sentiment.fetch_timeout_secs, 3);

            // An explicit but missing file means defaults
            let missing = dir.path().join("missing.toml");
            assert_eq!(load_config(Some(missing.as_path())).unwrap().sentiment.fetch_timeout_secs, 10);
        });
    }

    #[test]
    fn test_sentiment_command() {
        let cli = Cli::parse_from([
            "cryptopulse", "sentiment", "--coin", "eth", "-p", "7d", "--weights", "news:0.5", "--quick", "-f", "json",
        ]);
        assert_eq!(cli.format, Some(OutputFormat::Json));
        match cli.command {
            | Some(Commands::Sentiment { coin, period, weights, quick, detailed }) => {
                assert_eq!(coin.as_deref(), Some("eth"));
                assert_eq!(period, Period::Week);
                assert_eq!(weights.as_deref(), Some("news:0.5"));
                assert!(quick);
                assert!(!detailed);
            }
            | other => panic!("Expected Sentiment command, got {:?}", other),
        }
    }

    #[test]
    fn test_routes_command() {
        let cli = Cli::parse_from([
            "cryptopulse", "routes", "--from", "ETH", "--to", "USDC", "--amount", "1.5", "--gas-price", "12",
        ]);
        match cli.command {
            | Some(Commands::Routes { amount, chain, gas_price, eth_price, .. }) => {
                assert_eq!(amount, dec!(1.5));
                assert_eq!(chain, None);
                assert_eq!(gas_price, Some(12.0));
                assert_eq!(eth_price, None);
            }
            | other => panic!("Expected Routes command, got {:?}", other),
        }
    }

    #[test]
    fn test_bridge_stats_command() {
        let cli = Cli::parse_from(["cryptopulse", "bridge-stats", "list", "--chain", "Base", "-l", "5"]);
        match cli.command {
            | Some(Commands::BridgeStats { view: StatsView::List { chain, limit } }) => {
                assert_eq!(chain.as_deref(), Some("Base"));
                assert_eq!(limit, 5);
            }
            | other => panic!("Expected bridge-stats list, got {:?}", other),
        }
        let cli = Cli::parse_from(["cryptopulse", "bridge-stats", "detail", "stargate", "-f", "json"]);
        assert!(matches!(cli.command, Some(Commands::BridgeStats { view: StatsView::Detail { .. } })));
    }

    #[test]
    fn test_global_output_after_subcommand() {
        let cli = Cli::parse_from(["cryptopulse", "init", "--output", "x.toml", "--force"]);
        assert_eq!(cli.output, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Some(Commands::Init { force: true, commented: false })));
    }

    #[tokio::test]
    async fn test_init_writes_loadable_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cli = Cli::parse_from(["cryptopulse", "init", "-o", path.to_str().unwrap()]);
        cli.execute().await.unwrap();
        assert_eq!(Config::from_file(&path).unwrap().bridge, Config::default().bridge);

        // Refuses to clobber without --force
        let cli = Cli::parse_from(["cryptopulse", "init", "-o", path.to_str().unwrap()]);
        assert!(cli.execute().await.is_err());
    }

    #[tokio::test]
    async fn test_bridges_to_file() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("bridges.csv");
        let cli = Cli::parse_from([
            "cryptopulse",
            "bridges",
            "--source",
            "ethereum",
            "--dest",
            "base",
            "--amount",
            "500",
            "-f",
            "csv",
            "-c",
            dir.path().join("missing.toml").to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
        ]);
        cli.execute().await.unwrap();
        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.starts_with("rank,bridge,"));
        assert_eq!(written.lines().count(), 5);
        assert!(written.ends_with('\n') && !written.ends_with("\n\n"));
    }
}
