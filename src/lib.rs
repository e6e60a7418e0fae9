//! # cryptopulse
//!
//! Multi-source crypto market sentiment. Independent signal sources (Fear &
//! Greed index, news headlines, market momentum) are fetched concurrently,
//! normalized to 0-100 and combined into a weighted composite that degrades
//! gracefully when sources fail. The same compositor ranks DEX aggregator
//! routes and cross-chain bridge fees.

pub use crate::utils::error::{Error, Result};

pub mod analysis;
pub mod bridge;
pub mod cache;
pub mod cli;
pub mod config;
pub mod dex;
pub mod engine;
pub mod metrics;
pub mod signal;
pub mod utils;

pub use analysis::{CompositeResult, SentimentReport};
pub use engine::SentimentOrchestrator;
pub use utils::types::{AnalysisMode, AnalysisQuery, Period};
