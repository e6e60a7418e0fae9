//! Scoring pipeline: normalize, weight, composite, classify, report.

pub mod classifier;
pub mod composite;
pub mod normalizer;
pub mod report;
pub mod weights;

pub use classifier::{classify, ClassificationBand, Sentiment, BANDS};
pub use composite::{composite, ComponentScore, CompositeResult, ScoredComponent};
pub use normalizer::{direct_rank, inverted_rank, normalize, normalize_at, Normalized};
pub use report::{ReportMeta, SentimentReport};
pub use weights::{resolve_weights, WeightMap};
