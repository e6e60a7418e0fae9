//! Weighted composite of normalized component scores.

use super::classifier::{classify, Sentiment};
use super::normalizer::{Normalized, NEUTRAL_SCORE};
use super::weights::WeightMap;
use crate::utils::error::FetchError;
use crate::utils::types::source_priority;
use serde::{Deserialize, Serialize};

/// One source's contribution to a run, before weighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    #[serde(rename = "source")]
    pub source_id: String,
    #[serde(skip)]
    pub raw_value: Option<f64>,
    #[serde(rename = "score")]
    pub normalized_score: f64,
    /// Declared weight; the weight map takes precedence when it names this source
    #[serde(rename = "declared_weight")]
    pub weight: f64,
    pub available: bool,
    pub substitute: bool,
    pub staleness_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<serde_json::Value>,
}

impl ComponentScore {
    pub fn new(source_id: impl Into<String>, normalized_score: f64, weight: f64) -> Self {
        Self {
            source_id: source_id.into(),
            raw_value: None,
            normalized_score,
            weight,
            available: true,
            substitute: false,
            staleness_secs: None,
            error: None,
            details: None,
        }
    }

    pub fn from_normalized(source_id: impl Into<String>, n: Normalized, weight: f64) -> Self {
        Self {
            raw_value: Some(n.raw_value),
            substitute: n.substitute,
            details: Some(n.details),
            ..Self::new(source_id, n.score, weight)
        }
    }

    pub fn unavailable(source_id: impl Into<String>, weight: f64, error: &FetchError) -> Self {
        Self {
            available: false,
            normalized_score: NEUTRAL_SCORE,
            error: Some(error.to_string()),
            ..Self::new(source_id, NEUTRAL_SCORE, weight)
        }
    }

    pub fn with_staleness(mut self, secs: u64) -> Self {
        self.staleness_secs = Some(secs);
        self
    }
}

/// A component with its share of the composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredComponent {
    #[serde(flatten)]
    pub component: ComponentScore,
    #[serde(rename = "weight")]
    pub effective_weight: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeResult {
    /// Full precision; use [`CompositeResult::display_score`] for output
    pub score: f64,
    pub classification: Sentiment,
    pub components: Vec<ScoredComponent>,
    pub degraded: bool,
    pub missing_sources: Vec<String>,
}

impl CompositeResult {
    pub fn display_score(&self) -> f64 {
        round1(self.score)
    }
}

pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn declared(c: &ComponentScore, weights: &WeightMap) -> f64 {
    let w = weights.get(&c.source_id).unwrap_or(c.weight);
    if w.is_finite() && w > 0.0 {
        w
    } else {
        0.0
    }
}

/// Combine components into one score, renormalizing the declared weights over
/// the available subset. Component order is preserved.
pub fn composite(components: Vec<ComponentScore>, weights: &WeightMap) -> CompositeResult {
    let mut missing: Vec<String> = components
        .iter()
        .filter(|c| !c.available)
        .map(|c| c.source_id.clone())
        .collect();
    missing.sort_by(|a, b| source_priority(a).cmp(&source_priority(b)));

    let available_count = components.iter().filter(|c| c.available).count();
    let total: f64 = components.iter().filter(|c| c.available).map(|c| declared(c, weights)).sum();
    let equal_share = total <= 0.0;
    if equal_share && available_count > 0 {
        log::warn!("Declared weights of available sources sum to 0, using equal weights");
    }

    let scored: Vec<ScoredComponent> = components
        .into_iter()
        .map(|c| {
            let effective_weight = match (c.available, equal_share) {
                | (false, _) => 0.0,
                | (true, true) => 1.0 / available_count as f64,
                | (true, false) => declared(&c, weights) / total,
            };
            let contribution = c.normalized_score * effective_weight;
            ScoredComponent { component: c, effective_weight, contribution }
        })
        .collect();

    let score = if available_count == 0 {
        NEUTRAL_SCORE
    } else {
        scored.iter().map(|s| s.contribution).sum::<f64>().clamp(0.0, 100.0)
    };

    CompositeResult {
        score,
        classification: classify(score),
        components: scored,
        degraded: !missing.is_empty(),
        missing_sources: missing,
    }
}
