//! Immutable sentiment report assembled from a composite result and run metadata.

use super::composite::{CompositeResult, ScoredComponent};
use crate::utils::types::{AnalysisMode, AnalysisQuery, Period};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMeta {
    pub timestamp: DateTime<Utc>,
    pub period: Period,
    pub coin_filter: Option<String>,
    pub mode: AnalysisMode,
    /// Effective weight per source in this run
    pub weights: BTreeMap<String, f64>,
    /// Fetch error per failed source, plus rejected weight entries under `weights`
    pub errors: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentReport {
    pub composite_score: f64,
    pub classification: String,
    pub interpretation: String,
    pub components: Vec<ScoredComponent>,
    pub degraded: bool,
    pub missing_sources: Vec<String>,
    pub meta: ReportMeta,
}

impl SentimentReport {
    /// Details are dropped unless the query asked for them.
    pub fn build(
        result: CompositeResult,
        query: &AnalysisQuery,
        errors: BTreeMap<String, String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let weights = result
            .components
            .iter()
            .map(|c| (c.component.source_id.clone(), c.effective_weight))
            .collect();
        let components = result
            .components
            .iter()
            .cloned()
            .map(|mut c| {
                if !query.detailed {
                    c.component.details = None;
                }
                c
            })
            .collect();

        Self {
            composite_score: result.display_score(),
            classification: result.classification.label().to_string(),
            interpretation: result.classification.interpretation().to_string(),
            components,
            degraded: result.degraded,
            missing_sources: result.missing_sources,
            meta: ReportMeta {
                timestamp,
                period: query.period,
                coin_filter: query.coin_filter.clone(),
                mode: query.mode,
                weights,
                errors,
            },
        }
    }

    pub fn component(&self, source_id: &str) -> Option<&ScoredComponent> {
        self.components.iter().find(|c| c.component.source_id == source_id)
    }
}

/// Round to `places` decimals for display.
pub fn round_to(v: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (v * f).round() / f
}
