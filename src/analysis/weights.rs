//! Declared weight maps and `--weights` overrides.
//!
//! Invalid entries never fail a run: they are dropped and reported as
//! [`WeightError`] warnings, and the compositor renormalizes what is left.

use crate::utils::error::WeightError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `source_id -> declared weight`. Weights are non-negative and need not sum to 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightMap(BTreeMap<String, f64>);

/// Short names accepted on the command line.
fn canonical(name: &str) -> String {
    match name.trim().to_lowercase().as_str() {
        | "fng" | "feargreed" | "fear-greed" | "fear_and_greed" => "fear_greed".to_string(),
        | other => other.replace('-', "_"),
    }
}

fn check(source_id: &str, weight: f64, known: &[&str]) -> Result<(), WeightError> {
    if !known.is_empty() && !known.contains(&source_id) {
        return Err(WeightError::UnknownSource(source_id.to_string()));
    }
    if !weight.is_finite() {
        return Err(WeightError::Malformed(format!("{source_id}:{weight}")));
    }
    if weight < 0.0 {
        return Err(WeightError::Negative { source_id: source_id.to_string(), weight });
    }
    Ok(())
}

impl WeightMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the valid entries of `raw`. An empty `known` list accepts any id.
    pub fn sanitize(raw: &BTreeMap<String, f64>, known: &[&str]) -> (Self, Vec<WeightError>) {
        let mut map = BTreeMap::new();
        let mut errors = Vec::new();
        for (id, weight) in raw {
            let id = canonical(id);
            match check(&id, *weight, known) {
                | Ok(()) => {
                    map.insert(id, *weight);
                }
                | Err(e) => errors.push(e),
            }
        }
        (Self(map), errors)
    }

    /// Parse `news:0.5,fng:0.3,momentum:0.2`.
    pub fn parse(spec: &str, known: &[&str]) -> (Self, Vec<WeightError>) {
        let mut raw = BTreeMap::new();
        let mut errors = Vec::new();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let parsed = entry
                .split_once(':')
                .and_then(|(name, value)| Some((name.trim(), value.trim().parse::<f64>().ok()?)))
                .filter(|(name, _)| !name.is_empty());
            match parsed {
                | Some((name, weight)) => {
                    raw.insert(name.to_string(), weight);
                }
                | None => errors.push(WeightError::Malformed(entry.to_string())),
            }
        }
        let (map, mut rejected) = Self::sanitize(&raw, known);
        errors.append(&mut rejected);
        (map, errors)
    }

    /// Entries of `overrides` replace ours; everything else keeps its weight.
    pub fn merged_with(&self, overrides: &WeightMap) -> WeightMap {
        let mut merged = self.0.clone();
        merged.extend(overrides.0.iter().map(|(k, v)| (k.clone(), *v)));
        WeightMap(merged)
    }

    pub fn get(&self, source_id: &str) -> Option<f64> {
        self.0.get(source_id).copied()
    }

    pub fn insert(&mut self, source_id: impl Into<String>, weight: f64) {
        self.0.insert(source_id.into(), weight);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for WeightMap {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        WeightMap(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Configured defaults merged with an optional command-line override.
/// Every rejected entry is logged as a warning and returned.
pub fn resolve_weights(
    defaults: &BTreeMap<String, f64>,
    override_spec: Option<&str>,
    known: &[&str],
) -> (WeightMap, Vec<WeightError>) {
    let (mut weights, mut errors) = WeightMap::sanitize(defaults, known);
    if let Some(spec) = override_spec {
        let (overrides, mut rejected) = WeightMap::parse(spec, known);
        errors.append(&mut rejected);
        weights = weights.merged_with(&overrides);
    }
    for err in &errors {
        log::warn!("Ignoring weight entry: {}", err);
    }
    (weights, errors)
}
