//! Maps each source's native representation onto the common 0-100 scale.
//!
//! None of these functions fail: empty or degenerate input yields a neutral
//! or uniform score, flagged as a substitute where it is not a measurement.

use crate::signal::{ArticleSet, Payload, RawData, Tone};
use chrono::{DateTime, Utc};
use serde_json::json;

/// Neutral midpoint used when there is nothing to measure.
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Half-life style decay constant for article recency, in hours.
const RECENCY_HOURS: f64 = 12.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub score: f64,
    pub raw_value: f64,
    pub substitute: bool,
    pub details: serde_json::Value,
}

pub fn normalize(raw: &RawData) -> Normalized {
    normalize_at(raw, Utc::now())
}

/// Like [`normalize`] with an explicit clock for article ages.
pub fn normalize_at(raw: &RawData, now: DateTime<Utc>) -> Normalized {
    match &raw.payload {
        | Payload::Index(reading) => {
            let (score, substitute) = if reading.value.is_nan() {
                (NEUTRAL_SCORE, true)
            } else {
                (reading.value.clamp(0.0, 100.0), false)
            };
            Normalized {
                score,
                raw_value: reading.value,
                substitute,
                details: json!({
                    "value": reading.value,
                    "classification": reading.label,
                    "timestamp": reading.timestamp,
                    "time_until_update": reading.time_until_update,
                    "history": reading.history,
                }),
            }
        }
        | Payload::Articles(set) => normalize_articles(set, now),
        | Payload::Momentum(m) => {
            let price = price_score(m.price_change_pct);
            let volume = volume_score(m.volume_ratio);
            Normalized {
                score: momentum_score(m.price_change_pct, m.volume_ratio),
                raw_value: m.price_change_pct,
                substitute: false,
                details: json!({
                    "scope": m.scope,
                    "price_change_pct": m.price_change_pct,
                    "volume_ratio": m.volume_ratio,
                    "price_score": price,
                    "volume_score": volume,
                    "price": m.price,
                    "market_cap": m.market_cap,
                }),
            }
        }
    }
}

fn normalize_articles(set: &ArticleSet, now: DateTime<Utc>) -> Normalized {
    let items: Vec<(f64, f64)> = set
        .articles
        .iter()
        .map(|a| {
            let age_hours = a
                .published_at
                .map(|t| (now - t).num_seconds() as f64 / 3600.0)
                .unwrap_or(0.0);
            (a.score, age_hours)
        })
        .collect();
    let (score, average) = match recency_weighted_mean(&items) {
        | Some(avg) => (signed_to_scale(avg), avg),
        | None => (NEUTRAL_SCORE, 0.0),
    };
    Normalized {
        score,
        raw_value: average,
        substitute: items.is_empty(),
        details: json!({
            "total_articles": set.articles.len(),
            "positive": set.count(Tone::Positive),
            "negative": set.count(Tone::Negative),
            "neutral": set.count(Tone::Neutral),
            "average_sentiment": average,
            "top_positive": set.top_titles(Tone::Positive, 3),
            "top_negative": set.top_titles(Tone::Negative, 3),
        }),
    }
}

/// Weight of an item `age_hours` old. Future timestamps count as fresh.
pub fn recency_weight(age_hours: f64) -> f64 {
    1.0 / (1.0 + age_hours.max(0.0) / RECENCY_HOURS)
}

/// Recency-weighted mean of `(value, age_hours)` pairs; `None` when empty.
pub fn recency_weighted_mean(items: &[(f64, f64)]) -> Option<f64> {
    if items.is_empty() {
        return None;
    }
    let (sum, total) = items.iter().fold((0.0, 0.0), |(sum, total), (value, age)| {
        let w = recency_weight(*age);
        (sum + value * w, total + w)
    });
    Some(sum / total)
}

/// [-1, 1] onto [0, 100].
pub fn signed_to_scale(value: f64) -> f64 {
    ((value.clamp(-1.0, 1.0) + 1.0) * 50.0).clamp(0.0, 100.0)
}

pub fn price_score(change_pct: f64) -> f64 {
    (change_pct.clamp(-20.0, 20.0) + 20.0) * 2.5
}

pub fn volume_score(ratio: f64) -> f64 {
    if ratio < 0.5 {
        30.0 + 40.0 * ratio
    } else if ratio < 1.5 {
        40.0 + (ratio - 0.5) * 20.0
    } else {
        (60.0 + (ratio - 1.5) * 20.0).min(70.0)
    }
}

/// 60 % price change, 40 % volume activity.
pub fn momentum_score(change_pct: f64, volume_ratio: f64) -> f64 {
    if change_pct.is_nan() || volume_ratio.is_nan() {
        return NEUTRAL_SCORE;
    }
    0.6 * price_score(change_pct) + 0.4 * volume_score(volume_ratio)
}

fn rank(values: &[f64], higher_is_better: bool) -> Vec<f64> {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let range = max - min;
    values
        .iter()
        .map(|v| {
            if !range.is_finite() || range <= 0.0 {
                return 100.0;
            }
            if !v.is_finite() {
                return 0.0;
            }
            let pos = (v - min) / range;
            if higher_is_better {
                pos * 100.0
            } else {
                (1.0 - pos) * 100.0
            }
        })
        .collect()
}

/// Lowest value scores 100, highest 0, linear in between. A set with one
/// item or no spread scores 100 throughout.
pub fn inverted_rank(values: &[f64]) -> Vec<f64> {
    rank(values, false)
}

/// Highest value scores 100, lowest 0.
pub fn direct_rank(values: &[f64]) -> Vec<f64> {
    rank(values, true)
}
