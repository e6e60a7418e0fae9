//! Five-band sentiment classification of a 0-100 score.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    #[serde(rename = "Extreme Fear")]
    ExtremeFear,
    #[serde(rename = "Fear")]
    Fear,
    #[serde(rename = "Neutral")]
    Neutral,
    #[serde(rename = "Greed")]
    Greed,
    #[serde(rename = "Extreme Greed")]
    ExtremeGreed,
}

/// Half-open `[lower, upper)` band; the top band also includes 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationBand {
    pub lower: f64,
    pub upper: f64,
    pub label: Sentiment,
}

pub const BANDS: [ClassificationBand; 5] = [
    ClassificationBand { lower: 0.0, upper: 20.0, label: Sentiment::ExtremeFear },
    ClassificationBand { lower: 20.0, upper: 40.0, label: Sentiment::Fear },
    ClassificationBand { lower: 40.0, upper: 60.0, label: Sentiment::Neutral },
    ClassificationBand { lower: 60.0, upper: 80.0, label: Sentiment::Greed },
    ClassificationBand { lower: 80.0, upper: 100.0, label: Sentiment::ExtremeGreed },
];

/// Index into [`BANDS`]. Out-of-range input is clamped; NaN lands in Neutral.
pub fn band_index(score: f64) -> usize {
    if score.is_nan() {
        return 2;
    }
    let score = score.clamp(0.0, 100.0);
    BANDS
        .iter()
        .position(|b| score >= b.lower && score < b.upper)
        .unwrap_or(BANDS.len() - 1)
}

pub fn classify(score: f64) -> Sentiment {
    BANDS[band_index(score)].label
}

impl Sentiment {
    pub fn label(&self) -> &'static str {
        match self {
            | Sentiment::ExtremeFear => "Extreme Fear",
            | Sentiment::Fear => "Fear",
            | Sentiment::Neutral => "Neutral",
            | Sentiment::Greed => "Greed",
            | Sentiment::ExtremeGreed => "Extreme Greed",
        }
    }

    pub fn interpretation(&self) -> &'static str {
        match self {
            | Sentiment::ExtremeFear => {
                "Market is in extreme fear. Historically, this has been a good buying opportunity \
                 for long-term investors. However, prices may continue falling in the short term."
            }
            | Sentiment::Fear => {
                "Market sentiment is fearful. Caution is advised, but oversold conditions may \
                 present opportunities for those with higher risk tolerance."
            }
            | Sentiment::Neutral => {
                "Market sentiment is balanced with no strong directional bias. Wait for clearer \
                 signals before making major decisions."
            }
            | Sentiment::Greed => {
                "Market is moderately greedy. Consider taking some profits or reducing position \
                 sizes. Watch for reversal signals."
            }
            | Sentiment::ExtremeGreed => {
                "Market is in extreme greed territory. Exercise caution - this level often \
                 precedes corrections. Consider defensive positioning."
            }
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
