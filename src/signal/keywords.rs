//! Keyword sentiment scoring and coin alias matching for news articles.

use super::Tone;
use once_cell::sync::Lazy;
use regex::Regex;

const POSITIVE: &[(&str, f64)] = &[
    ("bullish", 0.3),
    ("surge", 0.3),
    ("soar", 0.3),
    ("rally", 0.3),
    ("breakout", 0.3),
    ("record high", 0.3),
    ("all-time high", 0.3),
    ("ath", 0.3),
    ("moon", 0.3),
    ("adoption", 0.2),
    ("partnership", 0.2),
    ("approval", 0.2),
    ("milestone", 0.2),
    ("upgrade", 0.2),
    ("launch", 0.2),
    ("integration", 0.2),
    ("institutional", 0.2),
    ("etf", 0.2),
    ("accumulation", 0.2),
    ("inflow", 0.2),
    ("buy", 0.2),
    ("gain", 0.1),
    ("rise", 0.1),
    ("up", 0.1),
    ("growth", 0.1),
    ("positive", 0.1),
    ("optimistic", 0.1),
    ("recovery", 0.1),
    ("support", 0.1),
    ("bullrun", 0.1),
];

const NEGATIVE: &[(&str, f64)] = &[
    ("bearish", -0.3),
    ("crash", -0.3),
    ("dump", -0.3),
    ("collapse", -0.3),
    ("hack", -0.3),
    ("exploit", -0.3),
    ("scam", -0.3),
    ("fraud", -0.3),
    ("bankruptcy", -0.3),
    ("insolvent", -0.3),
    ("rug pull", -0.3),
    ("rugpull", -0.3),
    ("ban", -0.2),
    ("lawsuit", -0.2),
    ("investigation", -0.2),
    ("sec", -0.2),
    ("regulation", -0.2),
    ("crackdown", -0.2),
    ("sell-off", -0.2),
    ("selloff", -0.2),
    ("outflow", -0.2),
    ("withdrawal", -0.2),
    ("liquidation", -0.2),
    ("decline", -0.1),
    ("drop", -0.1),
    ("fall", -0.1),
    ("down", -0.1),
    ("loss", -0.1),
    ("concern", -0.1),
    ("risk", -0.1),
    ("uncertain", -0.1),
    ("volatility", -0.1),
    ("correction", -0.1),
    ("dip", -0.1),
    ("fear", -0.1),
    ("weak", -0.1),
];

/// Score above which an article counts as positive; its negation bounds negative.
pub const TONE_THRESHOLD: f64 = 0.1;

/// Whole-word pattern that also accepts simple inflections ("surges", "soared").
fn word(term: &str) -> Regex {
    // Terms are plain words and hyphenated phrases, always a valid pattern
    Regex::new(&format!(r"\b{}(?:s|es|d|ed|ing)?\b", regex::escape(term)))
        .unwrap_or_else(|_| unreachable!())
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

/// Spellings the plain suffixes miss: "rise" -> "rising", "drop" ->
/// "dropped", "rally" -> "rallies".
fn irregular_forms(term: &str) -> Vec<String> {
    let chars: Vec<char> = term.chars().collect();
    let n = chars.len();
    let mut forms = Vec::new();
    if n < 3 || !term.is_ascii() || !chars[n - 1].is_ascii_lowercase() {
        return forms;
    }
    let (last, prev, before) = (chars[n - 1], chars[n - 2], chars[n - 3]);
    let stem = &term[..n - 1];
    if last == 'e' {
        forms.push(format!("{stem}ing"));
    } else if last == 'y' && !is_vowel(prev) {
        forms.extend([format!("{stem}ies"), format!("{stem}ied")]);
    } else if !is_vowel(last) && !matches!(last, 'w' | 'x' | 'y') && is_vowel(prev) && !is_vowel(before) {
        forms.extend([format!("{term}{last}ed"), format!("{term}{last}ing")]);
    }
    forms
}

fn keyword(term: &str) -> Regex {
    let mut alternatives = vec![format!("{}(?:s|es|d|ed|ing)?", regex::escape(term))];
    alternatives.extend(irregular_forms(term).iter().map(|f| regex::escape(f)));
    // Escaped literals joined by `|`, always a valid pattern
    Regex::new(&format!(r"\b(?:{})\b", alternatives.join("|"))).unwrap_or_else(|_| unreachable!())
}

static KEYWORDS: Lazy<Vec<(Regex, f64)>> = Lazy::new(|| {
    POSITIVE
        .iter()
        .chain(NEGATIVE.iter())
        .map(|(term, weight)| (keyword(term), *weight))
        .collect()
});

const COIN_ALIASES: &[(&str, &[&str])] = &[
    ("BTC", &["bitcoin", "btc", "satoshi"]),
    ("ETH", &["ethereum", "eth", "ether"]),
    ("SOL", &["solana", "sol"]),
    ("XRP", &["ripple", "xrp"]),
    ("ADA", &["cardano", "ada"]),
    ("DOGE", &["dogecoin", "doge"]),
    ("DOT", &["polkadot", "dot"]),
    ("LINK", &["chainlink", "link"]),
    ("AVAX", &["avalanche", "avax"]),
    ("MATIC", &["polygon", "matic"]),
];

static ALIAS_PATTERNS: Lazy<Vec<(&'static str, Vec<Regex>)>> = Lazy::new(|| {
    COIN_ALIASES
        .iter()
        .map(|(sym, aliases)| (*sym, aliases.iter().map(|a| word(a)).collect()))
        .collect()
});

/// Sum of matched keyword weights in `text`, clamped to [-1, 1]. Each keyword
/// counts once however often it appears.
pub fn score_text(text: &str) -> f64 {
    let lower = text.to_lowercase();
    KEYWORDS
        .iter()
        .filter(|(re, _)| re.is_match(&lower))
        .map(|(_, w)| w)
        .sum::<f64>()
        .clamp(-1.0, 1.0)
}

pub fn tone(score: f64) -> Tone {
    if score > TONE_THRESHOLD {
        Tone::Positive
    } else if score < -TONE_THRESHOLD {
        Tone::Negative
    } else {
        Tone::Neutral
    }
}

/// Whether `text` mentions the coin. Symbols without an alias entry match on
/// the lower-cased symbol itself.
pub fn mentions_coin(text: &str, symbol: &str) -> bool {
    let lower = text.to_lowercase();
    let symbol = symbol.to_uppercase();
    match ALIAS_PATTERNS.iter().find(|(sym, _)| *sym == symbol) {
        | Some((_, patterns)) => patterns.iter().any(|re| re.is_match(&lower)),
        | None => word(&symbol.to_lowercase()).is_match(&lower),
    }
}
