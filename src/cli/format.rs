//! Table, JSON and CSV rendering of run results.

use crate::analysis::SentimentReport;
use crate::bridge::{BridgeComparison, BridgeDetail, BridgeListing, ChainList, TvlRanking};
use crate::dex::RouteComparison;
use crate::utils::error::Error;
use crate::utils::types::{OutputFormat, FEAR_GREED, MOMENTUM, NEWS};
use crate::Result;
use colored::{ColoredString, Colorize};
use serde::Serialize;

const WIDTH: usize = 78;

/// Anything the CLI can print.
pub trait Render: Serialize {
    fn table(&self) -> String;
    fn csv_rows(&self) -> (Vec<String>, Vec<Vec<String>>);
}

pub fn render<R: Render>(value: &R, format: OutputFormat) -> Result<String> {
    match format {
        | OutputFormat::Table => Ok(value.table()),
        | OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        | OutputFormat::Csv => {
            let (header, rows) = value.csv_rows();
            to_csv(&header, &rows)
        }
    }
}

fn to_csv(header: &[String], rows: &[Vec<String>]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    let bytes = writer.into_inner().map_err(|e| Error::Other(format!("csv flush: {e}")))?;
    let text = String::from_utf8(bytes).map_err(|e| Error::Other(format!("csv output not utf-8: {e}")))?;
    // Callers append the final newline
    Ok(text.trim_end_matches('\n').to_owned())
}

fn rule(c: char) -> String {
    c.to_string().repeat(WIDTH)
}

fn colorize(label: &str, text: String) -> ColoredString {
    match label {
        | "Extreme Fear" => text.red().bold(),
        | "Fear" => text.yellow(),
        | "Greed" => text.green(),
        | "Extreme Greed" => text.cyan().bold(),
        | _ => text.normal(),
    }
}

/// 50-cell bar with a marker at the score.
pub fn gauge(score: f64) -> String {
    let width = 50usize;
    let pos = ((score / 100.0) * width as f64) as isize;
    let pos = pos.clamp(0, width as isize - 1) as usize;
    let mut cells = vec!['-'; width];
    cells[pos] = '█';
    if pos > 0 {
        cells[0] = '|';
    }
    if pos < width - 1 {
        cells[width - 1] = '|';
    }
    format!("[{}]", cells.into_iter().collect::<String>())
}

fn wrap(text: &str, indent: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && indent.len() + line.len() + word.len() + 1 > WIDTH - 2 {
            lines.push(format!("{indent}{line}"));
            line.clear();
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(format!("{indent}{line}"));
    }
    lines
}

fn source_label(id: &str) -> &str {
    match id {
        | FEAR_GREED => "Fear & Greed Index",
        | NEWS => "News Sentiment",
        | MOMENTUM => "Market Momentum",
        | other => other,
    }
}

fn opt(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

impl SentimentReport {
    fn component_note(&self, id: &str) -> String {
        let Some(c) = self.component(id) else { return String::new() };
        if !c.component.available {
            return format!("unavailable: {}", c.component.error.as_deref().unwrap_or("unknown error"));
        }
        let details = c.component.details.as_ref();
        let note = match id {
            | FEAR_GREED => details.and_then(|d| d["classification"].as_str()).map(str::to_string),
            | NEWS => details.and_then(|d| d["total_articles"].as_u64()).map(|n| format!("{n} articles")),
            | MOMENTUM => details.and_then(|d| {
                let change = d["price_change_pct"].as_f64()?;
                Some(format!("{} {:+.1}%", d["scope"].as_str().unwrap_or("market"), change))
            }),
            | _ => None,
        };
        let mut note = note.unwrap_or_default();
        if c.component.substitute {
            note = if note.is_empty() { "neutral substitute".into() } else { format!("{note}, neutral substitute") };
        }
        if let Some(age) = c.component.staleness_secs.filter(|s| *s > 0) {
            note = if note.is_empty() { format!("{age}s old") } else { format!("{note}, {age}s old") };
        }
        note
    }

    fn detail_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(d) = self.component(NEWS).and_then(|c| c.component.details.as_ref()) {
            if d["total_articles"].as_u64().unwrap_or(0) > 0 {
                lines.push("  News Analysis:".to_string());
                lines.push(format!(
                    "    Positive: {}  |  Negative: {}  |  Neutral: {}",
                    d["positive"], d["negative"], d["neutral"]
                ));
                for (key, label, sign) in [("top_positive", "Top Positive Headlines", '+'), ("top_negative", "Top Negative Headlines", '-')] {
                    let titles: Vec<&str> = d[key].as_array().map(|a| a.iter().filter_map(|t| t.as_str()).collect()).unwrap_or_default();
                    if !titles.is_empty() {
                        lines.push(format!("    {label}:"));
                        for t in titles.iter().take(2) {
                            lines.push(format!("      {sign} {}", t.chars().take(60).collect::<String>()));
                        }
                    }
                }
                lines.push(String::new());
            }
        }
        if let Some(d) = self.component(MOMENTUM).and_then(|c| c.component.details.as_ref()) {
            if let Some(ratio) = d["volume_ratio"].as_f64() {
                let desc = if ratio > 1.2 {
                    "high"
                } else if ratio > 0.8 {
                    "normal"
                } else {
                    "low"
                };
                lines.push("  Market Data:".to_string());
                lines.push(format!("    Volume Ratio: {:.2}x ({})", ratio, desc));
                lines.push(String::new());
            }
        }
        lines
    }
}

impl Render for SentimentReport {
    fn table(&self) -> String {
        let mut lines = Vec::new();
        let time = self.meta.timestamp.format("%Y-%m-%d %H:%M UTC").to_string();
        lines.push(rule('='));
        lines.push(format!("  MARKET SENTIMENT{}{}", " ".repeat(WIDTH - 18 - time.len()), time));
        lines.push(rule('='));
        lines.push(String::new());

        let label = self.classification.as_str();
        lines.push("  COMPOSITE SENTIMENT".to_string());
        lines.push(rule('-'));
        lines.push(format!(
            "  Score: {} / 100    Classification: {}",
            colorize(label, format!("{:.1}", self.composite_score)),
            colorize(label, label.to_uppercase())
        ));
        lines.push(String::new());
        lines.push(format!("  {}", gauge(self.composite_score)));
        lines.push("  0 -------- 25 -------- 50 -------- 75 -------- 100".to_string());
        lines.push("  FEAR                  NEUTRAL                 GREED".to_string());
        lines.push(String::new());

        lines.push("  COMPONENTS".to_string());
        lines.push(rule('-'));
        for c in &self.components {
            let id = c.component.source_id.as_str();
            lines.push(format!(
                "  {:<20} {:5.1}  (weight: {:>3.0}%)  → {:5.1} pts  [{}]",
                source_label(id),
                c.component.normalized_score,
                c.effective_weight * 100.0,
                c.contribution,
                self.component_note(id)
            ));
        }
        lines.push(String::new());

        let details = self.detail_lines();
        if !details.is_empty() {
            lines.push("  DETAILED BREAKDOWN".to_string());
            lines.push(rule('-'));
            lines.extend(details);
        }

        lines.push("  INTERPRETATION".to_string());
        lines.push(rule('-'));
        lines.extend(wrap(&self.interpretation, "  "));
        lines.push(String::new());

        if !self.meta.errors.is_empty() {
            lines.push("  WARNINGS".to_string());
            lines.push(rule('-'));
            for (source, err) in &self.meta.errors {
                lines.push(format!("  {} {}: {}", "⚠".yellow(), source, err));
            }
            lines.push(String::new());
        }

        lines.push(rule('='));
        let coin = self.meta.coin_filter.as_ref().map(|c| format!("Coin: {c}  |  ")).unwrap_or_default();
        let sources: Vec<&str> = self.components.iter().map(|c| source_label(&c.component.source_id)).collect();
        lines.push(format!(
            "  {}Period: {}  |  Mode: {}  |  Sources: {}",
            coin,
            self.meta.period,
            self.meta.mode,
            sources.join(", ")
        ));
        lines.push(rule('='));
        lines.join("\n")
    }

    fn csv_rows(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let mut header: Vec<String> =
            ["timestamp", "composite_score", "classification"].iter().map(|s| s.to_string()).collect();
        let mut row = vec![
            self.meta.timestamp.to_rfc3339(),
            self.composite_score.to_string(),
            self.classification.clone(),
        ];
        for c in &self.components {
            let id = &c.component.source_id;
            header.extend([format!("{id}_score"), format!("{id}_weight"), format!("{id}_available")]);
            row.extend([
                c.component.normalized_score.to_string(),
                c.effective_weight.to_string(),
                c.component.available.to_string(),
            ]);
        }
        header.extend(["period", "coin_filter", "mode", "degraded", "missing_sources"].iter().map(|s| s.to_string()));
        row.extend([
            self.meta.period.to_string(),
            self.meta.coin_filter.clone().unwrap_or_default(),
            self.meta.mode.to_string(),
            self.degraded.to_string(),
            self.missing_sources.join(";"),
        ]);

        if let Some(d) = self.component(NEWS).and_then(|c| c.component.details.as_ref()) {
            for key in ["positive", "negative", "neutral"] {
                header.push(format!("news_{key}"));
                row.push(d[key].as_u64().map(|n| n.to_string()).unwrap_or_default());
            }
        }
        if let Some(d) = self.component(MOMENTUM).and_then(|c| c.component.details.as_ref()) {
            header.push("momentum_volume_ratio".to_string());
            row.push(opt(d["volume_ratio"].as_f64()));
        }
        (header, vec![row])
    }
}

impl Render for RouteComparison {
    fn table(&self) -> String {
        let p = &self.params;
        let mut lines = vec![
            rule('='),
            format!("  DEX ROUTES  {} {} -> {} on {}", p.amount, p.from_token, p.to_token, p.chain),
            rule('='),
            format!(
                "  {:<4} {:<10} {:>16} {:>14} {:>9} {:>7} {:>8}",
                "#", "Source", "Output", "Eff. rate", "Gas $", "Score", "Save %"
            ),
            rule('-'),
        ];
        for r in &self.routes {
            let q = &r.quote;
            let line = format!(
                "  {:<4} {:<10} {:>16} {:>14} {:>9.2} {:>7.1} {:>8.3}",
                r.rank,
                q.source,
                q.output_amount.round_dp(6).to_string(),
                q.effective_rate.round_dp(6).to_string(),
                q.gas_cost_usd,
                r.score,
                r.savings_pct
            );
            lines.push(if r.rank == 1 { line.green().to_string() } else { line });
            lines.push(format!("       {}  |  via {}", r.recommendation, q.protocols.join(", ")));
        }
        lines.push(rule('-'));
        lines.push(format!("  Spread: {:.3}%  |  {}", self.price_spread, self.recommendation));
        if let Some(size) = &self.size_recommendation {
            lines.extend(wrap(size, "  "));
        }
        if self.degraded {
            for (source, err) in &self.errors {
                lines.push(format!("  {} {}: {}", "⚠".yellow(), source, err));
            }
        }
        lines.push(rule('='));
        lines.join("\n")
    }

    fn csv_rows(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let header = [
            "rank",
            "source",
            "input_token",
            "output_token",
            "input_amount",
            "output_amount",
            "effective_rate",
            "gas_estimate",
            "gas_cost_usd",
            "price_impact",
            "score",
            "savings_pct",
            "protocols",
            "recommendation",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let rows = self
            .routes
            .iter()
            .map(|r| {
                let q = &r.quote;
                vec![
                    r.rank.to_string(),
                    q.source.clone(),
                    q.input_token.clone(),
                    q.output_token.clone(),
                    q.input_amount.to_string(),
                    q.output_amount.to_string(),
                    q.effective_rate.to_string(),
                    q.gas_estimate.to_string(),
                    q.gas_cost_usd.to_string(),
                    q.price_impact.to_string(),
                    r.score.to_string(),
                    r.savings_pct.to_string(),
                    q.protocols.join(";"),
                    r.recommendation.clone(),
                ]
            })
            .collect();
        (header, rows)
    }
}

impl Render for BridgeComparison {
    fn table(&self) -> String {
        let mut lines = vec![
            rule('='),
            format!(
                "  BRIDGE FEES  {} {}  {} -> {}",
                self.amount, self.token, self.source_chain, self.dest_chain
            ),
            rule('='),
            format!("  {:<4} {:<10} {:>12} {:>12} {:>8} {:>7}", "#", "Bridge", "Bridge fee", "Total fee", "Minutes", "Score"),
            rule('-'),
        ];
        for r in &self.estimates {
            let e = &r.estimate;
            let line = format!(
                "  {:<4} {:<10} {:>12} {:>12} {:>8} {:>7.1}",
                r.rank,
                e.bridge,
                e.bridge_fee.round_dp(6).to_string(),
                e.total_fee.round_dp(6).to_string(),
                e.estimated_minutes,
                r.score
            );
            lines.push(if r.rank == 1 { line.green().to_string() } else { line });
        }
        lines.push(rule('-'));
        lines.push(format!("  Cheapest: {}  |  Fastest: {}", self.cheapest, self.fastest));
        lines.push(rule('='));
        lines.join("\n")
    }

    fn csv_rows(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let header = [
            "rank",
            "bridge",
            "source_chain",
            "dest_chain",
            "token",
            "amount",
            "bridge_fee",
            "gas_fee_source",
            "gas_fee_dest",
            "total_fee",
            "estimated_minutes",
            "score",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let rows = self
            .estimates
            .iter()
            .map(|r| {
                let e = &r.estimate;
                vec![
                    r.rank.to_string(),
                    e.bridge.clone(),
                    e.source_chain.clone(),
                    e.dest_chain.clone(),
                    e.token.clone(),
                    e.amount.to_string(),
                    e.bridge_fee.to_string(),
                    e.gas_fee_source.to_string(),
                    e.gas_fee_dest.to_string(),
                    e.total_fee.to_string(),
                    e.estimated_minutes.to_string(),
                    r.score.to_string(),
                ]
            })
            .collect();
        (header, rows)
    }
}

/// `$1.23M` style amounts for volume and TVL columns.
pub fn usd_compact(value: f64) -> String {
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1e12 {
        (value / 1e12, "T")
    } else if abs >= 1e9 {
        (value / 1e9, "B")
    } else if abs >= 1e6 {
        (value / 1e6, "M")
    } else if abs >= 1e3 {
        (value / 1e3, "K")
    } else {
        (value, "")
    };
    format!("${scaled:.2}{suffix}")
}

fn truncate_name(name: &str, width: usize) -> String {
    if name.chars().count() > width {
        format!("{}...", name.chars().take(width - 3).collect::<String>())
    } else {
        name.to_string()
    }
}

fn change_label(change: Option<f64>) -> String {
    change.map(|c| format!("{c:+.2}%")).unwrap_or_else(|| "N/A".to_string())
}

impl Render for BridgeListing {
    fn table(&self) -> String {
        let title = match &self.chain {
            | Some(chain) => format!("  CROSS-CHAIN BRIDGES  touching {chain}"),
            | None => "  CROSS-CHAIN BRIDGES".to_string(),
        };
        let mut lines = vec![
            rule('='),
            title,
            rule('='),
            format!("  {:<5} {:<25} {:>14} {:>7} {:>10}", "#", "Bridge", "24h volume", "Chains", "Change"),
            rule('-'),
        ];
        for (i, b) in self.bridges.iter().enumerate() {
            lines.push(format!(
                "  {:<5} {:<25} {:>14} {:>7} {:>10}",
                i + 1,
                truncate_name(&b.display_name, 23),
                usd_compact(b.volume_prev_day),
                b.all_chains().len(),
                change_label(b.volume_change_pct())
            ));
        }
        lines.push(rule('-'));
        lines.push(format!("  Showing {} of {} bridges", self.bridges.len(), self.total));
        lines.push(rule('='));
        lines.join("\n")
    }

    fn csv_rows(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let header = ["rank", "id", "name", "display_name", "volume_24h", "volume_prev_24h", "change_pct", "chains"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = self
            .bridges
            .iter()
            .enumerate()
            .map(|(i, b)| {
                vec![
                    (i + 1).to_string(),
                    b.id.clone(),
                    b.name.clone(),
                    b.display_name.clone(),
                    b.volume_prev_day.to_string(),
                    b.volume_prev2_day.to_string(),
                    opt(b.volume_change_pct()),
                    b.all_chains().join(";"),
                ]
            })
            .collect();
        (header, rows)
    }
}

impl Render for TvlRanking {
    fn table(&self) -> String {
        let mut lines = vec![
            rule('='),
            "  BRIDGE TVL RANKINGS".to_string(),
            rule('='),
            format!("  {:<5} {:<25} {:>16} {:>7}", "#", "Bridge", "Total TVL", "Chains"),
            rule('-'),
        ];
        for (i, e) in self.entries.iter().enumerate() {
            let (tvl, chains) = match &e.tvl {
                | Some(t) => (usd_compact(t.total_tvl), t.tvl_by_chain.len().to_string()),
                | None => ("unavailable".to_string(), "-".to_string()),
            };
            lines.push(format!("  {:<5} {:<25} {:>16} {:>7}", i + 1, truncate_name(&e.bridge, 23), tvl, chains));
        }
        lines.push(rule('='));
        lines.join("\n")
    }

    fn csv_rows(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let header = ["rank", "bridge", "bridge_id", "total_tvl", "chains"].iter().map(|s| s.to_string()).collect();
        let rows = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                vec![
                    (i + 1).to_string(),
                    e.bridge.clone(),
                    e.tvl.as_ref().map(|t| t.bridge_id.clone()).unwrap_or_default(),
                    opt(e.tvl.as_ref().map(|t| t.total_tvl)),
                    e.tvl.as_ref().map(|t| t.tvl_by_chain.len().to_string()).unwrap_or_default(),
                ]
            })
            .collect();
        (header, rows)
    }
}

impl Render for BridgeDetail {
    fn table(&self) -> String {
        let b = &self.bridge;
        let mut lines = vec![
            rule('='),
            format!("  BRIDGE: {}", b.display_name),
            rule('='),
            format!("  Name: {}  |  ID: {}", b.name, b.id),
            format!(
                "  24h volume: {}  |  Previous 24h: {}  |  Change: {}",
                usd_compact(b.volume_prev_day),
                usd_compact(b.volume_prev2_day),
                change_label(b.volume_change_pct())
            ),
            rule('-'),
            "  Supported chains:".to_string(),
        ];
        for chunk in b.all_chains().chunks(5) {
            lines.push(format!("    {}", chunk.join(", ")));
        }
        if let Some(tvl) = &self.tvl {
            lines.push(rule('-'));
            lines.push(format!("  TVL: {}", usd_compact(tvl.total_tvl)));
            let mut by_chain: Vec<(&String, &f64)> = tvl.tvl_by_chain.iter().collect();
            by_chain.sort_by(|a, b| b.1.total_cmp(a.1));
            for (chain, amount) in by_chain.into_iter().take(10) {
                lines.push(format!("    {:<20} {:>14}", chain, usd_compact(*amount)));
            }
        }
        lines.push(rule('='));
        lines.join("\n")
    }

    fn csv_rows(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let header = ["id", "display_name", "volume_24h", "volume_prev_24h", "change_pct", "chains", "total_tvl"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let b = &self.bridge;
        let row = vec![
            b.id.clone(),
            b.display_name.clone(),
            b.volume_prev_day.to_string(),
            b.volume_prev2_day.to_string(),
            opt(b.volume_change_pct()),
            b.all_chains().join(";"),
            opt(self.tvl.as_ref().map(|t| t.total_tvl)),
        ];
        (header, vec![row])
    }
}

impl Render for ChainList {
    fn table(&self) -> String {
        let mut lines = vec![rule('='), format!("  CHAINS WITH BRIDGE ACTIVITY ({})", self.chains.len()), rule('=')];
        for chunk in self.chains.chunks(5) {
            lines.push(format!("  {}", chunk.join(", ")));
        }
        lines.push(rule('='));
        lines.join("\n")
    }

    fn csv_rows(&self) -> (Vec<String>, Vec<Vec<String>>) {
        (vec!["chain".to_string()], self.chains.iter().map(|c| vec![c.clone()]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{composite, ComponentScore, WeightMap};
    use crate::bridge::{all_adapters, compare_bridges};
    use crate::config::BridgeConfig;
    use crate::utils::error::FetchError;
    use crate::utils::types::{AnalysisQuery, Period};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn report() -> SentimentReport {
        colored::control::set_override(false);
        let weights: WeightMap = [("fear_greed", 0.4), ("news", 0.4), ("momentum", 0.2)].into_iter().collect();
        let mut fng = ComponentScore::new("fear_greed", 72.0, 0.4);
        fng.details = Some(serde_json::json!({"classification": "Greed"}));
        let result = composite(
            vec![
                fng,
                ComponentScore::unavailable("news", 0.4, &FetchError::Timeout),
                ComponentScore::new("momentum", 66.5, 0.2),
            ],
            &weights,
        );
        let errors = BTreeMap::from([("news".to_string(), "request timed out".to_string())]);
        SentimentReport::build(result, &AnalysisQuery::new(Some("btc"), Period::Day).detailed(true), errors, Utc::now())
    }

    #[test]
    fn test_gauge() {
        assert_eq!(gauge(0.0).chars().nth(1), Some('█'));
        assert_eq!(gauge(100.0).chars().nth(50), Some('█'));
        assert_eq!(gauge(50.0).chars().count(), 52);
    }

    #[test]
    fn test_sentiment_table() {
        let out = render(&report(), OutputFormat::Table).unwrap();
        assert!(out.contains("Score: 70.2 / 100"));
        assert!(out.contains("Classification: GREED"));
        assert!(out.contains("[Greed]"));
        assert!(out.contains("[unavailable: request timed out]"));
        assert!(out.contains("news: request timed out"));
        assert!(out.contains("Coin: BTC  |  Period: 24h  |  Mode: full"));
        assert!(out.lines().filter(|l| l.starts_with("==")).all(|l| l.chars().count() == WIDTH));
    }

    #[test]
    fn test_sentiment_json_and_csv() {
        let report = report();
        let json: serde_json::Value = serde_json::from_str(&render(&report, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["composite_score"], 70.2);

        let csv = render(&report, OutputFormat::Csv).unwrap();
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("timestamp,composite_score,classification,fear_greed_score"));
        assert!(header.contains("news_available"));
        let row = lines.next().unwrap();
        assert!(row.contains(",70.2,Greed,72,"));
        assert!(row.contains(",24h,BTC,full,true,news"));
    }

    #[test]
    fn test_bridge_rendering() {
        colored::control::set_override(false);
        let cmp =
            compare_bridges(&all_adapters(), "ethereum", "arbitrum", "usdc", dec!(1000), &BridgeConfig::default())
                .unwrap();
        let table = render(&cmp, OutputFormat::Table).unwrap();
        assert!(table.contains("Cheapest: Across  |  Fastest: Across"));
        let csv = render(&cmp, OutputFormat::Csv).unwrap();
        assert_eq!(csv.lines().count(), 5);
        assert!(!csv.ends_with('\n'));
    }

    #[test]
    fn test_usd_compact() {
        assert_eq!(usd_compact(1_234_567.0), "$1.23M");
        assert_eq!(usd_compact(2_500_000_000.0), "$2.50B");
        assert_eq!(usd_compact(999.0), "$999.00");
        assert_eq!(usd_compact(45_000.0), "$45.00K");
    }

    #[test]
    fn test_bridge_listing_rendering() {
        colored::control::set_override(false);
        let bridge = crate::bridge::BridgeInfo {
            id: "7".into(),
            name: "stargate".into(),
            display_name: "Stargate Finance Bridge Protocol".into(),
            volume_prev_day: 2_000_000.0,
            volume_prev2_day: 0.0,
            chains: vec!["Ethereum".into(), "Arbitrum".into()],
            destination_chains: vec!["Ethereum".into()],
        };
        let listing = BridgeListing { chain: None, total: 12, bridges: vec![bridge] };
        let table = render(&listing, OutputFormat::Table).unwrap();
        assert!(table.contains("Stargate Finance Bri..."));
        assert!(table.contains("$2.00M"));
        assert!(table.contains("N/A"));
        assert!(table.contains("Showing 1 of 12 bridges"));
        let csv = render(&listing, OutputFormat::Csv).unwrap();
        assert_eq!(csv.lines().nth(1), Some("1,7,stargate,Stargate Finance Bridge Protocol,2000000,0,,Arbitrum;Ethereum"));
        assert!(csv.lines().nth(1).unwrap().starts_with("1,Across,ethereum,arbitrum,USDC,1000,"));
    }
}
