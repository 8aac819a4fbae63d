//! Signal reports: CSV export, JSON export and the console summary.
//!
//! A [`SignalReport`] gathers the signals of one or more backtest runs keyed
//! by (pair, timeframe). Exports list every signal sorted by timestamp; the
//! summary breaks counts down by stream and signal type.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use kumo_core::domain::{Direction, Signal, SignalType, Timeframe};
use kumo_core::engine::BacktestResult;

/// Bumped when the JSON layout changes.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Default)]
pub struct SignalReport {
    streams: BTreeMap<(String, Timeframe), Vec<Signal>>,
}

/// Per-stream counts, as written to the JSON report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub pair: String,
    pub timeframe: Timeframe,
    pub total: usize,
    pub buys: usize,
    pub sells: usize,
    pub by_type: BTreeMap<SignalType, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub schema_version: u32,
    pub signal_count: usize,
    pub first_signal: Option<DateTime<Utc>>,
    pub last_signal: Option<DateTime<Utc>>,
    pub streams: Vec<StreamSummary>,
    pub signals: Vec<Signal>,
}

impl SignalReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a BacktestResult>) -> Self {
        let mut report = Self::new();
        for result in results {
            report.add_result(result);
        }
        report
    }

    pub fn add_result(&mut self, result: &BacktestResult) {
        self.add_signals(
            &result.pair,
            result.timeframe,
            result.iter_signals().cloned(),
        );
    }

    /// Register signals for a stream. A stream with no signals still shows up
    /// in the JSON stream list.
    pub fn add_signals(
        &mut self,
        pair: &str,
        timeframe: Timeframe,
        signals: impl IntoIterator<Item = Signal>,
    ) {
        let entry = self
            .streams
            .entry((pair.to_string(), timeframe))
            .or_default();
        let before = entry.len();
        entry.extend(signals);
        info!("report: added {} signals for {pair} {timeframe}", entry.len() - before);
    }

    pub fn len(&self) -> usize {
        self.streams.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every signal across all streams, sorted by timestamp.
    ///
    /// The sort is stable, so signals sharing a bar keep stream order and the
    /// detector's rule order within a stream.
    pub fn sorted_signals(&self) -> Vec<&Signal> {
        let mut all: Vec<&Signal> = self.streams.values().flatten().collect();
        all.sort_by_key(|s| s.timestamp);
        all
    }

    pub fn stream_summaries(&self) -> Vec<StreamSummary> {
        self.streams
            .iter()
            .map(|((pair, timeframe), signals)| {
                let mut by_type = BTreeMap::new();
                for s in signals {
                    *by_type.entry(s.signal_type()).or_insert(0) += 1;
                }
                StreamSummary {
                    pair: pair.clone(),
                    timeframe: *timeframe,
                    total: signals.len(),
                    buys: count_direction(signals, Direction::Buy),
                    sells: count_direction(signals, Direction::Sell),
                    by_type,
                }
            })
            .collect()
    }

    /// Export every signal as CSV, one row per signal.
    ///
    /// Columns: timestamp, pair, timeframe, direction, signal_type, price,
    /// tenkan, kijun, senkou_a, senkou_b, chikou, chikou_reference.
    /// Missing indicator values are written as empty cells.
    pub fn to_csv(&self) -> Result<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record([
            "timestamp",
            "pair",
            "timeframe",
            "direction",
            "signal_type",
            "price",
            "tenkan",
            "kijun",
            "senkou_a",
            "senkou_b",
            "chikou",
            "chikou_reference",
        ])?;

        for s in self.sorted_signals() {
            let ctx = &s.context;
            wtr.write_record([
                s.timestamp.format(TIMESTAMP_FORMAT).to_string().as_str(),
                s.pair(),
                s.timeframe().as_str(),
                s.direction.as_str(),
                s.signal_type().as_str(),
                &format!("{:.5}", s.price),
                &fmt_level(ctx.tenkan),
                &fmt_level(ctx.kijun),
                &fmt_level(ctx.senkou_a),
                &fmt_level(ctx.senkou_b),
                &fmt_level(ctx.chikou),
                &fmt_level(ctx.chikou_reference),
            ])?;
        }

        let data = wtr.into_inner().context("failed to flush CSV writer")?;
        String::from_utf8(data).context("CSV output is not valid UTF-8")
    }

    pub fn document(&self) -> ReportDocument {
        let signals: Vec<Signal> = self.sorted_signals().into_iter().cloned().collect();
        ReportDocument {
            schema_version: REPORT_SCHEMA_VERSION,
            signal_count: signals.len(),
            first_signal: signals.first().map(|s| s.timestamp),
            last_signal: signals.last().map(|s| s.timestamp),
            streams: self.stream_summaries(),
            signals,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.document())
            .context("failed to serialize signal report to JSON")
    }

    /// Console summary.
    pub fn summary(&self) -> String {
        let all = self.sorted_signals();
        let (Some(first), Some(last)) = (all.first(), all.last()) else {
            return "\n  No signals were generated.\n".to_string();
        };

        let sep = "─".repeat(60);
        let sep2 = "═".repeat(60);
        let mut out = String::with_capacity(1024);

        out.push_str(&format!("\n{sep2}\n"));
        out.push_str("  ICHIMOKU BACKTEST REPORT\n");
        out.push_str(&format!("{sep2}\n"));
        out.push_str(&format!(
            "  Period   : {} → {}\n",
            first.timestamp.date_naive(),
            last.timestamp.date_naive()
        ));
        out.push_str(&format!("  Signals  : {}\n", all.len()));
        out.push_str(&format!("{sep}\n"));

        for stream in self.stream_summaries() {
            if stream.total == 0 {
                continue;
            }
            out.push_str(&format!("\n  {}  {}\n", stream.pair, stream.timeframe));
            out.push_str(&format!("  {}\n", "─".repeat(30)));
            out.push_str(&format!(
                "  Total : {:>4}  (BUY: {}, SELL: {})\n",
                stream.total, stream.buys, stream.sells
            ));
            for (signal_type, count) in &stream.by_type {
                let direction = match signal_type.direction() {
                    Direction::Buy => "BUY ",
                    Direction::Sell => "SELL",
                };
                out.push_str(&format!(
                    "    {direction}  {:<25} : {count:>4}\n",
                    title_case(signal_type.as_str())
                ));
            }
        }

        out.push_str(&format!("\n{sep2}\n"));
        out
    }

    /// Write `signals_{stamp}.csv` and `signals_{stamp}.json` under `output_dir`.
    ///
    /// Nothing is written when the report is empty. Returns the written paths.
    pub fn save(&self, output_dir: &Path, stamp: &str) -> Result<Vec<PathBuf>> {
        if self.is_empty() {
            warn!("no signals to export");
            return Ok(Vec::new());
        }
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

        let csv_path = output_dir.join(format!("signals_{stamp}.csv"));
        std::fs::write(&csv_path, self.to_csv()?)
            .with_context(|| format!("failed to write {}", csv_path.display()))?;
        info!("signals CSV saved to {} ({} rows)", csv_path.display(), self.len());

        let json_path = output_dir.join(format!("signals_{stamp}.json"));
        std::fs::write(&json_path, self.to_json()?)
            .with_context(|| format!("failed to write {}", json_path.display()))?;

        Ok(vec![csv_path, json_path])
    }
}

/// Output file stamp for the current local time, `YYYYmmdd_HHMMSS`.
pub fn file_stamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn count_direction(signals: &[Signal], direction: Direction) -> usize {
    signals.iter().filter(|s| s.direction == direction).count()
}

fn fmt_level(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.5}")).unwrap_or_default()
}

/// `kumo_breakout_up` → `Kumo Breakout Up`
fn title_case(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
