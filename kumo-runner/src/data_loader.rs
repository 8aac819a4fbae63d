//! Candle loading for the runner.
//!
//! CSV input has a header row and the columns `time,open,high,low,close`
//! with an optional `volume`. `time` is the bar open time in UTC, given as
//! RFC 3339, `YYYY-MM-DD HH:MM:SS`, or the broker export form
//! `YYYY.MM.DD HH:MM`.
//!
//! Loaded series are sorted by time and de-duplicated, keeping the *last*
//! row for a repeated open time (a broker repaint). Nothing else is fixed up:
//! malformed prices and misaligned times are left for the engine to reject.
//!
//! Synthetic data is a developer-only mode. The generator is a seeded random
//! walk, so the same symbol and timeframe always produce the same series.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use kumo_core::domain::{Candle, Timeframe};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path}: row {row}: unrecognised timestamp '{value}'")]
    BadTimestamp {
        path: PathBuf,
        row: usize,
        value: String,
    },
    #[error("{0}: no candles")]
    Empty(PathBuf),
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

#[derive(Debug, Serialize)]
struct CsvOutRow {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: Option<f64>,
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y.%m.%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
];

/// Parse a bar open time. Naive forms are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Sort by open time and drop duplicates, keeping the last occurrence.
pub fn normalize(mut candles: Vec<Candle>) -> Vec<Candle> {
    // Stable sort keeps file order among equal times, so "last" is preserved.
    candles.sort_by_key(|c| c.time);
    let mut out: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        match out.last_mut() {
            Some(last) if last.time == candle.time => *last = candle,
            _ => out.push(candle),
        }
    }
    out
}

/// Read candles from any CSV source. `source` names it in errors.
pub fn read_candles<R: io::Read>(reader: R, source: &Path) -> Result<Vec<Candle>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut candles = Vec::new();
    for (i, row) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = row.map_err(|source_err| LoadError::Csv {
            path: source.to_path_buf(),
            source: source_err,
        })?;
        let time = parse_timestamp(&row.time).ok_or_else(|| LoadError::BadTimestamp {
            path: source.to_path_buf(),
            row: i + 1,
            value: row.time.clone(),
        })?;
        let mut candle = Candle::new(time, row.open, row.high, row.low, row.close);
        candle.volume = row.volume;
        candles.push(candle);
    }

    if candles.is_empty() {
        return Err(LoadError::Empty(source.to_path_buf()));
    }
    let raw = candles.len();
    let candles = normalize(candles);
    if candles.len() != raw {
        debug!(source = %source.display(), dropped = raw - candles.len(), "duplicate open times collapsed");
    }
    Ok(candles)
}

/// Load a candle CSV file.
pub fn load_candles_csv(path: &Path) -> Result<Vec<Candle>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_candles(io::BufReader::new(file), path)
}

/// Serialize candles in the same CSV layout the loader reads.
pub fn write_candles<W: io::Write>(writer: W, candles: &[Candle]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for c in candles {
        wtr.serialize(CsvOutRow {
            time: c.time.format("%Y-%m-%d %H:%M:%S").to_string(),
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_candles_csv(path: &Path, candles: &[Candle]) -> Result<(), LoadError> {
    let file = std::fs::File::create(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_candles(io::BufWriter::new(file), candles).map_err(|source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

/// Deterministic BLAKE3 hash over open times and OHLCV values.
pub fn dataset_hash(candles: &[Candle]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in candles {
        hasher.update(&c.time.timestamp().to_le_bytes());
        hasher.update(&c.open.to_le_bytes());
        hasher.update(&c.high.to_le_bytes());
        hasher.update(&c.low.to_le_bytes());
        hasher.update(&c.close.to_le_bytes());
        hasher.update(&c.volume.unwrap_or(0.0).to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Generate `count` synthetic candles from the first aligned open time at or
/// after `start`.
///
/// Produces a random walk around 1.1000 with pip-sized moves. Clearly fake;
/// use it for smoke tests and benchmarks only.
pub fn generate_synthetic(
    symbol: &str,
    timeframe: Timeframe,
    start: DateTime<Utc>,
    count: usize,
) -> Vec<Candle> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    // Deterministic seed from symbol and timeframe
    let seed_bytes = blake3::hash(format!("{symbol}:{timeframe}").as_bytes());
    let mut rng = StdRng::from_seed(*seed_bytes.as_bytes());

    let mut candles = Vec::with_capacity(count);
    let mut price = 1.1000_f64;
    let mut time = align_start(timeframe, start);

    for _ in 0..count {
        let drift: f64 = rng.gen_range(-0.0015..0.0015);
        let open = price;
        let close = (price * (1.0 + drift)).max(0.0001);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.0008));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.0008));
        let volume = f64::from(rng.gen_range(100u32..5_000));
        candles.push(Candle::new(time, open, high, low, close).with_volume(volume));

        price = close;
        match timeframe.next_open(time) {
            Some(next) => time = next,
            None => break,
        }
    }
    candles
}

/// First aligned open time at or after `start`.
fn align_start(timeframe: Timeframe, start: DateTime<Utc>) -> DateTime<Utc> {
    let mut t = start
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|d| d.and_utc())
        .unwrap_or(start);
    if timeframe == Timeframe::MN1 {
        while !timeframe.is_aligned(t) || t < start {
            t += chrono::Duration::days(1);
        }
        return t;
    }
    // Midnight is aligned for every other timeframe; step forward to `start`.
    while t < start {
        match timeframe.next_open(t) {
            Some(next) => t = next,
            None => break,
        }
    }
    t
}
