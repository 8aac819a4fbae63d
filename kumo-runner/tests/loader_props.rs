//! Property tests for candle loading.
//!
//! 1. `normalize` yields strictly ascending times and keeps the last row per time
//! 2. CSV written by `write_candles` reads back to the same normalized series

use chrono::{DateTime, Duration, TimeZone, Utc};
use kumo_core::domain::Candle;
use kumo_runner::data_loader::{normalize, read_candles, write_candles};
use proptest::prelude::*;
use std::collections::HashMap;
use std::path::Path;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn arb_rows() -> impl Strategy<Value = Vec<(i64, f64)>> {
    prop::collection::vec((0i64..60, 10.0..20.0_f64), 1..120)
}

fn to_candles(rows: &[(i64, f64)]) -> Vec<Candle> {
    rows.iter()
        .map(|&(h, close)| {
            let close = (close * 10_000.0).round() / 10_000.0;
            Candle::new(
                base_time() + Duration::hours(h),
                close,
                close + 0.01,
                close - 0.01,
                close,
            )
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // ── 1. Normalize ─────────────────────────────────────────────────

    #[test]
    fn normalize_sorts_and_keeps_last(rows in arb_rows()) {
        let candles = to_candles(&rows);
        let mut last_by_time = HashMap::new();
        for c in &candles {
            last_by_time.insert(c.time, c.close);
        }

        let out = normalize(candles);
        prop_assert_eq!(out.len(), last_by_time.len());
        for pair in out.windows(2) {
            prop_assert!(pair[0].time < pair[1].time);
        }
        for c in &out {
            prop_assert_eq!(Some(&c.close), last_by_time.get(&c.time));
        }
    }

    // ── 2. CSV ───────────────────────────────────────────────────────

    #[test]
    fn written_csv_reads_back(rows in arb_rows()) {
        let series = normalize(to_candles(&rows));
        let mut buf = Vec::new();
        write_candles(&mut buf, &series).unwrap();
        let read = read_candles(buf.as_slice(), Path::new("memory.csv")).unwrap();
        prop_assert_eq!(read.len(), series.len());
        for (a, b) in read.iter().zip(&series) {
            prop_assert_eq!(a.time, b.time);
            prop_assert!((a.close - b.close).abs() < 1e-9);
        }
    }
}
