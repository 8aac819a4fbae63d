//! Live mode and backtest mode share one decision path.
//!
//! Feeding a series candle by candle through the `LiveMonitor` must emit the
//! same signals, in the same order, as a backtest over the same series.

use chrono::{DateTime, Duration, TimeZone, Utc};
use kumo_core::domain::{Candle, Timeframe};
use kumo_core::engine::{BacktestConfig, BacktestEngine, LiveMonitor, MonitorError, BufferError};
use kumo_core::signals::CollectingSink;
use std::sync::Arc;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 5, 0, 0, 0).unwrap()
}

fn make_test_candles(n: usize, seed: u64) -> Vec<Candle> {
    let mut state = seed.wrapping_add(17);
    let mut price = 150.0;
    (0..n)
        .map(|i| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let change = (((state >> 33) % 200) as f64 - 100.0) * 0.01;
            let open = price;
            price = (price + change).max(50.0);
            Candle::new(
                base_time() + Duration::hours(4 * i as i64),
                open,
                open.max(price) + 0.2,
                open.min(price) - 0.2,
                price,
            )
        })
        .collect()
}

#[test]
fn live_replay_matches_backtest() {
    let candles = make_test_candles(400, 3);
    let config = BacktestConfig::default();
    let warmup = config.warmup_candles;

    let backtest = BacktestEngine::new(config.clone())
        .unwrap()
        .run("USDJPY", Timeframe::H4, &candles)
        .unwrap();

    let monitor = LiveMonitor::new(config.pipeline_config());
    monitor
        .register("USDJPY", Timeframe::H4, &candles[..warmup])
        .unwrap();
    let sink = CollectingSink::new();
    for candle in &candles[warmup..] {
        monitor
            .on_candle("USDJPY", Timeframe::H4, *candle, &sink)
            .unwrap();
    }

    let live = sink.signals();
    let replayed: Vec<_> = backtest.iter_signals().cloned().collect();
    assert_eq!(live, replayed);
}

#[test]
fn out_of_order_tick_is_recoverable() {
    let candles = make_test_candles(120, 9);
    let monitor = LiveMonitor::new(BacktestConfig::default().pipeline_config());
    monitor
        .register("USDJPY", Timeframe::H4, &candles[..100])
        .unwrap();
    let sink = CollectingSink::new();

    // A bar older than anything buffered that is not a repaint of a known bar.
    let mut stale = candles[0];
    stale.time -= Duration::hours(4);
    let err = monitor
        .on_candle("USDJPY", Timeframe::H4, stale, &sink)
        .unwrap_err();
    assert!(matches!(
        err,
        MonitorError::Buffer {
            source: BufferError::OutOfOrder { .. },
            ..
        }
    ));

    // The stream keeps working afterwards.
    assert!(monitor
        .on_candle("USDJPY", Timeframe::H4, candles[100], &sink)
        .is_ok());
}

#[test]
fn streams_tick_concurrently() {
    let candles = make_test_candles(300, 21);
    let monitor = Arc::new(LiveMonitor::new(BacktestConfig::default().pipeline_config()));
    let pairs = ["EURUSD", "GBPUSD", "USDJPY", "AUDUSD"];
    for pair in pairs {
        monitor.register(pair, Timeframe::H4, &candles[..100]).unwrap();
    }
    let sink = Arc::new(CollectingSink::new());

    std::thread::scope(|scope| {
        for pair in pairs {
            let monitor = Arc::clone(&monitor);
            let sink = Arc::clone(&sink);
            let candles = &candles;
            scope.spawn(move || {
                for candle in &candles[100..] {
                    monitor
                        .on_candle(pair, Timeframe::H4, *candle, sink.as_ref())
                        .unwrap();
                }
            });
        }
    });

    let all = sink.signals();
    let eurusd: Vec<_> = all.iter().filter(|s| s.pair() == "EURUSD").collect();
    for pair in &pairs[1..] {
        let other: Vec<_> = all.iter().filter(|s| s.pair() == *pair).collect();
        assert_eq!(other.len(), eurusd.len());
        for (a, b) in other.iter().zip(&eurusd) {
            assert_eq!(a.timestamp, b.timestamp);
            assert_eq!(a.signal_type(), b.signal_type());
        }
    }
}
