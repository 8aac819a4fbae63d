//! Kumo Runner — backtest orchestration on top of `kumo-core`.
//!
//! This crate provides:
//! - TOML runner configuration (pairs, timeframes, date range, data layout)
//! - Candle CSV loading, normalization, and synthetic series generation
//! - Batch execution of (pair, timeframe) jobs on the rayon pool
//! - Signal reports: CSV, JSON, and a console summary

pub mod config;
pub mod data_loader;
pub mod report;
pub mod runner;

pub use config::{
    BacktestSettings, Job, PairConfig, RunnerConfig, RunnerConfigError, DEFAULT_MIN_CANDLES,
};
pub use data_loader::{
    dataset_hash, generate_synthetic, load_candles_csv, write_candles_csv, LoadError,
};
pub use report::{file_stamp, ReportDocument, SignalReport, StreamSummary};
pub use runner::{
    run_batch, run_job, run_series, BatchOutcome, BatchStats, JobOutcome, JobReport, RunError,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn jobs_cross_threads() {
        assert_send::<Job>();
        assert_sync::<Job>();
        assert_send::<JobReport>();
    }

    #[test]
    fn report_is_send_sync() {
        assert_send::<SignalReport>();
        assert_sync::<SignalReport>();
    }
}
