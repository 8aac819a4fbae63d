//! Candle buffering and the two drivers of the detection pipeline.
//!
//! - [`CandleBuffer`]: rolling, validated window of candles
//! - [`Pipeline`]: buffer + Ichimoku + detector for one stream
//! - [`LiveMonitor`]: per-stream pipelines for the live tick path
//! - [`BacktestEngine`]: bar-by-bar historical replay

pub mod backtest;
pub mod buffer;
pub mod live;
pub mod pipeline;

pub use backtest::{
    BacktestConfig, BacktestEngine, BacktestError, BacktestResult, RejectedBar, SignalRecord,
    DEFAULT_WARMUP_CANDLES,
};
pub use buffer::{validate_series, AppendOutcome, BufferError, CandleBuffer, ValidationIssue};
pub use live::{LiveMonitor, MonitorError};
pub use pipeline::{Pipeline, PipelineConfig, DEFAULT_BUFFER_SIZE};
