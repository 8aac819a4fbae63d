//! Backtest replay.
//!
//! A run seeds a fresh [`Pipeline`] with the first `warmup_candles` bars, then
//! appends the remaining bars one at a time and evaluates after each append.
//! The pipeline never holds a bar later than the one being evaluated, which is
//! the whole look-ahead guarantee: the replay loop is the only place future
//! bars exist, and it hands them over strictly in order.
//!
//! Only the warm-up slice is validated as a whole. A replayed bar the buffer
//! rejects (insane, misaligned, out of order) is skipped with a warning and
//! listed in [`BacktestResult::rejected`]; it never affects earlier bars.
//!
//! Every run builds its own buffer and cooldown registry. Runs share nothing
//! and can execute in parallel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::buffer::BufferError;
use super::pipeline::{Pipeline, PipelineConfig, DEFAULT_BUFFER_SIZE};
use crate::config::{ConfigError, DetectorConfig, IchimokuConfig};
use crate::domain::{Candle, Pair, Signal, Timeframe};
use crate::fingerprint::SignalLogHash;
use crate::indicators::Ichimoku;

/// Default number of bars used only to fill lookbacks.
pub const DEFAULT_WARMUP_CANDLES: usize = 100;

/// Replayed candles between two progress log lines.
const PROGRESS_INTERVAL: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub ichimoku: IchimokuConfig,
    pub detector: DetectorConfig,
    pub warmup_candles: usize,
    pub buffer_size: usize,
    /// Bars before `from` are appended but never evaluated.
    pub from: Option<DateTime<Utc>>,
    /// Replay stops at the first bar after `to`.
    pub to: Option<DateTime<Utc>>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            ichimoku: IchimokuConfig::default(),
            detector: DetectorConfig::default(),
            warmup_candles: DEFAULT_WARMUP_CANDLES,
            buffer_size: DEFAULT_BUFFER_SIZE,
            from: None,
            to: None,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = Ichimoku::new(self.ichimoku.clone())?.required_bars();
        if self.buffer_size < required {
            return Err(ConfigError::CapacityTooSmall {
                capacity: self.buffer_size,
                required,
            });
        }
        // One more bar is appended before the first evaluation.
        if self.warmup_candles + 1 < required {
            return Err(ConfigError::WarmupTooShort {
                warmup: self.warmup_candles,
                required: required - 1,
            });
        }
        if self.warmup_candles > self.buffer_size {
            return Err(ConfigError::WarmupExceedsCapacity {
                warmup: self.warmup_candles,
                capacity: self.buffer_size,
            });
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(ConfigError::EmptyDateRange {
                    from: from.to_rfc3339(),
                    to: to.to_rfc3339(),
                });
            }
        }
        Ok(())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            ichimoku: self.ichimoku.clone(),
            detector: self.detector.clone(),
            buffer_size: self.buffer_size,
        }
    }
}

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("{pair} {timeframe}: {source}")]
    Buffer {
        pair: Pair,
        timeframe: Timeframe,
        #[source]
        source: BufferError,
    },
    #[error("{pair} {timeframe}: insufficient history ({got} candles, need more than {need})")]
    InsufficientHistory {
        pair: Pair,
        timeframe: Timeframe,
        got: usize,
        need: usize,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// One emitted signal and the index of the bar it fired on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub bar_index: usize,
    pub signal: Signal,
}

/// A replayed bar the buffer refused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedBar {
    pub bar_index: usize,
    pub time: DateTime<Utc>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub pair: Pair,
    pub timeframe: Timeframe,
    pub total_bars: usize,
    pub warmup_bars: usize,
    /// Bars that reached the detector (inside the date range).
    pub evaluated_bars: usize,
    pub signals: Vec<SignalRecord>,
    /// Replayed bars skipped because the buffer rejected them.
    #[serde(default)]
    pub rejected: Vec<RejectedBar>,
}

impl BacktestResult {
    pub fn fingerprint(&self) -> Result<SignalLogHash, serde_json::Error> {
        SignalLogHash::of(&self.signals)
    }

    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// The emitted signals without bar indices.
    pub fn iter_signals(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter().map(|r| &r.signal)
    }
}

#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Replay `candles` for one (pair, timeframe).
    pub fn run(
        &self,
        pair: &str,
        timeframe: Timeframe,
        candles: &[Candle],
    ) -> Result<BacktestResult, BacktestError> {
        let buffer_err = |source| BacktestError::Buffer {
            pair: pair.to_string(),
            timeframe,
            source,
        };

        let warmup = self.config.warmup_candles;
        if candles.len() <= warmup {
            return Err(BacktestError::InsufficientHistory {
                pair: pair.to_string(),
                timeframe,
                got: candles.len(),
                need: warmup,
            });
        }

        let mut pipeline = Pipeline::new(pair, timeframe, self.config.pipeline_config())?;
        pipeline.seed(&candles[..warmup]).map_err(buffer_err)?;

        let to_replay = candles.len() - warmup;
        info!(%pair, %timeframe, total = candles.len(), warmup, "backtest started");

        let mut signals = Vec::new();
        let mut rejected = Vec::new();
        let mut evaluated_bars = 0;

        for (offset, candle) in candles[warmup..].iter().enumerate() {
            let bar_index = warmup + offset;
            if self.config.to.is_some_and(|to| candle.time > to) {
                break;
            }

            if let Err(err) = pipeline.push(*candle) {
                warn!(%pair, %timeframe, bar_index, time = %candle.time, "candle skipped: {err}");
                rejected.push(RejectedBar {
                    bar_index,
                    time: candle.time,
                    reason: err.to_string(),
                });
                continue;
            }

            if (offset + 1) % PROGRESS_INTERVAL == 0 {
                debug!(%pair, %timeframe, "replayed {}/{} candles", offset + 1, to_replay);
            }

            if self.config.from.is_some_and(|from| candle.time < from) {
                continue;
            }

            evaluated_bars += 1;
            signals.extend(
                pipeline
                    .evaluate()
                    .into_iter()
                    .map(|signal| SignalRecord { bar_index, signal }),
            );
        }

        info!(
            %pair,
            %timeframe,
            evaluated_bars,
            signals = signals.len(),
            rejected = rejected.len(),
            "backtest finished"
        );

        Ok(BacktestResult {
            pair: pair.to_string(),
            timeframe,
            total_bars: candles.len(),
            warmup_bars: warmup,
            evaluated_bars,
            signals,
            rejected,
        })
    }
}
