//! Buffer, indicator engine and detector for one (pair, timeframe).
//!
//! Live monitoring and backtest replay both drive a [`Pipeline`], so the
//! decision path from "candle appended" to "signals emitted" is one piece of
//! code. Mutation (`push`) and evaluation (`evaluate`) are separate steps;
//! `on_candle` runs both.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::buffer::{AppendOutcome, BufferError, CandleBuffer};
use crate::config::{ConfigError, DetectorConfig, IchimokuConfig};
use crate::domain::{Candle, Pair, Signal, Timeframe};
use crate::indicators::{Ichimoku, IchimokuFrame};
use crate::signals::SignalDetector;

/// Default rolling window length.
pub const DEFAULT_BUFFER_SIZE: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub ichimoku: IchimokuConfig,
    pub detector: DetectorConfig,
    pub buffer_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ichimoku: IchimokuConfig::default(),
            detector: DetectorConfig::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

#[derive(Debug)]
pub struct Pipeline {
    pair: Pair,
    timeframe: Timeframe,
    buffer: CandleBuffer,
    engine: Ichimoku,
    detector: SignalDetector,
}

impl Pipeline {
    /// Build a pipeline. The buffer must hold at least
    /// [`Ichimoku::required_bars`] candles.
    pub fn new(
        pair: impl Into<Pair>,
        timeframe: Timeframe,
        config: PipelineConfig,
    ) -> Result<Self, ConfigError> {
        let engine = Ichimoku::new(config.ichimoku)?;
        let required = engine.required_bars();
        if config.buffer_size < required {
            return Err(ConfigError::CapacityTooSmall {
                capacity: config.buffer_size,
                required,
            });
        }
        let buffer = CandleBuffer::new(timeframe, config.buffer_size, required)?;
        Ok(Self {
            pair: pair.into(),
            timeframe,
            buffer,
            engine,
            detector: SignalDetector::new(config.detector),
        })
    }

    pub fn pair(&self) -> &str {
        &self.pair
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn buffer(&self) -> &CandleBuffer {
        &self.buffer
    }

    pub fn engine(&self) -> &Ichimoku {
        &self.engine
    }

    pub fn detector(&self) -> &SignalDetector {
        &self.detector
    }

    /// Load history. Warns once when it is too short to evaluate rules yet.
    pub fn seed(&mut self, history: &[Candle]) -> Result<(), BufferError> {
        self.buffer.seed(history)?;
        if !self.buffer.is_ready() {
            warn!(
                pair = %self.pair,
                timeframe = %self.timeframe,
                have = self.buffer.len(),
                need = self.buffer.min_bars(),
                "insufficient history, signals stay silent until the buffer fills"
            );
        }
        Ok(())
    }

    /// Append a candle without evaluating.
    pub fn push(&mut self, candle: Candle) -> Result<AppendOutcome, BufferError> {
        self.buffer.append(candle)
    }

    /// Indicator frame for the newest bar, if the buffer is ready.
    pub fn latest_frame(&self) -> Option<IchimokuFrame> {
        self.engine.frame(self.buffer.window()?)
    }

    /// Evaluate the newest bar. Returns no signals while the buffer is warming up.
    pub fn evaluate(&self) -> Vec<Signal> {
        let (Some(frame), Some(time)) = (self.latest_frame(), self.buffer.latest_time()) else {
            debug!(pair = %self.pair, timeframe = %self.timeframe, "buffer not ready, skipping evaluation");
            return Vec::new();
        };
        self.detector.evaluate(&self.pair, self.timeframe, time, &frame)
    }

    /// Append then evaluate.
    pub fn on_candle(&mut self, candle: Candle) -> Result<Vec<Signal>, BufferError> {
        self.push(candle)?;
        Ok(self.evaluate())
    }
}
