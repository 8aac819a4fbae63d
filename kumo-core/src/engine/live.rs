//! Live monitoring: one [`Pipeline`] per (pair, timeframe).
//!
//! The registry map sits behind an `RwLock` and each pipeline behind its own
//! `Mutex`, so ticks for different streams run concurrently while two ticks
//! for the same stream serialize.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::buffer::BufferError;
use super::pipeline::{Pipeline, PipelineConfig};
use crate::config::ConfigError;
use crate::domain::{Candle, Pair, Signal, Timeframe};
use crate::signals::SignalSink;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("no pipeline registered for {pair} {timeframe}")]
    UnknownStream { pair: Pair, timeframe: Timeframe },
    #[error("{pair} {timeframe}: {source}")]
    Buffer {
        pair: Pair,
        timeframe: Timeframe,
        #[source]
        source: BufferError,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

type StreamKey = (Pair, Timeframe);

#[derive(Debug)]
pub struct LiveMonitor {
    config: PipelineConfig,
    pipelines: RwLock<HashMap<StreamKey, Arc<Mutex<Pipeline>>>>,
}

impl LiveMonitor {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            pipelines: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Create (or replace) the pipeline for a stream and seed it with history.
    pub fn register(
        &self,
        pair: impl Into<Pair>,
        timeframe: Timeframe,
        history: &[Candle],
    ) -> Result<(), MonitorError> {
        self.register_with(pair, timeframe, self.config.clone(), history)
    }

    /// Like [`register`](Self::register) with a per-stream configuration.
    pub fn register_with(
        &self,
        pair: impl Into<Pair>,
        timeframe: Timeframe,
        config: PipelineConfig,
        history: &[Candle],
    ) -> Result<(), MonitorError> {
        let pair = pair.into();
        let mut pipeline = Pipeline::new(pair.clone(), timeframe, config)?;
        pipeline
            .seed(history)
            .map_err(|source| MonitorError::Buffer {
                pair: pair.clone(),
                timeframe,
                source,
            })?;
        info!(%pair, %timeframe, bars = history.len(), "stream registered");
        self.pipelines
            .write()
            .insert((pair, timeframe), Arc::new(Mutex::new(pipeline)));
        Ok(())
    }

    pub fn is_registered(&self, pair: &str, timeframe: Timeframe) -> bool {
        self.pipelines
            .read()
            .contains_key(&(pair.to_string(), timeframe))
    }

    /// Registered streams, sorted.
    pub fn streams(&self) -> Vec<(Pair, Timeframe)> {
        let mut keys: Vec<_> = self.pipelines.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn pipeline(&self, pair: &str, timeframe: Timeframe) -> Result<Arc<Mutex<Pipeline>>, MonitorError> {
        self.pipelines
            .read()
            .get(&(pair.to_string(), timeframe))
            .cloned()
            .ok_or_else(|| MonitorError::UnknownStream {
                pair: pair.to_string(),
                timeframe,
            })
    }

    /// Feed one closed candle and deliver any signals to `sink`.
    ///
    /// An out-of-order candle is reported and leaves the stream unchanged.
    pub fn on_candle(
        &self,
        pair: &str,
        timeframe: Timeframe,
        candle: Candle,
        sink: &dyn SignalSink,
    ) -> Result<Vec<Signal>, MonitorError> {
        let pipeline = self.pipeline(pair, timeframe)?;
        let mut pipeline = pipeline.lock();
        let signals = pipeline
            .on_candle(candle)
            .map_err(|source| MonitorError::Buffer {
                pair: pair.to_string(),
                timeframe,
                source,
            })?;
        debug!(%pair, %timeframe, time = %candle.time, fired = signals.len(), "candle evaluated");
        for signal in &signals {
            sink.deliver(signal);
        }
        Ok(signals)
    }

    /// Clear cooldowns on every stream.
    pub fn reset_cooldowns(&self) {
        for pipeline in self.pipelines.read().values() {
            pipeline.lock().detector().reset_cooldowns();
        }
    }

    pub fn remove(&self, pair: &str, timeframe: Timeframe) -> bool {
        self.pipelines
            .write()
            .remove(&(pair.to_string(), timeframe))
            .is_some()
    }
}
