//! Fixed-capacity rolling candle window for one (pair, timeframe).
//!
//! Invariants held after every successful mutation:
//! - open times are strictly ascending (so no duplicates),
//! - every candle is sane and aligned to the buffer's timeframe,
//! - `len() <= capacity()`; the oldest candles are evicted first.
//!
//! A failed mutation leaves the buffer exactly as it was.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::{Candle, Timeframe};

/// Why a candle was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationIssue {
    /// Non-finite or inconsistent OHLC values.
    NotSane,
    /// Open time is not on a period boundary of the timeframe.
    Misaligned(Timeframe),
    /// Open time is earlier than the previous candle in the same batch.
    NotAscending { previous: DateTime<Utc> },
    /// Open time equals the previous candle in the same batch.
    Duplicate,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::NotSane => write!(f, "OHLC values are not sane"),
            ValidationIssue::Misaligned(tf) => write!(f, "open time not aligned to {tf}"),
            ValidationIssue::NotAscending { previous } => {
                write!(f, "open time precedes previous candle at {previous}")
            }
            ValidationIssue::Duplicate => write!(f, "duplicate open time"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BufferError {
    #[error("invalid candle #{index} at {time}: {issue}")]
    Validation {
        index: usize,
        time: DateTime<Utc>,
        issue: ValidationIssue,
    },
    #[error("candle at {got} is older than the newest buffered candle at {newest}")]
    OutOfOrder {
        newest: DateTime<Utc>,
        got: DateTime<Utc>,
    },
}

/// Result of a successful [`CandleBuffer::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// A new bar was pushed; `evicted` old bars were dropped to stay in capacity.
    Inserted { evicted: usize },
    /// A bar with the same open time was overwritten (repaint).
    Replaced,
}

fn check_candle(
    timeframe: Timeframe,
    index: usize,
    candle: &Candle,
) -> Result<(), BufferError> {
    let issue = if !candle.is_sane() {
        Some(ValidationIssue::NotSane)
    } else if !timeframe.is_aligned(candle.time) {
        Some(ValidationIssue::Misaligned(timeframe))
    } else {
        None
    };
    match issue {
        Some(issue) => Err(BufferError::Validation {
            index,
            time: candle.time,
            issue,
        }),
        None => Ok(()),
    }
}

/// Check a whole series: sane, aligned, strictly ascending.
pub fn validate_series(timeframe: Timeframe, candles: &[Candle]) -> Result<(), BufferError> {
    let mut previous: Option<DateTime<Utc>> = None;
    for (index, candle) in candles.iter().enumerate() {
        check_candle(timeframe, index, candle)?;
        if let Some(prev) = previous {
            let issue = if candle.time == prev {
                Some(ValidationIssue::Duplicate)
            } else if candle.time < prev {
                Some(ValidationIssue::NotAscending { previous: prev })
            } else {
                None
            };
            if let Some(issue) = issue {
                return Err(BufferError::Validation {
                    index,
                    time: candle.time,
                    issue,
                });
            }
        }
        previous = Some(candle.time);
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct CandleBuffer {
    timeframe: Timeframe,
    capacity: usize,
    min_bars: usize,
    candles: Vec<Candle>,
}

impl CandleBuffer {
    /// `min_bars` is the length at which [`window`](Self::window) starts
    /// returning data.
    pub fn new(timeframe: Timeframe, capacity: usize, min_bars: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::CapacityTooSmall {
                capacity,
                required: 1,
            });
        }
        if min_bars > capacity {
            return Err(ConfigError::MinBarsExceedsCapacity { min_bars, capacity });
        }
        Ok(Self {
            timeframe,
            capacity,
            min_bars,
            candles: Vec::with_capacity(capacity),
        })
    }

    /// Replace the content with `candles`, keeping the newest `capacity`.
    pub fn seed(&mut self, candles: &[Candle]) -> Result<(), BufferError> {
        validate_series(self.timeframe, candles)?;
        let start = candles.len().saturating_sub(self.capacity);
        self.candles.clear();
        self.candles.extend_from_slice(&candles[start..]);
        Ok(())
    }

    pub fn append(&mut self, candle: Candle) -> Result<AppendOutcome, BufferError> {
        check_candle(self.timeframe, self.candles.len(), &candle)?;

        if let Some(newest) = self.latest_time() {
            if candle.time < newest {
                return match self.candles.binary_search_by_key(&candle.time, |c| c.time) {
                    Ok(pos) => {
                        self.candles[pos] = candle;
                        Ok(AppendOutcome::Replaced)
                    }
                    Err(_) => Err(BufferError::OutOfOrder {
                        newest,
                        got: candle.time,
                    }),
                };
            }
            if candle.time == newest {
                let last = self.candles.len() - 1;
                self.candles[last] = candle;
                return Ok(AppendOutcome::Replaced);
            }
        }

        self.candles.push(candle);
        let evicted = self.candles.len().saturating_sub(self.capacity);
        if evicted > 0 {
            self.candles.drain(..evicted);
        }
        Ok(AppendOutcome::Inserted { evicted })
    }

    /// Ordered view of the buffer once it holds at least `min_bars` candles.
    pub fn window(&self) -> Option<&[Candle]> {
        self.is_ready().then_some(self.candles.as_slice())
    }

    /// Every buffered candle, regardless of readiness.
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn is_ready(&self) -> bool {
        self.candles.len() >= self.min_bars
    }

    pub fn latest_time(&self) -> Option<DateTime<Utc>> {
        self.candles.last().map(|c| c.time)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn min_bars(&self) -> usize {
        self.min_bars
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }
}
