//! Signal types, keys, and the immutable `Signal` event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::Timeframe;
use crate::indicators::IchimokuSnapshot;

/// Alert direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Buy => Direction::Sell,
            Direction::Sell => Direction::Buy,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The six Ichimoku signal rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    TkCrossUp,
    TkCrossDown,
    KumoBreakoutUp,
    KumoBreakoutDown,
    ChikouCrossUp,
    ChikouCrossDown,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown signal type '{0}'")]
pub struct ParseSignalTypeError(pub String);

impl SignalType {
    /// Evaluation order. Signals emitted in one evaluation follow this order.
    pub const ALL: [SignalType; 6] = [
        SignalType::TkCrossUp,
        SignalType::TkCrossDown,
        SignalType::KumoBreakoutUp,
        SignalType::KumoBreakoutDown,
        SignalType::ChikouCrossUp,
        SignalType::ChikouCrossDown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::TkCrossUp => "tk_cross_up",
            SignalType::TkCrossDown => "tk_cross_down",
            SignalType::KumoBreakoutUp => "kumo_breakout_up",
            SignalType::KumoBreakoutDown => "kumo_breakout_down",
            SignalType::ChikouCrossUp => "chikou_cross_up",
            SignalType::ChikouCrossDown => "chikou_cross_down",
        }
    }

    /// Human-readable label used in notifications and console reports.
    pub fn label(&self) -> &'static str {
        match self {
            SignalType::TkCrossUp => "TK Cross ↑",
            SignalType::TkCrossDown => "TK Cross ↓",
            SignalType::KumoBreakoutUp => "Kumo Breakout ↑",
            SignalType::KumoBreakoutDown => "Kumo Breakout ↓",
            SignalType::ChikouCrossUp => "Chikou Cross ↑",
            SignalType::ChikouCrossDown => "Chikou Cross ↓",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            SignalType::TkCrossUp | SignalType::KumoBreakoutUp | SignalType::ChikouCrossUp => {
                Direction::Buy
            }
            SignalType::TkCrossDown
            | SignalType::KumoBreakoutDown
            | SignalType::ChikouCrossDown => Direction::Sell,
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalType {
    type Err = ParseSignalTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        SignalType::ALL
            .into_iter()
            .find(|st| st.as_str() == lower)
            .ok_or_else(|| ParseSignalTypeError(s.to_string()))
    }
}

/// Identifies one cooldown timer and one alert channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalKey {
    pub pair: String,
    pub timeframe: Timeframe,
    pub signal_type: SignalType,
}

impl SignalKey {
    pub fn new(pair: impl Into<String>, timeframe: Timeframe, signal_type: SignalType) -> Self {
        Self {
            pair: pair.into(),
            timeframe,
            signal_type,
        }
    }
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.pair, self.timeframe, self.signal_type)
    }
}

/// An immutable alert emitted by the detector.
///
/// `timestamp` is the open time of the bar the rule fired on and `price` is
/// that bar's close. `context` is the indicator snapshot of the same bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub key: SignalKey,
    pub direction: Direction,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub context: IchimokuSnapshot,
}

impl Signal {
    pub fn pair(&self) -> &str {
        &self.key.pair
    }

    pub fn timeframe(&self) -> Timeframe {
        self.key.timeframe
    }

    pub fn signal_type(&self) -> SignalType {
        self.key.signal_type
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} | {} {} | price={:.5} | {}",
            self.direction,
            self.key.signal_type.as_str().to_ascii_uppercase(),
            self.key.pair,
            self.key.timeframe,
            self.price,
            self.timestamp.format("%Y-%m-%d %H:%M UTC"),
        )
    }
}
