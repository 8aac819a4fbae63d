//! Candle: one OHLC bar keyed by its open time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLC bar for one instrument on one timeframe.
///
/// `time` is the bar's open time in UTC. Candles are immutable once they are
/// inside a buffer; a broker-side repaint replaces the whole candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl Candle {
    pub fn new(time: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Returns true if any OHLC field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Basic OHLC sanity check: finite prices, high >= open/close >= low.
    ///
    /// Zero and negative prices pass; spreads and some synthetic series have them.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        if let Some(volume) = self.volume {
            if !(volume.is_finite() && volume >= 0.0) {
                return false;
            }
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_candle() -> Candle {
        Candle::new(
            Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap(),
            1.0850,
            1.0872,
            1.0841,
            1.0866,
        )
    }

    #[test]
    fn candle_is_sane() {
        assert!(sample_candle().is_sane());
    }

    #[test]
    fn candle_detects_void() {
        let mut candle = sample_candle();
        candle.close = f64::NAN;
        assert!(candle.is_void());
        assert!(!candle.is_sane());

        let mut candle = sample_candle();
        candle.high = f64::INFINITY;
        assert!(candle.is_void());
    }

    #[test]
    fn candle_detects_insane_high_low() {
        let mut candle = sample_candle();
        candle.high = 1.0800; // below low
        assert!(!candle.is_sane());
    }

    #[test]
    fn zero_and_negative_prices_are_sane_when_ordered() {
        let time = Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap();
        assert!(Candle::new(time, 0.0, 0.5, 0.0, 0.25).is_sane());
        assert!(Candle::new(time, -1.2, -0.8, -1.5, -1.0).is_sane());
        assert!(!Candle::new(time, -1.2, -1.6, -1.5, -1.0).is_sane());
    }

    #[test]
    fn candle_rejects_negative_volume() {
        let candle = sample_candle().with_volume(-1.0);
        assert!(!candle.is_sane());
        assert!(sample_candle().with_volume(120.0).is_sane());
    }

    #[test]
    fn candle_volume_is_optional_in_json() {
        let json = r#"{"time":"2024-06-03T10:00:00Z","open":1.085,"high":1.0872,"low":1.0841,"close":1.0866}"#;
        let candle: Candle = serde_json::from_str(json).unwrap();
        assert_eq!(candle.volume, None);
        assert_eq!(candle.time, sample_candle().time);
        assert!(!serde_json::to_string(&candle).unwrap().contains("volume"));
    }
}
