//! Donchian-style range helpers: highest high and lowest low over a window.
//!
//! For a window of `period` bars ending at `end` (inclusive):
//! - highest_high: max(high[end-period+1..=end])
//! - lowest_low:   min(low[end-period+1..=end])
//! - midpoint:     (highest_high + lowest_low) / 2
//!
//! All return `None` when fewer than `period` bars exist up to `end`. Bars
//! after `end` are never read.

use crate::domain::Candle;

fn window(candles: &[Candle], end: usize, period: usize) -> Option<&[Candle]> {
    if period == 0 || end >= candles.len() || end + 1 < period {
        return None;
    }
    Some(&candles[end + 1 - period..=end])
}

pub fn highest_high(candles: &[Candle], end: usize, period: usize) -> Option<f64> {
    window(candles, end, period)
        .map(|w| w.iter().fold(f64::NEG_INFINITY, |acc, c| acc.max(c.high)))
}

pub fn lowest_low(candles: &[Candle], end: usize, period: usize) -> Option<f64> {
    window(candles, end, period).map(|w| w.iter().fold(f64::INFINITY, |acc, c| acc.min(c.low)))
}

/// Midpoint of the high/low range over `period` bars ending at `end`.
pub fn midpoint(candles: &[Candle], end: usize, period: usize) -> Option<f64> {
    let high = highest_high(candles, end, period)?;
    let low = lowest_low(candles, end, period)?;
    Some((high + low) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_candles, DEFAULT_EPSILON};

    fn sample() -> Vec<Candle> {
        make_ohlc_candles(&[
            (10.0, 12.0, 9.0, 11.0),
            (11.0, 15.0, 10.0, 14.0),
            (14.0, 14.0, 13.0, 13.5),
            (13.5, 16.0, 12.0, 15.0),
            (15.0, 15.5, 14.0, 14.5),
        ])
    }

    #[test]
    fn highest_high_3() {
        let candles = sample();
        assert_eq!(highest_high(&candles, 1, 3), None);
        // max(12, 15, 14) = 15
        assert_approx(highest_high(&candles, 2, 3).unwrap(), 15.0, DEFAULT_EPSILON);
        // max(14, 16, 15.5) = 16
        assert_approx(highest_high(&candles, 4, 3).unwrap(), 16.0, DEFAULT_EPSILON);
    }

    #[test]
    fn lowest_low_3() {
        let candles = sample();
        // min(9, 10, 13) = 9
        assert_approx(lowest_low(&candles, 2, 3).unwrap(), 9.0, DEFAULT_EPSILON);
        // min(13, 12, 14) = 12
        assert_approx(lowest_low(&candles, 4, 3).unwrap(), 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn midpoint_3() {
        let candles = sample();
        // (16 + 10) / 2 = 13
        assert_approx(midpoint(&candles, 3, 3).unwrap(), 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn out_of_range_end_is_none() {
        let candles = sample();
        assert_eq!(midpoint(&candles, 5, 1), None);
        assert_eq!(midpoint(&candles, 0, 0), None);
    }

    #[test]
    fn single_bar_window() {
        let candles = sample();
        assert_approx(midpoint(&candles, 0, 1).unwrap(), 10.5, DEFAULT_EPSILON);
    }
}
