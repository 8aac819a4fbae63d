//! Broker timeframes and open-time alignment.

use chrono::{DateTime, Datelike, Duration, Months, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Bar timeframe, using the broker terminal's naming (M1 … MN1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
    W1,
    MN1,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown timeframe '{0}' (expected one of M1, M5, M15, M30, H1, H4, D1, W1, MN1)")]
pub struct ParseTimeframeError(pub String);

impl Timeframe {
    pub const ALL: [Timeframe; 9] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
        Timeframe::W1,
        Timeframe::MN1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "M1",
            Timeframe::M5 => "M5",
            Timeframe::M15 => "M15",
            Timeframe::M30 => "M30",
            Timeframe::H1 => "H1",
            Timeframe::H4 => "H4",
            Timeframe::D1 => "D1",
            Timeframe::W1 => "W1",
            Timeframe::MN1 => "MN1",
        }
    }

    /// Nominal bar length in minutes. MN1 is nominally 30 days.
    pub fn minutes(&self) -> i64 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::H1 => 60,
            Timeframe::H4 => 240,
            Timeframe::D1 => 1_440,
            Timeframe::W1 => 10_080,
            Timeframe::MN1 => 43_200,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.minutes())
    }

    /// Whether `time` is a valid bar open time for this timeframe.
    ///
    /// Intraday and daily bars must sit on an exact multiple of the period
    /// since the Unix epoch. Weekly bars must open at UTC midnight (brokers
    /// disagree on the weekday), monthly bars at midnight on the 1st.
    pub fn is_aligned(&self, time: DateTime<Utc>) -> bool {
        if time.timestamp_subsec_nanos() != 0 {
            return false;
        }
        match self {
            Timeframe::W1 => time.time() == NaiveTime::MIN,
            Timeframe::MN1 => time.time() == NaiveTime::MIN && time.day() == 1,
            _ => time.timestamp().rem_euclid(self.minutes() * 60) == 0,
        }
    }

    /// Open time of the bar following the one that opens at `time`.
    pub fn next_open(&self, time: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Timeframe::MN1 => time.checked_add_months(Months::new(1)),
            _ => time.checked_add_signed(self.duration()),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ParseTimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.as_str() == upper)
            .ok_or_else(|| ParseTimeframeError(s.to_string()))
    }
}
