//! Deterministic fingerprints for backtest output and configuration.
//!
//! - `SignalLogHash`: identity of a signal log. Two runs over the same data
//!   with the same configuration must produce the same hash.
//! - `ConfigHash`: identity of a pipeline configuration, used to label runs.
//!
//! Both hash the canonical `serde_json` encoding with BLAKE3. Struct fields
//! serialize in declaration order and sets are `BTreeSet`s, so the encoding is
//! stable across processes and platforms.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::{PipelineConfig, SignalRecord};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalLogHash(pub String);

impl SignalLogHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// Hash of the canonical JSON encoding of `records`.
    pub fn of(records: &[SignalRecord]) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_vec(records)?;
        Ok(Self::from_bytes(&json))
    }

    /// First 12 hex characters, for display.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for SignalLogHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    pub fn of(config: &PipelineConfig) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_vec(config)?;
        Ok(Self(blake3::hash(&json).to_hex().to_string()))
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, Signal, SignalKey, SignalType, Timeframe};
    use crate::indicators::IchimokuSnapshot;
    use chrono::{TimeZone, Utc};

    fn record(bar_index: usize, price: f64) -> SignalRecord {
        SignalRecord {
            bar_index,
            signal: Signal {
                key: SignalKey::new("EURUSD", Timeframe::H1, SignalType::TkCrossUp),
                direction: Direction::Buy,
                timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
                price,
                context: IchimokuSnapshot::empty(price),
            },
        }
    }

    #[test]
    fn identical_logs_hash_equal() {
        let a = SignalLogHash::of(&[record(80, 1.1)]).unwrap();
        let b = SignalLogHash::of(&[record(80, 1.1)]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.0.len(), 64);
        assert_eq!(a.short().len(), 12);
    }

    #[test]
    fn any_difference_changes_hash() {
        let base = SignalLogHash::of(&[record(80, 1.1)]).unwrap();
        assert_ne!(base, SignalLogHash::of(&[record(81, 1.1)]).unwrap());
        assert_ne!(base, SignalLogHash::of(&[record(80, 1.10001)]).unwrap());
        assert_ne!(base, SignalLogHash::of(&[]).unwrap());
    }

    #[test]
    fn config_hash_tracks_parameters() {
        let default = ConfigHash::of(&PipelineConfig::default()).unwrap();
        assert_eq!(default, ConfigHash::of(&PipelineConfig::default()).unwrap());
        let mut changed = PipelineConfig::default();
        changed.detector.cooldown_minutes = 60;
        assert_ne!(default, ConfigHash::of(&changed).unwrap());
    }
}
