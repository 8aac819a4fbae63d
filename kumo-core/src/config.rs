//! Indicator and detector configuration.
//!
//! Both structs deserialize with per-field defaults, so a TOML section may
//! name only the values it overrides. Validation happens once, when an
//! engine, detector, or pipeline is constructed; nothing is re-checked per bar.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::domain::SignalType;

/// Structural configuration errors. Always fatal at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must be >= 1 (got {value})")]
    NonPositivePeriod { name: &'static str, value: usize },
    #[error("buffer capacity {capacity} is too small: need at least {required} bars")]
    CapacityTooSmall { capacity: usize, required: usize },
    #[error("warmup_candles {warmup} is too small: need at least {required} bars")]
    WarmupTooShort { warmup: usize, required: usize },
    #[error("warmup_candles {warmup} exceeds buffer_size {capacity}")]
    WarmupExceedsCapacity { warmup: usize, capacity: usize },
    #[error("minimum bar count {min_bars} exceeds capacity {capacity}")]
    MinBarsExceedsCapacity { min_bars: usize, capacity: usize },
    #[error("date range is empty: from {from} is after to {to}")]
    EmptyDateRange { from: String, to: String },
}

/// Ichimoku periods. Defaults are the standard 9/26/52 with 26-bar shifts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IchimokuConfig {
    pub tenkan_period: usize,
    pub kijun_period: usize,
    pub senkou_b_period: usize,
    /// Forward shift of Senkou A/B.
    pub displacement: usize,
    /// Backward shift of the Chikou span.
    pub chikou_shift: usize,
}

impl Default for IchimokuConfig {
    fn default() -> Self {
        Self {
            tenkan_period: 9,
            kijun_period: 26,
            senkou_b_period: 52,
            displacement: 26,
            chikou_shift: 26,
        }
    }
}

impl IchimokuConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("tenkan_period", self.tenkan_period),
            ("kijun_period", self.kijun_period),
            ("senkou_b_period", self.senkou_b_period),
            ("displacement", self.displacement),
            ("chikou_shift", self.chikou_shift),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(ConfigError::NonPositivePeriod { name, value });
            }
        }
        Ok(())
    }

    /// Longest of the three midpoint lookbacks.
    pub fn max_period(&self) -> usize {
        self.tenkan_period
            .max(self.kijun_period)
            .max(self.senkou_b_period)
    }
}

/// Signal detector settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Minimum minutes between two fires of the same signal key. Zero disables.
    pub cooldown_minutes: u32,
    /// TK crosses only fire when price is on the matching side of the cloud.
    pub cloud_filter: bool,
    /// Only fire when at least two rules agree on a direction in one evaluation.
    pub strong_signal_only: bool,
    /// Rules to evaluate. Defaults to all six.
    pub enabled_signals: BTreeSet<SignalType>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            cooldown_minutes: 30,
            cloud_filter: true,
            strong_signal_only: false,
            enabled_signals: SignalType::ALL.into_iter().collect(),
        }
    }
}

impl DetectorConfig {
    pub fn with_enabled(mut self, signals: impl IntoIterator<Item = SignalType>) -> Self {
        self.enabled_signals = signals.into_iter().collect();
        self
    }

    pub fn is_enabled(&self, signal_type: SignalType) -> bool {
        self.enabled_signals.contains(&signal_type)
    }
}
