//! Signal detector: rule evaluation, strong-signal aggregation and cooldowns.
//!
//! Evaluation order for one bar:
//! 1. Each enabled rule is checked against the frame (cloud filter applied to
//!    TK crosses when enabled).
//! 2. With `strong_signal_only`, candidates survive only if at least one other
//!    candidate agrees on the same direction.
//! 3. Each survivor passes through its own cooldown key. There is no combined
//!    key for an aggregated signal; every contributing rule consumes its own
//!    timer.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::cooldown::CooldownRegistry;
use super::rules::rule_fires;
use crate::config::DetectorConfig;
use crate::domain::{Direction, Signal, SignalKey, SignalType, Timeframe};
use crate::indicators::IchimokuFrame;

/// Minimum number of agreeing rules under `strong_signal_only`.
pub const STRONG_SIGNAL_MIN_RULES: usize = 2;

/// Stateful detector for one (pair, timeframe) stream.
///
/// The only mutable state is the cooldown registry, which locks internally,
/// so `evaluate` takes `&self`.
#[derive(Debug)]
pub struct SignalDetector {
    config: DetectorConfig,
    cooldowns: CooldownRegistry,
}

impl SignalDetector {
    pub fn new(config: DetectorConfig) -> Self {
        let cooldowns = CooldownRegistry::from_minutes(config.cooldown_minutes);
        Self { config, cooldowns }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn cooldowns(&self) -> &CooldownRegistry {
        &self.cooldowns
    }

    /// Clear all cooldown state.
    pub fn reset_cooldowns(&self) {
        self.cooldowns.reset();
    }

    /// Rules that trigger on `frame`, before cooldowns. Does not touch state.
    pub fn candidates(&self, frame: &IchimokuFrame) -> Vec<SignalType> {
        let triggered: Vec<SignalType> = SignalType::ALL
            .into_iter()
            .filter(|st| self.config.is_enabled(*st))
            .filter(|st| rule_fires(*st, frame, self.config.cloud_filter))
            .collect();

        if !self.config.strong_signal_only {
            return triggered;
        }

        let agreeing = |direction: Direction| {
            triggered
                .iter()
                .filter(|st| st.direction() == direction)
                .count()
        };
        let buy_ok = agreeing(Direction::Buy) >= STRONG_SIGNAL_MIN_RULES;
        let sell_ok = agreeing(Direction::Sell) >= STRONG_SIGNAL_MIN_RULES;

        triggered
            .into_iter()
            .filter(|st| match st.direction() {
                Direction::Buy => buy_ok,
                Direction::Sell => sell_ok,
            })
            .collect()
    }

    /// Evaluate one bar and return the signals that fire.
    ///
    /// `time` is the open time of the bar `frame.current` describes.
    pub fn evaluate(
        &self,
        pair: &str,
        timeframe: Timeframe,
        time: DateTime<Utc>,
        frame: &IchimokuFrame,
    ) -> Vec<Signal> {
        let mut signals = Vec::new();

        for signal_type in self.candidates(frame) {
            let key = SignalKey::new(pair, timeframe, signal_type);
            if !self.cooldowns.try_fire(&key, time) {
                debug!(%key, %time, "cooldown active, signal suppressed");
                continue;
            }

            let signal = Signal {
                key,
                direction: signal_type.direction(),
                timestamp: time,
                price: frame.current.close,
                context: frame.current,
            };
            info!("signal fired: {signal}");
            signals.push(signal);
        }

        signals
    }
}
