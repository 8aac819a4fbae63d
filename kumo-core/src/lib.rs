//! Kumo Core — Ichimoku signal engine.
//!
//! This crate contains the detection pipeline shared by live monitoring and
//! backtesting:
//! - Domain types (candles, timeframes, signals)
//! - Rolling candle buffer with ordering and alignment validation
//! - Ichimoku indicator engine (pure, reads only bars up to the one evaluated)
//! - Six-rule signal detector with cloud filter and per-key cooldowns
//! - Live monitor and zero look-ahead backtest replay

pub mod config;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod indicators;
pub mod signals;

pub use config::{ConfigError, DetectorConfig, IchimokuConfig};
pub use domain::{Candle, Direction, Signal, SignalKey, SignalType, Timeframe};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything shared between threads is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Candle>();
        require_sync::<domain::Candle>();
        require_send::<domain::Signal>();
        require_sync::<domain::Signal>();

        require_send::<indicators::Ichimoku>();
        require_sync::<indicators::Ichimoku>();

        require_send::<signals::CooldownRegistry>();
        require_sync::<signals::CooldownRegistry>();
        require_send::<signals::SignalDetector>();
        require_sync::<signals::SignalDetector>();
        require_send::<signals::CollectingSink>();
        require_sync::<signals::CollectingSink>();

        require_send::<engine::Pipeline>();
        require_sync::<engine::Pipeline>();
        require_send::<engine::LiveMonitor>();
        require_sync::<engine::LiveMonitor>();
        require_send::<engine::BacktestEngine>();
        require_sync::<engine::BacktestEngine>();
        require_send::<engine::BacktestResult>();
        require_sync::<engine::BacktestResult>();
    }

    /// Compile-time check: rules see only an `IchimokuFrame`, never a candle
    /// slice, so they cannot index past the bar being evaluated.
    #[allow(dead_code)]
    fn rules_take_only_a_frame(frame: &indicators::IchimokuFrame) -> bool {
        signals::rule_fires(SignalType::TkCrossUp, frame, true)
    }

    #[test]
    fn no_rule_fires_on_an_undefined_frame() {
        let empty = indicators::IchimokuSnapshot {
            close: 1.1,
            tenkan: None,
            kijun: None,
            senkou_a: None,
            senkou_b: None,
            chikou: None,
            chikou_reference: None,
        };
        let frame = indicators::IchimokuFrame {
            previous: empty,
            current: empty,
        };
        for signal_type in SignalType::ALL {
            assert!(!signals::rule_fires(signal_type, &frame, false), "{signal_type:?}");
            assert!(!signals::rule_fires(signal_type, &frame, true), "{signal_type:?}");
        }
    }
}
