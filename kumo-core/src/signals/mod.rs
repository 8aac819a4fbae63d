//! Signal detection: rule predicates, cooldown timers, and the detector that
//! combines them, plus the sink interface signals are delivered through.

pub mod cooldown;
pub mod detector;
pub mod rules;

pub use cooldown::CooldownRegistry;
pub use detector::{SignalDetector, STRONG_SIGNAL_MIN_RULES};
pub use rules::{passes_cloud_filter, rule_fires};

use parking_lot::Mutex;
use tracing::info;

use crate::domain::Signal;

/// Destination for fired signals.
///
/// Delivery is fire-and-forget; a sink that can fail handles its own errors.
pub trait SignalSink: Send + Sync {
    fn deliver(&self, signal: &Signal);
}

/// Keeps every delivered signal in memory, in delivery order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    signals: Mutex<Vec<Signal>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything delivered so far.
    pub fn signals(&self) -> Vec<Signal> {
        self.signals.lock().clone()
    }

    /// Drain the collected signals.
    pub fn take(&self) -> Vec<Signal> {
        std::mem::take(&mut *self.signals.lock())
    }

    pub fn len(&self) -> usize {
        self.signals.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SignalSink for CollectingSink {
    fn deliver(&self, signal: &Signal) {
        self.signals.lock().push(signal.clone());
    }
}

/// Writes each signal to the `tracing` log at INFO.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl SignalSink for LogSink {
    fn deliver(&self, signal: &Signal) {
        info!(
            pair = signal.pair(),
            timeframe = %signal.timeframe(),
            signal_type = %signal.signal_type(),
            "{} {}",
            signal.signal_type().label(),
            signal
        );
    }
}

impl<S: SignalSink + ?Sized> SignalSink for std::sync::Arc<S> {
    fn deliver(&self, signal: &Signal) {
        (**self).deliver(signal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, SignalKey, SignalType, Timeframe};
    use crate::indicators::IchimokuSnapshot;
    use chrono::{TimeZone, Utc};

    fn signal(pair: &str) -> Signal {
        Signal {
            key: SignalKey::new(pair, Timeframe::H1, SignalType::TkCrossUp),
            direction: Direction::Buy,
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
            price: 1.1,
            context: IchimokuSnapshot::empty(1.1),
        }
    }

    #[test]
    fn collecting_sink_keeps_order() {
        let sink = CollectingSink::new();
        sink.deliver(&signal("EURUSD"));
        sink.deliver(&signal("GBPUSD"));
        let pairs: Vec<String> = sink.signals().iter().map(|s| s.pair().to_string()).collect();
        assert_eq!(pairs, vec!["EURUSD", "GBPUSD"]);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn sinks_are_usable_as_trait_objects() {
        let sinks: Vec<Box<dyn SignalSink>> = vec![
            Box::new(LogSink),
            Box::new(std::sync::Arc::new(CollectingSink::new())),
        ];
        for sink in &sinks {
            sink.deliver(&signal("EURUSD"));
        }
    }
}
