//! Domain types for Kumo

pub mod candle;
pub mod signal;
pub mod timeframe;

pub use candle::Candle;
pub use signal::{Direction, ParseSignalTypeError, Signal, SignalKey, SignalType};
pub use timeframe::{ParseTimeframeError, Timeframe};

/// Instrument symbol type alias (e.g. "EURUSD").
pub type Pair = String;
