//! Ichimoku lines for a single bar, computed from the bars up to and
//! including it.
//!
//! For bar `i` of a candle window:
//! - Tenkan   = midpoint over `tenkan_period` bars ending at i
//! - Kijun    = midpoint over `kijun_period` bars ending at i
//! - Senkou A = (Tenkan + Kijun) / 2 of bar `i - displacement`
//! - Senkou B = midpoint over `senkou_b_period` bars ending at `i - displacement`
//! - Chikou   = close of bar i, compared against close of bar `i - chikou_shift`
//!
//! Senkou A/B are stored at the bar they are *projected onto*, so the cloud
//! read from a snapshot is the cloud visible at that bar. Nothing here reads a
//! bar later than `i`.

use serde::{Deserialize, Serialize};

use super::midpoint::midpoint;
use crate::config::{ConfigError, IchimokuConfig};
use crate::domain::Candle;

/// Ichimoku values for one bar. `None` means insufficient history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IchimokuSnapshot {
    pub close: f64,
    pub tenkan: Option<f64>,
    pub kijun: Option<f64>,
    pub senkou_a: Option<f64>,
    pub senkou_b: Option<f64>,
    pub chikou: Option<f64>,
    /// Close `chikou_shift` bars back, the level the Chikou span is crossing.
    pub chikou_reference: Option<f64>,
}

/// Cloud bounds at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cloud {
    pub top: f64,
    pub bottom: f64,
}

/// Price location relative to the cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloudPosition {
    Above,
    Inside,
    Below,
}

impl Cloud {
    pub fn from_spans(senkou_a: f64, senkou_b: f64) -> Self {
        Self {
            top: senkou_a.max(senkou_b),
            bottom: senkou_a.min(senkou_b),
        }
    }

    /// Strictly above the top or strictly below the bottom; anything else,
    /// including touching an edge, is inside.
    pub fn position(&self, price: f64) -> CloudPosition {
        if price > self.top {
            CloudPosition::Above
        } else if price < self.bottom {
            CloudPosition::Below
        } else {
            CloudPosition::Inside
        }
    }
}

impl IchimokuSnapshot {
    /// Snapshot with every line undefined.
    pub fn empty(close: f64) -> Self {
        Self {
            close,
            tenkan: None,
            kijun: None,
            senkou_a: None,
            senkou_b: None,
            chikou: None,
            chikou_reference: None,
        }
    }

    pub fn cloud(&self) -> Option<Cloud> {
        Some(Cloud::from_spans(self.senkou_a?, self.senkou_b?))
    }

    pub fn cloud_top(&self) -> Option<f64> {
        self.cloud().map(|c| c.top)
    }

    pub fn cloud_bottom(&self) -> Option<f64> {
        self.cloud().map(|c| c.bottom)
    }

    pub fn cloud_position(&self) -> Option<CloudPosition> {
        self.cloud().map(|c| c.position(self.close))
    }

    /// True when every line is defined.
    pub fn is_complete(&self) -> bool {
        self.tenkan.is_some()
            && self.kijun.is_some()
            && self.senkou_a.is_some()
            && self.senkou_b.is_some()
            && self.chikou.is_some()
            && self.chikou_reference.is_some()
    }
}

/// Snapshots of the newest bar and the bar immediately before it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IchimokuFrame {
    pub previous: IchimokuSnapshot,
    pub current: IchimokuSnapshot,
}

/// Stateless Ichimoku calculator.
#[derive(Debug, Clone)]
pub struct Ichimoku {
    config: IchimokuConfig,
}

impl Ichimoku {
    pub fn new(config: IchimokuConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &IchimokuConfig {
        &self.config
    }

    /// Bars needed before the previous *and* current snapshots are complete.
    ///
    /// The cloud at bar i needs `max_period + displacement` bars, the Chikou
    /// reference needs `chikou_shift + 1`, and crossover rules need one more
    /// bar for the previous snapshot.
    pub fn required_bars(&self) -> usize {
        let cloud = self.config.max_period() + self.config.displacement;
        let chikou = self.config.chikou_shift + 1;
        cloud.max(chikou) + 1
    }

    /// Compute the snapshot for bar `index` using only `candles[..=index]`.
    ///
    /// Returns `None` if `index` is out of range.
    pub fn snapshot_at(&self, candles: &[Candle], index: usize) -> Option<IchimokuSnapshot> {
        let candle = candles.get(index)?;
        let visible = &candles[..=index];
        let cfg = &self.config;

        let tenkan = midpoint(visible, index, cfg.tenkan_period);
        let kijun = midpoint(visible, index, cfg.kijun_period);

        let projected_from = index.checked_sub(cfg.displacement);
        let senkou_a = projected_from.and_then(|j| {
            let t = midpoint(visible, j, cfg.tenkan_period)?;
            let k = midpoint(visible, j, cfg.kijun_period)?;
            Some((t + k) / 2.0)
        });
        let senkou_b = projected_from.and_then(|j| midpoint(visible, j, cfg.senkou_b_period));

        let chikou_reference = index
            .checked_sub(cfg.chikou_shift)
            .map(|j| visible[j].close);

        Some(IchimokuSnapshot {
            close: candle.close,
            tenkan,
            kijun,
            senkou_a,
            senkou_b,
            chikou: Some(candle.close),
            chikou_reference,
        })
    }

    /// Current and previous snapshots for the newest bar of `window`.
    ///
    /// `None` when the window holds fewer than two candles.
    pub fn frame(&self, window: &[Candle]) -> Option<IchimokuFrame> {
        let last = window.len().checked_sub(1)?;
        let prev = last.checked_sub(1)?;
        Some(IchimokuFrame {
            previous: self.snapshot_at(window, prev)?,
            current: self.snapshot_at(window, last)?,
        })
    }

    /// One snapshot per bar of `candles`.
    pub fn series(&self, candles: &[Candle]) -> Vec<IchimokuSnapshot> {
        (0..candles.len())
            .filter_map(|i| self.snapshot_at(candles, i))
            .collect()
    }
}
