//! Runner configuration, loaded from TOML.
//!
//! ```toml
//! [ichimoku]
//! tenkan_period = 9
//!
//! [signals]
//! cooldown_minutes = 30
//! cloud_filter = true
//!
//! [backtest]
//! from_date = "2024-01-01"
//! to_date = "2024-12-31"
//! data_dir = "data"
//!
//! [[pairs]]
//! symbol = "EURUSD"
//! timeframes = ["H1", "H4"]
//! enabled_signals = ["tk_cross_up", "tk_cross_down"]
//! ```
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration with no pairs.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use kumo_core::config::{ConfigError, DetectorConfig, IchimokuConfig};
use kumo_core::domain::{SignalType, Timeframe};
use kumo_core::engine::{BacktestConfig, DEFAULT_BUFFER_SIZE, DEFAULT_WARMUP_CANDLES};

/// Series shorter than this are skipped by the batch runner.
pub const DEFAULT_MIN_CANDLES: usize = 150;

/// Default data file name, relative to `data_dir`.
pub const DEFAULT_DATA_TEMPLATE: &str = "{symbol}_{timeframe}.csv";

#[derive(Debug, Error)]
pub enum RunnerConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("pair '{0}' has no timeframes")]
    NoTimeframes(String),
    #[error("pair '{symbol}' lists timeframe {timeframe} twice")]
    DuplicateStream { symbol: String, timeframe: Timeframe },
    #[error("pair '{0}' enables no signals")]
    NoSignals(String),
    #[error(transparent)]
    Core(#[from] ConfigError),
}

/// `[backtest]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub warmup_candles: usize,
    pub buffer_size: usize,
    pub min_candles: usize,
    /// First day evaluated (inclusive, UTC midnight).
    pub from_date: Option<NaiveDate>,
    /// Last day evaluated (inclusive, through 23:59:59 UTC).
    pub to_date: Option<NaiveDate>,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Run (pair, timeframe) jobs on the rayon pool.
    pub parallel: bool,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            warmup_candles: DEFAULT_WARMUP_CANDLES,
            buffer_size: DEFAULT_BUFFER_SIZE,
            min_candles: DEFAULT_MIN_CANDLES,
            from_date: None,
            to_date: None,
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("backtest_results"),
            parallel: true,
        }
    }
}

impl BacktestSettings {
    pub fn from_instant(&self) -> Option<DateTime<Utc>> {
        self.from_date.map(|d| d.and_time(NaiveTime::MIN).and_utc())
    }

    pub fn to_instant(&self) -> Option<DateTime<Utc>> {
        self.to_date
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .map(|dt| dt.and_utc())
    }
}

/// One `[[pairs]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairConfig {
    pub symbol: String,
    pub timeframes: Vec<Timeframe>,
    /// Overrides `[signals].enabled_signals` for this pair.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_signals: Option<BTreeSet<SignalType>>,
    /// File name template under `data_dir`; `{symbol}` and `{timeframe}` are substituted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl PairConfig {
    pub fn new(symbol: impl Into<String>, timeframes: Vec<Timeframe>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframes,
            enabled_signals: None,
            data: None,
        }
    }
}

/// A single (pair, timeframe) backtest to run.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub data_path: PathBuf,
    pub config: BacktestConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub ichimoku: IchimokuConfig,
    pub signals: DetectorConfig,
    pub backtest: BacktestSettings,
    pub pairs: Vec<PairConfig>,
}

impl RunnerConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, RunnerConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| RunnerConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, RunnerConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RunnerConfigError> {
        self.base_backtest_config().validate()?;
        for pair in &self.pairs {
            if pair.timeframes.is_empty() {
                return Err(RunnerConfigError::NoTimeframes(pair.symbol.clone()));
            }
            let mut seen = HashSet::new();
            for tf in &pair.timeframes {
                if !seen.insert(*tf) {
                    return Err(RunnerConfigError::DuplicateStream {
                        symbol: pair.symbol.clone(),
                        timeframe: *tf,
                    });
                }
            }
            if pair.enabled_signals.as_ref().is_some_and(|s| s.is_empty()) {
                return Err(RunnerConfigError::NoSignals(pair.symbol.clone()));
            }
        }
        Ok(())
    }

    /// Core backtest configuration before per-pair overrides.
    pub fn base_backtest_config(&self) -> BacktestConfig {
        BacktestConfig {
            ichimoku: self.ichimoku.clone(),
            detector: self.signals.clone(),
            warmup_candles: self.backtest.warmup_candles,
            buffer_size: self.backtest.buffer_size,
            from: self.backtest.from_instant(),
            to: self.backtest.to_instant(),
        }
    }

    pub fn backtest_config_for(&self, pair: &PairConfig) -> BacktestConfig {
        let mut config = self.base_backtest_config();
        if let Some(enabled) = &pair.enabled_signals {
            config.detector.enabled_signals = enabled.clone();
        }
        config
    }

    pub fn data_path(&self, pair: &PairConfig, timeframe: Timeframe) -> PathBuf {
        let template = pair.data.as_deref().unwrap_or(DEFAULT_DATA_TEMPLATE);
        let file = template
            .replace("{symbol}", &pair.symbol)
            .replace("{timeframe}", timeframe.as_str());
        self.backtest.data_dir.join(file)
    }

    /// Jobs for every configured (pair, timeframe).
    pub fn jobs(&self) -> Vec<Job> {
        self.select(None, None)
    }

    /// Jobs restricted by symbol and/or timeframe.
    ///
    /// With both set and the symbol not configured, a one-off job with every
    /// signal enabled is created so a single stream can be tested ad hoc.
    pub fn select(&self, symbol: Option<&str>, timeframe: Option<Timeframe>) -> Vec<Job> {
        let mut jobs = Vec::new();
        for pair in &self.pairs {
            if symbol.is_some_and(|s| !s.eq_ignore_ascii_case(&pair.symbol)) {
                continue;
            }
            for &tf in &pair.timeframes {
                if timeframe.is_some_and(|t| t != tf) {
                    continue;
                }
                jobs.push(self.job(pair, tf));
            }
        }

        if let (Some(symbol), Some(tf), true) = (symbol, timeframe, jobs.is_empty()) {
            let pair = PairConfig::new(symbol.to_ascii_uppercase(), vec![tf]);
            let mut job = self.job(&pair, tf);
            job.config.detector.enabled_signals = SignalType::ALL.into_iter().collect();
            jobs.push(job);
        }
        jobs
    }

    fn job(&self, pair: &PairConfig, timeframe: Timeframe) -> Job {
        Job {
            symbol: pair.symbol.clone(),
            timeframe,
            data_path: self.data_path(pair, timeframe),
            config: self.backtest_config_for(pair),
        }
    }

    /// Apply CLI date overrides.
    pub fn with_dates(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        if from.is_some() {
            self.backtest.from_date = from;
        }
        if to.is_some() {
            self.backtest.to_date = to;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[ichimoku]
tenkan_period = 9
kijun_period = 26

[signals]
cooldown_minutes = 60
strong_signal_only = true

[backtest]
from_date = "2024-01-01"
to_date = "2024-03-31"
data_dir = "fixtures"

[[pairs]]
symbol = "EURUSD"
timeframes = ["H1", "H4"]
enabled_signals = ["tk_cross_up", "tk_cross_down"]

[[pairs]]
symbol = "XAUUSD"
timeframes = ["M15"]
data = "metals/{symbol}-{timeframe}.csv"
"#;

    #[test]
    fn parses_sample() {
        let cfg = RunnerConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(cfg.signals.cooldown_minutes, 60);
        assert!(cfg.signals.strong_signal_only);
        assert!(cfg.signals.cloud_filter);
        assert_eq!(cfg.ichimoku.senkou_b_period, 52);
        assert_eq!(cfg.backtest.warmup_candles, 100);
        assert_eq!(cfg.pairs.len(), 2);
        assert_eq!(cfg.pairs[0].timeframes, vec![Timeframe::H1, Timeframe::H4]);
    }

    #[test]
    fn empty_file_is_valid() {
        let cfg = RunnerConfig::from_toml("").unwrap();
        assert!(cfg.pairs.is_empty());
        assert!(cfg.jobs().is_empty());
    }

    #[test]
    fn date_bounds_cover_whole_days() {
        let cfg = RunnerConfig::from_toml(SAMPLE).unwrap();
        let bt = cfg.base_backtest_config();
        assert_eq!(bt.from.unwrap().to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(bt.to.unwrap().to_rfc3339(), "2024-03-31T23:59:59+00:00");
    }

    #[test]
    fn jobs_apply_pair_overrides() {
        let cfg = RunnerConfig::from_toml(SAMPLE).unwrap();
        let jobs = cfg.jobs();
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].data_path, PathBuf::from("fixtures/EURUSD_H1.csv"));
        assert_eq!(jobs[0].config.detector.enabled_signals.len(), 2);
        assert_eq!(
            jobs[2].data_path,
            PathBuf::from("fixtures/metals/XAUUSD-M15.csv")
        );
        assert_eq!(jobs[2].config.detector.enabled_signals.len(), 6);
    }

    #[test]
    fn select_filters_and_builds_adhoc_jobs() {
        let cfg = RunnerConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(cfg.select(Some("eurusd"), None).len(), 2);
        assert_eq!(cfg.select(None, Some(Timeframe::M15)).len(), 1);

        let adhoc = cfg.select(Some("usdjpy"), Some(Timeframe::D1));
        assert_eq!(adhoc.len(), 1);
        assert_eq!(adhoc[0].symbol, "USDJPY");
        assert_eq!(adhoc[0].data_path, PathBuf::from("fixtures/USDJPY_D1.csv"));

        assert!(cfg.select(Some("usdjpy"), None).is_empty());
    }

    #[test]
    fn rejects_invalid_configs() {
        let err = RunnerConfig::from_toml("[ichimoku]\ntenkan_period = 0\n").unwrap_err();
        assert!(matches!(err, RunnerConfigError::Core(_)));

        let err = RunnerConfig::from_toml(
            "[backtest]\nfrom_date = \"2024-05-01\"\nto_date = \"2024-04-01\"\n",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RunnerConfigError::Core(ConfigError::EmptyDateRange { .. })
        ));

        let err = RunnerConfig::from_toml("[[pairs]]\nsymbol = \"EURUSD\"\ntimeframes = []\n")
            .unwrap_err();
        assert!(matches!(err, RunnerConfigError::NoTimeframes(_)));

        let err =
            RunnerConfig::from_toml("[[pairs]]\nsymbol = \"EURUSD\"\ntimeframes = [\"H1\", \"H1\"]\n")
                .unwrap_err();
        assert!(matches!(err, RunnerConfigError::DuplicateStream { .. }));

        let err = RunnerConfig::from_toml("[signals]\nbogus = 1\n");
        assert!(err.is_ok(), "unknown keys are ignored");

        assert!(matches!(
            RunnerConfig::from_toml("[[pairs]]\nsymbol = \"EURUSD\"\ntimeframes = [\"H2\"]\n"),
            Err(RunnerConfigError::Parse(_))
        ));
    }

    #[test]
    fn cli_dates_override_file() {
        let cfg = RunnerConfig::from_toml(SAMPLE)
            .unwrap()
            .with_dates(NaiveDate::from_ymd_opt(2024, 2, 1), None);
        assert_eq!(cfg.backtest.from_date, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(cfg.backtest.to_date, NaiveDate::from_ymd_opt(2024, 3, 31));
    }
}
