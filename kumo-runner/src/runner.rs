//! Batch backtest execution.
//!
//! Each [`Job`] loads its series, checks the minimum length, and replays it
//! through a fresh `BacktestEngine`. Jobs share nothing, so the batch runs them
//! on the rayon pool. A failing job is recorded in the batch outcome and never
//! aborts the other jobs.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use kumo_core::config::ConfigError;
use kumo_core::domain::{Candle, Timeframe};
use kumo_core::engine::{BacktestEngine, BacktestError, BacktestResult};

use crate::config::{Job, RunnerConfig};
use crate::data_loader::{dataset_hash, load_candles_csv, LoadError};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error("backtest error: {0}")]
    Backtest(#[from] BacktestError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// What happened to one job.
#[derive(Debug)]
pub enum JobOutcome {
    Completed(BacktestResult),
    /// Too few candles to be worth replaying.
    Skipped { candles: usize, min_candles: usize },
    Failed(RunError),
}

#[derive(Debug)]
pub struct JobReport {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub outcome: JobOutcome,
}

/// Counts for the end-of-batch log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub signals: usize,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub jobs: Vec<JobReport>,
}

impl BatchOutcome {
    pub fn results(&self) -> impl Iterator<Item = &BacktestResult> {
        self.jobs.iter().filter_map(|j| match &j.outcome {
            JobOutcome::Completed(result) => Some(result),
            _ => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&JobReport, &RunError)> {
        self.jobs.iter().filter_map(|j| match &j.outcome {
            JobOutcome::Failed(e) => Some((j, e)),
            _ => None,
        })
    }

    pub fn stats(&self) -> BatchStats {
        let mut stats = BatchStats::default();
        for job in &self.jobs {
            match &job.outcome {
                JobOutcome::Completed(r) => {
                    stats.completed += 1;
                    stats.signals += r.signals.len();
                }
                JobOutcome::Skipped { .. } => stats.skipped += 1,
                JobOutcome::Failed(_) => stats.failed += 1,
            }
        }
        stats
    }

    /// Take ownership of the completed results.
    pub fn into_results(self) -> Vec<BacktestResult> {
        self.jobs
            .into_iter()
            .filter_map(|j| match j.outcome {
                JobOutcome::Completed(result) => Some(result),
                _ => None,
            })
            .collect()
    }
}

/// Replay an in-memory series for a job, honouring `min_candles`.
pub fn run_series(job: &Job, candles: &[Candle], min_candles: usize) -> JobOutcome {
    if candles.len() < min_candles {
        warn!(
            symbol = %job.symbol,
            timeframe = %job.timeframe,
            "only {} candles, skipping (need at least {min_candles})",
            candles.len()
        );
        return JobOutcome::Skipped {
            candles: candles.len(),
            min_candles,
        };
    }
    let outcome = BacktestEngine::new(job.config.clone())
        .map_err(RunError::from)
        .and_then(|engine| Ok(engine.run(&job.symbol, job.timeframe, candles)?));
    match outcome {
        Ok(result) => JobOutcome::Completed(result),
        Err(e) => JobOutcome::Failed(e),
    }
}

/// Load a job's data file and replay it.
pub fn run_job(job: &Job, min_candles: usize) -> JobOutcome {
    info!(symbol = %job.symbol, timeframe = %job.timeframe, path = %job.data_path.display(), "loading candles");
    match load_candles_csv(&job.data_path) {
        Ok(candles) => {
            debug!(symbol = %job.symbol, timeframe = %job.timeframe, dataset = %dataset_hash(&candles), "candles loaded");
            run_series(job, &candles, min_candles)
        }
        Err(e) => JobOutcome::Failed(e.into()),
    }
}

/// Run every job, in parallel when `config.backtest.parallel` is set.
pub fn run_batch(config: &RunnerConfig, jobs: &[Job]) -> BatchOutcome {
    let min_candles = config.backtest.min_candles;
    let run = |job: &Job| JobReport {
        symbol: job.symbol.clone(),
        timeframe: job.timeframe,
        outcome: run_job(job, min_candles),
    };

    let reports: Vec<JobReport> = if config.backtest.parallel {
        jobs.par_iter().map(run).collect()
    } else {
        jobs.iter().map(run).collect()
    };

    let outcome = BatchOutcome { jobs: reports };
    for (job, err) in outcome.failures() {
        error!(symbol = %job.symbol, timeframe = %job.timeframe, "{err}");
    }
    let stats = outcome.stats();
    info!(
        completed = stats.completed,
        skipped = stats.skipped,
        failed = stats.failed,
        signals = stats.signals,
        "batch finished"
    );
    outcome
}
