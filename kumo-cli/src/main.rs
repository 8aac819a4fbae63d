//! Kumo CLI — Ichimoku signal backtests and replays.
//!
//! Commands:
//! - `backtest`: run every configured (pair, timeframe) job and write a signal report
//! - `replay`: feed a candle CSV through the live monitor, printing signals as JSON lines
//! - `synth`: write a synthetic candle CSV for smoke tests

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kumo_core::domain::{Signal, Timeframe};
use kumo_core::engine::{LiveMonitor, MonitorError};
use kumo_core::fingerprint::ConfigHash;
use kumo_core::signals::SignalSink;
use kumo_runner::{
    file_stamp, generate_synthetic, load_candles_csv, run_batch, write_candles_csv, RunnerConfig,
    SignalReport,
};

#[derive(Parser)]
#[command(name = "kumo", about = "Kumo — Ichimoku signal engine")]
struct Cli {
    /// Log level filter (overridden by RUST_LOG).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest the pairs in a TOML config and report the signals.
    Backtest {
        /// Path to the runner TOML config.
        #[arg(long, default_value = "kumo.toml")]
        config: PathBuf,

        /// Only this symbol (e.g. EURUSD).
        #[arg(long)]
        symbol: Option<String>,

        /// Only this timeframe (e.g. H1).
        #[arg(long)]
        tf: Option<Timeframe>,

        /// First day evaluated (YYYY-MM-DD).
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day evaluated (YYYY-MM-DD, inclusive).
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Print the summary without writing report files.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Report directory. Defaults to `[backtest].output_dir`.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Replay a candle CSV through the live monitor.
    Replay {
        /// Candle CSV (time,open,high,low,close[,volume]).
        #[arg(long)]
        data: PathBuf,

        #[arg(long)]
        symbol: String,

        #[arg(long)]
        tf: Timeframe,

        /// Runner config for indicator and signal settings. Defaults apply without one.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Candles used to seed the buffer before replay starts.
        #[arg(long)]
        warmup: Option<usize>,
    },
    /// Write a synthetic candle CSV.
    Synth {
        #[arg(long)]
        symbol: String,

        #[arg(long)]
        tf: Timeframe,

        /// First day of the series (YYYY-MM-DD).
        #[arg(long, default_value = "2024-01-01")]
        start: NaiveDate,

        #[arg(long, default_value_t = 1000)]
        count: usize,

        /// Output file. Defaults to `{symbol}_{tf}.csv` in the current directory.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Backtest {
            config,
            symbol,
            tf,
            from,
            to,
            dry_run,
            output_dir,
        } => run_backtest_cmd(config, symbol, tf, from, to, dry_run, output_dir),
        Commands::Replay {
            data,
            symbol,
            tf,
            config,
            warmup,
        } => run_replay(data, &symbol, tf, config, warmup),
        Commands::Synth {
            symbol,
            tf,
            start,
            count,
            output,
        } => run_synth(&symbol, tf, start, count, output),
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_backtest_cmd(
    config_path: PathBuf,
    symbol: Option<String>,
    timeframe: Option<Timeframe>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    dry_run: bool,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let config = RunnerConfig::from_file(&config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?
        .with_dates(from, to);
    // Date overrides can invert the range.
    config.validate()?;

    let jobs = config.select(symbol.as_deref(), timeframe);
    if jobs.is_empty() {
        bail!("no (pair, timeframe) jobs match the given filters");
    }
    let config_hash = ConfigHash::of(&config.base_backtest_config().pipeline_config())?;
    info!(jobs = jobs.len(), config = %config_hash, "starting backtest");

    let outcome = run_batch(&config, &jobs);
    let stats = outcome.stats();
    for result in outcome.results() {
        let log_hash = result.fingerprint()?;
        info!(
            pair = %result.pair,
            timeframe = %result.timeframe,
            signals = result.signal_count(),
            rejected = result.rejected.len(),
            log_hash = log_hash.short(),
            "run complete"
        );
    }
    for (job, err) in outcome.failures() {
        eprintln!("Error for {} {}: {err}", job.symbol, job.timeframe);
    }

    let report = SignalReport::from_results(outcome.results());
    println!("{}", report.summary());

    if dry_run {
        info!("dry run: report files not written");
    } else {
        let dir = output_dir.unwrap_or_else(|| config.backtest.output_dir.clone());
        for path in report.save(&dir, &file_stamp())? {
            println!("Saved: {}", path.display());
        }
    }

    if stats.completed == 0 && stats.failed > 0 {
        bail!("all {} backtest jobs failed", stats.failed);
    }
    Ok(())
}

/// Prints each signal as one JSON line on stdout.
struct JsonLinesSink;

impl SignalSink for JsonLinesSink {
    fn deliver(&self, signal: &Signal) {
        match serde_json::to_string(signal) {
            Ok(line) => {
                let mut out = std::io::stdout().lock();
                if let Err(e) = writeln!(out, "{line}") {
                    warn!("failed to write signal: {e}");
                }
            }
            Err(e) => warn!("failed to serialize signal {signal}: {e}"),
        }
    }
}

fn run_replay(
    data: PathBuf,
    symbol: &str,
    timeframe: Timeframe,
    config_path: Option<PathBuf>,
    warmup: Option<usize>,
) -> Result<()> {
    let config = match config_path {
        Some(path) => RunnerConfig::from_file(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RunnerConfig::default(),
    };
    let symbol = symbol.to_ascii_uppercase();
    let backtest = match config.pairs.iter().find(|p| p.symbol == symbol) {
        Some(pair) => config.backtest_config_for(pair),
        None => config.base_backtest_config(),
    };
    let warmup = warmup.unwrap_or(backtest.warmup_candles);

    let candles = load_candles_csv(&data)?;
    if candles.len() <= warmup {
        bail!(
            "{} has {} candles; need more than the {warmup} warm-up candles",
            data.display(),
            candles.len()
        );
    }

    let monitor = LiveMonitor::new(backtest.pipeline_config());
    monitor.register(symbol.as_str(), timeframe, &candles[..warmup])?;

    let sink = JsonLinesSink;
    let mut fired = 0;
    let mut rejected = 0;
    for candle in &candles[warmup..] {
        match monitor.on_candle(&symbol, timeframe, *candle, &sink) {
            Ok(signals) => fired += signals.len(),
            Err(MonitorError::Buffer { source, .. }) => {
                warn!(time = %candle.time, "candle rejected: {source}");
                rejected += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        replayed = candles.len() - warmup,
        fired, rejected, "replay finished"
    );
    Ok(())
}

fn run_synth(
    symbol: &str,
    timeframe: Timeframe,
    start: NaiveDate,
    count: usize,
    output: Option<PathBuf>,
) -> Result<()> {
    let symbol = symbol.to_ascii_uppercase();
    let start = start.and_time(chrono::NaiveTime::MIN).and_utc();
    let candles = generate_synthetic(&symbol, timeframe, start, count);
    let path = output.unwrap_or_else(|| PathBuf::from(format!("{symbol}_{timeframe}.csv")));
    write_candles_csv(&path, &candles)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!(
        "Wrote {} synthetic candles to {} (SYNTHETIC DATA)",
        candles.len(),
        path.display()
    );
    Ok(())
}
