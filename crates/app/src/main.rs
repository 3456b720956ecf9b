use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::info;
use micmeter_core::LevelTracker;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

mod analyze;
mod audio;
mod config;
mod display;

use audio::{BoxedSink, MeterEngine};
use config::AppConfig;
use display::{ConsoleSink, JsonSink};

#[derive(Parser)]
#[command(name = "micmeter")]
#[command(about = "Live microphone loudness meter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the meter in the foreground (default, press Ctrl+C to stop)
    Run(RunArgs),
    /// Report the overall loudness of an audio file
    Analyze {
        /// Path to the file (wav, mp3, ogg, flac)
        file: PathBuf,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    /// Sampling interval in milliseconds
    #[arg(short, long)]
    interval_ms: Option<u64>,
    /// Analysis window length in samples
    #[arg(short, long)]
    window: Option<usize>,
    /// Weight of the previous level in the meter (at least 0.0, below 1.0)
    #[arg(long)]
    smoothing: Option<f32>,
    /// Number of readings kept for the rolling average
    #[arg(long)]
    history: Option<usize>,
    /// Emit readings as JSON lines instead of the status line
    #[arg(long)]
    json: bool,
    /// Hide the level bar
    #[arg(long)]
    no_bar: bool,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Run(args)) => run_meter(args),
        Some(Commands::Analyze { file }) => {
            let report = analyze::analyze_file(&file)?;
            analyze::print_report(&report);
            Ok(())
        }
        None => run_meter(RunArgs::default()),
    }
}

/// Folds CLI overrides into the saved preferences.
///
/// Tracker bounds are checked here rather than left to the sink: the
/// merged values are persisted after startup even when `--json` output
/// never builds a tracker, so an out-of-range value has to fail the run
/// before it can be written back.
fn effective_config(mut cfg: AppConfig, args: &RunArgs) -> Result<AppConfig> {
    cfg.interval_ms = args.interval_ms.unwrap_or(cfg.interval_ms);
    cfg.window_len = args.window.unwrap_or(cfg.window_len);
    cfg.smoothing = args.smoothing.unwrap_or(cfg.smoothing);
    cfg.history_len = args.history.unwrap_or(cfg.history_len);
    LevelTracker::new(cfg.smoothing, cfg.history_len)?;
    Ok(cfg)
}

fn run_meter(args: RunArgs) -> Result<()> {
    let cfg = effective_config(AppConfig::load(), &args)?;
    // --no-bar is a per-run display choice, never persisted.
    let show_bar = cfg.show_bar && !args.no_bar;

    let mut sinks: Vec<BoxedSink> = Vec::new();
    if args.json {
        sinks.push(Box::new(JsonSink));
    } else {
        sinks.push(Box::new(ConsoleSink::new(
            cfg.smoothing,
            cfg.history_len,
            show_bar,
        )?));
    }

    let engine = MeterEngine::start(
        Duration::from_millis(cfg.interval_ms),
        cfg.window_len,
        sinks,
    )?;
    cfg.save();
    info!(
        "Metering started: {}ms interval, {} sample window",
        cfg.interval_ms, cfg.window_len
    );
    if !args.json {
        println!(
            "Sampling every {} ms over {} samples. Press Ctrl+C to stop.",
            cfg.interval_ms, cfg.window_len
        );
    }

    // Graceful shutdown handling
    let running = Arc::new(AtomicBool::new(true));
    let run_flag = running.clone();
    ctrlc::set_handler(move || {
        run_flag.store(false, Ordering::Relaxed);
    })?;

    while running.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(100));
    }

    engine.stop();
    if !args.json {
        println!("Meter stopped.");
    }
    Ok(())
}
