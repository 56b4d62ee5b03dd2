//! sweep - run the detect/track counter over a parameter grid
//!
//! Every (tracker, detect speed, window size) combination gets its own run and
//! its own result CSV. A failing combination is logged and skipped; the grid
//! keeps going. A summary of all runs is written to `sweep_summary.json`.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use person_counter::{
    output_file_name, CounterConfig, CsvResultSink, FrameScheduler, PhaseEvent, ResolvedVideo,
    RunSummary, SchedulerObserver, TrackerAlgorithm, TrackerRegistry,
};

#[path = "../ui.rs"]
mod ui;

const SWEEP_TRACKERS: [TrackerAlgorithm; 7] = [
    TrackerAlgorithm::Kcf,
    TrackerAlgorithm::Csrt,
    TrackerAlgorithm::Mosse,
    TrackerAlgorithm::Boosting,
    TrackerAlgorithm::Mil,
    TrackerAlgorithm::Tld,
    TrackerAlgorithm::MedianFlow,
];
const SWEEP_DETECT_SPEEDS: [f64; 9] = [0.0, 0.1, 0.3, 0.5, 0.7, 1.0, 1.5, 1.7, 2.0];

#[derive(Parser, Debug)]
#[command(name = "sweep", about = "Run the person counter over a parameter grid")]
struct Args {
    /// Dataset root containing train/ and test/ splits.
    #[arg(short = 'd', long)]
    dataset_home: Option<PathBuf>,
    /// Sequence name (MOT16-10) or stub://<name> for a synthetic scene.
    #[arg(short = 'v', long)]
    video: Option<String>,
    /// Trackers to sweep, comma separated (default: all).
    #[arg(long, value_delimiter = ',')]
    trackers: Vec<TrackerAlgorithm>,
    /// Detect speeds in seconds, comma separated.
    #[arg(long, value_delimiter = ',')]
    detect_speeds: Vec<f64>,
    /// Smallest window size.
    #[arg(long, default_value_t = 0)]
    window_start: u32,
    /// Largest window size (inclusive).
    #[arg(long, default_value_t = 40)]
    window_end: u32,
    /// Window size increment.
    #[arg(long, default_value_t = 5)]
    window_step: u32,
    /// Directory the result CSVs are written to.
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Config file (TOML or JSON); also read from COUNTER_CONFIG.
    #[arg(long)]
    config: Option<PathBuf>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

#[derive(Debug, Serialize)]
struct SweepEntry {
    tracker: &'static str,
    detect_speed: f64,
    window_size: u32,
    output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<RunSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Per-frame lines are only interesting one run at a time.
struct QuietObserver;

impl SchedulerObserver for QuietObserver {
    fn on_phase(&mut self, event: &PhaseEvent) {
        log::debug!(
            "frame {} {} lag={} next={}",
            event.frame_id,
            event.phase,
            event.lag,
            event.next_frame_id
        );
    }
}

fn window_sizes(start: u32, end: u32, step: u32) -> Vec<u32> {
    (start..=end).step_by(step.max(1) as usize).collect()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = ui::Ui::from_args(Some(&args.ui), std::io::stderr().is_terminal());

    let mut cfg = CounterConfig::load(args.config.as_deref())?;
    if let Some(home) = &args.dataset_home {
        cfg.dataset_home = Some(home.clone());
    }
    if let Some(video) = &args.video {
        cfg.video = Some(video.clone());
    }
    if let Some(dir) = &args.output_dir {
        cfg.output_dir = dir.clone();
    }
    cfg.validate()?;
    let video = cfg
        .video
        .clone()
        .context("no video given (use --video or COUNTER_VIDEO)")?;

    let trackers = if args.trackers.is_empty() {
        SWEEP_TRACKERS.to_vec()
    } else {
        args.trackers.clone()
    };
    let speeds = if args.detect_speeds.is_empty() {
        SWEEP_DETECT_SPEEDS.to_vec()
    } else {
        args.detect_speeds.clone()
    };
    let windows = window_sizes(args.window_start, args.window_end, args.window_step);
    log::info!(
        "sweeping {} tracker(s) x {} speed(s) x {} window(s) over {}",
        trackers.len(),
        speeds.len(),
        windows.len(),
        video
    );

    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = stop.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })
    .context("error setting Ctrl-C handler")?;

    let mut entries = Vec::new();
    'grid: for &tracker in &trackers {
        for &speed in &speeds {
            for &window in &windows {
                if stop.load(Ordering::SeqCst) {
                    log::warn!("stop requested; ending sweep early");
                    break 'grid;
                }
                let mut run_cfg = cfg.clone();
                run_cfg.tracker = tracker;
                run_cfg.detect_speed_secs = speed;
                run_cfg.window_size = window;

                let _stage = ui.stage(&format!("{} dt={} ws={}", tracker, speed, window));
                let mut entry = SweepEntry {
                    tracker: tracker.as_str(),
                    detect_speed: speed,
                    window_size: window,
                    output: String::new(),
                    summary: None,
                    error: None,
                };
                match run_one(&run_cfg, &video, stop.clone()) {
                    Ok((output, summary)) => {
                        entry.output = output.display().to_string();
                        entry.summary = Some(summary);
                    }
                    Err(err) => {
                        log::error!(
                            "{} dt={} ws={} failed: {:#}",
                            tracker,
                            speed,
                            window,
                            err
                        );
                        entry.error = Some(format!("{:#}", err));
                    }
                }
                entries.push(entry);
            }
        }
    }

    let failed = entries.iter().filter(|e| e.error.is_some()).count();
    std::fs::create_dir_all(&cfg.output_dir)
        .with_context(|| format!("failed to create {}", cfg.output_dir.display()))?;
    let summary_path = cfg.output_dir.join("sweep_summary.json");
    std::fs::write(&summary_path, serde_json::to_vec_pretty(&entries)?)
        .with_context(|| format!("failed to write {}", summary_path.display()))?;
    log::info!(
        "sweep finished: {} run(s), {} failed; summary at {}",
        entries.len(),
        failed,
        summary_path.display()
    );
    Ok(())
}

fn run_one(cfg: &CounterConfig, video: &str, stop: Arc<AtomicBool>) -> Result<(PathBuf, RunSummary)> {
    let ResolvedVideo {
        name,
        frame_rate,
        mut source,
        ground_truth,
        ..
    } = ResolvedVideo::open(cfg.dataset_home.as_deref(), video)?;
    let output = cfg.output_dir.join(output_file_name(
        &name,
        cfg.tracker.as_str(),
        cfg.detect_speed_secs,
        cfg.window_size,
    ));
    let mut sink = CsvResultSink::new(output.clone());
    let mut scheduler = FrameScheduler::new(
        cfg.scheduler_config(frame_rate)?,
        Box::new(ground_truth),
        Box::new(TrackerRegistry::builtin()),
    )
    .with_observer(Box::new(QuietObserver))
    .with_stop_flag(stop);
    let summary = scheduler.run(&mut source, &mut sink)?;
    Ok((output, summary))
}
