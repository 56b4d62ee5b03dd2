//! person_counter - hybrid detect/track counting over one video
//!
//! Detect phases take boxes from the sequence ground truth and reseed one
//! tracker per box; track phases advance those trackers. Frames are skipped
//! in proportion to each phase's cost, and every processed frame's boxes are
//! written once to `<output_dir>/<video>_<tracker>_pfr<dt>_ws<ws>.csv`.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use person_counter::{
    output_file_name, CounterConfig, CsvResultSink, FailurePolicy, FrameScheduler, ResolvedVideo,
    TrackerAlgorithm, TrackerRegistry,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(
    name = "person_counter",
    about = "Count people with alternating detect and track phases"
)]
struct Args {
    /// Dataset root containing train/ and test/ splits.
    #[arg(short = 'd', long)]
    dataset_home: Option<PathBuf>,
    /// Sequence name (MOT16-10) or stub://<name> for a synthetic scene.
    #[arg(short = 'v', long)]
    video: Option<String>,
    /// Tracker algorithm (csrt, kcf, mosse, boosting, mil, tld, medianflow).
    #[arg(short = 't', long)]
    tracker: Option<TrackerAlgorithm>,
    /// Seconds a detect phase is assumed to take.
    #[arg(long = "dt", visible_alias = "detect-speed")]
    detect_speed: Option<f64>,
    /// Track phases between two detect phases.
    #[arg(short = 'w', long)]
    window_size: Option<u32>,
    /// Directory the result CSV is written to.
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// What to record for objects a tracker lost (omit|flag).
    #[arg(long)]
    failure_policy: Option<FailurePolicy>,
    /// Config file (TOML or JSON); also read from COUNTER_CONFIG.
    #[arg(long)]
    config: Option<PathBuf>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

impl Args {
    fn apply(&self, cfg: &mut CounterConfig) {
        if let Some(home) = &self.dataset_home {
            cfg.dataset_home = Some(home.clone());
        }
        if let Some(video) = &self.video {
            cfg.video = Some(video.clone());
        }
        if let Some(tracker) = self.tracker {
            cfg.tracker = tracker;
        }
        if let Some(speed) = self.detect_speed {
            cfg.detect_speed_secs = speed;
        }
        if let Some(window) = self.window_size {
            cfg.window_size = window;
        }
        if let Some(dir) = &self.output_dir {
            cfg.output_dir = dir.clone();
        }
        if let Some(policy) = self.failure_policy {
            cfg.failure_policy = policy;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = ui::Ui::from_args(Some(&args.ui), std::io::stderr().is_terminal());

    let cfg = {
        let _stage = ui.stage("Load configuration");
        let mut cfg = CounterConfig::load(args.config.as_deref())?;
        args.apply(&mut cfg);
        cfg.validate()?;
        for (key, value) in cfg.entries() {
            log::info!("{} = {}", key, value);
        }
        cfg
    };
    let video_name = cfg
        .video
        .clone()
        .ok_or_else(|| anyhow!("no video given (use --video or COUNTER_VIDEO)"))?;

    let ResolvedVideo {
        name,
        frame_rate,
        frame_count,
        mut source,
        ground_truth,
    } = {
        let _stage = ui.stage("Open video");
        ResolvedVideo::open(cfg.dataset_home.as_deref(), &video_name)?
    };
    log::info!(
        "{}: {} fps, ground truth for {} frame(s)",
        name,
        frame_rate,
        ground_truth.frame_count()
    );

    let registry = TrackerRegistry::builtin();
    registry.ensure_supported(cfg.tracker)?;
    let scheduler_cfg = cfg.scheduler_config(frame_rate)?;

    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = stop.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })
    .context("error setting Ctrl-C handler")?;

    let output = cfg.output_dir.join(output_file_name(
        &name,
        cfg.tracker.as_str(),
        cfg.detect_speed_secs,
        cfg.window_size,
    ));
    let mut sink = CsvResultSink::new(output.clone());

    let mut scheduler =
        FrameScheduler::new(scheduler_cfg, Box::new(ground_truth), Box::new(registry))
            .with_observer(Box::new(ui.run_observer(frame_count)))
            .with_stop_flag(stop);

    let summary = {
        let _stage = ui.stage("Run detect/track loop");
        scheduler.run(&mut source, &mut sink)?
    };

    log::info!(
        "wrote {} record(s) for {} processed frame(s) to {}",
        summary.records,
        summary.frames_processed(),
        output.display()
    );
    if summary.cancelled {
        log::warn!("run was interrupted; output covers frames up to the interruption");
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
