use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

use person_counter::{LogObserver, Phase, PhaseEvent, RunSummary, SchedulerObserver};

#[derive(Clone, Copy, Debug)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty)
    }

    fn pretty(&self) -> bool {
        self.is_tty && !matches!(self.mode, UiMode::Plain)
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.pretty() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }

    /// Scheduler observer showing frame progress. Falls back to per-frame log
    /// lines when output is not a terminal.
    pub fn run_observer(&self, total_frames: Option<u64>) -> ProgressObserver {
        if !self.pretty() {
            return ProgressObserver { bar: None };
        }
        let bar = match total_frames {
            Some(total) => ProgressBar::new(total),
            None => ProgressBar::new_spinner(),
        };
        bar.set_draw_target(ProgressDrawTarget::stderr());
        let style = ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} frames {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        ProgressObserver { bar: Some(bar) }
    }
}

pub struct ProgressObserver {
    bar: Option<ProgressBar>,
}

impl SchedulerObserver for ProgressObserver {
    fn on_phase(&mut self, event: &PhaseEvent) {
        match &self.bar {
            Some(bar) => {
                bar.inc(1);
                let phase = if event.phase == Phase::Detect { "detect" } else { "track" };
                bar.set_message(format!("{} lag={} next={}", phase, event.lag, event.next_frame_id));
            }
            None => LogObserver.on_phase(event),
        }
    }

    fn on_skip(&mut self, frame_id: u64) {
        match &self.bar {
            Some(bar) => bar.inc(1),
            None => LogObserver.on_skip(frame_id),
        }
    }

    fn on_finish(&mut self, summary: &RunSummary) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(format!(
                "{} processed, {} records",
                summary.frames_processed(),
                summary.records
            ));
        }
        LogObserver.on_finish(summary);
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let message = format!("✔ {} ({})", self.name, format_duration(elapsed));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
