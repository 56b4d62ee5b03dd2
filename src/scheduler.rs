//! Adaptive detect/track frame scheduler.
//!
//! The scheduler pulls frames sequentially and processes only the frame whose
//! id matches `next_frame_id`; everything in between is discarded. Each
//! processed frame runs exactly one phase:
//!
//! - detect, when the tracking window is used up (always on the first
//!   processed frame): boxes are fetched, a new tracker set replaces the old
//!   one, and the lag is `floor(detect_interval * fps)`.
//! - track otherwise: the tracker set is advanced, the update is timed, and
//!   the lag is `floor(elapsed * fps)`.
//!
//! The lag pushes `next_frame_id` forward so output cadence follows the
//! source's native frame rate instead of falling behind it.

use anyhow::Result;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{frames_to_skip, FailurePolicy, SchedulerConfig};
use crate::detect::BoundingBoxSource;
use crate::error::CounterError;
use crate::frame::Frame;
use crate::ingest::VideoSource;
use crate::record::{Phase, ResultLog};
use crate::storage::ResultSink;
use crate::track::{MultiTracker, TrackerBank};

// ----------------------------------------------------------------------------
// Clock
// ----------------------------------------------------------------------------

/// Monotonic time source used to measure track-phase latency.
pub trait Clock {
    /// Time since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

// ----------------------------------------------------------------------------
// Observation
// ----------------------------------------------------------------------------

/// What happened on one processed frame.
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseEvent {
    pub frame_id: u64,
    /// `Phase::Detect` or `Phase::Track`.
    pub phase: Phase,
    /// Completed track cycles since the last detect, after this phase.
    pub k: u32,
    pub lag: u64,
    pub next_frame_id: u64,
    /// Records appended for this frame.
    pub records: usize,
    /// Objects whose tracker reported failure (track phases only).
    pub lost: usize,
    /// Measured update latency (track phases only).
    pub elapsed: Option<Duration>,
}

/// Receives scheduler progress. Injected at construction; the scheduler has
/// no other logging side effects.
pub trait SchedulerObserver {
    fn on_phase(&mut self, event: &PhaseEvent);

    fn on_skip(&mut self, _frame_id: u64) {}

    fn on_finish(&mut self, _summary: &RunSummary) {}
}

/// Default observer: one `info` line per processed frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl SchedulerObserver for LogObserver {
    fn on_phase(&mut self, event: &PhaseEvent) {
        match event.phase {
            Phase::Detect => log::info!(
                "Frame {} DETECT. Skipping {} frame(s) to {}",
                event.frame_id,
                event.lag,
                event.next_frame_id
            ),
            _ => log::info!(
                "Frame {} TRACK {}. Skipping {} frame(s) to {}",
                event.frame_id,
                event.k,
                event.lag,
                event.next_frame_id
            ),
        }
        if event.lost > 0 {
            log::debug!("Frame {}: {} object(s) lost", event.frame_id, event.lost);
        }
    }

    fn on_skip(&mut self, frame_id: u64) {
        log::debug!("Frame {} skipped", frame_id);
    }

    fn on_finish(&mut self, summary: &RunSummary) {
        log::info!(
            "run finished: {} frames pulled, {} processed ({} detect, {} track), {} records{}",
            summary.frames_pulled,
            summary.frames_processed(),
            summary.detect_phases,
            summary.track_phases,
            summary.records,
            if summary.cancelled { ", cancelled" } else { "" }
        );
    }
}

/// Counters for one run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub frames_pulled: u64,
    pub frames_skipped: u64,
    pub detect_phases: u64,
    pub track_phases: u64,
    pub records: u64,
    pub lost_objects: u64,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn frames_processed(&self) -> u64 {
        self.detect_phases + self.track_phases
    }
}

// ----------------------------------------------------------------------------
// Scheduler
// ----------------------------------------------------------------------------

pub struct FrameScheduler {
    config: SchedulerConfig,
    boxes: Box<dyn BoundingBoxSource>,
    bank: Box<dyn TrackerBank>,
    clock: Box<dyn Clock>,
    observer: Box<dyn SchedulerObserver>,
    stop: Option<Arc<AtomicBool>>,

    /// Track cycles completed since the last detect, in `[0, window_size]`.
    k: u32,
    /// Id of the next frame to process.
    next_frame_id: u64,
    /// Id of the last frame pulled.
    frame_id: u64,
    trackers: MultiTracker,
    results: ResultLog,
    summary: RunSummary,
}

impl FrameScheduler {
    pub fn new(
        config: SchedulerConfig,
        boxes: Box<dyn BoundingBoxSource>,
        bank: Box<dyn TrackerBank>,
    ) -> Self {
        let k = config.window_size();
        Self {
            config,
            boxes,
            bank,
            clock: Box::new(MonotonicClock::new()),
            observer: Box::new(LogObserver),
            stop: None,
            k,
            next_frame_id: 1,
            frame_id: 0,
            trackers: MultiTracker::new(),
            results: ResultLog::new(),
            summary: RunSummary::default(),
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn SchedulerObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Stop cooperatively before the next frame pull once `flag` is set.
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Records accumulated by the last run, including a failed one.
    pub fn results(&self) -> &ResultLog {
        &self.results
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Process `video` to exhaustion (or cancellation) and emit all records
    /// to `sink` exactly once.
    ///
    /// A failing phase ends the loop early; records gathered up to that point
    /// are still emitted before the phase error is returned.
    pub fn run(&mut self, video: &mut dyn VideoSource, sink: &mut dyn ResultSink) -> Result<RunSummary> {
        if !self.bank.supports(self.config.tracker_algorithm()) {
            return Err(CounterError::UnknownTracker(self.config.tracker_algorithm().to_string()).into());
        }
        let source_rate = video.frame_rate();
        if (source_rate - self.config.frame_rate()).abs() > 1e-6 {
            log::warn!(
                "video source reports {:.3} fps, scheduling at configured {:.3} fps",
                source_rate,
                self.config.frame_rate()
            );
        }

        self.reset();
        let outcome = self.drive(video);
        let emitted = self.results.flush(sink);

        match (outcome, emitted) {
            (Ok(()), Ok(())) => {
                self.observer.on_finish(&self.summary);
                Ok(self.summary.clone())
            }
            (Err(err), Ok(())) => {
                log::error!(
                    "run aborted at frame {}; emitted {} partial records",
                    self.frame_id,
                    self.results.len()
                );
                Err(err)
            }
            (Ok(()), Err(err)) => Err(err),
            (Err(err), Err(emit_err)) => {
                log::error!("partial emission also failed: {:#}", emit_err);
                Err(err)
            }
        }
    }

    fn reset(&mut self) {
        // Starting with a full window makes the first processed frame a detect.
        self.k = self.config.window_size();
        self.next_frame_id = 1;
        self.frame_id = 0;
        self.trackers = MultiTracker::new();
        self.results = ResultLog::new();
        self.summary = RunSummary::default();
    }

    fn stop_requested(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn drive(&mut self, video: &mut dyn VideoSource) -> Result<()> {
        loop {
            if self.stop_requested() {
                log::warn!("stop requested after frame {}", self.frame_id);
                self.summary.cancelled = true;
                return Ok(());
            }
            let Some(frame) = video.next_frame()? else {
                return Ok(());
            };
            self.frame_id += 1;
            self.summary.frames_pulled += 1;
            if frame.id() != self.frame_id {
                return Err(CounterError::SourceContract(format!(
                    "expected frame {}, got frame {}",
                    self.frame_id,
                    frame.id()
                ))
                .into());
            }

            if self.frame_id != self.next_frame_id {
                self.summary.frames_skipped += 1;
                self.observer.on_skip(self.frame_id);
                continue;
            }

            let event = if self.k >= self.config.window_size() {
                self.detect_phase(&frame)?
            } else {
                self.track_phase(&frame)?
            };
            self.summary.records += event.records as u64;
            self.observer.on_phase(&event);
        }
    }

    /// Skip `lag` frames past the current one. A lag of 0 still moves on to
    /// the very next frame; a lag past the end of `u64` never matches again.
    fn advance(&mut self, lag: u64) -> u64 {
        self.next_frame_id = self.next_frame_id.saturating_add(lag.max(1));
        self.next_frame_id
    }

    fn detect_phase(&mut self, frame: &Frame) -> Result<PhaseEvent> {
        let boxes = self.boxes.boxes_for(frame.id(), frame)?;
        // Replaces the previous set; no identity carries over.
        self.trackers = self
            .bank
            .seed(self.config.tracker_algorithm(), frame, &boxes)?;

        let lag = self.config.detect_lag();
        let records = self.results.log_output(
            frame.id(),
            boxes.iter().map(|bbox| (Phase::Detect, *bbox)),
            lag,
        );
        self.k = 0;
        self.summary.detect_phases += 1;

        Ok(PhaseEvent {
            frame_id: frame.id(),
            phase: Phase::Detect,
            k: self.k,
            lag,
            next_frame_id: self.advance(lag),
            records,
            lost: 0,
            elapsed: None,
        })
    }

    fn track_phase(&mut self, frame: &Frame) -> Result<PhaseEvent> {
        let started = self.clock.now();
        let updates = self.bank.update(&mut self.trackers, frame)?;
        let elapsed = self.clock.now().saturating_sub(started);
        let lag = frames_to_skip(elapsed.as_secs_f64(), self.config.frame_rate());

        let policy = self.config.failure_policy();
        let lost = updates.iter().filter(|u| !u.success).count();
        let entries = updates.iter().filter_map(|u| match (u.success, policy) {
            (true, _) => Some((Phase::Track, u.bbox)),
            (false, FailurePolicy::Omit) => None,
            (false, FailurePolicy::Flag) => Some((Phase::Lost, u.bbox)),
        });
        let records = self.results.log_output(frame.id(), entries, lag);
        self.k += 1;
        self.summary.track_phases += 1;
        self.summary.lost_objects += lost as u64;

        Ok(PhaseEvent {
            frame_id: frame.id(),
            phase: Phase::Track,
            k: self.k,
            lag,
            next_frame_id: self.advance(lag),
            records,
            lost,
            elapsed: Some(elapsed),
        })
    }
}
