use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};

use person_counter::{
    BoundingBox, CounterError, FailurePolicy, Frame, FrameScheduler, GroundTruthSource,
    InMemoryResultSink, ManualClock, MultiTracker, ObjectTracker, Phase, PhaseEvent,
    ResultRecord, ResultSink, SchedulerConfig, SchedulerObserver, StaticTracker, TrackUpdate,
    TrackerAlgorithm, TrackerBank, TrackerRegistry, VideoSource,
};

const FPS: f64 = 30.0;

// ----------------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------------

/// Blank frames numbered from 1. Optionally raises a stop flag once a given
/// number of frames has been handed out, or skips an id.
struct BlankVideo {
    total: u64,
    pulled: u64,
    stop_after: Option<(u64, Arc<AtomicBool>)>,
    skip_id: Option<u64>,
}

impl BlankVideo {
    fn new(total: u64) -> Self {
        Self {
            total,
            pulled: 0,
            stop_after: None,
            skip_id: None,
        }
    }
}

impl VideoSource for BlankVideo {
    fn frame_rate(&self) -> f64 {
        FPS
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.pulled >= self.total {
            return Ok(None);
        }
        self.pulled += 1;
        if let Some((after, flag)) = &self.stop_after {
            if self.pulled >= *after {
                flag.store(true, Ordering::SeqCst);
            }
        }
        let mut id = self.pulled;
        if self.skip_id.is_some_and(|skip| id >= skip) {
            id += 1;
        }
        Ok(Some(Frame::blank(id, 8, 8)))
    }
}

fn people(n: usize) -> Vec<BoundingBox> {
    (0..n)
        .map(|i| BoundingBox::new(10.0 * i as f32, 5.0, 8.0, 20.0))
        .collect()
}

fn truth(frames: u64, per_frame: usize) -> Box<GroundTruthSource> {
    Box::new(GroundTruthSource::from_boxes(
        (1..=frames).map(|id| (id, people(per_frame))),
    ))
}

fn static_registry() -> TrackerRegistry {
    let mut registry = TrackerRegistry::new();
    registry.register(TrackerAlgorithm::Kcf, || Box::new(StaticTracker::new()));
    registry
}

/// Tracker that loses its object on the first update.
struct Vanishing;

impl ObjectTracker for Vanishing {
    fn name(&self) -> &'static str {
        "vanishing"
    }

    fn init(&mut self, _frame: &Frame, _bbox: BoundingBox) -> Result<()> {
        Ok(())
    }

    fn update(&mut self, _frame: &Frame) -> Result<Option<BoundingBox>> {
        Ok(None)
    }
}

/// Bank whose updates take `per_update` on a manual clock. Can be told to
/// fail on the n-th update.
struct TimedBank {
    inner: TrackerRegistry,
    clock: ManualClock,
    per_update: Duration,
    updates: u32,
    fail_on: Option<u32>,
}

impl TimedBank {
    fn new(inner: TrackerRegistry, clock: ManualClock, per_update: Duration) -> Self {
        Self {
            inner,
            clock,
            per_update,
            updates: 0,
            fail_on: None,
        }
    }
}

impl TrackerBank for TimedBank {
    fn supports(&self, algorithm: TrackerAlgorithm) -> bool {
        self.inner.supports(algorithm)
    }

    fn seed(
        &mut self,
        algorithm: TrackerAlgorithm,
        frame: &Frame,
        boxes: &[BoundingBox],
    ) -> Result<MultiTracker> {
        self.inner.seed(algorithm, frame, boxes)
    }

    fn update(&mut self, trackers: &mut MultiTracker, frame: &Frame) -> Result<Vec<TrackUpdate>> {
        self.updates += 1;
        if self.fail_on == Some(self.updates) {
            return Err(anyhow!("tracker backend crashed on frame {}", frame.id()));
        }
        self.clock.advance(self.per_update);
        trackers.update(frame)
    }
}

#[derive(Clone, Default)]
struct Recorder {
    events: Arc<Mutex<Vec<PhaseEvent>>>,
}

impl Recorder {
    fn events(&self) -> Vec<PhaseEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl SchedulerObserver for Recorder {
    fn on_phase(&mut self, event: &PhaseEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

struct FailingSink;

impl ResultSink for FailingSink {
    fn emit(&mut self, _records: &[ResultRecord]) -> Result<()> {
        Err(anyhow!("disk full"))
    }
}

fn scheduler(
    cfg: SchedulerConfig,
    boxes: Box<GroundTruthSource>,
    bank: TimedBank,
    clock: ManualClock,
    recorder: &Recorder,
) -> FrameScheduler {
    FrameScheduler::new(cfg, boxes, Box::new(bank))
        .with_clock(Box::new(clock))
        .with_observer(Box::new(recorder.clone()))
}

fn processed(records: &[ResultRecord]) -> Vec<(u64, Phase, u64)> {
    let mut frames: Vec<(u64, Phase, u64)> =
        records.iter().map(|r| (r.frame_id, r.phase, r.lag)).collect();
    frames.dedup();
    frames
}

// ----------------------------------------------------------------------------
// Scenarios
// ----------------------------------------------------------------------------

#[test]
fn reference_run_at_thirty_fps() -> Result<()> {
    let cfg = SchedulerConfig::new(TrackerAlgorithm::Kcf, 0.7, 2, FPS)?;
    let clock = ManualClock::new();
    let bank = TimedBank::new(static_registry(), clock.clone(), Duration::from_millis(50));
    let recorder = Recorder::default();
    let mut sched = scheduler(cfg, truth(30, 3), bank, clock, &recorder);

    let mut sink = InMemoryResultSink::new();
    let summary = sched.run(&mut BlankVideo::new(30), &mut sink)?;

    assert_eq!(
        processed(sink.records()),
        vec![
            (1, Phase::Detect, 21),
            (22, Phase::Track, 1),
            (23, Phase::Track, 1),
            (24, Phase::Detect, 21),
        ]
    );
    assert_eq!(sink.records().len(), 12);
    assert_eq!(sink.emissions(), 1);
    assert_eq!(summary.frames_pulled, 30);
    assert_eq!(summary.frames_skipped, 26);
    assert_eq!(summary.detect_phases, 2);
    assert_eq!(summary.track_phases, 2);
    assert_eq!(summary.records, 12);
    assert!(!summary.cancelled);

    let first = &sink.records()[..3];
    assert_eq!(
        first.iter().map(|r| r.local_id).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!((first[1].x, first[1].y, first[1].width, first[1].height), (10, 5, 8, 20));

    let events = recorder.events();
    assert_eq!(events[0].next_frame_id, 22);
    assert_eq!(events[1].elapsed, Some(Duration::from_millis(50)));
    assert_eq!(events.last().map(|e| e.next_frame_id), Some(45));
    Ok(())
}

#[test]
fn huge_detect_interval_ends_after_first_detect() -> Result<()> {
    let cfg = SchedulerConfig::new(TrackerAlgorithm::Kcf, 1e18, 2, FPS)?;
    let clock = ManualClock::new();
    let bank = TimedBank::new(static_registry(), clock.clone(), Duration::ZERO);
    let recorder = Recorder::default();
    let mut sched = scheduler(cfg, truth(5, 1), bank, clock, &recorder);

    let mut sink = InMemoryResultSink::new();
    let summary = sched.run(&mut BlankVideo::new(5), &mut sink)?;

    assert_eq!(sink.emissions(), 1);
    assert_eq!(processed(sink.records()), vec![(1, Phase::Detect, u64::MAX)]);
    assert_eq!(summary.detect_phases, 1);
    assert_eq!(summary.frames_skipped, 4);
    assert_eq!(recorder.events()[0].next_frame_id, u64::MAX);
    Ok(())
}

#[test]
fn window_of_zero_detects_on_every_processed_frame() -> Result<()> {
    let cfg = SchedulerConfig::new(TrackerAlgorithm::Kcf, 0.1, 0, FPS)?;
    let clock = ManualClock::new();
    let bank = TimedBank::new(static_registry(), clock.clone(), Duration::ZERO);
    let recorder = Recorder::default();
    let mut sched = scheduler(cfg, truth(12, 1), bank, clock, &recorder);

    let mut sink = InMemoryResultSink::new();
    let summary = sched.run(&mut BlankVideo::new(12), &mut sink)?;

    assert_eq!(summary.track_phases, 0);
    let frames: Vec<u64> = recorder.events().iter().map(|e| e.frame_id).collect();
    assert_eq!(frames, vec![1, 4, 7, 10]);
    assert!(sink.records().iter().all(|r| r.phase == Phase::Detect && r.lag == 3));
    Ok(())
}

#[test]
fn detect_follows_every_full_window() -> Result<()> {
    let cfg = SchedulerConfig::new(TrackerAlgorithm::Kcf, 0.0, 3, FPS)?;
    let clock = ManualClock::new();
    let bank = TimedBank::new(static_registry(), clock.clone(), Duration::ZERO);
    let recorder = Recorder::default();
    let mut sched = scheduler(cfg, truth(10, 2), bank, clock, &recorder);

    sched.run(&mut BlankVideo::new(10), &mut InMemoryResultSink::new())?;

    let events = recorder.events();
    let phases: Vec<(Phase, u32)> = events.iter().map(|e| (e.phase, e.k)).collect();
    assert_eq!(
        phases,
        vec![
            (Phase::Detect, 0),
            (Phase::Track, 1),
            (Phase::Track, 2),
            (Phase::Track, 3),
            (Phase::Detect, 0),
            (Phase::Track, 1),
            (Phase::Track, 2),
            (Phase::Track, 3),
            (Phase::Detect, 0),
            (Phase::Track, 1),
        ]
    );
    for event in &events {
        assert_eq!(event.next_frame_id, event.frame_id + event.lag.max(1));
    }
    Ok(())
}

#[test]
fn processed_frames_strictly_increase_with_growing_latency() -> Result<()> {
    let cfg = SchedulerConfig::new(TrackerAlgorithm::Kcf, 0.2, 4, FPS)?;
    let clock = ManualClock::new();
    let bank = TimedBank::new(static_registry(), clock.clone(), Duration::from_millis(110));
    let recorder = Recorder::default();
    let mut sched = scheduler(cfg, truth(120, 2), bank, clock, &recorder);

    sched.run(&mut BlankVideo::new(120), &mut InMemoryResultSink::new())?;

    let events = recorder.events();
    assert!(events.len() > 5);
    for pair in events.windows(2) {
        assert!(pair[1].frame_id > pair[0].frame_id);
        assert_eq!(pair[1].frame_id, pair[0].next_frame_id);
    }
    for event in events.iter().filter(|e| e.phase == Phase::Track) {
        assert_eq!(event.lag, 3);
    }
    Ok(())
}

#[test]
fn lost_objects_are_omitted_by_default() -> Result<()> {
    let mut registry = TrackerRegistry::new();
    registry.register(TrackerAlgorithm::Kcf, || Box::new(Vanishing));
    let cfg = SchedulerConfig::new(TrackerAlgorithm::Kcf, 0.0, 2, FPS)?;
    let clock = ManualClock::new();
    let bank = TimedBank::new(registry, clock.clone(), Duration::ZERO);
    let recorder = Recorder::default();
    let mut sched = scheduler(cfg, truth(3, 2), bank, clock, &recorder);

    let mut sink = InMemoryResultSink::new();
    let summary = sched.run(&mut BlankVideo::new(3), &mut sink)?;

    assert_eq!(sink.records().len(), 2);
    assert!(sink.records().iter().all(|r| r.phase == Phase::Detect));
    assert_eq!(summary.lost_objects, 4);
    let lost: Vec<usize> = recorder.events().iter().map(|e| e.lost).collect();
    assert_eq!(lost, vec![0, 2, 2]);
    Ok(())
}

#[test]
fn lost_objects_can_be_flagged_at_last_known_box() -> Result<()> {
    let mut registry = TrackerRegistry::new();
    registry.register(TrackerAlgorithm::Kcf, || Box::new(Vanishing));
    let cfg = SchedulerConfig::new(TrackerAlgorithm::Kcf, 0.0, 2, FPS)?
        .with_failure_policy(FailurePolicy::Flag);
    let clock = ManualClock::new();
    let bank = TimedBank::new(registry, clock.clone(), Duration::ZERO);
    let recorder = Recorder::default();
    let mut sched = scheduler(cfg, truth(2, 2), bank, clock, &recorder);

    let mut sink = InMemoryResultSink::new();
    sched.run(&mut BlankVideo::new(2), &mut sink)?;

    let flagged: Vec<_> = sink
        .records()
        .iter()
        .filter(|r| r.frame_id == 2)
        .map(|r| (r.phase, r.local_id, r.x))
        .collect();
    assert_eq!(flagged, vec![(Phase::Lost, 1, 0), (Phase::Lost, 2, 10)]);
    Ok(())
}

#[test]
fn frames_without_people_produce_no_records() -> Result<()> {
    let cfg = SchedulerConfig::new(TrackerAlgorithm::Kcf, 0.0, 3, FPS)?;
    let clock = ManualClock::new();
    let bank = TimedBank::new(static_registry(), clock.clone(), Duration::ZERO);
    let recorder = Recorder::default();
    let mut sched = scheduler(cfg, truth(0, 0), bank, clock, &recorder);

    let mut sink = InMemoryResultSink::new();
    let summary = sched.run(&mut BlankVideo::new(8), &mut sink)?;

    assert!(sink.records().is_empty());
    assert_eq!(sink.emissions(), 1);
    assert_eq!(summary.frames_processed(), 8);
    assert_eq!(summary.detect_phases, 2);
    Ok(())
}

#[test]
fn stream_ending_mid_window_flushes_once() -> Result<()> {
    let cfg = SchedulerConfig::new(TrackerAlgorithm::Kcf, 0.0, 35, FPS)?;
    let clock = ManualClock::new();
    let bank = TimedBank::new(static_registry(), clock.clone(), Duration::ZERO);
    let recorder = Recorder::default();
    let mut sched = scheduler(cfg, truth(5, 1), bank, clock, &recorder);

    let mut sink = InMemoryResultSink::new();
    let summary = sched.run(&mut BlankVideo::new(5), &mut sink)?;

    assert_eq!(summary.detect_phases, 1);
    assert_eq!(summary.track_phases, 4);
    assert_eq!(sink.records().len(), 5);
    assert_eq!(sink.emissions(), 1);
    assert_eq!(sched.results().len(), 5);
    Ok(())
}

#[test]
fn failed_phase_still_emits_partial_records() -> Result<()> {
    let cfg = SchedulerConfig::new(TrackerAlgorithm::Kcf, 0.0, 5, FPS)?;
    let clock = ManualClock::new();
    let mut bank = TimedBank::new(static_registry(), clock.clone(), Duration::ZERO);
    bank.fail_on = Some(2);
    let recorder = Recorder::default();
    let mut sched = scheduler(cfg, truth(10, 2), bank, clock, &recorder);

    let mut sink = InMemoryResultSink::new();
    let err = sched
        .run(&mut BlankVideo::new(10), &mut sink)
        .expect_err("second update fails");

    assert!(err.to_string().contains("crashed on frame 3"));
    assert_eq!(sink.emissions(), 1);
    assert_eq!(processed(sink.records()), vec![(1, Phase::Detect, 0), (2, Phase::Track, 0)]);
    Ok(())
}

#[test]
fn emission_failure_keeps_records_in_memory() -> Result<()> {
    let cfg = SchedulerConfig::new(TrackerAlgorithm::Kcf, 0.0, 1, FPS)?;
    let clock = ManualClock::new();
    let bank = TimedBank::new(static_registry(), clock.clone(), Duration::ZERO);
    let recorder = Recorder::default();
    let mut sched = scheduler(cfg, truth(4, 1), bank, clock, &recorder);

    let err = sched
        .run(&mut BlankVideo::new(4), &mut FailingSink)
        .expect_err("sink rejects records");
    assert!(err.to_string().contains("disk full"));
    assert_eq!(sched.results().len(), 4);

    let mut retry = InMemoryResultSink::new();
    sched.results().flush(&mut retry)?;
    assert_eq!(retry.records(), sched.results().records());
    Ok(())
}

#[test]
fn stop_flag_ends_run_and_emits_what_was_gathered() -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    let cfg = SchedulerConfig::new(TrackerAlgorithm::Kcf, 0.0, 2, FPS)?;
    let clock = ManualClock::new();
    let bank = TimedBank::new(static_registry(), clock.clone(), Duration::ZERO);
    let recorder = Recorder::default();
    let mut sched =
        scheduler(cfg, truth(50, 1), bank, clock, &recorder).with_stop_flag(stop.clone());

    let mut video = BlankVideo::new(50);
    video.stop_after = Some((4, stop));
    let mut sink = InMemoryResultSink::new();
    let summary = sched.run(&mut video, &mut sink)?;

    assert!(summary.cancelled);
    assert_eq!(summary.frames_pulled, 4);
    assert_eq!(sink.records().len(), 4);
    assert_eq!(sink.emissions(), 1);
    Ok(())
}

#[test]
fn gap_in_frame_numbering_is_a_source_error() -> Result<()> {
    let cfg = SchedulerConfig::new(TrackerAlgorithm::Kcf, 0.0, 2, FPS)?;
    let clock = ManualClock::new();
    let bank = TimedBank::new(static_registry(), clock.clone(), Duration::ZERO);
    let recorder = Recorder::default();
    let mut sched = scheduler(cfg, truth(10, 1), bank, clock, &recorder);

    let mut video = BlankVideo::new(10);
    video.skip_id = Some(3);
    let mut sink = InMemoryResultSink::new();
    let err = sched.run(&mut video, &mut sink).expect_err("frame 3 is missing");

    let typed = err.downcast_ref::<CounterError>().expect("typed error");
    assert!(matches!(typed, CounterError::SourceContract(_)));
    assert!(!typed.is_configuration());
    assert_eq!(sink.records().len(), 2);
    Ok(())
}

#[test]
fn rerun_starts_from_a_clean_state() -> Result<()> {
    let cfg = SchedulerConfig::new(TrackerAlgorithm::Kcf, 0.0, 2, FPS)?;
    let clock = ManualClock::new();
    let bank = TimedBank::new(static_registry(), clock.clone(), Duration::ZERO);
    let recorder = Recorder::default();
    let mut sched = scheduler(cfg, truth(6, 1), bank, clock, &recorder);

    let first = sched.run(&mut BlankVideo::new(6), &mut InMemoryResultSink::new())?;
    let mut sink = InMemoryResultSink::new();
    let second = sched.run(&mut BlankVideo::new(6), &mut sink)?;

    assert_eq!(first, second);
    assert_eq!(sink.records().len(), 6);
    assert_eq!(sink.records()[0].phase, Phase::Detect);
    Ok(())
}

#[test]
fn builtin_registry_runs_on_synthetic_scene() -> Result<()> {
    use person_counter::{SyntheticConfig, SyntheticSource};

    let scene = SyntheticConfig {
        frame_count: 60,
        ..SyntheticConfig::default()
    };
    let truth = SyntheticSource::new(scene.clone()).ground_truth();
    let cfg = SchedulerConfig::new(TrackerAlgorithm::Csrt, 0.1, 5, scene.frame_rate)?;
    let mut sched = FrameScheduler::new(
        cfg,
        Box::new(truth),
        Box::new(TrackerRegistry::builtin()),
    )
    .with_clock(Box::new(ManualClock::new()));

    let mut sink = InMemoryResultSink::new();
    let summary = sched.run(&mut SyntheticSource::new(scene.clone()), &mut sink)?;

    assert_eq!(summary.frames_pulled, 60);
    assert!(summary.detect_phases >= 2);
    assert!(summary.track_phases > 0);
    let walkers = scene.walkers.len();
    for frame_id in sink.records().iter().map(|r| r.frame_id) {
        let count = sink
            .records()
            .iter()
            .filter(|r| r.frame_id == frame_id)
            .count();
        assert!(count <= walkers);
    }
    Ok(())
}
