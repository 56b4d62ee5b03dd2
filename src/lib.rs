//! Hybrid detect/track person counter.
//!
//! This crate evaluates a counting strategy where expensive detection
//! alternates with cheap per-object tracking, and frames are dropped in
//! proportion to how long each phase takes, so the output keeps pace with the
//! video's native frame rate.
//!
//! # Architecture
//!
//! - Every processed frame runs exactly one phase, detect or track.
//! - The first processed frame is always a detect, and every later detect
//!   follows `window_size` track phases.
//! - A detect phase skips `floor(detect_interval * fps)` frames. A track phase
//!   skips `floor(measured_update_time * fps)` frames.
//! - Object indices restart at 1 on every processed frame. No identity is
//!   kept across detect cycles.
//! - Records only ever get appended, and each run emits them once.
//!
//! # Module Structure
//!
//! - `scheduler`: the `FrameScheduler` control loop, clocks and observers
//! - `detect`: boxes that seed detect phases (`BoundingBoxSource`, MOT ground truth)
//! - `track`: per-object trackers, tracker sets and the algorithm registry
//! - `ingest`: frame sources (synthetic, image directories, video files)
//! - `record` / `storage`: the result log and its sinks
//! - `config` / `dataset`: run configuration and MOT16 sequence resolution

pub mod config;
pub mod dataset;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod record;
pub mod scheduler;
pub mod storage;
pub mod track;

pub use config::{frames_to_skip, CounterConfig, FailurePolicy, SchedulerConfig};
pub use dataset::{DatasetId, Mot16Sequence, ResolvedVideo};
pub use detect::{BoundingBox, BoundingBoxSource, GroundTruthSource};
pub use error::CounterError;
pub use frame::Frame;
#[cfg(feature = "ingest-images")]
pub use ingest::ImageSequenceSource;
pub use ingest::{FileConfig, FileSource, SyntheticConfig, SyntheticSource, VideoSource, Walker};
pub use record::{Phase, ResultLog, ResultRecord};
pub use scheduler::{
    Clock, FrameScheduler, LogObserver, ManualClock, MonotonicClock, PhaseEvent, RunSummary,
    SchedulerObserver,
};
pub use storage::{output_file_name, CsvResultSink, InMemoryResultSink, ResultSink};
pub use track::{
    MultiTracker, ObjectTracker, StaticTracker, TemplateParams, TemplateTracker, TrackUpdate,
    TrackerAlgorithm, TrackerBank, TrackerFactory, TrackerRegistry,
};
