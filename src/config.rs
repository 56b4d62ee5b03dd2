use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::CounterError;
use crate::storage::DEFAULT_OUTPUT_DIR;
use crate::track::TrackerAlgorithm;

const DEFAULT_TRACKER: TrackerAlgorithm = TrackerAlgorithm::Csrt;
const DEFAULT_DETECT_SPEED_SECS: f64 = 0.7;
const DEFAULT_WINDOW_SIZE: u32 = 35;

// ----------------------------------------------------------------------------
// Scheduler configuration
// ----------------------------------------------------------------------------

/// What a track phase does with an object its tracker lost.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Drop the object's record for that frame.
    #[default]
    Omit,
    /// Keep the record at the last known box, with phase `lost`.
    Flag,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Omit => "omit",
            FailurePolicy::Flag => "flag",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailurePolicy {
    type Err = CounterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "omit" => Ok(FailurePolicy::Omit),
            "flag" => Ok(FailurePolicy::Flag),
            other => Err(CounterError::configuration(format!(
                "unknown failure policy '{}' (expected omit or flag)",
                other
            ))),
        }
    }
}

/// Immutable parameters of one scheduler run.
#[derive(Clone, Debug, PartialEq)]
pub struct SchedulerConfig {
    tracker_algorithm: TrackerAlgorithm,
    detect_interval_secs: f64,
    window_size: u32,
    frame_rate: f64,
    failure_policy: FailurePolicy,
}

impl SchedulerConfig {
    pub fn new(
        tracker_algorithm: TrackerAlgorithm,
        detect_interval_secs: f64,
        window_size: u32,
        frame_rate: f64,
    ) -> Result<Self> {
        let cfg = Self {
            tracker_algorithm,
            detect_interval_secs,
            window_size,
            frame_rate,
            failure_policy: FailurePolicy::default(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    fn validate(&self) -> Result<(), CounterError> {
        if !self.detect_interval_secs.is_finite() || self.detect_interval_secs < 0.0 {
            return Err(CounterError::configuration(format!(
                "detect interval must be a finite number of seconds >= 0, got {}",
                self.detect_interval_secs
            )));
        }
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(CounterError::configuration(format!(
                "frame rate must be > 0, got {}",
                self.frame_rate
            )));
        }
        Ok(())
    }

    pub fn tracker_algorithm(&self) -> TrackerAlgorithm {
        self.tracker_algorithm
    }

    pub fn detect_interval_secs(&self) -> f64 {
        self.detect_interval_secs
    }

    pub fn window_size(&self) -> u32 {
        self.window_size
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Frames skipped after every detect phase: `floor(interval * fps)`.
    pub fn detect_lag(&self) -> u64 {
        frames_to_skip(self.detect_interval_secs, self.frame_rate)
    }
}

/// `floor(seconds * frame_rate)`, floored at zero.
pub fn frames_to_skip(seconds: f64, frame_rate: f64) -> u64 {
    let frames = (seconds * frame_rate).floor();
    if frames.is_finite() && frames > 0.0 {
        frames as u64
    } else {
        0
    }
}

// ----------------------------------------------------------------------------
// Run configuration (file + env)
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
struct CounterConfigFile {
    dataset_home: Option<PathBuf>,
    video: Option<String>,
    tracker: Option<String>,
    detect_speed: Option<f64>,
    window_size: Option<u32>,
    output_dir: Option<PathBuf>,
    failure_policy: Option<String>,
}

/// Everything a `person_counter` run needs besides the frames themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterConfig {
    pub dataset_home: Option<PathBuf>,
    /// Sequence name (`MOT16-10`) or a `stub://` synthetic video.
    pub video: Option<String>,
    pub tracker: TrackerAlgorithm,
    pub detect_speed_secs: f64,
    pub window_size: u32,
    pub output_dir: PathBuf,
    pub failure_policy: FailurePolicy,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            dataset_home: None,
            video: None,
            tracker: DEFAULT_TRACKER,
            detect_speed_secs: DEFAULT_DETECT_SPEED_SECS,
            window_size: DEFAULT_WINDOW_SIZE,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl CounterConfig {
    /// Load from `path` (or `COUNTER_CONFIG`), then apply `COUNTER_*` env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var("COUNTER_CONFIG")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let file_cfg = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => read_config_file(&path)?,
            None => CounterConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CounterConfigFile) -> Result<Self> {
        let defaults = Self::default();
        let tracker = match file.tracker {
            Some(name) => name.parse()?,
            None => defaults.tracker,
        };
        let failure_policy = match file.failure_policy {
            Some(policy) => policy.parse()?,
            None => defaults.failure_policy,
        };
        Ok(Self {
            dataset_home: file.dataset_home,
            video: file.video,
            tracker,
            detect_speed_secs: file.detect_speed.unwrap_or(defaults.detect_speed_secs),
            window_size: file.window_size.unwrap_or(defaults.window_size),
            output_dir: file.output_dir.unwrap_or(defaults.output_dir),
            failure_policy,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(home) = env_value("COUNTER_DATASET_HOME") {
            self.dataset_home = Some(PathBuf::from(home));
        }
        if let Some(video) = env_value("COUNTER_VIDEO") {
            self.video = Some(video);
        }
        if let Some(tracker) = env_value("COUNTER_TRACKER") {
            self.tracker = tracker.parse()?;
        }
        if let Some(speed) = env_value("COUNTER_DETECT_SPEED") {
            self.detect_speed_secs = speed.parse().map_err(|_| {
                CounterError::configuration("COUNTER_DETECT_SPEED must be a number of seconds")
            })?;
        }
        if let Some(window) = env_value("COUNTER_WINDOW_SIZE") {
            self.window_size = window.parse().map_err(|_| {
                CounterError::configuration("COUNTER_WINDOW_SIZE must be a non-negative integer")
            })?;
        }
        if let Some(dir) = env_value("COUNTER_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(policy) = env_value("COUNTER_FAILURE_POLICY") {
            self.failure_policy = policy.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.detect_speed_secs.is_finite() || self.detect_speed_secs < 0.0 {
            return Err(CounterError::configuration(format!(
                "detect speed must be >= 0 seconds, got {}",
                self.detect_speed_secs
            ))
            .into());
        }
        if let Some(video) = &self.video {
            if video.trim().is_empty() {
                return Err(CounterError::configuration("video must not be blank").into());
            }
        }
        Ok(())
    }

    /// Scheduler parameters for a video running at `frame_rate`.
    pub fn scheduler_config(&self, frame_rate: f64) -> Result<SchedulerConfig> {
        Ok(SchedulerConfig::new(
            self.tracker,
            self.detect_speed_secs,
            self.window_size,
            frame_rate,
        )?
        .with_failure_policy(self.failure_policy))
    }

    /// Effective settings as `(key, value)`, sorted by key.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let show = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        let mut entries = vec![
            ("dataset_home", show(&self.dataset_home)),
            ("detect_speed", self.detect_speed_secs.to_string()),
            ("failure_policy", self.failure_policy.to_string()),
            ("output_dir", self.output_dir.display().to_string()),
            ("tracker", self.tracker.to_string()),
            ("video", self.video.clone().unwrap_or_else(|| "-".to_string())),
            ("window_size", self.window_size.to_string()),
        ];
        entries.sort_by_key(|(key, _)| *key);
        entries
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn read_config_file(path: &Path) -> Result<CounterConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let parsed = if is_toml {
        toml::from_str(&raw).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&raw).map_err(|e| e.to_string())
    };
    parsed.map_err(|e| {
        anyhow::Error::from(CounterError::configuration(format!(
            "invalid config file {}: {}",
            path.display(),
            e
        )))
    })
}
