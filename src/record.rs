//! Per-object observations and the append-only log that holds them.
//!
//! The log knows nothing about scheduling: it numbers the boxes of one call
//! `1..N` and appends. Emission to persistent storage is a `ResultSink` concern.

use anyhow::Result;
use serde::Serialize;
use std::fmt;

use crate::detect::BoundingBox;
use crate::storage::ResultSink;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Detect,
    Track,
    /// Track-phase record of an object its tracker lost. Only emitted under
    /// `FailurePolicy::Flag`.
    Lost,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Detect => "detect",
            Phase::Track => "track",
            Phase::Lost => "lost",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One object on one processed frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
    pub frame_id: u64,
    pub phase: Phase,
    /// 1-based position within this frame's records. Not an identity.
    pub local_id: u32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Frames to skip that this record's phase produced.
    pub lag: u64,
}

impl ResultRecord {
    pub fn new(frame_id: u64, phase: Phase, local_id: u32, bbox: &BoundingBox, lag: u64) -> Self {
        let (x, y, width, height) = bbox.to_pixels();
        Self {
            frame_id,
            phase,
            local_id,
            x,
            y,
            width,
            height,
            lag,
        }
    }
}

/// Ordered, append-only record sequence for one run.
#[derive(Clone, Debug, Default)]
pub struct ResultLog {
    records: Vec<ResultRecord>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record per `(phase, box)` pair, numbering them from 1.
    /// Returns how many records were added.
    pub fn log_output<I>(&mut self, frame_id: u64, entries: I, lag: u64) -> usize
    where
        I: IntoIterator<Item = (Phase, BoundingBox)>,
    {
        let before = self.records.len();
        for (idx, (phase, bbox)) in entries.into_iter().enumerate() {
            self.records
                .push(ResultRecord::new(frame_id, phase, idx as u32 + 1, &bbox, lag));
        }
        self.records.len() - before
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hand every record to `sink`, in insertion order. The log is left intact
    /// so a failed emission can be retried elsewhere.
    pub fn flush(&self, sink: &mut dyn ResultSink) -> Result<()> {
        sink.emit(&self.records)
    }
}
