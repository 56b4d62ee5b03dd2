use anyhow::Result;

use crate::detect::BoundingBox;
use crate::frame::Frame;

use super::algorithm::TrackerAlgorithm;
use super::backend::{ObjectTracker, TrackUpdate};

/// Set of per-object trackers seeded together on one detect frame.
///
/// Updates are reported in seeding order, one per tracker, lost or not.
#[derive(Default)]
pub struct MultiTracker {
    trackers: Vec<Box<dyn ObjectTracker>>,
    last_known: Vec<BoundingBox>,
}

impl MultiTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tracker that has already been seeded with `bbox`.
    pub fn add(&mut self, tracker: Box<dyn ObjectTracker>, bbox: BoundingBox) {
        self.trackers.push(tracker);
        self.last_known.push(bbox);
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    /// Advance every tracker to `frame`.
    pub fn update(&mut self, frame: &Frame) -> Result<Vec<TrackUpdate>> {
        let mut updates = Vec::with_capacity(self.trackers.len());
        for (tracker, last) in self.trackers.iter_mut().zip(self.last_known.iter_mut()) {
            match tracker.update(frame)? {
                Some(bbox) => {
                    *last = bbox;
                    updates.push(TrackUpdate {
                        success: true,
                        bbox,
                    });
                }
                None => updates.push(TrackUpdate {
                    success: false,
                    bbox: *last,
                }),
            }
        }
        Ok(updates)
    }
}

/// Creates and advances tracker sets.
///
/// This is the only tracking surface the scheduler sees: it never names a
/// concrete tracker type.
pub trait TrackerBank {
    /// Returns true when the bank can build trackers for `algorithm`.
    fn supports(&self, _algorithm: TrackerAlgorithm) -> bool {
        true
    }

    /// Create one tracker per box, seeded on `frame`, in box order.
    fn seed(
        &mut self,
        algorithm: TrackerAlgorithm,
        frame: &Frame,
        boxes: &[BoundingBox],
    ) -> Result<MultiTracker>;

    /// Advance an existing set by one frame.
    fn update(&mut self, trackers: &mut MultiTracker, frame: &Frame) -> Result<Vec<TrackUpdate>> {
        trackers.update(frame)
    }
}
