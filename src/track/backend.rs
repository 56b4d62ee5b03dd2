use anyhow::Result;

use crate::detect::BoundingBox;
use crate::frame::Frame;

/// Outcome of advancing one tracker by one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackUpdate {
    /// False when the tracker lost its object on this frame.
    pub success: bool,
    /// New position, or the last known one when `success` is false.
    pub bbox: BoundingBox,
}

/// Single-object tracker.
///
/// One instance follows one object from the frame it was seeded on. Trackers
/// are created fresh on every detect phase and never outlive their window.
pub trait ObjectTracker: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Seed the tracker with `bbox` on `frame`.
    fn init(&mut self, frame: &Frame, bbox: BoundingBox) -> Result<()>;

    /// Advance to `frame`. `Ok(None)` means the object was lost; errors are
    /// reserved for failures of the tracker itself.
    fn update(&mut self, frame: &Frame) -> Result<Option<BoundingBox>>;
}
