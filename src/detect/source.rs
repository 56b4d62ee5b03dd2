use anyhow::Result;

use crate::detect::result::BoundingBox;
use crate::frame::Frame;

/// Supplies the boxes that seed a detect phase.
///
/// Implementations return boxes in a stable order; that order becomes the
/// `local_id` order of the detect records. An empty result is valid and seeds
/// an empty tracker set.
pub trait BoundingBoxSource {
    /// Source identifier for logs.
    fn name(&self) -> &'static str;

    /// Boxes for `frame_id`. Detector-backed sources may read `frame`;
    /// annotation-backed sources look up `frame_id` only.
    fn boxes_for(&mut self, frame_id: u64, frame: &Frame) -> Result<Vec<BoundingBox>>;
}
