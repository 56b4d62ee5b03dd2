use anyhow::{anyhow, Result};

use crate::detect::BoundingBox;
use crate::frame::Frame;
use crate::track::backend::ObjectTracker;

/// Stub tracker for testing. Reports its seed box on every frame.
#[derive(Default)]
pub struct StaticTracker {
    bbox: Option<BoundingBox>,
}

impl StaticTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectTracker for StaticTracker {
    fn name(&self) -> &'static str {
        "static"
    }

    fn init(&mut self, _frame: &Frame, bbox: BoundingBox) -> Result<()> {
        self.bbox = Some(bbox);
        Ok(())
    }

    fn update(&mut self, _frame: &Frame) -> Result<Option<BoundingBox>> {
        self.bbox
            .map(Some)
            .ok_or_else(|| anyhow!("static tracker updated before init"))
    }
}
