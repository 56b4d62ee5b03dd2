//! CPU grey-level template tracker.
//!
//! The seed patch is sampled on a regular grid at init. Each update scans a
//! square window around the previous position and moves the box to the offset
//! with the lowest mean absolute difference. A best score above the loss
//! threshold reports the object as lost and leaves the box where it was.

use anyhow::Result;

use crate::detect::BoundingBox;
use crate::frame::Frame;
use crate::track::algorithm::TrackerAlgorithm;
use crate::track::backend::ObjectTracker;

/// Candidates need at least this share of their samples inside the frame.
const MIN_VISIBLE_FRACTION: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemplateParams {
    /// Largest per-axis displacement searched, in pixels.
    pub search_radius: i64,
    /// Template sampling step, in pixels.
    pub stride: usize,
    /// Mean absolute luma difference above which the object is lost.
    pub max_mean_abs_diff: f32,
}

impl TemplateParams {
    /// Defaults per algorithm: narrow and sparse for the fast ones, wide and
    /// dense for the accurate ones.
    pub fn for_algorithm(algorithm: TrackerAlgorithm) -> Self {
        let (search_radius, stride, max_mean_abs_diff) = match algorithm {
            TrackerAlgorithm::Mosse => (4, 4, 30.0),
            TrackerAlgorithm::MedianFlow => (6, 3, 30.0),
            TrackerAlgorithm::Kcf => (8, 2, 35.0),
            TrackerAlgorithm::Boosting => (10, 2, 35.0),
            TrackerAlgorithm::Mil => (12, 2, 40.0),
            TrackerAlgorithm::Tld => (16, 2, 45.0),
            TrackerAlgorithm::Csrt => (16, 1, 40.0),
        };
        Self {
            search_radius,
            stride,
            max_mean_abs_diff,
        }
    }
}

impl Default for TemplateParams {
    fn default() -> Self {
        Self::for_algorithm(TrackerAlgorithm::Kcf)
    }
}

/// One template sample: offset from the box origin and its luma.
#[derive(Clone, Copy, Debug)]
struct Sample {
    dx: i64,
    dy: i64,
    luma: u8,
}

pub struct TemplateTracker {
    params: TemplateParams,
    bbox: Option<BoundingBox>,
    samples: Vec<Sample>,
}

impl TemplateTracker {
    pub fn new(params: TemplateParams) -> Self {
        Self {
            params,
            bbox: None,
            samples: Vec::new(),
        }
    }

    fn origin(bbox: &BoundingBox) -> (i64, i64) {
        (bbox.x.round() as i64, bbox.y.round() as i64)
    }

    /// Mean absolute difference of the template placed at `(ox, oy)`.
    fn score_at(&self, frame: &Frame, ox: i64, oy: i64) -> Option<f32> {
        let mut total: u64 = 0;
        let mut visible: usize = 0;
        for s in &self.samples {
            if let Some(p) = frame.pixel(ox + s.dx, oy + s.dy) {
                total += (p as i32 - s.luma as i32).unsigned_abs() as u64;
                visible += 1;
            }
        }
        let needed = (self.samples.len() as f32 * MIN_VISIBLE_FRACTION).ceil() as usize;
        if visible == 0 || visible < needed {
            return None;
        }
        Some(total as f32 / visible as f32)
    }
}

impl Default for TemplateTracker {
    fn default() -> Self {
        Self::new(TemplateParams::default())
    }
}

impl ObjectTracker for TemplateTracker {
    fn name(&self) -> &'static str {
        "template"
    }

    fn init(&mut self, frame: &Frame, bbox: BoundingBox) -> Result<()> {
        let (ox, oy) = Self::origin(&bbox);
        let width = bbox.width.round() as i64;
        let height = bbox.height.round() as i64;
        let step = self.params.stride.max(1);

        self.samples.clear();
        for dy in (0..height.max(0)).step_by(step) {
            for dx in (0..width.max(0)).step_by(step) {
                if let Some(luma) = frame.pixel(ox + dx, oy + dy) {
                    self.samples.push(Sample { dx, dy, luma });
                }
            }
        }
        if self.samples.is_empty() {
            log::debug!(
                "template tracker seeded outside frame {} at {:?}",
                frame.id(),
                bbox
            );
        }
        self.bbox = Some(bbox);
        Ok(())
    }

    fn update(&mut self, frame: &Frame) -> Result<Option<BoundingBox>> {
        let Some(bbox) = self.bbox else {
            return Ok(None);
        };
        if self.samples.is_empty() {
            return Ok(None);
        }

        let (ox, oy) = Self::origin(&bbox);
        let r = self.params.search_radius.max(0);

        // Stay put unless another offset is strictly better.
        let mut best: Option<(f32, i64, i64)> = self.score_at(frame, ox, oy).map(|s| (s, 0, 0));
        for dy in -r..=r {
            for dx in -r..=r {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let Some(score) = self.score_at(frame, ox + dx, oy + dy) else {
                    continue;
                };
                if best.map_or(true, |(b, _, _)| score < b) {
                    best = Some((score, dx, dy));
                }
            }
        }

        match best {
            Some((score, dx, dy)) if score <= self.params.max_mean_abs_diff => {
                let moved = bbox.translated(dx as f32, dy as f32);
                self.bbox = Some(moved);
                Ok(Some(moved))
            }
            _ => Ok(None),
        }
    }
}
