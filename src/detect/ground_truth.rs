//! MOT-challenge ground truth as a bounding-box source.
//!
//! `gt.txt` rows are `frame,id,x,y,w,h,considered,class,visibility`. Only rows
//! marked considered and labelled pedestrian (class 1) seed trackers. Files
//! that stop after the box columns are accepted as-is.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use super::result::BoundingBox;
use super::source::BoundingBoxSource;
use crate::frame::Frame;

const PEDESTRIAN_CLASS: u32 = 1;

#[derive(Clone, Debug, Default)]
pub struct GroundTruthSource {
    by_frame: HashMap<u64, Vec<BoundingBox>>,
}

impl GroundTruthSource {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open ground truth {}", path.display()))?;
        Self::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("invalid ground truth {}", path.display()))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut by_frame: HashMap<u64, Vec<BoundingBox>> = HashMap::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if let Some((frame_id, bbox)) = parse_row(trimmed)
                .with_context(|| format!("line {}: '{}'", line_no, trimmed))?
            {
                by_frame.entry(frame_id).or_default().push(bbox);
            }
        }
        Ok(Self { by_frame })
    }

    /// Build from already-known boxes, e.g. a synthetic scene.
    pub fn from_boxes<I>(boxes: I) -> Self
    where
        I: IntoIterator<Item = (u64, Vec<BoundingBox>)>,
    {
        Self {
            by_frame: boxes.into_iter().collect(),
        }
    }

    /// Number of frames carrying at least one box.
    pub fn frame_count(&self) -> usize {
        self.by_frame.values().filter(|b| !b.is_empty()).count()
    }

    pub fn box_count(&self) -> usize {
        self.by_frame.values().map(Vec::len).sum()
    }

    pub fn boxes(&self, frame_id: u64) -> &[BoundingBox] {
        self.by_frame
            .get(&frame_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl BoundingBoxSource for GroundTruthSource {
    fn name(&self) -> &'static str {
        "ground-truth"
    }

    fn boxes_for(&mut self, frame_id: u64, _frame: &Frame) -> Result<Vec<BoundingBox>> {
        Ok(self.boxes(frame_id).to_vec())
    }
}

fn parse_row(row: &str) -> Result<Option<(u64, BoundingBox)>> {
    let cols: Vec<&str> = row.split(',').map(str::trim).collect();
    if cols.len() < 6 {
        return Err(anyhow!("expected at least 6 columns, found {}", cols.len()));
    }
    let frame_id: u64 = cols[0]
        .parse::<f64>()
        .ok()
        .filter(|v| v.fract() == 0.0 && *v >= 1.0)
        .map(|v| v as u64)
        .ok_or_else(|| anyhow!("frame column '{}' is not a positive integer", cols[0]))?;
    let num = |i: usize| -> Result<f32> {
        cols[i]
            .parse::<f32>()
            .map_err(|_| anyhow!("column {} '{}' is not a number", i + 1, cols[i]))
    };

    if cols.len() > 6 && num(6)? != 1.0 {
        return Ok(None);
    }
    if cols.len() > 7 && num(7)? != PEDESTRIAN_CLASS as f32 {
        return Ok(None);
    }

    let bbox = BoundingBox::new(num(2)?, num(3)?, num(4)?, num(5)?);
    Ok(Some((frame_id, bbox)))
}
