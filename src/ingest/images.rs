//! Image-directory frame source.
//!
//! Decodes a folder of still images (MOT16 `img1/000001.jpg`, ...) in lexical
//! file-name order. Each file becomes one frame.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use super::VideoSource;
use crate::frame::Frame;

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

pub struct ImageSequenceSource {
    files: Vec<PathBuf>,
    frame_rate: f64,
    frame_count: u64,
}

impl ImageSequenceSource {
    pub fn new(dir: &Path, frame_rate: f64) -> Result<Self> {
        let mut files = Vec::new();
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("failed to list image directory {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if path.is_file() && is_image {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(anyhow!("no images found in {}", dir.display()));
        }
        files.sort();
        log::info!(
            "ImageSequenceSource: {} frames in {}",
            files.len(),
            dir.display()
        );
        Ok(Self {
            files,
            frame_rate,
            frame_count: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl VideoSource for ImageSequenceSource {
    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.files.get(self.frame_count as usize) else {
            return Ok(None);
        };
        let luma = image::open(path)
            .with_context(|| format!("failed to decode {}", path.display()))?
            .to_luma8();
        let (width, height) = luma.dimensions();
        self.frame_count += 1;
        Frame::new(self.frame_count, width, height, luma.into_raw()).map(Some)
    }
}
