//! Decoded video frames.
//!
//! - `Frame`: one 8-bit luma image plus the sequential id the source gave it.
//!
//! Frames are read once, handed to the active phase and dropped. Nothing in the
//! scheduler buffers them, so there is deliberately no `Clone`.

use anyhow::{anyhow, Result};

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// A single grey-level frame pulled from a `VideoSource`.
pub struct Frame {
    /// 1-based position in the stream. Counts skipped frames too.
    id: u64,

    pub width: u32,
    pub height: u32,

    /// Row-major luma, `width * height` bytes.
    data: Vec<u8>,
}

impl Frame {
    /// Build a frame from row-major luma bytes.
    pub fn new(id: u64, width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| anyhow!("frame dimensions {}x{} overflow", width, height))?;
        if data.len() != expected {
            return Err(anyhow!(
                "frame {} has {} luma bytes, expected {} for {}x{}",
                id,
                data.len(),
                expected,
                width,
                height
            ));
        }
        Ok(Self {
            id,
            width,
            height,
            data,
        })
    }

    /// A uniform frame. Handy for tests and for sources without pixels.
    pub fn blank(id: u64, width: u32, height: u32) -> Self {
        Self {
            id,
            width,
            height,
            data: vec![0u8; width as usize * height as usize],
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn luma(&self) -> &[u8] {
        &self.data
    }

    /// Luma at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: i64, y: i64) -> Option<u8> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

impl std::fmt::Debug for Frame {
    // Pixel data is intentionally left out.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}
