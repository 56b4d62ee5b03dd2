//! Synthetic scene source.
//!
//! Renders bright rectangles ("walkers") bouncing across a noisy dark
//! background. Walker positions are a pure function of the frame id, so the
//! source can hand out exact ground truth for the frames it draws.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::VideoSource;
use crate::detect::{BoundingBox, GroundTruthSource};
use crate::frame::Frame;

const BACKGROUND_LUMA: u8 = 40;
const NOISE_AMPLITUDE: i16 = 4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Walker {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Pixels per frame.
    pub vx: f32,
    pub vy: f32,
    pub luma: u8,
}

#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub frame_count: u64,
    pub walkers: Vec<Walker>,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            frame_rate: 30.0,
            frame_count: 300,
            walkers: vec![
                Walker {
                    x: 20.0,
                    y: 60.0,
                    width: 16.0,
                    height: 40.0,
                    vx: 2.0,
                    vy: 0.0,
                    luma: 220,
                },
                Walker {
                    x: 200.0,
                    y: 120.0,
                    width: 16.0,
                    height: 40.0,
                    vx: -1.0,
                    vy: 1.0,
                    luma: 180,
                },
                Walker {
                    x: 140.0,
                    y: 20.0,
                    width: 16.0,
                    height: 40.0,
                    vx: 0.0,
                    vy: 2.0,
                    luma: 250,
                },
            ],
            seed: 7,
        }
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
    frame_count: u64,
    rng: StdRng,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            frame_count: 0,
            rng,
        }
    }

    /// Walker boxes on `frame_id`, in walker order.
    pub fn walker_boxes(&self, frame_id: u64) -> Vec<BoundingBox> {
        let step = frame_id.saturating_sub(1) as f32;
        self.config
            .walkers
            .iter()
            .map(|w| {
                let x = reflect(w.x + w.vx * step, self.config.width as f32 - w.width);
                let y = reflect(w.y + w.vy * step, self.config.height as f32 - w.height);
                BoundingBox::new(x, y, w.width, w.height)
            })
            .collect()
    }

    /// Exact ground truth for every frame this source will produce.
    pub fn ground_truth(&self) -> GroundTruthSource {
        GroundTruthSource::from_boxes(
            (1..=self.config.frame_count).map(|id| (id, self.walker_boxes(id))),
        )
    }

    fn render(&mut self, frame_id: u64) -> Vec<u8> {
        let (w, h) = (self.config.width as usize, self.config.height as usize);
        let mut pixels = Vec::with_capacity(w * h);
        for _ in 0..w * h {
            let noise: i16 = self.rng.gen_range(-NOISE_AMPLITUDE..=NOISE_AMPLITUDE);
            pixels.push((BACKGROUND_LUMA as i16 + noise) as u8);
        }
        for (walker, bbox) in self.config.walkers.iter().zip(self.walker_boxes(frame_id)) {
            let x0 = bbox.x.max(0.0) as usize;
            let y0 = bbox.y.max(0.0) as usize;
            let x1 = (bbox.right().max(0.0) as usize).min(w);
            let y1 = (bbox.bottom().max(0.0) as usize).min(h);
            for y in y0..y1 {
                for x in x0..x1 {
                    // Vertical gradient so the template has structure.
                    let shade = ((y - y0) * 2).min(40) as u8;
                    pixels[y * w + x] = walker.luma.saturating_sub(shade);
                }
            }
        }
        pixels
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new(SyntheticConfig::default())
    }
}

impl VideoSource for SyntheticSource {
    fn frame_rate(&self) -> f64 {
        self.config.frame_rate
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.frame_count >= self.config.frame_count {
            return Ok(None);
        }
        self.frame_count += 1;
        let id = self.frame_count;
        let pixels = self.render(id);
        Frame::new(id, self.config.width, self.config.height, pixels).map(Some)
    }
}

/// Fold `p` back and forth into `[0, limit]`.
fn reflect(p: f32, limit: f32) -> f32 {
    if limit <= 0.0 {
        return 0.0;
    }
    let period = 2.0 * limit;
    let m = p.rem_euclid(period);
    if m > limit {
        period - m
    } else {
        m
    }
}
