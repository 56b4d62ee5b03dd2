//! Frame ingestion sources.
//!
//! This module provides different sources of frames for the scheduler:
//! - Synthetic scenes (`stub://` paths, testing and demos)
//! - Directories of still images, e.g. a MOT16 `img1/` folder (feature: ingest-images)
//! - Local video files (feature: ingest-file-ffmpeg)
//!
//! Every source numbers frames from 1 without gaps and signals end of stream
//! with `Ok(None)`. Sources decode to 8-bit luma; colour is never needed by
//! the trackers.

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
#[cfg(feature = "ingest-images")]
pub mod images;
pub mod synthetic;

use anyhow::Result;

use crate::frame::Frame;

pub use file::{FileConfig, FileSource};
#[cfg(feature = "ingest-images")]
pub use images::ImageSequenceSource;
pub use synthetic::{SyntheticConfig, SyntheticSource, Walker};

/// Sequential frame supplier.
pub trait VideoSource {
    /// Native frame rate in frames per second.
    fn frame_rate(&self) -> f64;

    /// Next frame, or `None` once the stream is exhausted. May block.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

impl<V: VideoSource + ?Sized> VideoSource for Box<V> {
    fn frame_rate(&self) -> f64 {
        (**self).frame_rate()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }
}
