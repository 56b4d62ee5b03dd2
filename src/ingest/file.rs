//! Local file frame source.
//!
//! `FileSource` picks a backend from the path:
//! - `stub://<name>`: synthetic scene, no I/O
//! - a directory: still-image sequence (feature: ingest-images)
//! - a file: video decoded with FFmpeg (feature: ingest-file-ffmpeg)
//!
//! Remote URLs are rejected; frames are only read from local storage.

use anyhow::Result;
use std::path::Path;

use super::synthetic::SyntheticSource;
use super::VideoSource;
use crate::detect::GroundTruthSource;
use crate::error::CounterError;
use crate::frame::Frame;

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
#[cfg(feature = "ingest-images")]
use super::images::ImageSequenceSource;

/// Configuration for a local file source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local path (directory, video file, or `stub://name`).
    pub path: String,
    /// Frame rate used when the media does not carry one.
    pub frame_rate: f64,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            frame_rate: 30.0,
        }
    }
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "ingest-images")]
    Images(ImageSequenceSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    pub fn new(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(CounterError::configuration(format!(
                "file ingestion only supports local paths, got '{}'",
                config.path
            ))
            .into());
        }
        if config.path.starts_with("stub://") {
            let mut synthetic = super::synthetic::SyntheticConfig::default();
            if config.frame_rate > 0.0 {
                synthetic.frame_rate = config.frame_rate;
            }
            log::info!("FileSource: {} (synthetic)", config.path);
            return Ok(Self {
                backend: FileBackend::Synthetic(SyntheticSource::new(synthetic)),
            });
        }

        let path = Path::new(&config.path);
        if path.is_dir() {
            #[cfg(feature = "ingest-images")]
            {
                Ok(Self {
                    backend: FileBackend::Images(ImageSequenceSource::new(
                        path,
                        config.frame_rate,
                    )?),
                })
            }
            #[cfg(not(feature = "ingest-images"))]
            {
                Err(CounterError::configuration(
                    "image directories require the ingest-images feature",
                )
                .into())
            }
        } else {
            #[cfg(feature = "ingest-file-ffmpeg")]
            {
                Ok(Self {
                    backend: FileBackend::Ffmpeg(FfmpegFileSource::new(config)?),
                })
            }
            #[cfg(not(feature = "ingest-file-ffmpeg"))]
            {
                Err(CounterError::configuration(
                    "video files require the ingest-file-ffmpeg feature",
                )
                .into())
            }
        }
    }

    /// Exact ground truth when the backend draws its own scene.
    pub fn synthetic_ground_truth(&self) -> Option<GroundTruthSource> {
        match &self.backend {
            FileBackend::Synthetic(source) => Some(source.ground_truth()),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }
}

impl VideoSource for FileSource {
    fn frame_rate(&self) -> f64 {
        match &self.backend {
            FileBackend::Synthetic(source) => source.frame_rate(),
            #[cfg(feature = "ingest-images")]
            FileBackend::Images(source) => source.frame_rate(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.frame_rate(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-images")]
            FileBackend::Images(source) => source.next_frame(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame(),
        }
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}
