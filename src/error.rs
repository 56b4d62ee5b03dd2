//! Typed failures that callers need to tell apart.
//!
//! Library functions return `anyhow::Result`; the variants below are raised
//! through it and recovered with `anyhow::Error::downcast_ref::<CounterError>()`.
//! End of stream and per-object tracking loss are not errors and have no variant.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CounterError {
    /// Invalid scheduler or run configuration. Raised before any frame is read.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unsupported tracker algorithm '{0}' (expected one of csrt, kcf, mosse, boosting, mil, tld, medianflow)")]
    UnknownTracker(String),

    #[error("invalid dataset '{0}'")]
    UnknownDataset(String),

    /// Persisted output could not be written. Records stay in memory.
    #[error("failed to emit results to {}: {source}", path.display())]
    Emission {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The video source broke its numbering contract.
    #[error("video source contract violated: {0}")]
    SourceContract(String),
}

impl CounterError {
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// True for failures that are raised before the run loop starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::UnknownTracker(_) | Self::UnknownDataset(_)
        )
    }
}
