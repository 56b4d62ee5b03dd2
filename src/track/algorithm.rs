use std::fmt;
use std::str::FromStr;

use crate::error::CounterError;

/// Tracking algorithms a run may be configured with.
///
/// The scheduler never matches on these; it only hands the selected value to
/// a `TrackerBank`, which resolves it to a concrete `ObjectTracker`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackerAlgorithm {
    Csrt,
    Kcf,
    Mosse,
    Boosting,
    Mil,
    Tld,
    MedianFlow,
}

impl TrackerAlgorithm {
    pub const ALL: [TrackerAlgorithm; 7] = [
        TrackerAlgorithm::Csrt,
        TrackerAlgorithm::Kcf,
        TrackerAlgorithm::Mosse,
        TrackerAlgorithm::Boosting,
        TrackerAlgorithm::Mil,
        TrackerAlgorithm::Tld,
        TrackerAlgorithm::MedianFlow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerAlgorithm::Csrt => "csrt",
            TrackerAlgorithm::Kcf => "kcf",
            TrackerAlgorithm::Mosse => "mosse",
            TrackerAlgorithm::Boosting => "boosting",
            TrackerAlgorithm::Mil => "mil",
            TrackerAlgorithm::Tld => "tld",
            TrackerAlgorithm::MedianFlow => "medianflow",
        }
    }
}

impl fmt::Display for TrackerAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackerAlgorithm {
    type Err = CounterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        TrackerAlgorithm::ALL
            .into_iter()
            .find(|algo| algo.as_str() == name)
            .ok_or_else(|| CounterError::UnknownTracker(s.trim().to_string()))
    }
}
