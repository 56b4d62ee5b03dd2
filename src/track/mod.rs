mod algorithm;
mod backend;
mod backends;
mod bank;
mod registry;

pub use algorithm::TrackerAlgorithm;
pub use backend::{ObjectTracker, TrackUpdate};
pub use backends::{StaticTracker, TemplateParams, TemplateTracker};
pub use bank::{MultiTracker, TrackerBank};
pub use registry::{TrackerFactory, TrackerRegistry};
