mod ground_truth;
mod result;
mod source;

pub use ground_truth::GroundTruthSource;
pub use result::BoundingBox;
pub use source::BoundingBoxSource;
