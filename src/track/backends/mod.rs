pub mod stub;
pub mod template;

pub use stub::StaticTracker;
pub use template::{TemplateParams, TemplateTracker};
