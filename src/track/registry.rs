use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use crate::detect::BoundingBox;
use crate::error::CounterError;
use crate::frame::Frame;

use super::algorithm::TrackerAlgorithm;
use super::backend::ObjectTracker;
use super::backends::{TemplateParams, TemplateTracker};
use super::bank::{MultiTracker, TrackerBank};

/// Builds a fresh, unseeded tracker.
pub type TrackerFactory = Arc<dyn Fn() -> Box<dyn ObjectTracker> + Send + Sync>;

/// Algorithm-keyed table of tracker constructors.
pub struct TrackerRegistry {
    factories: HashMap<TrackerAlgorithm, TrackerFactory>,
}

impl TrackerRegistry {
    /// Empty registry. Every algorithm must be registered before use.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the CPU template tracker behind every algorithm, tuned
    /// per algorithm by `TemplateParams::for_algorithm`.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for algorithm in TrackerAlgorithm::ALL {
            let params = TemplateParams::for_algorithm(algorithm);
            registry.register(algorithm, move || {
                Box::new(TemplateTracker::new(params)) as Box<dyn ObjectTracker>
            });
        }
        registry
    }

    /// Register (or replace) the constructor for `algorithm`.
    pub fn register<F>(&mut self, algorithm: TrackerAlgorithm, factory: F)
    where
        F: Fn() -> Box<dyn ObjectTracker> + Send + Sync + 'static,
    {
        self.factories.insert(algorithm, Arc::new(factory));
    }

    pub fn is_registered(&self, algorithm: TrackerAlgorithm) -> bool {
        self.factories.contains_key(&algorithm)
    }

    /// Registered algorithms, sorted.
    pub fn list(&self) -> Vec<TrackerAlgorithm> {
        let mut algorithms: Vec<_> = self.factories.keys().copied().collect();
        algorithms.sort();
        algorithms
    }

    /// Fail fast when `algorithm` has no constructor.
    pub fn ensure_supported(&self, algorithm: TrackerAlgorithm) -> Result<()> {
        if self.is_registered(algorithm) {
            Ok(())
        } else {
            Err(CounterError::UnknownTracker(algorithm.to_string()).into())
        }
    }

    /// Build an unseeded tracker for `algorithm`.
    pub fn create(&self, algorithm: TrackerAlgorithm) -> Result<Box<dyn ObjectTracker>> {
        let factory = self
            .factories
            .get(&algorithm)
            .ok_or_else(|| CounterError::UnknownTracker(algorithm.to_string()))?;
        Ok(factory())
    }
}

impl Default for TrackerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TrackerBank for TrackerRegistry {
    fn supports(&self, algorithm: TrackerAlgorithm) -> bool {
        self.is_registered(algorithm)
    }

    fn seed(
        &mut self,
        algorithm: TrackerAlgorithm,
        frame: &Frame,
        boxes: &[BoundingBox],
    ) -> Result<MultiTracker> {
        let mut set = MultiTracker::new();
        for bbox in boxes {
            let mut tracker = self.create(algorithm)?;
            tracker.init(frame, *bbox)?;
            set.add(tracker, *bbox);
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::backends::StaticTracker;

    #[test]
    fn builtin_covers_every_algorithm() -> Result<()> {
        let registry = TrackerRegistry::builtin();
        assert_eq!(registry.list().len(), TrackerAlgorithm::ALL.len());
        for algorithm in TrackerAlgorithm::ALL {
            registry.ensure_supported(algorithm)?;
            assert_eq!(registry.create(algorithm)?.name(), "template");
        }
        Ok(())
    }

    #[test]
    fn empty_registry_rejects_algorithm() {
        let registry = TrackerRegistry::new();
        let err = registry.ensure_supported(TrackerAlgorithm::Kcf).unwrap_err();
        let typed = err.downcast_ref::<CounterError>().expect("typed error");
        assert!(typed.is_configuration());
        assert!(registry.create(TrackerAlgorithm::Kcf).is_err());
    }

    #[test]
    fn register_replaces_factory() -> Result<()> {
        let mut registry = TrackerRegistry::builtin();
        registry.register(TrackerAlgorithm::Mosse, || Box::new(StaticTracker::new()));
        assert_eq!(registry.create(TrackerAlgorithm::Mosse)?.name(), "static");
        assert_eq!(registry.create(TrackerAlgorithm::Kcf)?.name(), "template");
        Ok(())
    }

    #[test]
    fn seed_creates_one_tracker_per_box() -> Result<()> {
        let mut registry = TrackerRegistry::new();
        registry.register(TrackerAlgorithm::Csrt, || Box::new(StaticTracker::new()));
        let frame = Frame::blank(1, 16, 16);
        let boxes = [
            BoundingBox::new(0.0, 0.0, 4.0, 4.0),
            BoundingBox::new(8.0, 8.0, 4.0, 4.0),
        ];
        let mut set = registry.seed(TrackerAlgorithm::Csrt, &frame, &boxes)?;
        assert_eq!(set.len(), 2);

        let updates = registry.update(&mut set, &Frame::blank(2, 16, 16))?;
        let got: Vec<_> = updates.iter().map(|u| u.bbox).collect();
        assert_eq!(got, boxes);

        let none = registry.seed(TrackerAlgorithm::Csrt, &frame, &[])?;
        assert!(none.is_empty());
        Ok(())
    }
}
