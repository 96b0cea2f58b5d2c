//! Feature computers and their registry

use super::context::WindowContext;
use super::{activity, beacon, connection, probe, signal};
use super::{FeatureId, FeatureSet};

/// One window feature
pub trait FeatureComputer: Send + Sync {
    /// Column this computer fills
    fn id(&self) -> FeatureId;

    /// Feature value; `NaN` when undefined
    fn compute(&self, ctx: &WindowContext<'_>) -> f64;
}

/// Feature that is a plain frame count
pub struct FrameCount {
    id: FeatureId,
    count: fn(&WindowContext<'_>) -> usize,
}

impl FrameCount {
    pub fn new(id: FeatureId, count: fn(&WindowContext<'_>) -> usize) -> Self {
        Self { id, count }
    }

    pub(crate) fn boxed(id: FeatureId, count: fn(&WindowContext<'_>) -> usize) -> Box<dyn FeatureComputer> {
        Box::new(Self::new(id, count))
    }
}

impl FeatureComputer for FrameCount {
    fn id(&self) -> FeatureId {
        self.id
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        (self.count)(ctx) as f64
    }
}

/// Ordered list of feature computers
pub struct FeatureRegistry {
    computers: Vec<Box<dyn FeatureComputer>>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self { computers: Vec::new() }
    }

    /// Registry with every built-in feature, in column order
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        for computer in signal::computers() {
            registry.register(computer);
        }
        for computer in activity::computers() {
            registry.register(computer);
        }
        for computer in probe::computers() {
            registry.register(computer);
        }
        for computer in beacon::computers() {
            registry.register(computer);
        }
        for computer in connection::computers() {
            registry.register(computer);
        }

        registry.computers.sort_by_key(|c| c.id().position());
        registry
    }

    /// Built-in registry restricted to `features`
    pub fn for_features(features: &FeatureSet) -> Self {
        let mut registry = Self::with_builtins();
        registry.computers.retain(|c| features.contains(c.id()));
        registry
    }

    pub fn register(&mut self, computer: Box<dyn FeatureComputer>) {
        self.computers.push(computer);
    }

    /// Evaluate every registered feature, in registry order.
    pub fn compute_all(&self, ctx: &WindowContext<'_>) -> Vec<(FeatureId, f64)> {
        self.computers
            .iter()
            .map(|c| (c.id(), c.compute(ctx)))
            .collect()
    }

    pub fn ids(&self) -> Vec<FeatureId> {
        self.computers.iter().map(|c| c.id()).collect()
    }

    pub fn get(&self, id: FeatureId) -> Option<&dyn FeatureComputer> {
        self.computers.iter().find(|c| c.id() == id).map(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.computers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.computers.is_empty()
    }
}

impl Default for FeatureRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
