//! Registry resolving stage names to stage instances.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{
    CapitalizeStage, JoinStringsStage, LowercaseStage, Stage, StringsToUpperStage, UppercaseStage,
};
use crate::errors::{Result, RouteSlipError};

/// Thread-safe map from stage name to stage.
#[derive(Default)]
pub struct StageRegistry {
    stages: RwLock<HashMap<String, Arc<dyn Stage>>>,
}

impl fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageRegistry")
            .field("stages", &self.names())
            .finish()
    }
}

impl StageRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in stage.
    #[must_use]
    pub fn with_builtin_stages() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(UppercaseStage));
        registry.register(Arc::new(LowercaseStage));
        registry.register(Arc::new(CapitalizeStage));
        registry.register(Arc::new(JoinStringsStage));
        registry.register(Arc::new(StringsToUpperStage));
        registry
    }

    /// Registers a stage under its own name, returning any stage it replaced.
    pub fn register(&self, stage: Arc<dyn Stage>) -> Option<Arc<dyn Stage>> {
        self.stages.write().insert(stage.name().to_string(), stage)
    }

    /// Resolves a stage by name.
    ///
    /// # Errors
    ///
    /// Returns `RouteSlipError::UnknownStage` if nothing is registered under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Stage>> {
        self.stages
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RouteSlipError::unknown_stage(name))
    }

    /// Returns true if a stage is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.stages.read().contains_key(name)
    }

    /// Returns the registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stages.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.read().len()
    }

    /// Returns true if no stages are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.read().is_empty()
    }
}
