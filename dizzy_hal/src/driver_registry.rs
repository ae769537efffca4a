//! Backend registry.
//!
//! Provides a `BackendRegistry` struct for registering and retrieving
//! backend factories. Constructed at startup and passed by value; there is
//! no global registry.

use crate::drivers;
use dizzy_common::config::ArenaConfig;
use dizzy_common::hal::driver::{Backend, BackendFactory, HalError};
use std::collections::HashMap;
use tracing::info;

/// Registry of available hardware backends.
pub struct BackendRegistry {
    factories: HashMap<&'static str, BackendFactory>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in backend.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        drivers::register_builtin(&mut registry);
        registry
    }

    /// Register a backend factory.
    ///
    /// # Panics
    /// Panics if a backend with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: BackendFactory) {
        if self.factories.contains_key(name) {
            panic!("Backend '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a backend factory by name.
    pub fn get_factory(&self, name: &str) -> Option<BackendFactory> {
        self.factories.get(name).copied()
    }

    /// Open a backend by name.
    ///
    /// # Errors
    /// `HalError::BackendNotFound` if no backend with the given name is
    /// registered, or the factory's own error.
    pub fn create(&self, name: &str, config: &ArenaConfig) -> Result<Backend, HalError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| HalError::BackendNotFound(name.to_string()))?;
        let backend = factory(config)?;
        info!("Opened backend '{}'", backend.name);
        Ok(backend)
    }

    /// All registered backend names, sorted.
    pub fn list(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
