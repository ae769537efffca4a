//! Hardware backend implementations.
//!
//! - [`simulation`] - Software arena for development and testing
//!
//! # Adding New Backends
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Provide a `fn(&ArenaConfig) -> Result<Backend, HalError>` factory
//! 3. Register it in [`register_builtin`]

pub mod simulation;

use crate::driver_registry::BackendRegistry;

/// Register all built-in backends.
pub fn register_builtin(registry: &mut BackendRegistry) {
    registry.register(simulation::NAME, simulation::create_backend);
}
