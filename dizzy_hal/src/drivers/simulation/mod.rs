//! Simulation backend.
//!
//! Runs the whole arena in software for development and testing without
//! the physical rig.

mod io;
mod world;

pub use io::{SimInputs, SimPwmBus, SimSpi};
pub use world::{SharedWorld, SimWorld};

use crate::mcp3008::Mcp3008;
use dizzy_common::config::ArenaConfig;
use dizzy_common::hal::driver::{Backend, HalError};

/// Backend name in the registry.
pub const NAME: &str = "simulation";

/// Open the simulation backend and keep a handle on its world.
pub fn open(config: &ArenaConfig) -> Result<(Backend, SharedWorld), HalError> {
    let world = SimWorld::new(config)?.into_shared();
    let backend = Backend {
        name: NAME,
        analog: Box::new(Mcp3008::new(SimSpi::new(world.clone()))),
        pwm: Box::new(SimPwmBus::new(world.clone())),
        inputs: Box::new(SimInputs::new(world.clone())),
    };
    Ok((backend, world))
}

/// Factory function to create a simulation backend.
pub fn create_backend(config: &ArenaConfig) -> Result<Backend, HalError> {
    open(config).map(|(backend, _)| backend)
}
