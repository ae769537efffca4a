//! # DiZzy FC HAL Library
//!
//! Sensor sampling, servo actuation and pluggable hardware backends.
//! Backends implement the bus traits defined in `dizzy_common::hal::driver`.
//!
//! # Module Structure
//!
//! - [`filter`] - Baseline filter and linear damage ramp
//! - [`sampler`] - Fixed-rate background sensor sampler
//! - [`actuator`] - Servo driver, attack macro, shutdown guard
//! - [`mcp3008`] - MCP3008 frame codec over an SPI transfer seam
//! - [`driver_registry`] - Backend factory registration
//! - [`drivers`] - Backend implementations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          dizzy_hal                               │
//! │  ┌──────────────┐   ┌───────────────┐   ┌─────────────────────┐  │
//! │  │ SensorSampler│   │ ActuatorDriver│   │  BackendRegistry    │  │
//! │  │ (own thread) │   │ (Arc, &self)  │   │                     │  │
//! │  └──────┬───────┘   └──────┬────────┘   └──────────┬──────────┘  │
//! │         │                  │                       │             │
//! │         ▼                  ▼                       ▼             │
//! │   AnalogBus           PwmBus               Backend { analog,     │
//! │                                              pwm, inputs }       │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod actuator;
pub mod driver_registry;
pub mod drivers;
pub mod filter;
pub mod mcp3008;
pub mod sampler;

// Re-export key types for convenience
pub use crate::actuator::{Actuation, ActuatorDriver, AttackMacro, ShutdownGuard};
pub use crate::driver_registry::BackendRegistry;
pub use crate::sampler::{HitSource, SamplerStats, SensorSampler};
