//! HAL driver traits and error types.
//!
//! This module defines:
//! - `HalError` enum - Error types for HAL operations
//! - `AnalogBus` trait - Force sensor converter access
//! - `PwmBus` trait - Servo pulse output
//! - `DigitalInputs` trait - Controller button levels
//! - `Backend` struct and `BackendFactory` type alias - A complete hardware set

use crate::config::ArenaConfig;
use thiserror::Error;

/// Error types for HAL operations.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Backend initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Hardware communication error
    #[error("Hardware communication error: {0}")]
    CommunicationError(String),

    /// Channel id outside the configured or supported set
    #[error("Invalid channel {channel}: {reason}")]
    InvalidChannel {
        /// Offending channel id
        channel: u8,
        /// Why it was rejected
        reason: String,
    },

    /// Backend not found
    #[error("Backend not found: {0}")]
    BackendNotFound(String),
}

impl HalError {
    /// Shorthand for an [`HalError::InvalidChannel`].
    pub fn invalid_channel(channel: u8, reason: impl Into<String>) -> Self {
        Self::InvalidChannel {
            channel,
            reason: reason.into(),
        }
    }
}

/// Analog converter carrying the force sensors.
///
/// `read_channel` is synchronous and may be slow; the sampler budgets it
/// inside its tick. A failed read only affects that channel for that tick.
pub trait AnalogBus: Send {
    /// Read one channel, returning a value in `0..=ADC_MAX`.
    fn read_channel(&mut self, channel: u8) -> Result<u16, HalError>;

    /// Release the underlying bus. Called once when sampling stops.
    fn release(&mut self) -> Result<(), HalError> {
        Ok(())
    }
}

/// Servo pulse output.
///
/// Pulse widths are in milliseconds at the servo frame rate (50 Hz).
pub trait PwmBus: Send {
    /// Set the pulse width on one output channel.
    fn set_pulse_ms(&mut self, channel: u8, pulse_ms: f64) -> Result<(), HalError>;

    /// Stop emitting pulses on one output channel.
    fn disable(&mut self, channel: u8) -> Result<(), HalError>;
}

/// Digital controller inputs, one boolean level per logical line.
///
/// Contact bounce is filtered below this abstraction.
pub trait DigitalInputs: Send {
    /// Whether the line is currently pressed.
    fn is_pressed(&mut self, line: u8) -> bool;
}

/// Complete hardware set produced by a backend factory.
pub struct Backend {
    /// Backend name (e.g. "simulation")
    pub name: &'static str,
    /// Force sensor converter
    pub analog: Box<dyn AnalogBus>,
    /// Servo outputs
    pub pwm: Box<dyn PwmBus>,
    /// Controller buttons
    pub inputs: Box<dyn DigitalInputs>,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").field("name", &self.name).finish()
    }
}

/// Factory function type for creating a backend from the arena config.
pub type BackendFactory = fn(&ArenaConfig) -> Result<Backend, HalError>;
