//! Engine error type.

use dizzy_common::config::ConfigError;
use dizzy_common::hal::driver::HalError;
use thiserror::Error;

/// Errors raised while setting up or running rounds.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Hardware or backend failure.
    #[error(transparent)]
    Hal(#[from] HalError),

    /// Configuration file could not be loaded or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Combat settings are inconsistent.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_hal_error_transparently() {
        let err: EngineError = HalError::BackendNotFound("gpio".to_string()).into();
        assert_eq!(err.to_string(), "Backend not found: gpio");
    }

    #[test]
    fn invalid_settings_display() {
        let err = EngineError::InvalidSettings("loop_hz is 0".to_string());
        assert!(err.to_string().contains("loop_hz is 0"));
    }
}
