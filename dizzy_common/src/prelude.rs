//! Prelude module for common re-exports.
//!
//! `use dizzy_common::prelude::*;` brings in the configuration types,
//! the driver seams and the arena value types.

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ArenaConfig, CombatConfig, ConfigError, ConfigLoader, FighterConfig, GateMode,
    SamplerConfig, ServoConfig, SharedConfig, SimulationConfig, load_arena_config,
};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{ADC_MAX, MAX_ADC_CHANNELS, STARTING_HP};

// ─── HAL ────────────────────────────────────────────────────────────
pub use crate::hal::driver::{
    AnalogBus, Backend, BackendFactory, DigitalInputs, HalError, PwmBus,
};
pub use crate::hal::types::{Facing, HitEvent, LimbSide, PlayerId, RoundResult};
