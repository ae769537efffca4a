//! Configuration loading traits and types.
//!
//! This module provides the TOML configuration of the arena: one file with
//! a `[shared]` section, one section per subsystem and exactly two
//! `[[fighters]]` tables.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dizzy_common::config::{load_arena_config, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = load_arena_config(Path::new("config/arena.toml"))?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use crate::consts::{
    ATTACK_DURATION_MS, COMBAT_LOOP_HZ, DAMAGE_DIVISOR, DEFAULT_BASELINE_ALPHA,
    DEFAULT_EVENT_QUEUE_LEN, DEFAULT_HIT_DEBOUNCE_MS, DEFAULT_HIT_THRESHOLD, DEFAULT_SAMPLE_HZ,
    HIT_COOLDOWN_MS, MAX_ADC_CHANNELS, MAX_DAMAGE, MAX_PWM_CHANNELS, MIN_DAMAGE, SERVO_PWM_HZ,
    STARTING_HP,
};
use crate::hal::types::{Facing, LimbSide};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Error type for configuration loading operations.
///
/// This enum represents all possible errors that can occur when loading
/// configuration files.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Common configuration fields.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "arena-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            service_name: "dizzy-fc".to_string(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// Blanket-implemented for every `serde::de::DeserializeOwned` type.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── Defaults ───────────────────────────────────────────────────────

fn default_channels() -> Vec<u8> {
    vec![0, 1, 2, 3]
}
fn default_sample_hz() -> f64 {
    DEFAULT_SAMPLE_HZ
}
fn default_threshold() -> u16 {
    DEFAULT_HIT_THRESHOLD
}
fn default_debounce_ms() -> u64 {
    DEFAULT_HIT_DEBOUNCE_MS
}
fn default_queue_len() -> usize {
    DEFAULT_EVENT_QUEUE_LEN
}
fn default_alpha() -> f64 {
    DEFAULT_BASELINE_ALPHA
}
fn default_divisor() -> f64 {
    DAMAGE_DIVISOR
}
fn default_min_damage() -> f64 {
    MIN_DAMAGE
}
fn default_max_damage() -> f64 {
    MAX_DAMAGE
}
fn default_pwm_hz() -> f64 {
    SERVO_PWM_HZ
}
fn default_min_pulse() -> f64 {
    1.0
}
fn default_max_pulse() -> f64 {
    2.0
}
fn default_stop_pulse() -> f64 {
    1.5
}
fn default_span() -> f64 {
    0.40
}
fn default_swing_deg() -> f64 {
    90.0
}
fn default_hold_ms() -> u64 {
    200
}
fn default_macro_cooldown_ms() -> u64 {
    500
}
fn default_starting_hp() -> u32 {
    STARTING_HP
}
fn default_loop_hz() -> u32 {
    COMBAT_LOOP_HZ
}
fn default_attack_ms() -> u64 {
    ATTACK_DURATION_MS
}
fn default_hit_cooldown_ms() -> u64 {
    HIT_COOLDOWN_MS
}
fn default_drive_speed() -> f64 {
    1.0
}
fn default_events_per_tick() -> usize {
    16
}
fn default_countdown_s() -> u32 {
    3
}
fn default_start_poll_ms() -> u64 {
    50
}
fn default_self_motion_ms() -> u64 {
    200
}
fn default_boost_extra() -> u16 {
    150
}
fn default_resting_level() -> u16 {
    40
}
fn default_impact_level() -> u16 {
    700
}
fn default_reach_ms() -> u64 {
    60
}
fn default_impact_ms() -> u64 {
    30
}
fn default_true() -> bool {
    true
}
fn default_attack_period_ms() -> u64 {
    450
}
fn default_press_ms() -> u64 {
    40
}

/// Prototype damage curve: raw force bands 20/200/400/600/800 → 3..7 hp.
fn default_damage_curve() -> Vec<DamageStepConfig> {
    [(20.0, 3), (200.0, 4), (400.0, 5), (600.0, 6), (800.0, 7)]
        .into_iter()
        .map(|(min_signal, damage)| DamageStepConfig { min_signal, damage })
        .collect()
}

// ─── Sections ───────────────────────────────────────────────────────

/// `[sampler]`: force sensor sampling and hit detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplerConfig {
    /// Analog channels to sample.
    #[serde(default = "default_channels")]
    pub channels: Vec<u8>,
    /// Sampling rate [Hz].
    #[serde(default = "default_sample_hz")]
    pub sample_hz: f64,
    /// Base detection threshold on the filtered signal [ADC counts].
    #[serde(default = "default_threshold")]
    pub threshold: u16,
    /// Minimum spacing between hits on one channel [ms].
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Pending event capacity; the oldest event is dropped when full.
    #[serde(default = "default_queue_len")]
    pub queue_len: usize,
    /// Baseline filter smoothing factor, `0 <= alpha < 1`.
    #[serde(default = "default_alpha")]
    pub baseline_alpha: f64,
    /// Divisor of the linear damage ramp.
    #[serde(default = "default_divisor")]
    pub damage_divisor: f64,
    /// Lower clamp of event damage.
    #[serde(default = "default_min_damage")]
    pub min_damage: f64,
    /// Upper clamp of event damage.
    #[serde(default = "default_max_damage")]
    pub max_damage: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            channels: default_channels(),
            sample_hz: default_sample_hz(),
            threshold: default_threshold(),
            debounce_ms: default_debounce_ms(),
            queue_len: default_queue_len(),
            baseline_alpha: default_alpha(),
            damage_divisor: default_divisor(),
            min_damage: default_min_damage(),
            max_damage: default_max_damage(),
        }
    }
}

impl SamplerConfig {
    /// Target tick period.
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.sample_hz)
    }

    /// Per-channel debounce window.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.channels.is_empty() {
            return invalid("sampler.channels must contain at least one channel");
        }
        let mut seen = HashSet::new();
        for &ch in &self.channels {
            if ch as usize >= MAX_ADC_CHANNELS {
                return invalid(format!(
                    "sampler channel {ch} out of range (0..{MAX_ADC_CHANNELS})"
                ));
            }
            if !seen.insert(ch) {
                return invalid(format!("sampler channel {ch} listed twice"));
            }
        }
        if !(self.sample_hz.is_finite() && self.sample_hz > 0.0) {
            return invalid("sampler.sample_hz must be positive");
        }
        if !(0.0..1.0).contains(&self.baseline_alpha) {
            return invalid(format!(
                "sampler.baseline_alpha must be in [0, 1), got {}",
                self.baseline_alpha
            ));
        }
        if self.queue_len == 0 {
            return invalid("sampler.queue_len must be greater than 0");
        }
        if !(self.damage_divisor > 0.0) {
            return invalid("sampler.damage_divisor must be positive");
        }
        if !(self.min_damage >= 0.0 && self.min_damage <= self.max_damage) {
            return invalid(format!(
                "sampler damage range invalid: min {} max {}",
                self.min_damage, self.max_damage
            ));
        }
        Ok(())
    }
}

/// `[servo]`: pulse timing shared by all servos.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServoConfig {
    /// Servo frame rate [Hz].
    #[serde(default = "default_pwm_hz")]
    pub pwm_hz: f64,
    /// Pulse at 0° [ms].
    #[serde(default = "default_min_pulse")]
    pub min_pulse_ms: f64,
    /// Pulse at 180° [ms].
    #[serde(default = "default_max_pulse")]
    pub max_pulse_ms: f64,
    /// Continuous servo stop pulse [ms].
    #[serde(default = "default_stop_pulse")]
    pub stop_pulse_ms: f64,
    /// Continuous servo pulse offset at full speed [ms].
    #[serde(default = "default_span")]
    pub span_ms: f64,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            pwm_hz: default_pwm_hz(),
            min_pulse_ms: default_min_pulse(),
            max_pulse_ms: default_max_pulse(),
            stop_pulse_ms: default_stop_pulse(),
            span_ms: default_span(),
        }
    }
}

impl ServoConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.pwm_hz > 0.0) {
            return invalid("servo.pwm_hz must be positive");
        }
        let frame_ms = 1000.0 / self.pwm_hz;
        if !(self.min_pulse_ms > 0.0 && self.min_pulse_ms < self.max_pulse_ms) {
            return invalid(format!(
                "servo pulse range invalid: {} .. {} ms",
                self.min_pulse_ms, self.max_pulse_ms
            ));
        }
        if self.max_pulse_ms >= frame_ms {
            return invalid(format!(
                "servo.max_pulse_ms {} does not fit a {frame_ms:.1} ms frame",
                self.max_pulse_ms
            ));
        }
        if !(self.span_ms >= 0.0 && self.stop_pulse_ms - self.span_ms > 0.0) {
            return invalid("servo stop/span produce a non-positive pulse");
        }
        if self.stop_pulse_ms + self.span_ms >= frame_ms {
            return invalid("servo stop/span exceed the frame");
        }
        Ok(())
    }
}

/// `[attack_macro]`: the blocking swing/hold/retract/cooldown macro.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttackMacroConfig {
    /// Swing offset from neutral [deg].
    #[serde(default = "default_swing_deg")]
    pub swing_deg: f64,
    /// Time at the swung position [ms].
    #[serde(default = "default_hold_ms")]
    pub hold_ms: u64,
    /// Extra time the limb lock stays held after retracting [ms].
    #[serde(default = "default_macro_cooldown_ms")]
    pub cooldown_ms: u64,
}

impl Default for AttackMacroConfig {
    fn default() -> Self {
        Self {
            swing_deg: default_swing_deg(),
            hold_ms: default_hold_ms(),
            cooldown_ms: default_macro_cooldown_ms(),
        }
    }
}

/// One step of the engine's damage curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DamageStepConfig {
    /// Smallest aggregate signal that earns `damage`.
    pub min_signal: f64,
    /// Damage applied for aggregates at or above `min_signal`.
    pub damage: u32,
}

/// How the engine gates a fighter's own sensors while its limb moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateMode {
    /// Suppress hit detection entirely.
    #[default]
    Mask,
    /// Raise the detection threshold by `extra`.
    Boost,
    /// No gating.
    Off,
}

/// `[combat.self_motion]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelfMotionConfig {
    /// Gating mode.
    #[serde(default)]
    pub mode: GateMode,
    /// Gate length from swing start [ms].
    #[serde(default = "default_self_motion_ms")]
    pub duration_ms: u64,
    /// Threshold boost for `mode = "boost"` [ADC counts].
    #[serde(default = "default_boost_extra")]
    pub extra: u16,
}

impl Default for SelfMotionConfig {
    fn default() -> Self {
        Self {
            mode: GateMode::default(),
            duration_ms: default_self_motion_ms(),
            extra: default_boost_extra(),
        }
    }
}

/// `[combat]`: round rules and loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CombatConfig {
    /// Hit points at round start.
    #[serde(default = "default_starting_hp")]
    pub starting_hp: u32,
    /// Loop rate [Hz].
    #[serde(default = "default_loop_hz")]
    pub loop_hz: u32,
    /// Time a limb stays extended [ms].
    #[serde(default = "default_attack_ms")]
    pub attack_duration_ms: u64,
    /// Retracted time before the limb may fire again [ms].
    #[serde(default)]
    pub recovery_ms: u64,
    /// Player-level spacing between scored hits [ms].
    #[serde(default = "default_hit_cooldown_ms")]
    pub hit_cooldown_ms: u64,
    /// Wheel speed for drive commands, `0 < speed <= 1`.
    #[serde(default = "default_drive_speed")]
    pub drive_speed: f64,
    /// Maximum sampler events drained per tick.
    #[serde(default = "default_events_per_tick")]
    pub events_per_tick: usize,
    /// Pre-round countdown [s].
    #[serde(default = "default_countdown_s")]
    pub countdown_s: u32,
    /// Start-button polling interval [ms].
    #[serde(default = "default_start_poll_ms")]
    pub start_poll_ms: u64,
    /// Step function from aggregate signal to damage.
    #[serde(default = "default_damage_curve")]
    pub damage_curve: Vec<DamageStepConfig>,
    /// Self-motion sensor gating.
    #[serde(default)]
    pub self_motion: SelfMotionConfig,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            starting_hp: default_starting_hp(),
            loop_hz: default_loop_hz(),
            attack_duration_ms: default_attack_ms(),
            recovery_ms: 0,
            hit_cooldown_ms: default_hit_cooldown_ms(),
            drive_speed: default_drive_speed(),
            events_per_tick: default_events_per_tick(),
            countdown_s: default_countdown_s(),
            start_poll_ms: default_start_poll_ms(),
            damage_curve: default_damage_curve(),
            self_motion: SelfMotionConfig::default(),
        }
    }
}

impl CombatConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.starting_hp == 0 {
            return invalid("combat.starting_hp must be greater than 0");
        }
        if self.loop_hz == 0 {
            return invalid("combat.loop_hz must be greater than 0");
        }
        if self.attack_duration_ms == 0 {
            return invalid("combat.attack_duration_ms must be greater than 0");
        }
        if !(self.drive_speed > 0.0 && self.drive_speed <= 1.0) {
            return invalid("combat.drive_speed must be in (0, 1]");
        }
        if self.events_per_tick == 0 {
            return invalid("combat.events_per_tick must be greater than 0");
        }
        for pair in self.damage_curve.windows(2) {
            if !(pair[1].min_signal > pair[0].min_signal) {
                return invalid(format!(
                    "combat.damage_curve min_signal must increase ({} then {})",
                    pair[0].min_signal, pair[1].min_signal
                ));
            }
            if pair[1].damage < pair[0].damage {
                return invalid(format!(
                    "combat.damage_curve damage must not decrease ({} then {})",
                    pair[0].damage, pair[1].damage
                ));
            }
        }
        if self.damage_curve.iter().any(|s| !s.min_signal.is_finite()) {
            return invalid("combat.damage_curve min_signal must be finite");
        }
        Ok(())
    }
}

/// `[simulation]`: parameters of the software arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Sensor reading at rest.
    #[serde(default = "default_resting_level")]
    pub resting_level: u16,
    /// Sensor reading during a simulated impact.
    #[serde(default = "default_impact_level")]
    pub impact_level: u16,
    /// Delay from swing command to impact [ms].
    #[serde(default = "default_reach_ms")]
    pub reach_ms: u64,
    /// Length of a simulated impact [ms].
    #[serde(default = "default_impact_ms")]
    pub impact_ms: u64,
    /// Drive the controller inputs from a scripted opponent pair.
    #[serde(default = "default_true")]
    pub autoplay: bool,
    /// Autoplay: interval between attack presses per fighter [ms].
    #[serde(default = "default_attack_period_ms")]
    pub attack_period_ms: u64,
    /// Autoplay: how long each attack press is held [ms].
    #[serde(default = "default_press_ms")]
    pub press_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            resting_level: default_resting_level(),
            impact_level: default_impact_level(),
            reach_ms: default_reach_ms(),
            impact_ms: default_impact_ms(),
            autoplay: true,
            attack_period_ms: default_attack_period_ms(),
            press_ms: default_press_ms(),
        }
    }
}

/// Controller lines of one fighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputLines {
    /// Drive left.
    pub left: u8,
    /// Drive right.
    pub right: u8,
    /// Left limb attack.
    pub attack_left: u8,
    /// Right limb attack.
    pub attack_right: u8,
    /// Ready/start button.
    pub start: u8,
}

impl InputLines {
    /// Attack line of one limb.
    pub fn attack(&self, side: LimbSide) -> u8 {
        match side {
            LimbSide::Left => self.attack_left,
            LimbSide::Right => self.attack_right,
        }
    }

    fn all(&self) -> [u8; 5] {
        [
            self.left,
            self.right,
            self.attack_left,
            self.attack_right,
            self.start,
        ]
    }
}

/// Wheel servo channels of one fighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriveChannels {
    /// Left wheel continuous servo.
    pub left_wheel: u8,
    /// Right wheel continuous servo.
    pub right_wheel: u8,
}

/// One limb servo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimbConfig {
    /// Positional servo channel.
    pub channel: u8,
    /// Resting angle [deg].
    pub neutral_deg: f64,
    /// Extended (attack) angle [deg].
    pub attack_deg: f64,
}

/// Both limbs of one fighter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimbPair {
    /// Left limb.
    pub left: LimbConfig,
    /// Right limb.
    pub right: LimbConfig,
}

impl LimbPair {
    /// Limb config by side.
    pub fn get(&self, side: LimbSide) -> &LimbConfig {
        match side {
            LimbSide::Left => &self.left,
            LimbSide::Right => &self.right,
        }
    }
}

/// `[[fighters]]`: wiring and orientation of one fighter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FighterConfig {
    /// Display name.
    pub name: String,
    /// Rail orientation.
    #[serde(default)]
    pub facing: Facing,
    /// Sensor channels on this fighter's body (hits taken).
    pub sensor_channels: Vec<u8>,
    /// Controller lines.
    pub inputs: InputLines,
    /// Wheel servos.
    pub drive: DriveChannels,
    /// Limb servos.
    pub limbs: LimbPair,
}

impl FighterConfig {
    fn pwm_channels(&self) -> [u8; 4] {
        [
            self.drive.left_wheel,
            self.drive.right_wheel,
            self.limbs.left.channel,
            self.limbs.right.channel,
        ]
    }
}

/// Complete arena configuration loaded from `arena.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArenaConfig {
    /// Shared service settings.
    #[serde(default)]
    pub shared: SharedConfig,
    /// Sensor sampler.
    #[serde(default)]
    pub sampler: SamplerConfig,
    /// Servo timing.
    #[serde(default)]
    pub servo: ServoConfig,
    /// Blocking attack macro.
    #[serde(default)]
    pub attack_macro: AttackMacroConfig,
    /// Round rules.
    #[serde(default)]
    pub combat: CombatConfig,
    /// Simulation backend.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Exactly two fighters, Player 1 first.
    pub fighters: Vec<FighterConfig>,
}

impl ArenaConfig {
    /// Prototype arena wiring: two sensors per fighter, servo channels 0-7.
    pub fn prototype() -> Self {
        let limb = |channel, neutral_deg| LimbConfig {
            channel,
            neutral_deg,
            attack_deg: 90.0,
        };
        Self {
            shared: SharedConfig::default(),
            sampler: SamplerConfig::default(),
            servo: ServoConfig::default(),
            attack_macro: AttackMacroConfig::default(),
            combat: CombatConfig::default(),
            simulation: SimulationConfig::default(),
            fighters: vec![
                FighterConfig {
                    name: "Player 1".to_string(),
                    facing: Facing::Right,
                    sensor_channels: vec![0, 1],
                    inputs: InputLines {
                        left: 17,
                        right: 27,
                        attack_left: 22,
                        attack_right: 23,
                        start: 16,
                    },
                    drive: DriveChannels {
                        left_wheel: 0,
                        right_wheel: 1,
                    },
                    limbs: LimbPair {
                        left: limb(2, 180.0),
                        right: limb(3, 0.0),
                    },
                },
                FighterConfig {
                    name: "Player 2".to_string(),
                    facing: Facing::Left,
                    sensor_channels: vec![2, 3],
                    inputs: InputLines {
                        left: 24,
                        right: 25,
                        attack_left: 5,
                        attack_right: 6,
                        start: 26,
                    },
                    drive: DriveChannels {
                        left_wheel: 4,
                        right_wheel: 5,
                    },
                    limbs: LimbPair {
                        left: limb(6, 0.0),
                        right: limb(7, 180.0),
                    },
                },
            ],
        }
    }

    /// Validate the arena configuration.
    ///
    /// # Validation Rules
    /// 1. Section rules (sampler, servo, combat)
    /// 2. Exactly two fighters with non-empty names
    /// 3. Fighter sensor channels non-empty, sampled, not shared
    /// 4. PWM channels unique and `< MAX_PWM_CHANNELS`
    /// 5. Input lines unique
    /// 6. Limb angles within 0..=180
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.sampler.validate()?;
        self.servo.validate()?;
        self.combat.validate()?;

        if !self.attack_macro.swing_deg.is_finite() {
            return invalid("attack_macro.swing_deg must be finite");
        }

        if self.fighters.len() != 2 {
            return invalid(format!(
                "exactly 2 fighters required, got {}",
                self.fighters.len()
            ));
        }

        let mut sensors = HashSet::new();
        let mut pwm = HashSet::new();
        let mut lines = HashSet::new();

        for fighter in &self.fighters {
            if fighter.name.is_empty() {
                return invalid("fighter name cannot be empty");
            }
            if fighter.sensor_channels.is_empty() {
                return invalid(format!("fighter '{}' has no sensor channels", fighter.name));
            }
            for &ch in &fighter.sensor_channels {
                if !self.sampler.channels.contains(&ch) {
                    return invalid(format!(
                        "fighter '{}' sensor channel {ch} is not sampled",
                        fighter.name
                    ));
                }
                if !sensors.insert(ch) {
                    return invalid(format!("sensor channel {ch} assigned twice"));
                }
            }
            for ch in fighter.pwm_channels() {
                if ch as usize >= MAX_PWM_CHANNELS {
                    return invalid(format!(
                        "fighter '{}' servo channel {ch} out of range (0..{MAX_PWM_CHANNELS})",
                        fighter.name
                    ));
                }
                if !pwm.insert(ch) {
                    return invalid(format!("servo channel {ch} assigned twice"));
                }
            }
            for line in fighter.inputs.all() {
                if !lines.insert(line) {
                    return invalid(format!("input line {line} assigned twice"));
                }
            }
            for side in LimbSide::ALL {
                let limb = fighter.limbs.get(side);
                for angle in [limb.neutral_deg, limb.attack_deg] {
                    if !(0.0..=180.0).contains(&angle) {
                        return invalid(format!(
                            "fighter '{}' {side:?} limb angle {angle} outside 0..=180",
                            fighter.name
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}

fn invalid<T>(msg: impl Into<String>) -> Result<T, ConfigError> {
    Err(ConfigError::ValidationError(msg.into()))
}

/// Load and validate an arena configuration file.
pub fn load_arena_config(path: &Path) -> Result<ArenaConfig, ConfigError> {
    let config = ArenaConfig::load(path)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_log_level_deserialization() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct TestWrapper {
            level: LogLevel,
        }

        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"trace\"")
                .unwrap()
                .level,
            LogLevel::Trace
        );
        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"warn\"")
                .unwrap()
                .level,
            LogLevel::Warn
        );
    }

    #[test]
    fn test_log_level_maps_to_tracing() {
        assert_eq!(tracing::Level::from(LogLevel::Debug), tracing::Level::DEBUG);
        assert_eq!(tracing::Level::from(LogLevel::Error), tracing::Level::ERROR);
    }

    #[test]
    fn test_shared_config_validation_empty_service_name() {
        let config = SharedConfig {
            log_level: LogLevel::Info,
            service_name: "".to_string(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_config_loader_file_not_found() {
        let result = ArenaConfig::load(Path::new("/nonexistent/path/arena.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn test_config_loader_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid toml {{{{").unwrap();

        let result = ArenaConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_prototype_is_valid() {
        ArenaConfig::prototype().validate().unwrap();
    }

    #[test]
    fn test_sampler_defaults_match_prototype() {
        let sampler = SamplerConfig::default();
        assert_eq!(sampler.threshold, 100);
        assert_eq!(sampler.debounce(), Duration::from_millis(100));
        assert_eq!(sampler.period(), Duration::from_millis(10));
        assert_eq!(sampler.queue_len, 128);
    }

    #[test]
    fn test_empty_channel_set_rejected() {
        let mut config = ArenaConfig::prototype();
        config.sampler.channels.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at least one channel"));
    }

    #[test]
    fn test_out_of_range_channel_rejected() {
        let mut config = ArenaConfig::prototype();
        config.sampler.channels.push(8);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_unsampled_fighter_channel_rejected() {
        let mut config = ArenaConfig::prototype();
        config.sampler.channels = vec![0, 1, 2];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("not sampled"));
    }

    #[test]
    fn test_alpha_must_be_below_one() {
        let mut config = ArenaConfig::prototype();
        config.sampler.baseline_alpha = 1.0;
        assert!(config.validate().is_err());
        config.sampler.baseline_alpha = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_servo_channel_rejected() {
        let mut config = ArenaConfig::prototype();
        config.fighters[1].drive.left_wheel = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("servo channel 0 assigned twice"));
    }

    #[test]
    fn test_duplicate_input_line_rejected() {
        let mut config = ArenaConfig::prototype();
        config.fighters[1].inputs.start = 16;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_decreasing_damage_curve_rejected() {
        let mut config = ArenaConfig::prototype();
        config.combat.damage_curve = vec![
            DamageStepConfig {
                min_signal: 100.0,
                damage: 5,
            },
            DamageStepConfig {
                min_signal: 200.0,
                damage: 4,
            },
        ];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_single_fighter_rejected() {
        let mut config = ArenaConfig::prototype();
        config.fighters.pop();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("exactly 2 fighters"));
    }

    #[test]
    fn test_limb_angle_range() {
        let mut config = ArenaConfig::prototype();
        config.fighters[0].limbs.right.attack_deg = 200.0;
        assert!(config.validate().is_err());
    }
}
