//! Servo actuation.
//!
//! - `ServoTiming` - Angle and speed to pulse-width conversion
//! - `ActuatorDriver` - Shared driver over one `PwmBus` with per-limb attack locks
//! - `AttackMacro` - Blocking swing/hold/retract/cooldown sequence
//! - `Actuation` - The non-blocking command seam used by the combat loop
//! - `ShutdownGuard` - Drives everything safe and disables outputs on drop

use dizzy_common::config::{ArenaConfig, AttackMacroConfig, ServoConfig};
use dizzy_common::consts::MAX_PWM_CHANNELS;
use dizzy_common::hal::driver::{HalError, PwmBus};
use dizzy_common::hal::types::LimbSide;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Largest commandable angle [deg].
pub const MAX_ANGLE_DEG: f64 = 180.0;

// ─── Timing ─────────────────────────────────────────────────────────

/// Pulse-width mapping shared by all servos.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServoTiming {
    /// Pulse at 0° [ms].
    pub min_pulse_ms: f64,
    /// Pulse at 180° [ms].
    pub max_pulse_ms: f64,
    /// Continuous servo stop pulse [ms].
    pub stop_pulse_ms: f64,
    /// Continuous servo offset at full speed [ms].
    pub span_ms: f64,
}

impl ServoTiming {
    /// Timing from the `[servo]` config section.
    pub fn from_config(config: &ServoConfig) -> Self {
        Self {
            min_pulse_ms: config.min_pulse_ms,
            max_pulse_ms: config.max_pulse_ms,
            stop_pulse_ms: config.stop_pulse_ms,
            span_ms: config.span_ms,
        }
    }

    /// Pulse for an angle, saturating at 0° and 180°.
    #[inline]
    pub fn angle_to_pulse(&self, angle_deg: f64) -> f64 {
        let angle = angle_deg.clamp(0.0, MAX_ANGLE_DEG);
        self.min_pulse_ms + (self.max_pulse_ms - self.min_pulse_ms) * angle / MAX_ANGLE_DEG
    }

    /// Pulse for a speed, saturating at ±1.
    #[inline]
    pub fn speed_to_pulse(&self, speed: f64) -> f64 {
        self.stop_pulse_ms + speed.clamp(-1.0, 1.0) * self.span_ms
    }
}

impl Default for ServoTiming {
    fn default() -> Self {
        Self::from_config(&ServoConfig::default())
    }
}

// ─── Actuator specs ─────────────────────────────────────────────────

/// What sits on an output channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActuatorKind {
    /// Positional servo driving a limb.
    Positional {
        /// Resting angle [deg].
        neutral_deg: f64,
    },
    /// Continuous-rotation servo driving a wheel.
    Continuous,
}

/// One actuator on one output channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorSpec {
    /// Output channel.
    pub channel: u8,
    /// Actuator kind.
    pub kind: ActuatorKind,
}

impl ActuatorSpec {
    /// Every actuator described by the arena config: two wheels and two
    /// limbs per fighter.
    pub fn from_arena(config: &ArenaConfig) -> Vec<ActuatorSpec> {
        config
            .fighters
            .iter()
            .flat_map(|f| {
                let wheels = [f.drive.left_wheel, f.drive.right_wheel].map(|channel| {
                    ActuatorSpec {
                        channel,
                        kind: ActuatorKind::Continuous,
                    }
                });
                let limbs = LimbSide::ALL.map(|side| {
                    let limb = f.limbs.get(side);
                    ActuatorSpec {
                        channel: limb.channel,
                        kind: ActuatorKind::Positional {
                            neutral_deg: limb.neutral_deg,
                        },
                    }
                });
                wheels.into_iter().chain(limbs)
            })
            .collect()
    }
}

// ─── Attack macro ───────────────────────────────────────────────────

/// Swing to `neutral + swing_deg`, hold, retract, then keep the limb
/// locked for `cooldown`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackMacro {
    swing_deg: f64,
    hold: Duration,
    cooldown: Duration,
}

impl AttackMacro {
    /// Validate and build a macro.
    ///
    /// # Errors
    /// `HalError::ConfigError` if `swing_deg` is not finite.
    pub fn new(swing_deg: f64, hold: Duration, cooldown: Duration) -> Result<Self, HalError> {
        if !swing_deg.is_finite() {
            return Err(HalError::ConfigError(format!(
                "attack swing must be finite, got {swing_deg}"
            )));
        }
        Ok(Self {
            swing_deg,
            hold,
            cooldown,
        })
    }

    /// Macro from the `[attack_macro]` config section.
    pub fn from_config(config: &AttackMacroConfig) -> Result<Self, HalError> {
        Self::new(
            config.swing_deg,
            Duration::from_millis(config.hold_ms),
            Duration::from_millis(config.cooldown_ms),
        )
    }

    /// Total time the limb lock is held.
    pub fn lock_time(&self) -> Duration {
        self.hold + self.cooldown
    }
}

// ─── Actuation seam ─────────────────────────────────────────────────

/// Non-blocking actuator commands issued from the combat loop.
pub trait Actuation: Send + Sync {
    /// Command a limb to an angle (saturating).
    fn set_angle(&self, channel: u8, angle_deg: f64) -> Result<(), HalError>;

    /// Command a limb to its resting angle.
    fn neutral(&self, channel: u8) -> Result<(), HalError>;

    /// Command a wheel speed in `[-1, 1]` (saturating).
    fn set_speed(&self, channel: u8, speed: f64) -> Result<(), HalError>;

    /// Stop a wheel.
    fn stop(&self, channel: u8) -> Result<(), HalError>;

    /// Every limb to neutral, every wheel stopped; outputs stay enabled.
    fn park(&self) -> Result<(), HalError>;
}

// ─── Driver ─────────────────────────────────────────────────────────

#[derive(Debug)]
struct Actuator {
    kind: ActuatorKind,
    attack_lock: Mutex<()>,
}

/// Servo driver shared between the combat loop and any macro callers.
///
/// All methods take `&self`; the bus sits behind a mutex and each
/// positional actuator has its own attack lock.
pub struct ActuatorDriver {
    pwm: Mutex<Box<dyn PwmBus>>,
    timing: ServoTiming,
    actuators: BTreeMap<u8, Actuator>,
    shut_down: AtomicBool,
}

impl ActuatorDriver {
    /// Create a driver for the given actuators.
    ///
    /// # Errors
    /// `HalError::ConfigError` for a duplicate or out-of-range channel, or
    /// a non-finite neutral angle.
    pub fn new(
        pwm: Box<dyn PwmBus>,
        timing: ServoTiming,
        specs: impl IntoIterator<Item = ActuatorSpec>,
    ) -> Result<Self, HalError> {
        let mut actuators = BTreeMap::new();
        for spec in specs {
            if spec.channel as usize >= MAX_PWM_CHANNELS {
                return Err(HalError::ConfigError(format!(
                    "servo channel {} out of range (0..{MAX_PWM_CHANNELS})",
                    spec.channel
                )));
            }
            if let ActuatorKind::Positional { neutral_deg } = spec.kind
                && !neutral_deg.is_finite()
            {
                return Err(HalError::ConfigError(format!(
                    "servo channel {} has a non-finite neutral angle",
                    spec.channel
                )));
            }
            let actuator = Actuator {
                kind: spec.kind,
                attack_lock: Mutex::new(()),
            };
            if actuators.insert(spec.channel, actuator).is_some() {
                return Err(HalError::ConfigError(format!(
                    "servo channel {} configured twice",
                    spec.channel
                )));
            }
        }
        Ok(Self {
            pwm: Mutex::new(pwm),
            timing,
            actuators,
            shut_down: AtomicBool::new(false),
        })
    }

    /// Create a driver for every actuator in the arena config.
    pub fn from_arena(pwm: Box<dyn PwmBus>, config: &ArenaConfig) -> Result<Self, HalError> {
        Self::new(
            pwm,
            ServoTiming::from_config(&config.servo),
            ActuatorSpec::from_arena(config),
        )
    }

    /// Pulse timing in use.
    pub fn timing(&self) -> &ServoTiming {
        &self.timing
    }

    /// Configured output channels, ascending.
    pub fn channels(&self) -> impl Iterator<Item = u8> + '_ {
        self.actuators.keys().copied()
    }

    /// Whether `shutdown()` has run.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn actuator(&self, channel: u8) -> Result<&Actuator, HalError> {
        self.actuators
            .get(&channel)
            .ok_or_else(|| HalError::ConfigError(format!("no actuator on servo channel {channel}")))
    }

    fn positional(&self, channel: u8) -> Result<(&Actuator, f64), HalError> {
        let actuator = self.actuator(channel)?;
        match actuator.kind {
            ActuatorKind::Positional { neutral_deg } => Ok((actuator, neutral_deg)),
            ActuatorKind::Continuous => Err(HalError::ConfigError(format!(
                "servo channel {channel} is a wheel, not a limb"
            ))),
        }
    }

    fn continuous(&self, channel: u8) -> Result<(), HalError> {
        match self.actuator(channel)?.kind {
            ActuatorKind::Continuous => Ok(()),
            ActuatorKind::Positional { .. } => Err(HalError::ConfigError(format!(
                "servo channel {channel} is a limb, not a wheel"
            ))),
        }
    }

    fn write(&self, channel: u8, pulse_ms: f64) -> Result<(), HalError> {
        self.pwm.lock().set_pulse_ms(channel, pulse_ms)
    }

    /// Move a limb to `angle_deg`, clamped to `[0, 180]`.
    pub fn goto(&self, channel: u8, angle_deg: f64) -> Result<(), HalError> {
        self.positional(channel)?;
        if angle_deg.is_nan() {
            return Err(HalError::ConfigError(format!(
                "servo channel {channel}: angle is NaN"
            )));
        }
        self.write(channel, self.timing.angle_to_pulse(angle_deg))
    }

    /// Run a wheel at `speed`, clamped to `[-1, 1]`.
    pub fn run(&self, channel: u8, speed: f64) -> Result<(), HalError> {
        self.continuous(channel)?;
        if speed.is_nan() {
            return Err(HalError::ConfigError(format!(
                "servo channel {channel}: speed is NaN"
            )));
        }
        self.write(channel, self.timing.speed_to_pulse(speed))
    }

    /// Run the attack macro on one limb. Blocks for the macro's lock time
    /// plus any wait for a macro already running on the same limb.
    pub fn attack(&self, channel: u8, attack: &AttackMacro) -> Result<(), HalError> {
        let (actuator, neutral_deg) = self.positional(channel)?;
        let _limb = actuator.attack_lock.lock();
        debug!("Attack macro on servo channel {}", channel);

        self.goto(channel, neutral_deg + attack.swing_deg)?;
        std::thread::sleep(attack.hold);
        self.goto(channel, neutral_deg)?;
        std::thread::sleep(attack.cooldown);
        Ok(())
    }

    /// Run a wheel at `speed` for `duration`, then stop it. Blocking.
    pub fn burst(&self, channel: u8, speed: f64, duration: Duration) -> Result<(), HalError> {
        self.run(channel, speed)?;
        std::thread::sleep(duration);
        self.run(channel, 0.0)
    }

    fn park_all(&self) -> Result<(), HalError> {
        let mut first_err = None;
        for (&channel, actuator) in &self.actuators {
            let pulse = match actuator.kind {
                ActuatorKind::Positional { neutral_deg } => self.timing.angle_to_pulse(neutral_deg),
                ActuatorKind::Continuous => self.timing.stop_pulse_ms,
            };
            if let Err(e) = self.write(channel, pulse) {
                warn!("Failed to park servo channel {}: {}", channel, e);
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Force the safe pose on every channel, then disable all outputs.
    ///
    /// Idempotent. Every channel is attempted; the first error is returned.
    pub fn shutdown(&self) -> Result<(), HalError> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Shutting down {} servo channels", self.actuators.len());

        let parked = self.park_all();
        let mut first_err = parked.err();
        let mut pwm = self.pwm.lock();
        for &channel in self.actuators.keys() {
            if let Err(e) = pwm.disable(channel) {
                warn!("Failed to disable servo channel {}: {}", channel, e);
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl Actuation for ActuatorDriver {
    fn set_angle(&self, channel: u8, angle_deg: f64) -> Result<(), HalError> {
        self.goto(channel, angle_deg)
    }

    fn neutral(&self, channel: u8) -> Result<(), HalError> {
        let (_, neutral_deg) = self.positional(channel)?;
        self.goto(channel, neutral_deg)
    }

    fn set_speed(&self, channel: u8, speed: f64) -> Result<(), HalError> {
        self.run(channel, speed)
    }

    fn stop(&self, channel: u8) -> Result<(), HalError> {
        self.run(channel, 0.0)
    }

    fn park(&self) -> Result<(), HalError> {
        self.park_all()
    }
}

impl std::fmt::Debug for ActuatorDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActuatorDriver")
            .field("channels", &self.actuators.keys().collect::<Vec<_>>())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// Calls [`ActuatorDriver::shutdown`] when dropped.
#[derive(Debug)]
pub struct ShutdownGuard {
    driver: Arc<ActuatorDriver>,
}

impl ShutdownGuard {
    /// Guard a shared driver.
    pub fn new(driver: Arc<ActuatorDriver>) -> Self {
        Self { driver }
    }

    /// The guarded driver.
    pub fn driver(&self) -> &Arc<ActuatorDriver> {
        &self.driver
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        if let Err(e) = self.driver.shutdown() {
            warn!("Actuator shutdown incomplete: {}", e);
        }
    }
}
