//! Simulated arena.
//!
//! The `SimWorld` manages:
//! - Servo pulses per output channel
//! - Linked impacts (a limb leaving neutral triggers a delayed spike on the opponent's sensor)
//! - Sensor readings (resting level, impact level, small deterministic ripple)
//! - Controller inputs, either manual or from the autoplay script

use crate::actuator::ServoTiming;
use dizzy_common::config::{ArenaConfig, InputLines, SimulationConfig};
use dizzy_common::consts::{ADC_MAX, MAX_ADC_CHANNELS, MAX_PWM_CHANNELS};
use dizzy_common::hal::driver::HalError;
use dizzy_common::hal::types::{Facing, LimbSide, PlayerId};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// A world shared by the simulation buses and test code.
pub type SharedWorld = Arc<Mutex<SimWorld>>;

/// Pulse deviation from neutral that counts as a limb leaving rest [ms].
const EXTEND_TOLERANCE_MS: f64 = 0.05;

/// Autoplay drive pattern segment length.
const DRIVE_SEGMENT: Duration = Duration::from_millis(700);

/// Reading noise added on top of the level, cycled per read.
const RIPPLE: [u16; 4] = [0, 3, 1, 4];

/// Limb servo tracked for linked impacts.
#[derive(Debug, Clone, Copy)]
struct SimLimb {
    channel: u8,
    owner: PlayerId,
    neutral_pulse_ms: f64,
    extended: bool,
}

/// Scheduled sensor spike.
#[derive(Debug, Clone, Copy)]
struct Impact {
    channel: u8,
    start: Instant,
    end: Instant,
}

/// Scripted controller pair.
#[derive(Debug, Clone)]
struct Autoplay {
    attack_period: Duration,
    press: Duration,
    lines: [InputLines; 2],
    facing: [Facing; 2],
}

impl Autoplay {
    fn is_pressed(&self, line: u8, since_epoch: Duration) -> bool {
        let period_ms = self.attack_period.as_millis().max(1);
        let t_ms = since_epoch.as_millis();

        for player in PlayerId::ALL {
            let i = player.index();
            let lines = &self.lines[i];
            if line == lines.start {
                return true;
            }

            // Fighters attack half a period apart, alternating limbs.
            let phase = t_ms + (i as u128) * period_ms / 2;
            if phase % period_ms < self.press.as_millis() {
                let side = if (phase / period_ms) % 2 == 0 {
                    LimbSide::Left
                } else {
                    LimbSide::Right
                };
                if line == lines.attack(side) {
                    return true;
                }
            }

            // Advance, hold, retreat.
            let segment = (t_ms / DRIVE_SEGMENT.as_millis() + i as u128) % 3;
            let (advance, retreat) = match self.facing[i] {
                Facing::Right => (lines.right, lines.left),
                Facing::Left => (lines.left, lines.right),
            };
            match segment {
                0 if line == advance => return true,
                2 if line == retreat => return true,
                _ => {}
            }
        }
        false
    }
}

#[derive(Debug, Clone)]
enum InputMode {
    Manual(HashSet<u8>),
    Autoplay(Autoplay),
}

/// Software model of the arena hardware.
#[derive(Debug)]
pub struct SimWorld {
    params: SimulationConfig,
    epoch: Instant,
    sensors: [Vec<u8>; 2],
    next_sensor: [usize; 2],
    limbs: Vec<SimLimb>,
    pulses: [Option<f64>; MAX_PWM_CHANNELS],
    impacts: Vec<Impact>,
    faults: [bool; MAX_ADC_CHANNELS],
    reads: u64,
    impacts_scheduled: u64,
    inputs: InputMode,
}

impl SimWorld {
    /// Build the world for an arena config.
    ///
    /// # Errors
    /// `HalError::ConfigError` unless the config has exactly two fighters.
    pub fn new(config: &ArenaConfig) -> Result<Self, HalError> {
        let [p1, p2] = config.fighters.as_slice() else {
            return Err(HalError::ConfigError(format!(
                "simulation needs exactly 2 fighters, got {}",
                config.fighters.len()
            )));
        };

        let timing = ServoTiming::from_config(&config.servo);
        let limbs: Vec<SimLimb> = [(PlayerId::One, p1), (PlayerId::Two, p2)]
            .into_iter()
            .flat_map(|(owner, fighter)| {
                LimbSide::ALL.map(|side| {
                    let limb = fighter.limbs.get(side);
                    SimLimb {
                        channel: limb.channel,
                        owner,
                        neutral_pulse_ms: timing.angle_to_pulse(limb.neutral_deg),
                        extended: false,
                    }
                })
            })
            .collect();

        let inputs = if config.simulation.autoplay {
            InputMode::Autoplay(Autoplay {
                attack_period: Duration::from_millis(config.simulation.attack_period_ms),
                press: Duration::from_millis(config.simulation.press_ms),
                lines: [p1.inputs, p2.inputs],
                facing: [p1.facing, p2.facing],
            })
        } else {
            InputMode::Manual(HashSet::new())
        };

        debug!(
            "SimWorld initialized: {} limbs, autoplay={}",
            limbs.len(),
            config.simulation.autoplay
        );

        Ok(Self {
            params: config.simulation.clone(),
            epoch: Instant::now(),
            sensors: [p1.sensor_channels.clone(), p2.sensor_channels.clone()],
            next_sensor: [0; 2],
            limbs,
            pulses: [None; MAX_PWM_CHANNELS],
            impacts: Vec::new(),
            faults: [false; MAX_ADC_CHANNELS],
            reads: 0,
            impacts_scheduled: 0,
            inputs,
        })
    }

    /// Wrap for sharing between the buses.
    pub fn into_shared(self) -> SharedWorld {
        Arc::new(Mutex::new(self))
    }

    // ─── Servo side ─────────────────────────────────────────────────

    /// Record a pulse; a limb leaving neutral schedules an impact on the
    /// opponent.
    pub fn set_pulse(&mut self, channel: u8, pulse_ms: f64, now: Instant) -> Result<(), HalError> {
        let slot = self
            .pulses
            .get_mut(channel as usize)
            .ok_or_else(|| HalError::invalid_channel(channel, "no such servo output"))?;
        *slot = Some(pulse_ms);

        let Some(limb) = self.limbs.iter_mut().find(|l| l.channel == channel) else {
            return Ok(());
        };
        let extended = (pulse_ms - limb.neutral_pulse_ms).abs() > EXTEND_TOLERANCE_MS;
        let rising = extended && !limb.extended;
        limb.extended = extended;

        if rising {
            let target = limb.owner.opponent();
            let sensors = &self.sensors[target.index()];
            if !sensors.is_empty() {
                let idx = self.next_sensor[target.index()] % sensors.len();
                let sensor = sensors[idx];
                self.next_sensor[target.index()] = idx + 1;
                self.schedule_impact(sensor, now + Duration::from_millis(self.params.reach_ms));
            }
        }
        Ok(())
    }

    /// Stop pulses on an output; a limb with no pulse is at rest.
    pub fn disable(&mut self, channel: u8) -> Result<(), HalError> {
        let slot = self
            .pulses
            .get_mut(channel as usize)
            .ok_or_else(|| HalError::invalid_channel(channel, "no such servo output"))?;
        *slot = None;
        if let Some(limb) = self.limbs.iter_mut().find(|l| l.channel == channel) {
            limb.extended = false;
        }
        Ok(())
    }

    /// Last pulse on an output, `None` if disabled or never set.
    pub fn pulse(&self, channel: u8) -> Option<f64> {
        self.pulses.get(channel as usize).copied().flatten()
    }

    // ─── Sensor side ────────────────────────────────────────────────

    /// Queue an impact on `channel` starting at `at`.
    pub fn schedule_impact(&mut self, channel: u8, at: Instant) {
        trace!("Impact scheduled on channel {}", channel);
        self.impacts.push(Impact {
            channel,
            start: at,
            end: at + Duration::from_millis(self.params.impact_ms),
        });
        self.impacts_scheduled += 1;
    }

    /// Number of impacts scheduled so far.
    pub fn impacts_scheduled(&self) -> u64 {
        self.impacts_scheduled
    }

    /// Make reads of `channel` fail (or succeed again).
    pub fn inject_fault(&mut self, channel: u8, faulty: bool) {
        if let Some(f) = self.faults.get_mut(channel as usize) {
            *f = faulty;
        }
    }

    /// Sensor reading at `now`.
    pub fn read_sensor(&mut self, channel: u8, now: Instant) -> Result<u16, HalError> {
        let ch = channel as usize;
        if ch >= MAX_ADC_CHANNELS {
            return Err(HalError::invalid_channel(channel, "no such sensor input"));
        }
        if self.faults[ch] {
            return Err(HalError::CommunicationError(format!(
                "simulated read fault on channel {channel}"
            )));
        }

        self.impacts.retain(|i| i.end > now);
        let hit = self
            .impacts
            .iter()
            .any(|i| i.channel == channel && i.start <= now);
        let level = if hit {
            self.params.impact_level
        } else {
            self.params.resting_level
        };

        let ripple = RIPPLE[(self.reads % RIPPLE.len() as u64) as usize];
        self.reads += 1;
        Ok(level.saturating_add(ripple).min(ADC_MAX))
    }

    // ─── Controller side ────────────────────────────────────────────

    /// Switch to manual input control with every line released.
    pub fn manual_inputs(&mut self) {
        self.inputs = InputMode::Manual(HashSet::new());
    }

    /// Press or release a line. Switches to manual control.
    pub fn press(&mut self, line: u8, pressed: bool) {
        if let InputMode::Autoplay(_) = self.inputs {
            self.manual_inputs();
        }
        if let InputMode::Manual(lines) = &mut self.inputs {
            if pressed {
                lines.insert(line);
            } else {
                lines.remove(&line);
            }
        }
    }

    /// Line level at `now`.
    pub fn is_pressed(&self, line: u8, now: Instant) -> bool {
        match &self.inputs {
            InputMode::Manual(lines) => lines.contains(&line),
            InputMode::Autoplay(script) => {
                script.is_pressed(line, now.saturating_duration_since(self.epoch))
            }
        }
    }
}
