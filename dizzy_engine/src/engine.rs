//! Real-time combat loop.
//!
//! One `CombatEngine` plays one round. Each tick it:
//! 1. Re-asserts each fighter's drive from the current button levels
//! 2. Advances the four limb state machines, issuing swing/retract commands
//! 3. Drains sampler events and applies damage behind the player cooldown
//! 4. Checks for a knockout and, if found, strikes the terminal pose
//!
//! The engine only issues non-blocking actuator commands.

use crate::damage::DamageCurve;
use crate::error::EngineError;
use crate::fighter::{DriveCommand, Fighter, wheel_speeds};
use crate::limb::{LimbCommand, LimbId, LimbStateMachine};
use dizzy_common::config::{CombatConfig, FighterConfig, GateMode};
use dizzy_common::hal::driver::DigitalInputs;
use dizzy_common::hal::types::{LimbSide, PlayerId, RoundResult};
use dizzy_hal::actuator::Actuation;
use dizzy_hal::sampler::HitSource;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Self-motion gating applied to a fighter's own sensors while it swings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelfMotionGate {
    /// Mask, boost or nothing.
    pub mode: GateMode,
    /// Gate length from swing start.
    pub duration: Duration,
    /// Threshold boost for [`GateMode::Boost`].
    pub extra: u16,
}

/// Validated round rules.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Hit points at round start.
    pub starting_hp: u32,
    /// Loop period.
    pub tick: Duration,
    /// Time a limb stays extended.
    pub attack_duration: Duration,
    /// Retracted time before a limb can fire again.
    pub recovery: Duration,
    /// Player-level spacing between scored hits.
    pub hit_cooldown: Duration,
    /// Wheel speed for drive commands.
    pub drive_speed: f64,
    /// Maximum sampler events drained per tick.
    pub events_per_tick: usize,
    /// Aggregate signal to damage mapping.
    pub curve: DamageCurve,
    /// Own-sensor gating during swings.
    pub self_motion: SelfMotionGate,
}

impl EngineSettings {
    /// Settings from the `[combat]` config section.
    pub fn from_config(config: &CombatConfig) -> Result<Self, EngineError> {
        if config.loop_hz == 0 {
            return Err(EngineError::InvalidSettings(
                "loop_hz must be greater than 0".to_string(),
            ));
        }
        if config.starting_hp == 0 {
            return Err(EngineError::InvalidSettings(
                "starting_hp must be greater than 0".to_string(),
            ));
        }
        if config.events_per_tick == 0 {
            return Err(EngineError::InvalidSettings(
                "events_per_tick must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            starting_hp: config.starting_hp,
            tick: Duration::from_secs(1) / config.loop_hz,
            attack_duration: Duration::from_millis(config.attack_duration_ms),
            recovery: Duration::from_millis(config.recovery_ms),
            hit_cooldown: Duration::from_millis(config.hit_cooldown_ms),
            drive_speed: config.drive_speed.clamp(0.0, 1.0),
            events_per_tick: config.events_per_tick,
            curve: DamageCurve::new(config.damage_curve.clone())?,
            self_motion: SelfMotionGate {
                mode: config.self_motion.mode,
                duration: Duration::from_millis(config.self_motion.duration_ms),
                extra: config.self_motion.extra,
            },
        })
    }
}

/// How a round ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// A fighter was knocked out.
    Finished(RoundResult),
    /// The running flag was cleared.
    Interrupted,
}

/// One round of combat.
pub struct CombatEngine<'a> {
    settings: &'a EngineSettings,
    actuators: &'a dyn Actuation,
    hits: &'a dyn HitSource,
    inputs: &'a mut dyn DigitalInputs,
    fighters: [Fighter; 2],
    limbs: [[LimbStateMachine; 2]; 2],
    round: u32,
    started: Option<Instant>,
    ticks: u64,
}

impl<'a> CombatEngine<'a> {
    /// Set up a round with fresh fighters.
    ///
    /// # Errors
    /// `EngineError::InvalidSettings` unless exactly two fighters are given.
    pub fn new(
        settings: &'a EngineSettings,
        fighters: &[FighterConfig],
        round: u32,
        actuators: &'a dyn Actuation,
        hits: &'a dyn HitSource,
        inputs: &'a mut dyn DigitalInputs,
    ) -> Result<Self, EngineError> {
        let [p1, p2] = fighters else {
            return Err(EngineError::InvalidSettings(format!(
                "a round needs exactly 2 fighters, got {}",
                fighters.len()
            )));
        };
        let fighters = [
            Fighter::new(PlayerId::One, p1.clone(), settings.starting_hp),
            Fighter::new(PlayerId::Two, p2.clone(), settings.starting_hp),
        ];
        let limbs = PlayerId::ALL.map(|player| {
            LimbSide::ALL.map(|side| {
                LimbStateMachine::new(
                    LimbId { player, side },
                    settings.attack_duration,
                    settings.recovery,
                )
            })
        });

        Ok(Self {
            settings,
            actuators,
            hits,
            inputs,
            fighters,
            limbs,
            round,
            started: None,
            ticks: 0,
        })
    }

    /// Fighter state.
    pub fn fighter(&self, player: PlayerId) -> &Fighter {
        &self.fighters[player.index()]
    }

    /// Limb state machine.
    pub fn limb(&self, id: LimbId) -> &LimbStateMachine {
        let side = match id.side {
            LimbSide::Left => 0,
            LimbSide::Right => 1,
        };
        &self.limbs[id.player.index()][side]
    }

    /// Ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one tick at `now`. Returns the result once a fighter is
    /// knocked out.
    pub fn tick(&mut self, now: Instant) -> Result<Option<RoundResult>, EngineError> {
        let started = *self.started.get_or_insert(now);
        self.ticks += 1;

        for player in PlayerId::ALL {
            self.drive(player)?;
            self.advance_limbs(player, now)?;
        }
        self.integrate_damage(now);

        for player in PlayerId::ALL {
            if self.fighters[player.index()].is_knocked_out() {
                let winner = player.opponent();
                self.terminal_pose(winner)?;
                let result = RoundResult {
                    round: self.round,
                    winner,
                    winner_name: self.fighters[winner.index()].name().to_string(),
                    final_hp: self.fighters.each_ref().map(Fighter::hp),
                    duration_ms: now.saturating_duration_since(started).as_millis() as u64,
                };
                info!(
                    "KO! {} wins round {} (hp {} / {})",
                    result.winner_name, result.round, result.final_hp[0], result.final_hp[1]
                );
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    /// Tick at the loop rate until a knockout or until `running` clears.
    pub fn run(&mut self, running: &AtomicBool) -> Result<RoundOutcome, EngineError> {
        let period = self.settings.tick;
        let mut overruns: u64 = 0;
        info!(
            "Round {} started (tick={}us)",
            self.round,
            period.as_micros()
        );

        while running.load(Ordering::SeqCst) {
            let tick_start = Instant::now();
            if let Some(result) = self.tick(tick_start)? {
                return Ok(RoundOutcome::Finished(result));
            }

            let elapsed = tick_start.elapsed();
            if elapsed < period {
                std::thread::sleep(period - elapsed);
            } else {
                overruns += 1;
                if overruns <= 10 || overruns % 1000 == 0 {
                    warn!(
                        "Timing violation #{}: tick took {}us (target {}us)",
                        overruns,
                        elapsed.as_micros(),
                        period.as_micros()
                    );
                }
            }
        }

        info!(
            "Round {} interrupted after {} ticks",
            self.round, self.ticks
        );
        Ok(RoundOutcome::Interrupted)
    }

    fn drive(&mut self, player: PlayerId) -> Result<(), EngineError> {
        let fighter = &self.fighters[player.index()];
        let config = fighter.config();
        let command = DriveCommand::from_buttons(
            self.inputs.is_pressed(config.inputs.left),
            self.inputs.is_pressed(config.inputs.right),
        );
        let (left, right) = wheel_speeds(config.facing, command, self.settings.drive_speed);
        self.actuators.set_speed(config.drive.left_wheel, left)?;
        self.actuators.set_speed(config.drive.right_wheel, right)?;
        Ok(())
    }

    fn advance_limbs(&mut self, player: PlayerId, now: Instant) -> Result<(), EngineError> {
        let config = self.fighters[player.index()].config();
        for (slot, side) in LimbSide::ALL.into_iter().enumerate() {
            let pressed = self.inputs.is_pressed(config.inputs.attack(side));
            let limb = config.limbs.get(side);
            let sm = &mut self.limbs[player.index()][slot];

            match sm.update(pressed, now) {
                LimbCommand::Swing => {
                    debug!("{} swings", sm.id());
                    self.actuators.set_angle(limb.channel, limb.attack_deg)?;
                    gate_own_sensors(self.hits, &self.settings.self_motion, &config.sensor_channels)?;
                }
                LimbCommand::Retract => {
                    trace!("{} retracts", sm.id());
                    self.actuators.neutral(limb.channel)?;
                }
                LimbCommand::None => {}
            }
        }
        Ok(())
    }

    fn integrate_damage(&mut self, now: Instant) {
        let cooldown = self.settings.hit_cooldown;
        let mut aggregate = [0.0_f64; 2];

        for event in self.hits.pop_events(self.settings.events_per_tick) {
            let Some(target) = self.fighters.iter().find(|f| f.owns_sensor(event.channel)) else {
                trace!("Event on unassigned channel {} dropped", event.channel);
                continue;
            };
            if target.cooldown_ready(now, cooldown) {
                aggregate[target.id().index()] += event.signal;
            } else {
                trace!(
                    "{} in hit cooldown, event on channel {} discarded",
                    target.id(),
                    event.channel
                );
            }
        }

        for fighter in &mut self.fighters {
            let signal = aggregate[fighter.id().index()];
            if signal <= 0.0 {
                continue;
            }
            let damage = self.settings.curve.damage(signal);
            if damage == 0 {
                continue;
            }
            let applied = fighter.apply_damage(damage, now);
            info!(
                "{} hit for {} (signal {:.0}), hp {}",
                fighter.name(),
                applied,
                signal,
                fighter.hp()
            );
        }
    }

    fn terminal_pose(&self, winner: PlayerId) -> Result<(), EngineError> {
        for fighter in &self.fighters {
            let config = fighter.config();
            self.actuators.stop(config.drive.left_wheel)?;
            self.actuators.stop(config.drive.right_wheel)?;
            for side in LimbSide::ALL {
                let limb = config.limbs.get(side);
                if fighter.id() == winner {
                    self.actuators.set_angle(limb.channel, limb.attack_deg)?;
                } else {
                    self.actuators.neutral(limb.channel)?;
                }
            }
        }
        Ok(())
    }
}

fn gate_own_sensors(
    hits: &dyn HitSource,
    gate: &SelfMotionGate,
    channels: &[u8],
) -> Result<(), EngineError> {
    match gate.mode {
        GateMode::Mask => hits.mask(channels, gate.duration)?,
        GateMode::Boost => hits.boost_threshold(channels, gate.extra, gate.duration)?,
        GateMode::Off => {}
    }
    Ok(())
}
