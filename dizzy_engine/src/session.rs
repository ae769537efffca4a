//! Round supervisor.
//!
//! A `Session` owns the hardware for the lifetime of the process and plays
//! rounds on it: wait for both start buttons, count down, run a fresh
//! [`CombatEngine`], repeat. The sampler and the actuator driver are kept
//! across rounds.
//!
//! A knockout leaves the victory pose standing until the next round starts
//! or the session closes. Every other exit path leaves the arena safe:
//! - `ParkGuard` parks the actuators when a round is interrupted or fails
//! - `Session`'s `Drop` parks and stops the sampler
//! - `ShutdownGuard` then disables every servo output

use crate::engine::{CombatEngine, EngineSettings, RoundOutcome};
use crate::error::EngineError;
use dizzy_common::config::ArenaConfig;
use dizzy_common::hal::driver::{Backend, DigitalInputs};
use dizzy_common::hal::types::RoundResult;
use dizzy_hal::actuator::{Actuation, ActuatorDriver, ShutdownGuard};
use dizzy_hal::sampler::{HitSource, SamplerStats, SensorSampler};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest single sleep while waiting, so an interrupt is seen promptly.
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// What a session produced.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    /// Finished rounds, in order.
    pub rounds: Vec<RoundResult>,
    /// Sampler counters at the end of the session.
    pub sampler: SamplerStats,
}

/// Parks the actuators when dropped, unless disarmed.
struct ParkGuard<'a> {
    actuators: &'a dyn Actuation,
    armed: bool,
}

impl<'a> ParkGuard<'a> {
    fn new(actuators: &'a dyn Actuation) -> Self {
        Self {
            actuators,
            armed: true,
        }
    }

    /// Leave the actuators as they are.
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ParkGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = self.actuators.park() {
            warn!("Failed to park actuators after round: {}", e);
        }
    }
}

/// Start presses seen per fighter since the wait began.
#[derive(Debug, Default)]
struct StartLatch {
    ready: [bool; 2],
}

impl StartLatch {
    /// Record one poll of `player`'s start line. Returns `true` the first
    /// time the press is seen.
    fn observe(&mut self, player: usize, pressed: bool) -> bool {
        let first = pressed && !self.ready[player];
        self.ready[player] |= pressed;
        first
    }

    fn all_ready(&self) -> bool {
        self.ready.iter().all(|&r| r)
    }
}

/// Hardware plus round rules for a run of rounds.
pub struct Session {
    config: ArenaConfig,
    settings: EngineSettings,
    sampler: SensorSampler,
    actuators: ShutdownGuard,
    inputs: Box<dyn DigitalInputs>,
    running: Arc<AtomicBool>,
}

impl Session {
    /// Take over an opened backend: park the actuators and start sampling.
    ///
    /// # Errors
    /// Any validation, settings, actuator or sampler error. Nothing is
    /// retried.
    pub fn open(
        config: ArenaConfig,
        backend: Backend,
        running: Arc<AtomicBool>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let settings = EngineSettings::from_config(&config.combat)?;
        let Backend {
            name,
            analog,
            pwm,
            inputs,
        } = backend;

        let actuators = ShutdownGuard::new(Arc::new(ActuatorDriver::from_arena(pwm, &config)?));
        actuators.driver().park()?;

        let mut sampler = SensorSampler::new(analog, &config.sampler)?;
        sampler.start()?;

        info!(
            "Session open on '{}' backend: {} vs {}",
            name, config.fighters[0].name, config.fighters[1].name
        );
        Ok(Self {
            config,
            settings,
            sampler,
            actuators,
            inputs,
            running,
        })
    }

    /// Arena configuration in use.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// The running sensor sampler.
    pub fn sampler(&self) -> &SensorSampler {
        &self.sampler
    }

    /// Block until each fighter has pressed start. The presses need not
    /// overlap: a fighter who pressed once stays ready.
    ///
    /// Returns `false` if the running flag cleared first.
    pub fn wait_for_start(&mut self) -> bool {
        let poll = Duration::from_millis(self.config.combat.start_poll_ms.max(1));
        let mut latch = StartLatch::default();
        info!("Waiting for both start buttons");

        while self.running.load(Ordering::SeqCst) {
            for (player, fighter) in self.config.fighters.iter().enumerate() {
                let pressed = self.inputs.is_pressed(fighter.inputs.start);
                if latch.observe(player, pressed) {
                    info!("{} ready", fighter.name);
                }
            }
            if latch.all_ready() {
                return true;
            }
            std::thread::sleep(poll);
        }
        false
    }

    /// Pre-round countdown. Returns `false` if interrupted.
    pub fn countdown(&self) -> bool {
        for remaining in (1..=self.config.combat.countdown_s).rev() {
            if !self.running.load(Ordering::SeqCst) {
                return false;
            }
            info!("{}...", remaining);
            sleep_while_running(&self.running, Duration::from_secs(1));
        }
        let running = self.running.load(Ordering::SeqCst);
        if running {
            info!("FIGHT!");
        }
        running
    }

    /// Play one round with fresh fighters.
    ///
    /// A finished round leaves the terminal pose on the limbs; the next
    /// round parks them before it starts.
    pub fn play_round(&mut self, round: u32) -> Result<RoundOutcome, EngineError> {
        let actuators: &dyn Actuation = self.actuators.driver().as_ref();
        actuators.park()?;
        let park = ParkGuard::new(actuators);

        let stale = self.sampler.pop_events(usize::MAX).len();
        if stale > 0 {
            debug!("Discarded {} hit events from before round {}", stale, round);
        }

        let mut engine = CombatEngine::new(
            &self.settings,
            &self.config.fighters,
            round,
            actuators,
            &self.sampler,
            self.inputs.as_mut(),
        )?;
        let outcome = engine.run(&self.running)?;
        if let RoundOutcome::Finished(_) = outcome {
            park.disarm();
        }
        Ok(outcome)
    }

    /// Play `rounds` rounds, or until interrupted when `rounds` is 0.
    pub fn run(&mut self, rounds: u32) -> Result<SessionSummary, EngineError> {
        let mut results = Vec::new();
        let mut round = 0;

        while rounds == 0 || round < rounds {
            if !self.wait_for_start() || !self.countdown() {
                break;
            }
            round += 1;
            match self.play_round(round)? {
                RoundOutcome::Finished(result) => results.push(result),
                RoundOutcome::Interrupted => break,
            }
        }

        info!("Session over after {} finished round(s)", results.len());
        Ok(SessionSummary {
            rounds: results,
            sampler: self.sampler.stats(),
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.actuators.driver().park() {
            warn!("Failed to park actuators: {}", e);
        }
        if let Err(e) = self.sampler.stop() {
            warn!("Failed to stop sampler: {}", e);
        }
    }
}

fn sleep_while_running(running: &AtomicBool, total: Duration) {
    let deadline = Instant::now() + total;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        std::thread::sleep((deadline - now).min(WAIT_SLICE));
    }
}
