//! Per-limb attack state machine.
//!
//! Idle → Swinging → (Recovering →) Idle, triggered by a rising edge on the
//! limb's attack input. One instance per limb, four per round.

use dizzy_common::hal::types::{LimbSide, PlayerId};
use std::fmt;
use std::time::{Duration, Instant};

/// Which limb of which fighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LimbId {
    /// Owning fighter.
    pub player: PlayerId,
    /// Left or right limb.
    pub side: LimbSide,
}

impl fmt::Display for LimbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.side {
            LimbSide::Left => "left",
            LimbSide::Right => "right",
        };
        write!(f, "{} {} limb", self.player, side)
    }
}

/// Attack phase of one limb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimbPhase {
    /// At rest, ready to fire.
    Idle,
    /// Extended since the given tick.
    Swinging {
        /// Swing start.
        since: Instant,
    },
    /// Retracted, waiting out the recovery time.
    Recovering {
        /// Retract time.
        since: Instant,
    },
}

/// Actuator command produced by a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimbCommand {
    /// Nothing to do this tick.
    None,
    /// Move the limb to its attack angle.
    Swing,
    /// Move the limb back to neutral.
    Retract,
}

/// Edge-triggered attack timer of one limb.
#[derive(Debug, Clone)]
pub struct LimbStateMachine {
    id: LimbId,
    phase: LimbPhase,
    attack_duration: Duration,
    recovery: Duration,
    was_pressed: bool,
}

impl LimbStateMachine {
    /// Create an idle limb.
    pub fn new(id: LimbId, attack_duration: Duration, recovery: Duration) -> Self {
        Self {
            id,
            phase: LimbPhase::Idle,
            attack_duration,
            recovery,
            was_pressed: false,
        }
    }

    /// Limb identity.
    #[inline]
    pub fn id(&self) -> LimbId {
        self.id
    }

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> LimbPhase {
        self.phase
    }

    /// Whether the limb can fire.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.phase == LimbPhase::Idle
    }

    /// Advance with this tick's attack input level.
    ///
    /// Only a rising edge seen while Idle fires; holding the input never
    /// retriggers.
    pub fn update(&mut self, pressed: bool, now: Instant) -> LimbCommand {
        let rising = pressed && !self.was_pressed;
        self.was_pressed = pressed;

        match self.phase {
            LimbPhase::Idle if rising => {
                self.phase = LimbPhase::Swinging { since: now };
                LimbCommand::Swing
            }
            LimbPhase::Swinging { since }
                if now.saturating_duration_since(since) >= self.attack_duration =>
            {
                self.phase = if self.recovery.is_zero() {
                    LimbPhase::Idle
                } else {
                    LimbPhase::Recovering { since: now }
                };
                LimbCommand::Retract
            }
            LimbPhase::Recovering { since }
                if now.saturating_duration_since(since) >= self.recovery =>
            {
                self.phase = LimbPhase::Idle;
                LimbCommand::None
            }
            _ => LimbCommand::None,
        }
    }
}
