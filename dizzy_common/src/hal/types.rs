//! Arena value types shared by the sampler, the actuator layer and the engine.
//!
//! - `PlayerId` / `LimbSide` / `Facing` - Identity and orientation
//! - `HitEvent` - One debounced impact produced by the sensor sampler
//! - `RoundResult` - The output contract of a finished round

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// One of the two participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerId {
    /// First fighter (`fighters[0]` in the config).
    One,
    /// Second fighter (`fighters[1]` in the config).
    Two,
}

impl PlayerId {
    /// Both players in config order.
    pub const ALL: [PlayerId; 2] = [PlayerId::One, PlayerId::Two];

    /// Index into per-player arrays.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            PlayerId::One => 0,
            PlayerId::Two => 1,
        }
    }

    /// The other participant.
    #[inline]
    pub const fn opponent(self) -> PlayerId {
        match self {
            PlayerId::One => PlayerId::Two,
            PlayerId::Two => PlayerId::One,
        }
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerId::One => write!(f, "Player 1"),
            PlayerId::Two => write!(f, "Player 2"),
        }
    }
}

/// Which of a fighter's two limbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimbSide {
    /// Left limb.
    Left,
    /// Right limb.
    Right,
}

impl LimbSide {
    /// Both sides, left first.
    pub const ALL: [LimbSide; 2] = [LimbSide::Left, LimbSide::Right];
}

/// Direction a fighter faces on the rail.
///
/// The drive wheels are mounted mirrored, so the wheel direction for a
/// logical "left" depends on facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Facing towards the right end of the rail.
    #[default]
    Right,
    /// Facing towards the left end of the rail.
    Left,
}

/// One debounced impact on a sensor channel.
///
/// Produced once by the sampler, consumed once by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitEvent {
    /// Analog channel the hit was seen on.
    pub channel: u8,
    /// Raw converter reading at the hit.
    pub raw: u16,
    /// Baseline-subtracted signal at the hit.
    pub signal: f64,
    /// Linear-ramp damage, clamped to the configured range.
    pub damage: f64,
    /// Sampler tick time of the hit.
    pub timestamp: Instant,
}

/// Outcome of a finished round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    /// 1-based round number within the session.
    pub round: u32,
    /// Winning participant.
    pub winner: PlayerId,
    /// Display name of the winner.
    pub winner_name: String,
    /// Final hp, indexed by [`PlayerId::index`].
    pub final_hp: [u32; 2],
    /// Wall-clock length of the round [ms].
    pub duration_ms: u64,
}

impl RoundResult {
    /// Final hp of one participant.
    #[inline]
    pub fn hp_of(&self, player: PlayerId) -> u32 {
        self.final_hp[player.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opponent_is_involutive() {
        for p in PlayerId::ALL {
            assert_ne!(p, p.opponent());
            assert_eq!(p, p.opponent().opponent());
        }
    }

    #[test]
    fn player_display_matches_scoreboard() {
        assert_eq!(PlayerId::One.to_string(), "Player 1");
        assert_eq!(PlayerId::Two.to_string(), "Player 2");
    }

    #[test]
    fn round_result_hp_lookup() {
        let result = RoundResult {
            round: 1,
            winner: PlayerId::Two,
            winner_name: "Blue".into(),
            final_hp: [0, 35],
            duration_ms: 4200,
        };
        assert_eq!(result.hp_of(PlayerId::One), 0);
        assert_eq!(result.hp_of(PlayerId::Two), 35);
    }
}
