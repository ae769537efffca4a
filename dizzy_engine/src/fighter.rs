//! Fighter state and drive mapping.
//!
//! - `Fighter` - Hit points and player-level hit cooldown for one round
//! - `DriveCommand` - Level-mapped drive direction
//! - `wheel_speeds` - Facing-aware wheel speeds for a drive command

use dizzy_common::config::FighterConfig;
use dizzy_common::hal::types::{Facing, PlayerId};
use std::time::{Duration, Instant};

/// Logical drive direction of one fighter for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveCommand {
    /// Both wheels stopped.
    Stop,
    /// Move towards the left end of the rail.
    Left,
    /// Move towards the right end of the rail.
    Right,
}

impl DriveCommand {
    /// Left xor right pressed drives that way; anything else stops.
    #[inline]
    pub fn from_buttons(left: bool, right: bool) -> Self {
        match (left, right) {
            (true, false) => DriveCommand::Left,
            (false, true) => DriveCommand::Right,
            _ => DriveCommand::Stop,
        }
    }
}

/// `(left_wheel, right_wheel)` speeds for a command.
///
/// The wheels are mounted mirrored: moving left on a right-facing fighter
/// runs the left wheel backward and the right wheel forward.
#[inline]
pub fn wheel_speeds(facing: Facing, command: DriveCommand, speed: f64) -> (f64, f64) {
    let left = match (facing, command) {
        (_, DriveCommand::Stop) => return (0.0, 0.0),
        (Facing::Right, DriveCommand::Left) | (Facing::Left, DriveCommand::Right) => -speed,
        (Facing::Right, DriveCommand::Right) | (Facing::Left, DriveCommand::Left) => speed,
    };
    (left, -left)
}

/// One fighter's round state.
#[derive(Debug, Clone)]
pub struct Fighter {
    id: PlayerId,
    config: FighterConfig,
    hp: u32,
    starting_hp: u32,
    last_hit: Option<Instant>,
}

impl Fighter {
    /// Fresh fighter at full hp.
    pub fn new(id: PlayerId, config: FighterConfig, starting_hp: u32) -> Self {
        Self {
            id,
            config,
            hp: starting_hp,
            starting_hp,
            last_hit: None,
        }
    }

    /// Player identity.
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Wiring and orientation.
    pub fn config(&self) -> &FighterConfig {
        &self.config
    }

    /// Remaining hit points.
    pub fn hp(&self) -> u32 {
        self.hp
    }

    /// Hit points at round start.
    pub fn starting_hp(&self) -> u32 {
        self.starting_hp
    }

    /// Whether hp reached zero.
    pub fn is_knocked_out(&self) -> bool {
        self.hp == 0
    }

    /// Whether `channel` is one of this fighter's body sensors.
    pub fn owns_sensor(&self, channel: u8) -> bool {
        self.config.sensor_channels.contains(&channel)
    }

    /// Whether the player-level hit cooldown has elapsed at `now`.
    pub fn cooldown_ready(&self, now: Instant, cooldown: Duration) -> bool {
        self.last_hit
            .is_none_or(|t| now.saturating_duration_since(t) >= cooldown)
    }

    /// Subtract `amount` (saturating at 0) and restart the cooldown.
    /// Returns the hp actually removed.
    pub fn apply_damage(&mut self, amount: u32, now: Instant) -> u32 {
        let applied = amount.min(self.hp);
        self.hp -= applied;
        self.last_hit = Some(now);
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dizzy_common::config::ArenaConfig;

    fn fighter() -> Fighter {
        let config = ArenaConfig::prototype().fighters[0].clone();
        Fighter::new(PlayerId::One, config, 50)
    }

    #[test]
    fn drive_buttons() {
        assert_eq!(DriveCommand::from_buttons(true, false), DriveCommand::Left);
        assert_eq!(DriveCommand::from_buttons(false, true), DriveCommand::Right);
        assert_eq!(DriveCommand::from_buttons(true, true), DriveCommand::Stop);
        assert_eq!(DriveCommand::from_buttons(false, false), DriveCommand::Stop);
    }

    #[test]
    fn wheel_mapping_honours_facing() {
        assert_eq!(
            wheel_speeds(Facing::Right, DriveCommand::Left, 1.0),
            (-1.0, 1.0)
        );
        assert_eq!(
            wheel_speeds(Facing::Left, DriveCommand::Left, 1.0),
            (1.0, -1.0)
        );
        assert_eq!(
            wheel_speeds(Facing::Right, DriveCommand::Right, 0.5),
            (0.5, -0.5)
        );
        assert_eq!(
            wheel_speeds(Facing::Left, DriveCommand::Right, 0.5),
            (-0.5, 0.5)
        );
        assert_eq!(
            wheel_speeds(Facing::Left, DriveCommand::Stop, 1.0),
            (0.0, 0.0)
        );
    }

    #[test]
    fn damage_saturates_at_zero() {
        let mut f = fighter();
        let now = Instant::now();
        assert_eq!(f.apply_damage(45, now), 45);
        assert_eq!(f.hp(), 5);
        assert_eq!(f.apply_damage(7, now), 5);
        assert_eq!(f.hp(), 0);
        assert!(f.is_knocked_out());
    }

    #[test]
    fn cooldown_boundary_is_inclusive() {
        let mut f = fighter();
        let t0 = Instant::now();
        let cd = Duration::from_millis(300);
        assert!(f.cooldown_ready(t0, cd));
        f.apply_damage(5, t0);
        assert!(!f.cooldown_ready(t0 + Duration::from_millis(299), cd));
        assert!(f.cooldown_ready(t0 + cd, cd));
    }

    #[test]
    fn sensor_ownership() {
        let f = fighter();
        assert!(f.owns_sensor(0));
        assert!(f.owns_sensor(1));
        assert!(!f.owns_sensor(2));
        assert_eq!(f.name(), "Player 1");
    }
}
