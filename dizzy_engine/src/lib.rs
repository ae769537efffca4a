//! # DiZzy FC Engine
//!
//! Combat rules and round supervision for the DiZzy FC arena: two fighters
//! on a rail, each with a drive and two servo limbs, scored by force
//! sensors on the opponent's body.
//!
//! ## Layers
//!
//! 1. **LimbStateMachine** - Edge-triggered swing timer, one per limb
//! 2. **Fighter** - Hit points, player-level hit cooldown, drive mapping
//! 3. **CombatEngine** - The ~60 Hz loop playing one round
//! 4. **Session** - Start buttons, countdown, rounds, safe shutdown
//!
//! Sensor sampling and servo output live in `dizzy_hal`; the engine talks
//! to them only through the `HitSource` and `Actuation` traits.

pub mod damage;
pub mod engine;
pub mod error;
pub mod fighter;
pub mod limb;
pub mod session;

pub use engine::{CombatEngine, EngineSettings, RoundOutcome};
pub use error::EngineError;
pub use session::{Session, SessionSummary};
