//! Hardware abstraction layer traits and shared types.
//!
//! This module contains the driver seams the arena depends on and the
//! value types that cross them.

pub mod driver;
pub mod types;
