//! DiZzy FC Common Library
//!
//! This crate provides shared constants, configuration loading and the
//! hardware seams used by every DiZzy FC workspace crate.
//!
//! # Module Structure
//!
//! - [`consts`] - Numeric limits and prototype defaults
//! - [`hal`] - Driver traits, errors and arena value types
//! - [`config`] - Configuration loading traits and the arena config
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use dizzy_common::prelude::*;
//!
//! let config = ArenaConfig::prototype();
//! assert!(config.validate().is_ok());
//! ```

pub mod config;
pub mod consts;
pub mod hal;
pub mod prelude;
