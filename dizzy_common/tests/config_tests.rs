//! Arena config loading tests.
//!
//! Covers `load_arena_config()`: the shipped prototype file, section
//! defaults, unknown field rejection and cross-section validation.

use dizzy_common::config::{ArenaConfig, ConfigError, GateMode, load_arena_config};
use dizzy_common::hal::types::Facing;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const TWO_FIGHTERS: &str = r#"
[[fighters]]
name = "Red"
sensor_channels = [0, 1]
inputs = { left = 17, right = 27, attack_left = 22, attack_right = 23, start = 16 }
drive = { left_wheel = 0, right_wheel = 1 }
limbs.left = { channel = 2, neutral_deg = 180.0, attack_deg = 90.0 }
limbs.right = { channel = 3, neutral_deg = 0.0, attack_deg = 90.0 }

[[fighters]]
name = "Blue"
facing = "left"
sensor_channels = [2, 3]
inputs = { left = 24, right = 25, attack_left = 5, attack_right = 6, start = 26 }
drive = { left_wheel = 4, right_wheel = 5 }
limbs.left = { channel = 6, neutral_deg = 0.0, attack_deg = 90.0 }
limbs.right = { channel = 7, neutral_deg = 180.0, attack_deg = 90.0 }
"#;

fn write_arena(dir: &Path, extra: &str) -> PathBuf {
    let path = dir.join("arena.toml");
    fs::write(&path, format!("{extra}\n{TWO_FIGHTERS}")).unwrap();
    path
}

fn shipped_config() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/arena.toml")
}

// ─── Tests ──────────────────────────────────────────────────────────

/// The shipped prototype file loads and matches the built-in prototype.
#[test]
fn shipped_arena_config_loads() {
    let config = load_arena_config(&shipped_config()).expect("shipped config should load");
    let prototype = ArenaConfig::prototype();

    assert_eq!(config.fighters.len(), 2);
    assert_eq!(config.sampler.channels, prototype.sampler.channels);
    assert_eq!(config.combat.damage_curve, prototype.combat.damage_curve);
    for (loaded, built) in config.fighters.iter().zip(&prototype.fighters) {
        assert_eq!(loaded.sensor_channels, built.sensor_channels);
        assert_eq!(loaded.inputs, built.inputs);
        assert_eq!(loaded.drive, built.drive);
        assert_eq!(loaded.limbs, built.limbs);
        assert_eq!(loaded.facing, built.facing);
    }
}

/// Omitted sections fall back to the prototype defaults.
#[test]
fn omitted_sections_use_defaults() {
    let tmp = TempDir::new().unwrap();
    let path = write_arena(tmp.path(), "");

    let config = load_arena_config(&path).expect("should load");
    assert_eq!(config.shared.service_name, "dizzy-fc");
    assert_eq!(config.sampler.threshold, 100);
    assert_eq!(config.combat.starting_hp, 50);
    assert_eq!(config.combat.loop_hz, 60);
    assert_eq!(config.combat.self_motion.mode, GateMode::Mask);
    assert_eq!(config.combat.damage_curve.len(), 5);
    assert_eq!(config.fighters[0].facing, Facing::Right);
    assert_eq!(config.fighters[1].facing, Facing::Left);
}

/// Overrides in a section keep the remaining fields at default.
#[test]
fn partial_section_override() {
    let tmp = TempDir::new().unwrap();
    let path = write_arena(
        tmp.path(),
        r#"
[combat]
starting_hp = 20

[combat.self_motion]
mode = "boost"
"#,
    );

    let config = load_arena_config(&path).unwrap();
    assert_eq!(config.combat.starting_hp, 20);
    assert_eq!(config.combat.hit_cooldown_ms, 300);
    assert_eq!(config.combat.self_motion.mode, GateMode::Boost);
    assert_eq!(config.combat.self_motion.extra, 150);
}

/// Unknown fields are rejected as parse errors.
#[test]
fn unknown_field_rejected() {
    let tmp = TempDir::new().unwrap();
    let path = write_arena(
        tmp.path(),
        r#"
[sampler]
thresh = 100
"#,
    );

    let result = load_arena_config(&path);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

/// Missing fighters table is a parse error.
#[test]
fn missing_fighters_rejected() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("arena.toml");
    fs::write(&path, "[sampler]\nthreshold = 80\n").unwrap();

    assert!(matches!(
        load_arena_config(&path),
        Err(ConfigError::ParseError(_))
    ));
}

/// Semantic errors surface as validation errors after a successful parse.
#[test]
fn fighter_channel_outside_sampler_set() {
    let tmp = TempDir::new().unwrap();
    let path = write_arena(
        tmp.path(),
        r#"
[sampler]
channels = [0, 1, 2]
"#,
    );

    let result = load_arena_config(&path);
    assert!(
        matches!(result, Err(ConfigError::ValidationError(ref msg)) if msg.contains("not sampled")),
        "expected ValidationError, got {result:?}"
    );
}

/// A non-existent path is reported as `FileNotFound`.
#[test]
fn missing_file() {
    let tmp = TempDir::new().unwrap();
    let result = load_arena_config(&tmp.path().join("nope.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound)));
}
