//! Full sessions against the simulation backend with the autoplay script.

use dizzy_common::config::{ArenaConfig, load_arena_config};
use dizzy_engine::engine::RoundOutcome;
use dizzy_engine::error::EngineError;
use dizzy_engine::session::Session;
use dizzy_hal::actuator::ServoTiming;
use dizzy_hal::drivers::simulation;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn shipped_config() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../config/arena.toml")
}

/// Shipped arena with a short round and no countdown.
fn quick_arena(dir: &TempDir) -> ArenaConfig {
    let text = std::fs::read_to_string(shipped_config()).unwrap();
    let text = text
        .replace("starting_hp = 50", "starting_hp = 10")
        .replace("countdown_s = 3", "countdown_s = 0");
    let path = dir.path().join("arena.toml");
    std::fs::write(&path, text).unwrap();
    load_arena_config(&path).unwrap()
}

/// Clear `running` after `after`, so a broken round cannot hang the test.
fn watchdog(running: &Arc<AtomicBool>, after: Duration) {
    let running = running.clone();
    thread::spawn(move || {
        thread::sleep(after);
        running.store(false, Ordering::SeqCst);
    });
}

#[test]
fn autoplay_round_ends_in_knockout() {
    let dir = TempDir::new().unwrap();
    let config = quick_arena(&dir);
    assert_eq!(config.combat.starting_hp, 10);

    let (backend, world) = simulation::open(&config).unwrap();
    let running = Arc::new(AtomicBool::new(true));
    watchdog(&running, Duration::from_secs(30));

    let summary = {
        let mut session = Session::open(config, backend, running.clone()).unwrap();
        session.run(1).unwrap()
    };

    assert_eq!(summary.rounds.len(), 1, "round did not finish");
    let result = &summary.rounds[0];
    let loser = result.winner.opponent();
    assert_eq!(result.hp_of(loser), 0);
    assert!(result.hp_of(result.winner) > 0);
    assert!(result.duration_ms > 0);
    assert!(summary.sampler.ticks > 0);
    assert!(summary.sampler.events_emitted >= 2);
    assert!(world.lock().impacts_scheduled() >= 2);

    // shutdown disabled every servo output
    for ch in 0..8 {
        assert_eq!(world.lock().pulse(ch), None, "channel {ch} still driven");
    }
}

#[test]
fn knockout_pose_holds_after_round() {
    let dir = TempDir::new().unwrap();
    let config = quick_arena(&dir);
    let (backend, world) = simulation::open(&config).unwrap();
    let running = Arc::new(AtomicBool::new(true));
    watchdog(&running, Duration::from_secs(30));

    let mut session = Session::open(config, backend, running.clone()).unwrap();
    let result = match session.play_round(1).unwrap() {
        RoundOutcome::Finished(result) => result,
        RoundOutcome::Interrupted => panic!("round did not finish"),
    };

    let config = session.config();
    let timing = ServoTiming::from_config(&config.servo);
    let winner = &config.fighters[result.winner.index()];
    let loser = &config.fighters[result.winner.opponent().index()];
    let world = world.lock();
    let at = |ch: u8| world.pulse(ch).expect("channel not driven");
    let close = |a: f64, b: f64| (a - b).abs() < 1e-9;

    for limb in [&winner.limbs.left, &winner.limbs.right] {
        let expected = timing.angle_to_pulse(limb.attack_deg);
        assert!(close(at(limb.channel), expected), "winner limb {}", limb.channel);
    }
    for limb in [&loser.limbs.left, &loser.limbs.right] {
        let expected = timing.angle_to_pulse(limb.neutral_deg);
        assert!(close(at(limb.channel), expected), "loser limb {}", limb.channel);
    }
    for fighter in &config.fighters {
        for ch in [fighter.drive.left_wheel, fighter.drive.right_wheel] {
            assert!(close(at(ch), timing.stop_pulse_ms), "wheel {ch} still moving");
        }
    }
}

#[test]
fn start_presses_need_not_overlap() {
    let dir = TempDir::new().unwrap();
    let mut config = quick_arena(&dir);
    config.simulation.autoplay = false;
    let p1_start = config.fighters[0].inputs.start;
    let p2_start = config.fighters[1].inputs.start;

    let (backend, world) = simulation::open(&config).unwrap();
    let running = Arc::new(AtomicBool::new(true));
    watchdog(&running, Duration::from_secs(10));
    let mut session = Session::open(config, backend, running.clone()).unwrap();

    let presser = {
        let world = world.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            world.lock().press(p1_start, true);
            thread::sleep(Duration::from_millis(100));
            world.lock().press(p1_start, false);
            thread::sleep(Duration::from_millis(100));
            world.lock().press(p2_start, true);
        })
    };

    assert!(session.wait_for_start(), "start was never registered");
    assert!(running.load(Ordering::SeqCst));
    presser.join().unwrap();
    assert!(!world.lock().is_pressed(p1_start, std::time::Instant::now()));
}

#[test]
fn interrupt_ends_session_without_result() {
    let dir = TempDir::new().unwrap();
    let mut config = quick_arena(&dir);
    config.combat.starting_hp = 500;

    let (backend, world) = simulation::open(&config).unwrap();
    let running = Arc::new(AtomicBool::new(true));
    watchdog(&running, Duration::from_millis(300));

    let summary = {
        let mut session = Session::open(config, backend, running.clone()).unwrap();
        session.run(0).unwrap()
    };

    assert!(summary.rounds.is_empty());
    assert!(!running.load(Ordering::SeqCst));
    for ch in 0..8 {
        assert_eq!(world.lock().pulse(ch), None);
    }
}

#[test]
fn open_rejects_invalid_config() {
    let (backend, _world) = simulation::open(&ArenaConfig::prototype()).unwrap();
    let mut config = ArenaConfig::prototype();
    config.combat.loop_hz = 0;

    let result = Session::open(config, backend, Arc::new(AtomicBool::new(true)));
    assert!(matches!(result, Err(EngineError::Config(_))));
}
