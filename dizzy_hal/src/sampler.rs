//! Fixed-rate background force sensor sampler.
//!
//! The sampler owns the analog bus on its own thread. Each tick it reads
//! every configured channel, updates the per-channel baseline, applies the
//! mask/boost gates and the debounce window, and pushes hit events into a
//! bounded queue drained by the combat loop.
//!
//! - `SamplerSettings` - Validated sampler parameters
//! - `ChannelGate` - Per-channel mask and threshold boost schedule
//! - `SamplerCore` - Pure per-tick detection logic, driven with explicit timestamps
//! - `SensorSampler` - Thread wrapper with start/stop and the shared state
//! - `HitSource` - The seam the engine consumes events through

use crate::filter::{BaselineFilter, DamageRamp};
use dizzy_common::config::SamplerConfig;
use dizzy_common::consts::MAX_ADC_CHANNELS;
use dizzy_common::hal::driver::{AnalogBus, HalError};
use dizzy_common::hal::types::HitEvent;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// ─── Settings ───────────────────────────────────────────────────────

/// Validated sampler parameters.
#[derive(Debug, Clone)]
pub struct SamplerSettings {
    /// Sampled channels, in read order.
    pub channels: Vec<u8>,
    /// Target tick period.
    pub period: Duration,
    /// Base detection threshold [ADC counts].
    pub threshold: u16,
    /// Minimum spacing between accepted hits on one channel.
    pub debounce: Duration,
    /// Pending event capacity.
    pub queue_len: usize,
    /// Baseline filter smoothing factor.
    pub alpha: f64,
    /// Event damage mapping.
    pub ramp: DamageRamp,
}

impl SamplerSettings {
    /// Build settings from the `[sampler]` config section.
    ///
    /// # Errors
    /// - `HalError::ConfigError` for an empty channel set or invalid numbers
    /// - `HalError::InvalidChannel` for an out-of-range or repeated channel
    pub fn from_config(config: &SamplerConfig) -> Result<Self, HalError> {
        if config.channels.is_empty() {
            return Err(HalError::ConfigError(
                "sampler needs at least one channel".to_string(),
            ));
        }
        for (i, &ch) in config.channels.iter().enumerate() {
            if ch as usize >= MAX_ADC_CHANNELS {
                return Err(HalError::invalid_channel(
                    ch,
                    format!("converter has {MAX_ADC_CHANNELS} channels"),
                ));
            }
            if config.channels[..i].contains(&ch) {
                return Err(HalError::invalid_channel(ch, "listed twice"));
            }
        }
        if !(config.sample_hz.is_finite() && config.sample_hz > 0.0) {
            return Err(HalError::ConfigError(format!(
                "sample rate must be positive, got {}",
                config.sample_hz
            )));
        }
        if !(0.0..1.0).contains(&config.baseline_alpha) {
            return Err(HalError::ConfigError(format!(
                "baseline alpha must be in [0, 1), got {}",
                config.baseline_alpha
            )));
        }
        if config.queue_len == 0 {
            return Err(HalError::ConfigError(
                "event queue length must be greater than 0".to_string(),
            ));
        }
        if !(config.damage_divisor > 0.0) || config.min_damage > config.max_damage {
            return Err(HalError::ConfigError(
                "invalid damage ramp parameters".to_string(),
            ));
        }

        Ok(Self {
            channels: config.channels.clone(),
            period: config.period(),
            threshold: config.threshold,
            debounce: config.debounce(),
            queue_len: config.queue_len,
            alpha: config.baseline_alpha,
            ramp: DamageRamp {
                divisor: config.damage_divisor,
                min: config.min_damage,
                max: config.max_damage,
            },
        })
    }
}

// ─── Gating ─────────────────────────────────────────────────────────

/// Mask and threshold-boost schedule of one channel.
///
/// Written by the engine thread, read by the sampler thread under the
/// gate lock.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelGate {
    mask_until: Option<Instant>,
    boost: u16,
    boost_until: Option<Instant>,
}

impl ChannelGate {
    /// Suppress detection until `until`; an active later mask is kept.
    pub fn mask_until(&mut self, until: Instant) {
        self.mask_until = Some(self.mask_until.map_or(until, |t| t.max(until)));
    }

    /// Raise the threshold by `extra` until `until`.
    ///
    /// While an earlier boost is still active the larger amount and the
    /// later expiry win.
    pub fn boost_until(&mut self, extra: u16, until: Instant, now: Instant) {
        match self.boost_until {
            Some(t) if now < t => {
                self.boost = self.boost.max(extra);
                self.boost_until = Some(t.max(until));
            }
            _ => {
                self.boost = extra;
                self.boost_until = Some(until);
            }
        }
    }

    /// Whether detection is suppressed at `now`.
    #[inline]
    pub fn is_masked(&self, now: Instant) -> bool {
        matches!(self.mask_until, Some(t) if now < t)
    }

    /// Boost in effect at `now`; an expired boost is reset to zero.
    #[inline]
    pub fn active_boost(&mut self, now: Instant) -> u16 {
        if let Some(t) = self.boost_until
            && now >= t
        {
            self.boost = 0;
            self.boost_until = None;
        }
        self.boost
    }
}

// ─── Core ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct ChannelTrack {
    channel: u8,
    filter: BaselineFilter,
    last_hit: Option<Instant>,
}

/// Per-tick hit detection with explicit timestamps.
///
/// Holds the baseline filter and last accepted hit of every sampled
/// channel. Channel state persists for the life of the sampler.
#[derive(Debug, Clone)]
pub struct SamplerCore {
    settings: SamplerSettings,
    tracks: Vec<ChannelTrack>,
}

impl SamplerCore {
    /// Create fresh channel state for the given settings.
    pub fn new(settings: SamplerSettings) -> Self {
        let tracks = settings
            .channels
            .iter()
            .map(|&channel| ChannelTrack {
                channel,
                filter: BaselineFilter::new(settings.alpha),
                last_hit: None,
            })
            .collect();
        Self { settings, tracks }
    }

    /// Settings in use.
    pub fn settings(&self) -> &SamplerSettings {
        &self.settings
    }

    /// Current baseline of the channel in `slot`.
    pub fn baseline(&self, slot: usize) -> Option<f64> {
        self.tracks.get(slot).and_then(|t| t.filter.baseline())
    }

    /// Process one raw reading of the channel in `slot` (its index in
    /// `settings.channels`).
    ///
    /// The baseline is updated on every reading, masked or not.
    pub fn process(
        &mut self,
        slot: usize,
        raw: u16,
        gate: &mut ChannelGate,
        now: Instant,
    ) -> Option<HitEvent> {
        let SamplerSettings {
            threshold,
            debounce,
            ramp,
            ..
        } = self.settings;
        let track = self.tracks.get_mut(slot)?;

        let signal = track.filter.update(raw);
        if gate.is_masked(now) {
            return None;
        }

        let effective = f64::from(threshold) + f64::from(gate.active_boost(now));
        if signal <= effective {
            return None;
        }
        if let Some(last) = track.last_hit
            && now.saturating_duration_since(last) < debounce
        {
            return None;
        }

        track.last_hit = Some(now);
        Some(HitEvent {
            channel: track.channel,
            raw,
            signal,
            damage: ramp.map(signal, effective),
            timestamp: now,
        })
    }
}

// ─── Shared state ───────────────────────────────────────────────────

/// Snapshot of sampler counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SamplerStats {
    /// Completed ticks.
    pub ticks: u64,
    /// Ticks that exceeded the target period.
    pub overruns: u64,
    /// Failed single-channel reads.
    pub read_failures: u64,
    /// Events dropped from a full queue.
    pub dropped_events: u64,
    /// Events pushed into the queue.
    pub events_emitted: u64,
    /// Events waiting to be drained.
    pub pending_events: usize,
}

struct SamplerShared {
    latest: [AtomicU16; MAX_ADC_CHANNELS],
    events: Mutex<VecDeque<HitEvent>>,
    gates: Mutex<[ChannelGate; MAX_ADC_CHANNELS]>,
    queue_len: usize,
    sampled: Vec<u8>,
    ticks: AtomicU64,
    overruns: AtomicU64,
    read_failures: AtomicU64,
    dropped_events: AtomicU64,
    events_emitted: AtomicU64,
}

impl SamplerShared {
    fn new(settings: &SamplerSettings) -> Self {
        Self {
            latest: std::array::from_fn(|_| AtomicU16::new(0)),
            events: Mutex::new(VecDeque::with_capacity(settings.queue_len)),
            gates: Mutex::new([ChannelGate::default(); MAX_ADC_CHANNELS]),
            queue_len: settings.queue_len,
            sampled: settings.channels.clone(),
            ticks: AtomicU64::new(0),
            overruns: AtomicU64::new(0),
            read_failures: AtomicU64::new(0),
            dropped_events: AtomicU64::new(0),
            events_emitted: AtomicU64::new(0),
        }
    }

    /// Append events, dropping the oldest pending ones on overflow.
    fn push_events(&self, fresh: &mut Vec<HitEvent>) {
        let mut queue = self.events.lock();
        for event in fresh.drain(..) {
            if queue.len() >= self.queue_len {
                queue.pop_front();
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
            }
            queue.push_back(event);
            self.events_emitted.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn pop_events(&self, max: usize) -> Vec<HitEvent> {
        let mut queue = self.events.lock();
        let n = max.min(queue.len());
        queue.drain(..n).collect()
    }

    fn check_channels(&self, channels: &[u8]) -> Result<(), HalError> {
        match channels.iter().find(|ch| !self.sampled.contains(ch)) {
            Some(&ch) => Err(HalError::invalid_channel(ch, "not a sampled channel")),
            None => Ok(()),
        }
    }
}

// ─── Hit source seam ────────────────────────────────────────────────

/// Source of debounced hit events with self-motion gating controls.
pub trait HitSource {
    /// Drain up to `max` pending events, oldest first. Never blocks.
    fn pop_events(&self, max: usize) -> Vec<HitEvent>;

    /// Suppress detection on `channels` for `duration`.
    fn mask(&self, channels: &[u8], duration: Duration) -> Result<(), HalError>;

    /// Raise the detection threshold on `channels` by `extra` for `duration`.
    fn boost_threshold(&self, channels: &[u8], extra: u16, duration: Duration)
    -> Result<(), HalError>;
}

// ─── Sampler ────────────────────────────────────────────────────────

enum Worker {
    Idle {
        bus: Box<dyn AnalogBus>,
        core: SamplerCore,
    },
    Running(JoinHandle<(Box<dyn AnalogBus>, SamplerCore)>),
    Released,
}

/// Background fixed-rate sensor sampler.
///
/// `start()` moves the bus onto a dedicated thread; `stop()` joins it
/// (bounded by one period) and releases the bus. A released sampler
/// cannot be restarted. Dropping a running sampler stops it.
pub struct SensorSampler {
    shared: Arc<SamplerShared>,
    running: Arc<AtomicBool>,
    worker: Worker,
}

impl SensorSampler {
    /// Create a stopped sampler from the `[sampler]` config section.
    ///
    /// # Errors
    /// See [`SamplerSettings::from_config`].
    pub fn new(bus: Box<dyn AnalogBus>, config: &SamplerConfig) -> Result<Self, HalError> {
        Ok(Self::with_settings(bus, SamplerSettings::from_config(config)?))
    }

    /// Create a stopped sampler from already validated settings.
    pub fn with_settings(bus: Box<dyn AnalogBus>, settings: SamplerSettings) -> Self {
        Self {
            shared: Arc::new(SamplerShared::new(&settings)),
            running: Arc::new(AtomicBool::new(false)),
            worker: Worker::Idle {
                bus,
                core: SamplerCore::new(settings),
            },
        }
    }

    /// Launch the sampling thread. Idempotent while running.
    ///
    /// # Errors
    /// `HalError::InitFailed` if the bus was already released or the
    /// thread cannot be spawned.
    pub fn start(&mut self) -> Result<(), HalError> {
        match std::mem::replace(&mut self.worker, Worker::Released) {
            Worker::Running(handle) => {
                self.worker = Worker::Running(handle);
                Ok(())
            }
            Worker::Released => Err(HalError::InitFailed(
                "sampler bus already released".to_string(),
            )),
            Worker::Idle { bus, core } => {
                self.running.store(true, Ordering::SeqCst);
                let shared = Arc::clone(&self.shared);
                let running = Arc::clone(&self.running);
                let spawned = std::thread::Builder::new()
                    .name("dizzy-sampler".to_string())
                    .spawn(move || sample_loop(bus, core, shared, running));
                match spawned {
                    Ok(handle) => {
                        self.worker = Worker::Running(handle);
                        Ok(())
                    }
                    Err(e) => {
                        self.running.store(false, Ordering::SeqCst);
                        Err(HalError::InitFailed(format!(
                            "failed to spawn sampler thread: {e}"
                        )))
                    }
                }
            }
        }
    }

    /// Stop the sampling thread and release the bus.
    ///
    /// Safe to call when never started or already stopped.
    pub fn stop(&mut self) -> Result<(), HalError> {
        self.running.store(false, Ordering::SeqCst);
        let mut bus = match std::mem::replace(&mut self.worker, Worker::Released) {
            Worker::Released => return Ok(()),
            Worker::Idle { bus, .. } => bus,
            Worker::Running(handle) => match handle.join() {
                Ok((bus, _core)) => bus,
                Err(_) => {
                    return Err(HalError::CommunicationError(
                        "sampler thread panicked".to_string(),
                    ));
                }
            },
        };
        bus.release()
    }

    /// Whether the sampling thread is running.
    pub fn is_running(&self) -> bool {
        matches!(self.worker, Worker::Running(_))
    }

    /// Most recent raw reading of `channel`, 0 if never sampled.
    pub fn get_latest(&self, channel: u8) -> u16 {
        self.shared
            .latest
            .get(channel as usize)
            .map_or(0, |v| v.load(Ordering::Relaxed))
    }

    /// Counter snapshot.
    pub fn stats(&self) -> SamplerStats {
        SamplerStats {
            ticks: self.shared.ticks.load(Ordering::Relaxed),
            overruns: self.shared.overruns.load(Ordering::Relaxed),
            read_failures: self.shared.read_failures.load(Ordering::Relaxed),
            dropped_events: self.shared.dropped_events.load(Ordering::Relaxed),
            events_emitted: self.shared.events_emitted.load(Ordering::Relaxed),
            pending_events: self.shared.events.lock().len(),
        }
    }
}

impl HitSource for SensorSampler {
    fn pop_events(&self, max: usize) -> Vec<HitEvent> {
        self.shared.pop_events(max)
    }

    fn mask(&self, channels: &[u8], duration: Duration) -> Result<(), HalError> {
        self.shared.check_channels(channels)?;
        let until = Instant::now() + duration;
        let mut gates = self.shared.gates.lock();
        for &ch in channels {
            gates[ch as usize].mask_until(until);
        }
        Ok(())
    }

    fn boost_threshold(
        &self,
        channels: &[u8],
        extra: u16,
        duration: Duration,
    ) -> Result<(), HalError> {
        self.shared.check_channels(channels)?;
        let now = Instant::now();
        let mut gates = self.shared.gates.lock();
        for &ch in channels {
            gates[ch as usize].boost_until(extra, now + duration, now);
        }
        Ok(())
    }
}

impl Drop for SensorSampler {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Sampler shutdown failed: {}", e);
        }
    }
}

// ─── Thread loop ────────────────────────────────────────────────────

fn sample_loop(
    mut bus: Box<dyn AnalogBus>,
    mut core: SamplerCore,
    shared: Arc<SamplerShared>,
    running: Arc<AtomicBool>,
) -> (Box<dyn AnalogBus>, SamplerCore) {
    let period = core.settings().period;
    let channels = core.settings().channels.clone();
    info!(
        "Sampler started: {} channels, period={}us ({} mode)",
        channels.len(),
        period.as_micros(),
        if detect_rt_mode() { "real-time" } else { "standard" }
    );

    let mut readings: Vec<(usize, u8, u16)> = Vec::with_capacity(channels.len());
    let mut fresh: Vec<HitEvent> = Vec::new();

    while running.load(Ordering::SeqCst) {
        let tick_start = Instant::now();

        readings.clear();
        for (slot, &ch) in channels.iter().enumerate() {
            match bus.read_channel(ch) {
                Ok(raw) => {
                    shared.latest[ch as usize].store(raw, Ordering::Relaxed);
                    readings.push((slot, ch, raw));
                }
                Err(e) => {
                    let n = shared.read_failures.fetch_add(1, Ordering::Relaxed) + 1;
                    if should_report(n) {
                        warn!("Read failure #{} on channel {}: {}", n, ch, e);
                    }
                }
            }
        }

        {
            let mut gates = shared.gates.lock();
            for &(slot, ch, raw) in &readings {
                if let Some(event) = core.process(slot, raw, &mut gates[ch as usize], tick_start)
                {
                    debug!(
                        channel = event.channel,
                        raw = event.raw,
                        signal = event.signal,
                        damage = event.damage,
                        "Hit detected"
                    );
                    fresh.push(event);
                }
            }
        }
        if !fresh.is_empty() {
            shared.push_events(&mut fresh);
        }

        let ticks = shared.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        let elapsed = tick_start.elapsed();
        if elapsed < period {
            std::thread::sleep(period - elapsed);
        } else {
            let n = shared.overruns.fetch_add(1, Ordering::Relaxed) + 1;
            if should_report(n) {
                warn!(
                    "Timing violation #{}: tick took {}us (target {}us)",
                    n,
                    elapsed.as_micros(),
                    period.as_micros()
                );
            }
        }

        if ticks % 1000 == 0 {
            debug!(
                "Sampler: {} ticks, overruns={}, read_failures={}",
                ticks,
                shared.overruns.load(Ordering::Relaxed),
                shared.read_failures.load(Ordering::Relaxed)
            );
        }
    }

    info!(
        "Sampler stopped after {} ticks (overruns: {})",
        shared.ticks.load(Ordering::Relaxed),
        shared.overruns.load(Ordering::Relaxed)
    );
    (bus, core)
}

/// First ten occurrences, then every thousandth.
fn should_report(count: u64) -> bool {
    count <= 10 || count % 1000 == 0
}

/// Detect if running in real-time mode by checking scheduler policy.
fn detect_rt_mode() -> bool {
    #[cfg(target_os = "linux")]
    {
        use libc::{SCHED_FIFO, SCHED_RR, sched_getscheduler};
        // SAFETY: querying the calling thread's policy has no preconditions.
        let policy = unsafe { sched_getscheduler(0) };
        policy == SCHED_FIFO || policy == SCHED_RR
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SamplerSettings {
        SamplerSettings::from_config(&SamplerConfig::default()).unwrap()
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    struct ReleaseProbe(Arc<AtomicBool>);

    impl AnalogBus for ReleaseProbe {
        fn read_channel(&mut self, _channel: u8) -> Result<u16, HalError> {
            Ok(40)
        }

        fn release(&mut self) -> Result<(), HalError> {
            self.0.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn rest(core: &mut SamplerCore, gate: &mut ChannelGate, t0: Instant, ticks: u64) {
        for i in 0..ticks {
            assert!(core.process(0, 40, gate, t0 + ms(i * 10)).is_none());
        }
    }

    #[test]
    fn settings_reject_bad_channels() {
        let mut config = SamplerConfig::default();
        config.channels = vec![];
        assert!(matches!(
            SamplerSettings::from_config(&config),
            Err(HalError::ConfigError(_))
        ));

        config.channels = vec![0, 8];
        assert!(matches!(
            SamplerSettings::from_config(&config),
            Err(HalError::InvalidChannel { channel: 8, .. })
        ));

        config.channels = vec![1, 1];
        assert!(matches!(
            SamplerSettings::from_config(&config),
            Err(HalError::InvalidChannel { channel: 1, .. })
        ));
    }

    #[test]
    fn below_threshold_emits_nothing() {
        let mut core = SamplerCore::new(settings());
        let mut gate = ChannelGate::default();
        let t0 = Instant::now();
        rest(&mut core, &mut gate, t0, 5);
        // 40 -> 130 is a step of ~90 counts, under the 100 threshold
        assert!(core.process(0, 130, &mut gate, t0 + ms(50)).is_none());
    }

    #[test]
    fn spike_emits_clamped_event() {
        let mut core = SamplerCore::new(settings());
        let mut gate = ChannelGate::default();
        let t0 = Instant::now();
        rest(&mut core, &mut gate, t0, 5);

        let event = core.process(0, 700, &mut gate, t0 + ms(50)).unwrap();
        assert_eq!(event.channel, 0);
        assert_eq!(event.raw, 700);
        assert!(event.signal > 600.0);
        assert_eq!(event.damage, 50.0);
        assert_eq!(event.timestamp, t0 + ms(50));
    }

    #[test]
    fn debounce_spaces_events() {
        let mut core = SamplerCore::new(settings());
        let mut gate = ChannelGate::default();
        let t0 = Instant::now();
        rest(&mut core, &mut gate, t0, 1);

        let mut stamps = Vec::new();
        for i in 1..40 {
            let t = t0 + ms(i * 10);
            if let Some(ev) = core.process(0, 900, &mut gate, t) {
                stamps.push(ev.timestamp);
            }
        }
        assert!(stamps.len() >= 2);
        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= ms(100));
        }
    }

    #[test]
    fn mask_suppresses_for_window() {
        let mut core = SamplerCore::new(settings());
        let mut gate = ChannelGate::default();
        let t0 = Instant::now();
        rest(&mut core, &mut gate, t0, 1);

        gate.mask_until(t0 + ms(200));
        for i in 1..20 {
            assert!(core.process(0, 900, &mut gate, t0 + ms(i * 10)).is_none());
        }
        assert!(core.process(0, 900, &mut gate, t0 + ms(200)).is_some());
    }

    #[test]
    fn boost_raises_threshold_then_expires() {
        let mut core = SamplerCore::new(settings());
        let mut gate = ChannelGate::default();
        let t0 = Instant::now();
        rest(&mut core, &mut gate, t0, 1);

        gate.boost_until(500, t0 + ms(100), t0);
        // signal ~ 360 < 100 + 500
        assert!(core.process(0, 400, &mut gate, t0 + ms(10)).is_none());
        assert!(core.process(0, 400, &mut gate, t0 + ms(150)).is_some());
        assert_eq!(gate.active_boost(t0 + ms(150)), 0);
    }

    #[test]
    fn boosted_hit_damage_starts_at_effective_threshold() {
        let mut core = SamplerCore::new(settings());
        let mut gate = ChannelGate::default();
        let t0 = Instant::now();
        rest(&mut core, &mut gate, t0, 1);

        gate.boost_until(300, t0 + ms(100), t0);
        // baseline 0.98 * 40 + 0.02 * 600 = 51.2, signal 548.8
        let event = core.process(0, 600, &mut gate, t0 + ms(10)).unwrap();
        assert!((event.signal - 548.8).abs() < 1e-9);
        assert!((event.damage - 14.88).abs() < 1e-9);

        // without a boost the same step ramps from the base threshold
        let mut core = SamplerCore::new(settings());
        let mut gate = ChannelGate::default();
        rest(&mut core, &mut gate, t0, 1);
        let event = core.process(0, 600, &mut gate, t0 + ms(10)).unwrap();
        assert!((event.damage - 44.88).abs() < 1e-9);
    }

    #[test]
    fn gate_merging_keeps_later_and_larger() {
        let t0 = Instant::now();
        let mut gate = ChannelGate::default();

        gate.mask_until(t0 + ms(300));
        gate.mask_until(t0 + ms(100));
        assert!(gate.is_masked(t0 + ms(250)));
        assert!(!gate.is_masked(t0 + ms(300)));

        gate.boost_until(200, t0 + ms(100), t0);
        gate.boost_until(50, t0 + ms(150), t0 + ms(10));
        assert_eq!(gate.active_boost(t0 + ms(120)), 200);
        assert_eq!(gate.active_boost(t0 + ms(150)), 0);

        // an expired boost is replaced, not merged
        gate.boost_until(30, t0 + ms(400), t0 + ms(300));
        assert_eq!(gate.active_boost(t0 + ms(310)), 30);
    }

    #[test]
    fn queue_drops_oldest_on_overflow() {
        let mut s = settings();
        s.queue_len = 3;
        let shared = SamplerShared::new(&s);
        let t0 = Instant::now();

        let mut fresh: Vec<HitEvent> = (0..5)
            .map(|i| HitEvent {
                channel: 0,
                raw: 500 + i,
                signal: 400.0,
                damage: 30.0,
                timestamp: t0 + ms(u64::from(i) * 100),
            })
            .collect();
        shared.push_events(&mut fresh);

        assert_eq!(shared.dropped_events.load(Ordering::Relaxed), 2);
        let drained = shared.pop_events(10);
        let raws: Vec<u16> = drained.iter().map(|e| e.raw).collect();
        assert_eq!(raws, vec![502, 503, 504]);
        assert!(shared.pop_events(10).is_empty());
    }

    #[test]
    fn pop_events_respects_max() {
        let shared = SamplerShared::new(&settings());
        let t0 = Instant::now();
        let mut fresh: Vec<HitEvent> = (0..4)
            .map(|i| HitEvent {
                channel: i,
                raw: 600,
                signal: 500.0,
                damage: 40.0,
                timestamp: t0,
            })
            .collect();
        shared.push_events(&mut fresh);

        let first = shared.pop_events(3);
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].channel, 0);
        assert_eq!(shared.pop_events(3).len(), 1);
    }

    #[test]
    fn mask_rejects_unsampled_channel() {
        let released = Arc::new(AtomicBool::new(false));
        let sampler = SensorSampler::new(
            Box::new(ReleaseProbe(Arc::clone(&released))),
            &SamplerConfig::default(),
        )
        .unwrap();

        assert!(sampler.mask(&[0, 3], ms(100)).is_ok());
        assert!(matches!(
            sampler.mask(&[5], ms(100)),
            Err(HalError::InvalidChannel { channel: 5, .. })
        ));
        assert!(sampler.boost_threshold(&[7], 10, ms(100)).is_err());
    }

    #[test]
    fn stop_without_start_releases_bus() {
        let released = Arc::new(AtomicBool::new(false));
        let mut sampler = SensorSampler::new(
            Box::new(ReleaseProbe(Arc::clone(&released))),
            &SamplerConfig::default(),
        )
        .unwrap();

        assert_eq!(sampler.get_latest(0), 0);
        sampler.stop().unwrap();
        assert!(released.load(Ordering::SeqCst));
        sampler.stop().unwrap();
        assert!(matches!(sampler.start(), Err(HalError::InitFailed(_))));
    }

    #[test]
    fn report_throttle() {
        assert!(should_report(1));
        assert!(should_report(10));
        assert!(!should_report(11));
        assert!(should_report(2000));
    }
}
