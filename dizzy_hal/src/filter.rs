//! Signal conditioning for the force sensors.
//!
//! - `BaselineFilter` - Exponential baseline tracker, one per channel
//! - `DamageRamp` - Linear, clamped signal-to-damage mapping of a hit event

/// Exponential baseline estimate of a slowly drifting sensor.
///
/// `baseline = alpha * baseline + (1 - alpha) * raw`; the signal is
/// `raw - baseline`. The first reading seeds the baseline, so a channel
/// that rests at a non-zero level does not fire on startup.
#[derive(Debug, Clone, Copy)]
pub struct BaselineFilter {
    alpha: f64,
    baseline: Option<f64>,
}

impl BaselineFilter {
    /// Create an unseeded filter.
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            baseline: None,
        }
    }

    /// Feed one raw reading and return the baseline-subtracted signal.
    #[inline]
    pub fn update(&mut self, raw: u16) -> f64 {
        let raw = f64::from(raw);
        let baseline = match self.baseline {
            Some(prev) => self.alpha * prev + (1.0 - self.alpha) * raw,
            None => raw,
        };
        self.baseline = Some(baseline);
        raw - baseline
    }

    /// Current baseline, `None` before the first reading.
    pub fn baseline(&self) -> Option<f64> {
        self.baseline
    }
}

/// `clamp((signal - threshold) / divisor, min, max)`, where `threshold` is
/// the detection threshold in effect for the reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageRamp {
    /// Ramp divisor, positive.
    pub divisor: f64,
    /// Lower clamp.
    pub min: f64,
    /// Upper clamp.
    pub max: f64,
}

impl DamageRamp {
    /// Damage carried by a hit event with the given filtered signal,
    /// measured above the effective threshold (base plus any boost).
    #[inline]
    pub fn map(&self, signal: f64, threshold: f64) -> f64 {
        ((signal - threshold) / self.divisor).clamp(self.min, self.max)
    }
}
