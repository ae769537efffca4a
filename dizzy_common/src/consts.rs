//! System-wide constants for the DiZzy FC workspace.
//!
//! Single source of truth for numeric limits, prototype defaults and
//! default paths. Configuration defaults in [`crate::config`] are built
//! from these values.

use static_assertions::const_assert;

/// Largest raw reading of the 10-bit force sensor converter.
pub const ADC_MAX: u16 = 1023;

/// Number of single-ended channels on the analog converter.
pub const MAX_ADC_CHANNELS: usize = 8;

/// Number of servo output channels addressable by the PWM bus.
pub const MAX_PWM_CHANNELS: usize = 32;

/// Starting hit points for each fighter.
pub const STARTING_HP: u32 = 50;

/// Default sensor sampling rate [Hz].
pub const DEFAULT_SAMPLE_HZ: f64 = 100.0;

/// Default hit detection threshold on the filtered signal [ADC counts].
pub const DEFAULT_HIT_THRESHOLD: u16 = 100;

/// Default minimum spacing between hits on one channel [ms].
pub const DEFAULT_HIT_DEBOUNCE_MS: u64 = 100;

/// Default capacity of the pending hit-event queue.
pub const DEFAULT_EVENT_QUEUE_LEN: usize = 128;

/// Default smoothing factor of the baseline filter.
pub const DEFAULT_BASELINE_ALPHA: f64 = 0.98;

/// Smallest damage a sampler hit event can carry.
pub const MIN_DAMAGE: f64 = 5.0;

/// Largest damage a sampler hit event can carry.
pub const MAX_DAMAGE: f64 = 50.0;

/// Divisor of the linear `(signal - threshold) / divisor` damage ramp.
pub const DAMAGE_DIVISOR: f64 = 10.0;

/// Combat loop rate [Hz].
pub const COMBAT_LOOP_HZ: u32 = 60;

/// How long a limb stays extended after an attack press [ms].
pub const ATTACK_DURATION_MS: u64 = 150;

/// Player-level spacing between scored hits [ms].
pub const HIT_COOLDOWN_MS: u64 = 300;

/// Servo frame rate [Hz].
pub const SERVO_PWM_HZ: f64 = 50.0;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/dizzy/arena.toml";

const_assert!(MAX_ADC_CHANNELS <= 8);
const_assert!(STARTING_HP > 0);
const_assert!(HIT_COOLDOWN_MS > ATTACK_DURATION_MS);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_consistent() {
        assert!(MIN_DAMAGE <= MAX_DAMAGE);
        assert!(DAMAGE_DIVISOR > 0.0);
        assert!((0.0..1.0).contains(&DEFAULT_BASELINE_ALPHA));
        assert!(DEFAULT_SAMPLE_HZ > 0.0);
        assert!(COMBAT_LOOP_HZ > 0);
    }

    #[test]
    fn threshold_fits_in_adc_range() {
        assert!(DEFAULT_HIT_THRESHOLD < ADC_MAX);
    }
}
