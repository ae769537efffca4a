//! Step-function damage curve.
//!
//! Maps a fighter's aggregate sensor signal for one tick to hit points.

use crate::error::EngineError;
use dizzy_common::config::DamageStepConfig;

/// Monotonic non-decreasing step function from signal to damage.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageCurve {
    steps: Vec<DamageStepConfig>,
}

impl DamageCurve {
    /// Build a curve, rejecting steps that are not strictly increasing in
    /// `min_signal` or that decrease in damage.
    pub fn new(steps: Vec<DamageStepConfig>) -> Result<Self, EngineError> {
        for pair in steps.windows(2) {
            if !(pair[1].min_signal > pair[0].min_signal) || pair[1].damage < pair[0].damage {
                return Err(EngineError::InvalidSettings(format!(
                    "damage curve not monotonic at min_signal {}",
                    pair[1].min_signal
                )));
            }
        }
        Ok(Self { steps })
    }

    /// Damage for an aggregate signal; 0 below the first step.
    pub fn damage(&self, aggregate: f64) -> u32 {
        self.steps
            .iter()
            .rev()
            .find(|s| aggregate >= s.min_signal)
            .map_or(0, |s| s.damage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dizzy_common::config::CombatConfig;

    fn prototype() -> DamageCurve {
        DamageCurve::new(CombatConfig::default().damage_curve).unwrap()
    }

    #[test]
    fn prototype_bands() {
        let c = prototype();
        assert_eq!(c.damage(0.0), 0);
        assert_eq!(c.damage(19.9), 0);
        assert_eq!(c.damage(20.0), 3);
        assert_eq!(c.damage(199.0), 3);
        assert_eq!(c.damage(450.0), 5);
        assert_eq!(c.damage(799.0), 6);
        assert_eq!(c.damage(5000.0), 7);
    }

    #[test]
    fn monotonic_over_range() {
        let c = prototype();
        let mut prev = 0;
        for s in 0..2000 {
            let d = c.damage(f64::from(s));
            assert!(d >= prev);
            prev = d;
        }
    }

    #[test]
    fn rejects_unordered_steps() {
        let steps = vec![
            DamageStepConfig {
                min_signal: 200.0,
                damage: 3,
            },
            DamageStepConfig {
                min_signal: 100.0,
                damage: 4,
            },
        ];
        assert!(matches!(
            DamageCurve::new(steps),
            Err(EngineError::InvalidSettings(_))
        ));
    }

    #[test]
    fn empty_curve_never_damages() {
        let c = DamageCurve::new(Vec::new()).unwrap();
        assert_eq!(c.damage(1000.0), 0);
    }
}
