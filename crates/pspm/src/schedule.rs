//! Cohort introduction schedules.
//!
//! The default schedule introduces cohorts densely while the population is
//! young and sparsely later on. Starting from `t = 0`, each step is the power
//! of two just below `t * multiplier`, clamped to `[min_step, max_step]`:
//!
//! ```text
//! dt = clamp(2^floor(log2(t * multiplier)), min_step, max_step)
//! ```
//!
//! Each step is appended while the previous time is `<= max_time`; the final
//! entry, which lies beyond the horizon, is dropped.

use thiserror::Error;

#[cfg(feature = "serde-derive")]
use serde::{Deserialize, Serialize};

/// Parameters of the cohort schedule generator.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(Serialize, Deserialize))]
pub struct ScheduleConfig {
    multiplier: f64,
    min_step: f64,
    max_step: f64,
}

/// Errors that can occur when validating a schedule.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ScheduleError {
    #[error("multiplier must be finite and positive")]
    Multiplier,

    #[error("step bounds must be finite, positive and ordered")]
    StepBounds,

    #[error("max_time must be finite and non-negative, got {0}")]
    MaxTime(f64),
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            multiplier: 0.2,
            min_step: 1e-5,
            max_step: 2.0,
        }
    }
}

impl ScheduleConfig {
    /// Creates a validated schedule config.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is non-finite or non-positive, or if
    /// `min_step > max_step`.
    pub fn new(multiplier: f64, min_step: f64, max_step: f64) -> Result<Self, ScheduleError> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(ScheduleError::Multiplier);
        }
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(min_step) || !positive(max_step) || min_step > max_step {
            return Err(ScheduleError::StepBounds);
        }

        Ok(Self {
            multiplier,
            min_step,
            max_step,
        })
    }

    /// Returns the growth multiplier.
    #[must_use]
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Returns the smallest allowed step.
    #[must_use]
    pub fn min_step(&self) -> f64 {
        self.min_step
    }

    /// Returns the largest allowed step.
    #[must_use]
    pub fn max_step(&self) -> f64 {
        self.max_step
    }

    fn step_at(&self, time: f64) -> f64 {
        // log2(0) is -inf, which clamps to the minimum step.
        (time * self.multiplier)
            .log2()
            .floor()
            .exp2()
            .clamp(self.min_step, self.max_step)
    }
}

/// Generates introduction times in `[0, max_time]`, starting at zero.
///
/// # Errors
///
/// Returns an error if `max_time` is negative or non-finite.
pub fn cohort_schedule(max_time: f64, config: &ScheduleConfig) -> Result<Vec<f64>, ScheduleError> {
    if !max_time.is_finite() || max_time < 0.0 {
        return Err(ScheduleError::MaxTime(max_time));
    }

    let mut times = vec![0.0];
    let mut time = 0.0;
    while time <= max_time {
        time += config.step_at(time);
        times.push(time);
    }
    // Only the step that crossed the horizon.
    times.pop();
    Ok(times)
}

/// Generates the schedule with the default multiplier and step bounds.
///
/// # Errors
///
/// Returns an error if `max_time` is negative or non-finite.
pub fn default_cohort_schedule(max_time: f64) -> Result<Vec<f64>, ScheduleError> {
    cohort_schedule(max_time, &ScheduleConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn plant_horizon() {
        let times = default_cohort_schedule(105.32).unwrap();

        assert_eq!(times[0], 0.0);
        assert_eq!(times[1], 1e-5);
        assert!(times.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(times.len(), 141);
        assert_relative_eq!(*times.last().unwrap(), 104.000_003_7, epsilon = 1e-6);
        // Late steps saturate at the maximum.
        let n = times.len();
        assert_relative_eq!(times[n - 1] - times[n - 2], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn steps_are_powers_of_two() {
        let config = ScheduleConfig::default();
        assert_eq!(config.step_at(0.0), 1e-5);
        assert_eq!(config.step_at(1.0), 0.125);
        assert_eq!(config.step_at(50.0), 2.0);
    }

    #[test]
    fn rejects_invalid_inputs() {
        assert_eq!(
            ScheduleConfig::new(0.0, 1e-5, 2.0),
            Err(ScheduleError::Multiplier)
        );
        assert_eq!(
            ScheduleConfig::new(0.2, 3.0, 2.0),
            Err(ScheduleError::StepBounds)
        );
        assert!(matches!(
            default_cohort_schedule(f64::NAN),
            Err(ScheduleError::MaxTime(_))
        ));
        assert_eq!(default_cohort_schedule(0.0).unwrap(), [0.0]);
    }

    #[test]
    fn keeps_every_time_inside_the_horizon() {
        let times = default_cohort_schedule(1.0).unwrap();
        assert_eq!(times.len(), 76);
        assert!(*times.last().unwrap() <= 1.0);

        // The dropped time is the first one past the horizon.
        let last = *times.last().unwrap();
        let next = last + ScheduleConfig::default().step_at(last);
        assert!(next > 1.0);
    }

    proptest! {
        #[test]
        fn schedule_is_increasing_and_bounded(max_time in 0.0f64..200.0, multiplier in 0.05f64..1.0) {
            let config = ScheduleConfig::new(multiplier, 1e-3, 4.0).unwrap();
            let times = cohort_schedule(max_time, &config).unwrap();
            prop_assert!(times.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(times[0], 0.0);
            let last = times[times.len() - 1];
            prop_assert!(last <= max_time);
            prop_assert!(last + config.step_at(last) > max_time);
        }
    }
}
