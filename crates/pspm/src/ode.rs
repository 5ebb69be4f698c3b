//! Adaptive Cash–Karp Runge–Kutta 4(5) integration over flat buffers.
//!
//! # Algorithm
//!
//! Each call to [`Stepper::integrate`] advances `y` from `t` to a mandatory
//! stop time:
//!
//! 1. Try the remembered step size, clipped so the sub-step ends exactly on
//!    the stop time.
//! 2. Take an embedded 4(5) step and scale its error estimate by
//!    `|y| + |h y'|` per component.
//! 3. Reject and shrink (at most tenfold) while the scaled error exceeds
//!    `eps`; fail when the step underflows.
//! 4. Accept, then grow the remembered step size (at most fivefold).
//!
//! The state only changes on accepted sub-steps, so after an error `y` and `t`
//! hold the last accepted values.

use tracing::trace;

use crate::{control::Control, error::IntegrationError};

const A2: f64 = 0.2;
const A3: f64 = 0.3;
const A4: f64 = 0.6;
const A5: f64 = 1.0;
const A6: f64 = 0.875;

const B21: f64 = 0.2;
const B31: f64 = 3.0 / 40.0;
const B32: f64 = 9.0 / 40.0;
const B41: f64 = 0.3;
const B42: f64 = -0.9;
const B43: f64 = 1.2;
const B51: f64 = -11.0 / 54.0;
const B52: f64 = 2.5;
const B53: f64 = -70.0 / 27.0;
const B54: f64 = 35.0 / 27.0;
const B61: f64 = 1631.0 / 55296.0;
const B62: f64 = 175.0 / 512.0;
const B63: f64 = 575.0 / 13824.0;
const B64: f64 = 44275.0 / 110_592.0;
const B65: f64 = 253.0 / 4096.0;

const C1: f64 = 37.0 / 378.0;
const C3: f64 = 250.0 / 621.0;
const C4: f64 = 125.0 / 594.0;
const C6: f64 = 512.0 / 1771.0;

const DC1: f64 = C1 - 2825.0 / 27648.0;
const DC3: f64 = C3 - 18575.0 / 48384.0;
const DC4: f64 = C4 - 13525.0 / 55296.0;
const DC5: f64 = -277.0 / 14336.0;
const DC6: f64 = C6 - 0.25;

const SAFETY: f64 = 0.9;
const GROW_EXP: f64 = -0.2;
const SHRINK_EXP: f64 = -0.25;
// (5 / SAFETY)^(1 / GROW_EXP)
const ERRCON: f64 = 1.89e-4;
const TINY: f64 = 1e-30;

/// How an integration interval ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Reached,
    Stopped,
}

/// Step-size memory plus scratch buffers for the embedded stages.
#[derive(Debug, Clone)]
pub(crate) struct Stepper {
    step_size: f64,
    eps: f64,
    max_steps: usize,
    min_step_size: f64,
    dydx: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    k5: Vec<f64>,
    k6: Vec<f64>,
    y_stage: Vec<f64>,
    y_out: Vec<f64>,
    y_err: Vec<f64>,
}

impl Stepper {
    pub(crate) fn new(control: &Control) -> Self {
        Self {
            step_size: control.ode_initial_step_size(),
            eps: control.ode_eps(),
            max_steps: control.ode_max_steps(),
            min_step_size: control.ode_min_step_size(),
            dydx: Vec::new(),
            k2: Vec::new(),
            k3: Vec::new(),
            k4: Vec::new(),
            k5: Vec::new(),
            k6: Vec::new(),
            y_stage: Vec::new(),
            y_out: Vec::new(),
            y_err: Vec::new(),
        }
    }

    /// Step size the next interval will try first.
    pub(crate) fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Integrates `y` from `*t` to `t_stop`.
    ///
    /// `derivs(t, y, dydt)` must fill `dydt` with the rates at `(t, y)`.
    /// `on_step(t, h)` is called after each accepted sub-step and returns
    /// `true` to stop before `t_stop`.
    pub(crate) fn integrate<F, O>(
        &mut self,
        t: &mut f64,
        y: &mut Vec<f64>,
        t_stop: f64,
        mut derivs: F,
        mut on_step: O,
    ) -> Result<Outcome, IntegrationError>
    where
        F: FnMut(f64, &[f64], &mut [f64]),
        O: FnMut(f64, f64) -> bool,
    {
        let n = y.len();
        for buf in [
            &mut self.dydx,
            &mut self.k2,
            &mut self.k3,
            &mut self.k4,
            &mut self.k5,
            &mut self.k6,
            &mut self.y_stage,
            &mut self.y_out,
            &mut self.y_err,
        ] {
            buf.clear();
            buf.resize(n, 0.0);
        }

        let mut attempts = 0;
        while *t < t_stop {
            let remaining = t_stop - *t;
            let mut last = self.step_size >= remaining;
            let mut h = if last { remaining } else { self.step_size };

            derivs(*t, y, &mut self.dydx);

            let err_max = loop {
                attempts += 1;
                if attempts > self.max_steps {
                    return Err(IntegrationError::MaxSteps {
                        time: *t,
                        steps: self.max_steps,
                    });
                }

                self.cash_karp(*t, y, h, &mut derivs);
                let err_max = self.scaled_error(y, h);
                if err_max <= 1.0 {
                    break err_max;
                }

                trace!(t = *t, h, err_max, "sub-step rejected");
                h = (SAFETY * h * err_max.powf(SHRINK_EXP)).max(0.1 * h);
                last = false;
                if h < self.min_step_size || *t + h == *t {
                    return Err(IntegrationError::StepSizeUnderflow {
                        time: *t,
                        step_size: h,
                    });
                }
            };

            *t = if last { t_stop } else { *t + h };
            std::mem::swap(y, &mut self.y_out);
            self.step_size = if err_max > ERRCON {
                SAFETY * h * err_max.powf(GROW_EXP)
            } else {
                5.0 * h
            };
            trace!(t = *t, h, next = self.step_size, "sub-step accepted");

            if on_step(*t, h) {
                return Ok(Outcome::Stopped);
            }
        }

        Ok(Outcome::Reached)
    }

    /// Fills `y_out` and `y_err` with one embedded step of size `h`.
    fn cash_karp<F>(&mut self, t: f64, y: &[f64], h: f64, derivs: &mut F)
    where
        F: FnMut(f64, &[f64], &mut [f64]),
    {
        let n = y.len();
        let dydx = &self.dydx;

        for i in 0..n {
            self.y_stage[i] = y[i] + B21 * h * dydx[i];
        }
        derivs(t + A2 * h, &self.y_stage, &mut self.k2);

        for i in 0..n {
            self.y_stage[i] = y[i] + h * (B31 * dydx[i] + B32 * self.k2[i]);
        }
        derivs(t + A3 * h, &self.y_stage, &mut self.k3);

        for i in 0..n {
            self.y_stage[i] = y[i] + h * (B41 * dydx[i] + B42 * self.k2[i] + B43 * self.k3[i]);
        }
        derivs(t + A4 * h, &self.y_stage, &mut self.k4);

        for i in 0..n {
            self.y_stage[i] = y[i]
                + h * (B51 * dydx[i] + B52 * self.k2[i] + B53 * self.k3[i] + B54 * self.k4[i]);
        }
        derivs(t + A5 * h, &self.y_stage, &mut self.k5);

        for i in 0..n {
            self.y_stage[i] = y[i]
                + h * (B61 * dydx[i]
                    + B62 * self.k2[i]
                    + B63 * self.k3[i]
                    + B64 * self.k4[i]
                    + B65 * self.k5[i]);
        }
        derivs(t + A6 * h, &self.y_stage, &mut self.k6);

        for i in 0..n {
            self.y_out[i] =
                y[i] + h * (C1 * dydx[i] + C3 * self.k3[i] + C4 * self.k4[i] + C6 * self.k6[i]);
            self.y_err[i] = h
                * (DC1 * dydx[i]
                    + DC3 * self.k3[i]
                    + DC4 * self.k4[i]
                    + DC5 * self.k5[i]
                    + DC6 * self.k6[i]);
        }
    }

    /// Largest error relative to `|y| + |h y'|`, in units of `eps`.
    fn scaled_error(&self, y: &[f64], h: f64) -> f64 {
        let mut err_max: f64 = 0.0;
        for ((&yi, &dy), &err) in y.iter().zip(&self.dydx).zip(&self.y_err) {
            let scale = yi.abs() + (h * dy).abs() + TINY;
            let ratio = (err / scale).abs();
            if ratio.is_nan() {
                return f64::INFINITY;
            }
            err_max = err_max.max(ratio);
        }
        err_max / self.eps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn control() -> Control {
        Control::new(1e-10, 0.1, 10_000, 1e-12).unwrap()
    }

    #[test]
    fn exponential_decay() {
        let mut stepper = Stepper::new(&control());
        let mut t = 0.0;
        let mut y = vec![1.0, 2.0];

        let outcome = stepper
            .integrate(
                &mut t,
                &mut y,
                2.0,
                |_, y, dydt| {
                    dydt[0] = -y[0];
                    dydt[1] = -0.5 * y[1];
                },
                |_, _| false,
            )
            .unwrap();

        assert_eq!(outcome, Outcome::Reached);
        assert_eq!(t, 2.0);
        assert_relative_eq!(y[0], (-2.0_f64).exp(), max_relative = 1e-7);
        assert_relative_eq!(y[1], 2.0 * (-1.0_f64).exp(), max_relative = 1e-7);
    }

    #[test]
    fn lands_exactly_on_stop_times() {
        let mut stepper = Stepper::new(&control());
        let mut t = 0.0;
        let mut y = vec![0.0];
        for stop in [0.3, 0.35, 1.7] {
            stepper
                .integrate(&mut t, &mut y, stop, |_, _, dydt| dydt[0] = 1.0, |_, _| false)
                .unwrap();
            assert_eq!(t, stop);
            assert_relative_eq!(y[0], stop, max_relative = 1e-12);
        }
    }

    #[test]
    fn observer_can_stop_after_first_sub_step() {
        let mut stepper = Stepper::new(&control());
        let mut t = 0.0;
        let mut y = vec![1.0];
        let outcome = stepper
            .integrate(&mut t, &mut y, 10.0, |_, y, dydt| dydt[0] = -y[0], |_, _| true)
            .unwrap();
        assert_eq!(outcome, Outcome::Stopped);
        assert!(t > 0.0 && t < 10.0);
    }

    #[test]
    fn non_finite_rates_underflow() {
        let mut stepper = Stepper::new(&control());
        let mut t = 0.0;
        let mut y = vec![1.0];
        let err = stepper
            .integrate(
                &mut t,
                &mut y,
                1.0,
                |t, _, dydt| dydt[0] = if t > 0.5 { f64::NAN } else { 1.0 },
                |_, _| false,
            )
            .unwrap_err();

        assert!(matches!(err, IntegrationError::StepSizeUnderflow { .. }));
        assert!(t <= 0.5);
        assert!(y[0].is_finite());
    }

    #[test]
    fn step_budget_is_enforced() {
        let control = Control::new(1e-10, 1e-3, 3, 1e-12).unwrap();
        let mut stepper = Stepper::new(&control);
        let mut t = 0.0;
        let mut y = vec![1.0];
        let err = stepper
            .integrate(&mut t, &mut y, 1.0, |_, y, dydt| dydt[0] = -y[0], |_, _| false)
            .unwrap_err();
        assert_eq!(
            err,
            IntegrationError::MaxSteps {
                time: t,
                steps: 3
            }
        );
    }
}
