use thiserror::Error;

#[cfg(feature = "serde-derive")]
use serde::{Deserialize, Serialize};

/// Numerical controls for time stepping and rate evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(Serialize, Deserialize))]
pub struct Control {
    ode_eps: f64,
    ode_initial_step_size: f64,
    ode_max_steps: usize,
    ode_min_step_size: f64,
    ebt_grad_dx: f64,
    cm_grad_dx: f64,
    use_log_densities: bool,
}

/// Errors that can occur when validating a [`Control`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    #[error("ode_eps must be finite and positive")]
    OdeEps,

    #[error("ode_initial_step_size must be finite and positive")]
    InitialStepSize,

    #[error("ode_max_steps must be at least one")]
    MaxSteps,

    #[error("ode_min_step_size must be finite, positive and below the initial step size")]
    MinStepSize,

    #[error("ebt_grad_dx must be finite and positive")]
    EbtGradDx,

    #[error("cm_grad_dx must be finite and positive")]
    CmGradDx,
}

impl Default for Control {
    fn default() -> Self {
        Self {
            ode_eps: 1e-6,
            ode_initial_step_size: 0.1,
            ode_max_steps: 100_000,
            ode_min_step_size: 1e-12,
            ebt_grad_dx: 1e-6,
            cm_grad_dx: 1e-6,
            use_log_densities: true,
        }
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl Control {
    /// Creates a control with validated ODE settings and default method settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a tolerance or step size is non-finite or
    /// non-positive, if `ode_max_steps` is zero, or if the minimum step size
    /// is not below the initial one.
    pub fn new(
        ode_eps: f64,
        ode_initial_step_size: f64,
        ode_max_steps: usize,
        ode_min_step_size: f64,
    ) -> Result<Self, ControlError> {
        if !positive(ode_eps) {
            return Err(ControlError::OdeEps);
        }
        if !positive(ode_initial_step_size) {
            return Err(ControlError::InitialStepSize);
        }
        if ode_max_steps == 0 {
            return Err(ControlError::MaxSteps);
        }
        if !positive(ode_min_step_size) || ode_min_step_size >= ode_initial_step_size {
            return Err(ControlError::MinStepSize);
        }

        Ok(Self {
            ode_eps,
            ode_initial_step_size,
            ode_max_steps,
            ode_min_step_size,
            ..Self::default()
        })
    }

    /// Sets the finite-difference width for the EBT boundary derivatives.
    ///
    /// # Errors
    ///
    /// Returns an error if `dx` is non-finite or non-positive.
    pub fn with_ebt_grad_dx(self, dx: f64) -> Result<Self, ControlError> {
        if !positive(dx) {
            return Err(ControlError::EbtGradDx);
        }
        Ok(Self {
            ebt_grad_dx: dx,
            ..self
        })
    }

    /// Sets the finite-difference width for the CM growth gradient.
    ///
    /// # Errors
    ///
    /// Returns an error if `dx` is non-finite or non-positive.
    pub fn with_cm_grad_dx(self, dx: f64) -> Result<Self, ControlError> {
        if !positive(dx) {
            return Err(ControlError::CmGradDx);
        }
        Ok(Self {
            cm_grad_dx: dx,
            ..self
        })
    }

    /// Chooses whether CM stores densities or their natural logarithm.
    #[must_use]
    pub fn with_log_densities(self, use_log_densities: bool) -> Self {
        Self {
            use_log_densities,
            ..self
        }
    }

    /// Returns the relative local error tolerance.
    #[must_use]
    pub fn ode_eps(&self) -> f64 {
        self.ode_eps
    }

    /// Returns the first trial step size.
    #[must_use]
    pub fn ode_initial_step_size(&self) -> f64 {
        self.ode_initial_step_size
    }

    /// Returns the sub-step budget per integration interval.
    #[must_use]
    pub fn ode_max_steps(&self) -> usize {
        self.ode_max_steps
    }

    /// Returns the step size below which integration fails.
    #[must_use]
    pub fn ode_min_step_size(&self) -> f64 {
        self.ode_min_step_size
    }

    /// Returns the EBT boundary derivative width.
    #[must_use]
    pub fn ebt_grad_dx(&self) -> f64 {
        self.ebt_grad_dx
    }

    /// Returns the CM growth-gradient width.
    #[must_use]
    pub fn cm_grad_dx(&self) -> f64 {
        self.cm_grad_dx
    }

    /// Returns whether CM stores log densities.
    #[must_use]
    pub fn use_log_densities(&self) -> bool {
        self.use_log_densities
    }
}
