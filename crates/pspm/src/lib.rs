//! Numerical solver for physiologically structured population models.
//!
//! A population of individuals distinguished by a continuous trait (size, for
//! example) grows, dies and reproduces at rates that depend on a shared
//! environment, which is itself computed from the population. This crate
//! discretizes the trait axis and integrates the resulting ODE system:
//!
//! - [`Method::Fmu`]: fixed-mesh upwind finite volumes
//! - [`Method::Ebt`]: escalator boxcar train
//! - [`Method::Cm`]: characteristic method with scheduled cohort introduction
//!
//! Biology is supplied through the [`Model`] trait (per species) and the
//! [`Environment`] trait (shared feedback). The [`Solver`] owns the packed
//! state buffer, the environment and the cohort schedule, and advances time
//! with an adaptive Runge–Kutta stepper.
//!
//! Species records are described by a [`Layout`] and read through an
//! [`IteratorSet`]; environments integrate over the population with the
//! quadrature methods of [`Population`].

mod control;
mod error;
mod iterator_set;
mod layout;
mod method;
mod model;
mod observer;
mod ode;
mod population;
mod solver;
mod species;

pub mod schedule;

pub use control::{Control, ControlError};
pub use error::{ConfigError, Error, IntegrationError, InvariantError, LookupError};
pub use iterator_set::IteratorSet;
pub use layout::{Field, Layout};
pub use method::Method;
pub use model::{Environment, Model};
pub use observer::{Action, Event, Observer, Status};
pub use population::{Population, Scope, trapezium};
pub use schedule::{ScheduleConfig, ScheduleError, cohort_schedule, default_cohort_schedule};
pub use solver::Solver;
pub use species::{Mesh, Species};
