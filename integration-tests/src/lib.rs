//! Test doubles for end-to-end solver runs.
//!
//! - [`reference`]: a single-resource competition model with a smooth
//!   weighting kernel, used for regression values.
//! - [`linear`]: constant rates with known analytic solutions.
//! - [`canopy`]: a light-competition model with extra state variables and an
//!   environment built from `integrate_wudx_above`.

pub mod canopy;
pub mod linear;
pub mod reference;
