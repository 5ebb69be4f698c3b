//! The species collection and the rate and quadrature routines over it.
//!
//! A [`Population`] is what an [`Environment`](crate::Environment) sees while
//! it is being recomputed: it knows how each species' segment of a state
//! buffer is laid out and can integrate weighted densities over it.

mod cm;
mod ebt;
mod fmu;
mod quadrature;

pub use quadrature::{Scope, trapezium};

use crate::{
    control::Control,
    error::{InvariantError, LookupError},
    method::Method,
    model::Model,
    species::Species,
};

/// Every species of a solver, sharing one method and one control.
#[derive(Debug, Clone)]
pub struct Population<M> {
    method: Method,
    control: Control,
    species: Vec<Species<M>>,
}

impl<M> Population<M> {
    pub(crate) fn new(method: Method, control: Control) -> Self {
        Self {
            method,
            control,
            species: Vec::new(),
        }
    }

    /// Returns the discretization method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Returns the numerical controls.
    #[must_use]
    pub fn control(&self) -> &Control {
        &self.control
    }

    /// Returns all species in segment order.
    #[must_use]
    pub fn species(&self) -> &[Species<M>] {
        &self.species
    }

    /// Returns species `k`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::UnknownSpecies`] if `k` is out of range.
    pub fn get_species(&self, k: usize) -> Result<&Species<M>, LookupError> {
        self.species.get(k).ok_or(LookupError::UnknownSpecies(k))
    }

    /// Returns the number of species.
    #[must_use]
    pub fn n_species(&self) -> usize {
        self.species.len()
    }

    /// Total number of scalars across all species segments.
    #[must_use]
    pub fn state_len(&self) -> usize {
        self.species.iter().map(Species::size).sum()
    }

    /// Largest trait value present in `state` over all species.
    ///
    /// Returns negative infinity for an empty population.
    #[must_use]
    pub fn max_size(&self, state: &[f64]) -> f64 {
        self.species
            .iter()
            .map(|sp| sp.max_size(state))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub(crate) fn get_species_mut(&mut self, k: usize) -> Result<&mut Species<M>, LookupError> {
        self.species.get_mut(k).ok_or(LookupError::UnknownSpecies(k))
    }

    pub(crate) fn species_mut(&mut self) -> &mut [Species<M>] {
        &mut self.species
    }

    pub(crate) fn push(&mut self, species: Species<M>) {
        self.species.push(species);
    }

    /// Recomputes segment start indices and returns the total state length.
    pub(crate) fn pack(&mut self) -> usize {
        let mut start = 0;
        for sp in &mut self.species {
            sp.set_start_index(start);
            start += sp.size();
        }
        start
    }

    /// Checks that `state` and `rates` match the species segments.
    pub(crate) fn check_shapes(&self, state: &[f64], rates: &[f64]) -> Result<(), InvariantError> {
        if state.len() != rates.len() {
            return Err(InvariantError::RatesMismatch {
                state: state.len(),
                rates: rates.len(),
            });
        }
        let expected = self.state_len();
        if expected != state.len() {
            return Err(InvariantError::SegmentMismatch {
                expected,
                actual: state.len(),
            });
        }
        Ok(())
    }

    /// Evaluates the rates of every species at `(t, state)`.
    ///
    /// The environment must already have been computed for `t` and `state`.
    /// Every entry of `rates` is overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer lengths disagree with the species
    /// segments.
    pub fn calc_rates<E>(
        &self,
        t: f64,
        state: &[f64],
        rates: &mut [f64],
        env: &E,
    ) -> Result<(), InvariantError>
    where
        M: Model<E>,
    {
        self.check_shapes(state, rates)?;
        self.rates_unchecked(t, state, rates, env);
        Ok(())
    }

    /// Rate evaluation for buffers already known to match the layout.
    pub(crate) fn rates_unchecked<E>(&self, t: f64, state: &[f64], rates: &mut [f64], env: &E)
    where
        M: Model<E>,
    {
        for sp in &self.species {
            let range = sp.segment();
            let segment = &state[range.clone()];
            let out = &mut rates[range];
            match self.method {
                Method::Fmu => fmu::rates(sp, t, segment, out, env),
                Method::Ebt => ebt::rates(sp, &self.control, t, segment, out, env),
                Method::Cm => cm::rates(sp, &self.control, t, segment, out, env),
            }
        }
    }
}

/// Zeroes the extra rates of a record and lets the model fill them.
fn extra_rates<M, E>(sp: &Species<M>, x: f64, t: f64, env: &E, record: &[f64], out: &mut [f64])
where
    M: Model<E>,
{
    let extras = sp.layout().extra_range();
    if extras.is_empty() {
        return;
    }
    let out = &mut out[extras.clone()];
    out.fill(0.0);
    sp.model().calc_rates_extra(x, t, env, &record[extras], out);
}
