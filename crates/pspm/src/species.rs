//! A single species: its record layout, segment bounds and bookkeeping.
//!
//! Records are stored in decreasing trait order. Per method:
//!
//! - FMU: one `[u, extras…]` record per mesh cell, largest cell first.
//! - EBT: internal cohorts `[X, u, extras…]` followed by the boundary cohort
//!   `[pi0, N0, extras…]`, which is always the last record.
//! - CM: one `[X, u, extras…]` record per cohort; `u` may hold `ln u`.

mod mesh;

pub use mesh::Mesh;
pub(crate) use mesh::{grid, validate_traits};

use std::ops::Range;

use crate::{
    error::{ConfigError, InvariantError},
    iterator_set::IteratorSet,
    layout::Layout,
    method::Method,
    model::Model,
};

/// Method-specific data kept alongside the state.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MethodData {
    /// The fixed mesh.
    Fmu(Mesh),
    /// Bins of the initial cohorts; the boundary cohort starts empty.
    Ebt(Mesh),
    /// Initial cohort positions, ascending.
    Cm(Vec<f64>),
}

/// A species in a [`Population`](crate::Population).
#[derive(Debug, Clone)]
pub struct Species<M> {
    method: Method,
    layout: Layout,
    data: MethodData,
    start_index: usize,
    len: usize,
    xb: f64,
    xm: f64,
    is_resident: bool,
    birth_flux_in: f64,
    birth_flux_out_history: Vec<f64>,
    bfin_is_u0in: bool,
    model: M,
}

impl<M> Species<M> {
    /// Creates a species from ascending initial trait values.
    ///
    /// FMU and EBT read `traits` as bin breaks, CM as cohort positions.
    pub(crate) fn new(
        method: Method,
        traits: &[f64],
        model: M,
        extra_names: &[&str],
        birth_flux_in: f64,
    ) -> Result<Self, ConfigError> {
        if traits.len() < method.min_traits() {
            return Err(ConfigError::TooFewTraits {
                method,
                required: method.min_traits(),
                given: traits.len(),
            });
        }
        validate_traits(traits)?;

        let data = match method {
            Method::Fmu => MethodData::Fmu(Mesh::from_breaks(traits)),
            Method::Ebt => MethodData::Ebt(Mesh::from_breaks(traits)),
            Method::Cm => MethodData::Cm(traits.to_vec()),
        };

        let mut species = Self {
            method,
            layout: Layout::new(),
            data,
            start_index: 0,
            len: 0,
            xb: traits[0],
            xm: traits[traits.len() - 1],
            is_resident: true,
            birth_flux_in,
            birth_flux_out_history: Vec::new(),
            bfin_is_u0in: false,
            model,
        };
        species.set_i_state_variables(extra_names)?;
        species.len = species.initial_len();
        Ok(species)
    }

    /// Registers the core variables of the method followed by `extra_names`.
    ///
    /// Returns the record width.
    pub(crate) fn set_i_state_variables(&mut self, extra_names: &[&str]) -> Result<usize, ConfigError> {
        let mut layout = Layout::new();
        for name in self.method.core_variables() {
            layout.push_scalar(name)?;
        }
        layout.seal_core();
        for name in extra_names {
            layout.push_scalar(name)?;
        }

        let width = layout.width();
        self.layout = layout;
        Ok(width)
    }

    /// Record count right after a reset.
    fn initial_len(&self) -> usize {
        match &self.data {
            MethodData::Fmu(mesh) => mesh.len(),
            MethodData::Ebt(mesh) => mesh.len() + 1,
            MethodData::Cm(traits) => traits.len(),
        }
    }

    /// Returns the discretization method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Returns the record layout.
    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Number of records `J` (including the EBT boundary cohort).
    #[must_use]
    pub fn xsize(&self) -> usize {
        self.len
    }

    /// Number of scalars in the species segment.
    #[must_use]
    pub fn size(&self) -> usize {
        self.len * self.layout.width()
    }

    /// Scalars per record.
    #[must_use]
    pub fn width(&self) -> usize {
        self.layout.width()
    }

    /// Variable names in record order.
    #[must_use]
    pub fn varnames(&self) -> Vec<&str> {
        self.layout.names().collect()
    }

    /// Lower bound of the trait domain.
    #[must_use]
    pub fn xb(&self) -> f64 {
        self.xb
    }

    /// Upper trait bound as of when the species was added.
    ///
    /// This is a snapshot and is never refreshed as cohorts grow; use
    /// [`max_size`](Self::max_size) for the live value.
    #[must_use]
    pub fn xm(&self) -> f64 {
        self.xm
    }

    /// Returns whether the species feeds into environment quadrature.
    #[must_use]
    pub fn is_resident(&self) -> bool {
        self.is_resident
    }

    /// Marks the species as resident (or as an invader when `false`).
    pub fn set_resident(&mut self, resident: bool) {
        self.is_resident = resident;
    }

    /// Offset of the species segment in the state buffer.
    #[must_use]
    pub fn start_index(&self) -> usize {
        self.start_index
    }

    /// Sets the input birth flux.
    pub fn set_input_birth_flux(&mut self, flux: f64) {
        self.birth_flux_in = flux;
    }

    /// Returns the input birth flux.
    #[must_use]
    pub fn input_birth_flux(&self) -> f64 {
        self.birth_flux_in
    }

    /// Interprets the input birth flux as a boundary density `u0` when `true`.
    pub fn set_bfin_is_u0in(&mut self, flag: bool) {
        self.bfin_is_u0in = flag;
    }

    /// Returns whether the input birth flux is a boundary density.
    #[must_use]
    pub fn bfin_is_u0in(&self) -> bool {
        self.bfin_is_u0in
    }

    /// Realized output birth flux, one entry per completed `step_to`.
    #[must_use]
    pub fn birth_flux_out_history(&self) -> &[f64] {
        &self.birth_flux_out_history
    }

    /// Returns the model.
    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Returns the model mutably, e.g. to change parameters between steps.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Returns the fixed mesh of an FMU species.
    #[must_use]
    pub fn mesh(&self) -> Option<&Mesh> {
        match &self.data {
            MethodData::Fmu(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Builds synchronized cursors over this species' segment of `buffer`.
    ///
    /// # Errors
    ///
    /// Returns an error if `buffer` ends before the segment does.
    pub fn iterators<'a>(&'a self, buffer: &'a [f64]) -> Result<IteratorSet<'a>, InvariantError> {
        IteratorSet::new(buffer, &self.layout, self.start_index, self.len)
    }

    /// Largest trait value present in `state`, or `xb` when there is none.
    #[must_use]
    pub fn max_size(&self, state: &[f64]) -> f64 {
        let Some(segment) = state.get(self.segment()) else {
            return self.xb;
        };
        let width = self.width();

        match &self.data {
            MethodData::Fmu(mesh) => mesh.centres().last().copied().unwrap_or(self.xb),
            MethodData::Ebt(_) if self.len > 1 => segment[0],
            MethodData::Ebt(_) => match segment.get(..width) {
                Some(boundary) => self.boundary_size(boundary[0], boundary[1]),
                None => self.xb,
            },
            MethodData::Cm(_) => segment.first().copied().unwrap_or(self.xb),
        }
    }

    /// Mean trait value of an EBT boundary cohort.
    pub(crate) fn boundary_size(&self, pi0: f64, n0: f64) -> f64 {
        if n0 > 0.0 { self.xb + pi0 / n0 } else { self.xb }
    }

    pub(crate) fn data(&self) -> &MethodData {
        &self.data
    }

    pub(crate) fn segment(&self) -> Range<usize> {
        self.start_index..self.start_index + self.size()
    }

    pub(crate) fn set_start_index(&mut self, start: usize) {
        self.start_index = start;
    }

    pub(crate) fn set_len(&mut self, len: usize) {
        self.len = len;
    }

    pub(crate) fn push_birth_flux_out(&mut self, flux: f64) {
        self.birth_flux_out_history.push(flux);
    }

    pub(crate) fn clear_history(&mut self) {
        self.birth_flux_out_history.clear();
    }

    /// Restores the initial record count and returns the matching segment.
    ///
    /// Trait slots hold the initial positions; densities and extras are zero.
    pub(crate) fn reset_segment(&mut self) -> Vec<f64> {
        self.len = self.initial_len();
        let width = self.width();
        let mut segment = vec![0.0; self.size()];

        match &self.data {
            MethodData::Fmu(_) => {}
            MethodData::Ebt(mesh) => {
                for (record, x) in segment.chunks_exact_mut(width).zip(mesh.centres().iter().rev()) {
                    record[0] = *x;
                }
            }
            MethodData::Cm(traits) => {
                for (record, x) in segment.chunks_exact_mut(width).zip(traits.iter().rev()) {
                    record[0] = *x;
                }
            }
        }
        segment
    }

    /// Writes initial densities and extras into a freshly reset `segment`.
    pub(crate) fn initialize_segment<E>(
        &self,
        index: usize,
        segment: &mut [f64],
        t: f64,
        env: &E,
        use_log_densities: bool,
    ) -> Result<(), InvariantError>
    where
        M: Model<E>,
    {
        let width = self.width();
        let extras = self.layout.extra_range();

        for (i, record) in segment.chunks_exact_mut(width).enumerate() {
            let x = match &self.data {
                MethodData::Fmu(mesh) => {
                    let x = mesh.centres()[self.len - 1 - i];
                    record[0] = self.model.init_density(x, env);
                    x
                }
                MethodData::Ebt(mesh) if i + 1 < self.len => {
                    let bin = self.len - 2 - i;
                    let x = mesh.centres()[bin];
                    record[0] = x;
                    record[1] = self.model.init_density(x, env) * mesh.widths()[bin];
                    x
                }
                MethodData::Ebt(_) => {
                    record[0] = 0.0;
                    record[1] = 0.0;
                    self.xb
                }
                MethodData::Cm(_) => {
                    let x = record[0];
                    let u = self.model.init_density(x, env);
                    record[1] = if use_log_densities {
                        u.max(f64::MIN_POSITIVE).ln()
                    } else {
                        u
                    };
                    x
                }
            };

            self.write_extras(index, x, t, env, &mut record[extras.clone()])?;
        }
        Ok(())
    }

    /// Fills `extras` with `init_state_extra(x)`, checking its length.
    pub(crate) fn write_extras<E>(
        &self,
        index: usize,
        x: f64,
        t: f64,
        env: &E,
        extras: &mut [f64],
    ) -> Result<(), InvariantError>
    where
        M: Model<E>,
    {
        let values = self.model.init_state_extra(x, t, env);
        if values.len() != extras.len() {
            return Err(InvariantError::ExtraStateLength {
                species: index,
                expected: extras.len(),
                actual: values.len(),
            });
        }
        extras.copy_from_slice(&values);
        Ok(())
    }

    /// Boundary flux `B(t)` entering at `xb`.
    pub(crate) fn boundary_flux<E>(&self, t: f64, env: &E) -> f64
    where
        M: Model<E>,
    {
        if self.bfin_is_u0in {
            self.birth_flux_in * self.model.growth_rate(self.xb, t, env)
        } else {
            self.birth_flux_in * self.model.establishment_probability(t, env)
        }
    }
}
