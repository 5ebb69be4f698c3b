//! The solver: owns the population, the state buffer and the environment.
//!
//! # Example
//!
//! ```ignore
//! use pspm::{Method, Solver};
//!
//! let mut solver = Solver::new(Method::Ebt, MyEnvironment::default());
//! solver.add_species_on_grid(25, 0.0, 1.0, false, MyModel, &[], 2.0)?;
//! solver.initialize()?;
//!
//! for i in 1..=100 {
//!     solver.step_to(0.1 * i as f64)?;
//! }
//! println!("{:?}", solver.u0_out());
//! ```

mod display;
mod introduce;
mod step;

use tracing::{debug, info};

use crate::{
    control::Control,
    error::{ConfigError, Error, LookupError},
    method::Method,
    model::{Environment, Model},
    ode::Stepper,
    population::{Population, Scope},
    species::{Species, grid},
};

/// Solves a physiologically structured population model.
///
/// `M` is the per-species model and `E` the shared environment.
#[derive(Debug, Clone)]
pub struct Solver<M, E> {
    population: Population<M>,
    env: E,
    state: Vec<f64>,
    rates: Vec<f64>,
    current_time: f64,
    schedule: Option<Vec<f64>>,
    stepper: Stepper,
}

impl<M, E> Solver<M, E> {
    /// Creates a solver with default controls and no species.
    pub fn new(method: Method, env: E) -> Self {
        Self::with_control(method, Control::default(), env)
    }

    /// Creates a solver with the given controls and no species.
    pub fn with_control(method: Method, control: Control, env: E) -> Self {
        Self {
            population: Population::new(method, control),
            env,
            state: Vec::new(),
            rates: Vec::new(),
            current_time: 0.0,
            schedule: None,
            stepper: Stepper::new(&control),
        }
    }

    /// Adds a species and resets the state. Returns the species index.
    ///
    /// FMU and EBT read `initial_traits` as ascending bin breaks (FMU needs at
    /// least two), CM as ascending cohort positions. `extra_names` declares
    /// the model's extra state variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the trait values are not finite and strictly
    /// increasing, if there are too few of them, or if an extra name clashes
    /// with another variable.
    pub fn add_species(
        &mut self,
        initial_traits: &[f64],
        model: M,
        extra_names: &[&str],
        input_birth_flux: f64,
    ) -> Result<usize, Error> {
        let method = self.method();
        let species = Species::new(method, initial_traits, model, extra_names, input_birth_flux)?;
        let index = self.population.n_species();
        info!(
            species = index,
            method = %method,
            records = species.xsize(),
            width = species.width(),
            "species added"
        );

        self.population.push(species);
        self.reset_state();
        Ok(index)
    }

    /// Adds a species on an evenly spaced grid over `[xb, xm]`.
    ///
    /// FMU and EBT get `j` bins (`j + 1` breaks), CM gets `j` cohorts. With
    /// `log_breaks` the spacing is uniform in `ln x`.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain is empty or non-finite, if `j` is zero,
    /// or if `log_breaks` is set with `xb <= 0`, plus the errors of
    /// [`add_species`](Self::add_species).
    #[allow(clippy::too_many_arguments)]
    pub fn add_species_on_grid(
        &mut self,
        j: usize,
        xb: f64,
        xm: f64,
        log_breaks: bool,
        model: M,
        extra_names: &[&str],
        input_birth_flux: f64,
    ) -> Result<usize, Error> {
        if j == 0 {
            return Err(ConfigError::InvalidDomain { xb, xm, points: 0 }.into());
        }
        let points = match self.method() {
            Method::Fmu | Method::Ebt => j + 1,
            Method::Cm => j,
        };
        let traits = grid(xb, xm, points, log_breaks)?;
        self.add_species(&traits, model, extra_names, input_birth_flux)
    }

    /// Restores every species to its initial records at `t = 0`.
    ///
    /// Densities and extras are zero until [`initialize`](Self::initialize)
    /// runs. Output birth flux histories are cleared.
    pub fn reset_state(&mut self) {
        let mut state = Vec::new();
        for sp in self.population.species_mut() {
            state.extend(sp.reset_segment());
            sp.clear_history();
        }
        self.population.pack();

        self.rates = vec![0.0; state.len()];
        self.state = state;
        self.current_time = 0.0;
        self.stepper = Stepper::new(self.population.control());
        debug!(len = self.state.len(), "state reset");
    }

    /// Replaces the environment.
    pub fn set_environment(&mut self, env: E) {
        self.env = env;
    }

    /// Sets the times at which cohorts are introduced.
    ///
    /// Without a schedule, every `step_to` call ends with an introduction.
    ///
    /// # Errors
    ///
    /// Returns an error if the times are not finite and non-decreasing.
    pub fn set_cohort_schedule(&mut self, times: Vec<f64>) -> Result<(), ConfigError> {
        let finite = times.iter().all(|t| t.is_finite());
        if !finite || times.windows(2).any(|w| w[0] > w[1]) {
            return Err(ConfigError::UnsortedSchedule);
        }
        self.schedule = Some(times);
        Ok(())
    }

    /// Removes the cohort schedule.
    pub fn clear_cohort_schedule(&mut self) {
        self.schedule = None;
    }

    /// Returns the cohort schedule, if any.
    #[must_use]
    pub fn cohort_schedule(&self) -> Option<&[f64]> {
        self.schedule.as_deref()
    }

    /// Returns the discretization method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.population.method()
    }

    /// Returns the numerical controls.
    #[must_use]
    pub fn control(&self) -> &Control {
        self.population.control()
    }

    /// Returns the population.
    #[must_use]
    pub fn population(&self) -> &Population<M> {
        &self.population
    }

    /// Returns species `k`.
    ///
    /// # Errors
    ///
    /// Returns an error if `k` is out of range.
    pub fn species(&self, k: usize) -> Result<&Species<M>, LookupError> {
        self.population.get_species(k)
    }

    /// Returns species `k` mutably, e.g. to set its input birth flux.
    ///
    /// # Errors
    ///
    /// Returns an error if `k` is out of range.
    pub fn species_mut(&mut self, k: usize) -> Result<&mut Species<M>, LookupError> {
        self.population.get_species_mut(k)
    }

    /// Returns the number of species.
    #[must_use]
    pub fn n_species(&self) -> usize {
        self.population.n_species()
    }

    /// Returns the environment.
    #[must_use]
    pub fn environment(&self) -> &E {
        &self.env
    }

    /// Returns the environment mutably.
    pub fn environment_mut(&mut self) -> &mut E {
        &mut self.env
    }

    /// Returns the concatenated state of all species.
    #[must_use]
    pub fn state(&self) -> &[f64] {
        &self.state
    }

    /// Returns the rates from the last [`update_rates`](Self::update_rates).
    #[must_use]
    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    /// Returns the current time.
    #[must_use]
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Largest trait value present in the state over all species.
    #[must_use]
    pub fn max_size(&self) -> f64 {
        self.population.max_size(&self.state)
    }

    fn require_method(&self, requested: Method) -> Result<(), ConfigError> {
        let active = self.method();
        if requested == active {
            Ok(())
        } else {
            Err(ConfigError::MethodMismatch { requested, active })
        }
    }
}

impl<M, E> Solver<M, E>
where
    M: Model<E>,
    E: Environment<M>,
{
    /// Resets the state, computes the environment and sets initial densities.
    ///
    /// EBT cohorts start with `init_density(X) * h`, CM cohorts with
    /// `init_density(X)` (or its log), FMU cells with `init_density` at the
    /// cell centre. Extras come from `init_state_extra`.
    ///
    /// # Errors
    ///
    /// Returns an error if a model returns extras of the wrong length.
    pub fn initialize(&mut self) -> Result<(), Error> {
        self.reset_state();
        let t = self.current_time;
        self.compute_env(t);

        let use_log = self.control().use_log_densities();
        for (k, sp) in self.population.species().iter().enumerate() {
            let segment = &mut self.state[sp.segment()];
            sp.initialize_segment(k, segment, t, &self.env, use_log)?;
        }

        info!(
            species = self.n_species(),
            len = self.state.len(),
            method = %self.method(),
            "solver initialized"
        );
        Ok(())
    }

    /// Recomputes the environment for time `t` over the current state.
    pub fn compute_env(&mut self, t: f64) {
        self.env.compute_env(t, &self.state, &self.population);
    }

    /// Recomputes the environment and the rates at time `t`.
    ///
    /// # Errors
    ///
    /// Returns an error if the state and rates buffers have drifted apart.
    pub fn update_rates(&mut self, t: f64) -> Result<(), Error> {
        self.compute_env(t);
        self.population
            .calc_rates(t, &self.state, &mut self.rates, &self.env)?;
        Ok(())
    }

    /// Fixed-mesh upwind rates of `state` at `t` into `rates`.
    ///
    /// The environment must already be computed for `t`.
    ///
    /// # Errors
    ///
    /// Returns an error if the solver does not use FMU or the buffers do not
    /// match the species layout.
    pub fn calc_rates_fmu(&self, t: f64, state: &[f64], rates: &mut [f64]) -> Result<(), Error> {
        self.calc_rates_for(Method::Fmu, t, state, rates)
    }

    /// Escalator boxcar train rates of `state` at `t` into `rates`.
    ///
    /// The environment must already be computed for `t`.
    ///
    /// # Errors
    ///
    /// Returns an error if the solver does not use EBT or the buffers do not
    /// match the species layout.
    pub fn calc_rates_ebt(&self, t: f64, state: &[f64], rates: &mut [f64]) -> Result<(), Error> {
        self.calc_rates_for(Method::Ebt, t, state, rates)
    }

    /// Characteristic method rates of `state` at `t` into `rates`.
    ///
    /// The environment must already be computed for `t`.
    ///
    /// # Errors
    ///
    /// Returns an error if the solver does not use CM or the buffers do not
    /// match the species layout.
    pub fn calc_rates_cm(&self, t: f64, state: &[f64], rates: &mut [f64]) -> Result<(), Error> {
        self.calc_rates_for(Method::Cm, t, state, rates)
    }

    fn calc_rates_for(&self, method: Method, t: f64, state: &[f64], rates: &mut [f64]) -> Result<(), Error> {
        self.require_method(method)?;
        self.population.calc_rates(t, state, rates, &self.env)?;
        Ok(())
    }

    /// Boundary density each species would produce from its own offspring.
    ///
    /// For species `k` this is `∫ β u dx / g(xb)` at the current time, or 0
    /// when the growth rate at `xb` is not positive. Invaders are included.
    pub fn u0_out(&mut self) -> Vec<f64> {
        let t = self.current_time;
        self.compute_env(t);

        (0..self.n_species())
            .map(|k| {
                let sp = &self.population.species()[k];
                let g = sp.model().growth_rate(sp.xb(), t, &self.env);
                if g > 0.0 {
                    self.birth_flux_out(k) / g
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// `∫ β u dx` of species `k` at the current time and environment.
    fn birth_flux_out(&self, k: usize) -> f64 {
        let model = self.population.species()[k].model();
        let env = &self.env;
        self.population.integrate_x_scoped(
            |x, t| model.birth_rate(x, t, env),
            self.current_time,
            &self.state,
            k,
            Scope::IncludeInvaders,
        )
    }
}
