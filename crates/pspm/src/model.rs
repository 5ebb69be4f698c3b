use crate::population::Population;

/// Demographic rates of one species, evaluated against an environment `E`.
///
/// All rates take the trait value `x`, the time `t` and the environment, and
/// must be deterministic for identical inputs so that rate evaluation is
/// idempotent.
///
/// `Model` is implemented for `&T`, so a solver can borrow a model that lives
/// elsewhere by using `Solver<&MyModel, _>`.
pub trait Model<E> {
    /// Individual growth rate `g(x, t, E)`.
    fn growth_rate(&self, x: f64, t: f64, env: &E) -> f64;

    /// Per-capita mortality rate `μ(x, t, E)`.
    fn mortality_rate(&self, x: f64, t: f64, env: &E) -> f64;

    /// Per-capita fecundity `β(x, t, E)`.
    fn birth_rate(&self, x: f64, t: f64, env: &E) -> f64;

    /// Initial density at trait value `x`.
    fn init_density(&self, x: f64, env: &E) -> f64;

    /// Fraction of newborns that establish at time `t`.
    fn establishment_probability(&self, _t: f64, _env: &E) -> f64 {
        1.0
    }

    /// Initial values of the extra state variables for a cohort at `x`.
    ///
    /// The returned length must match the number of extra names the species
    /// was registered with.
    fn init_state_extra(&self, _x: f64, _t: f64, _env: &E) -> Vec<f64> {
        Vec::new()
    }

    /// Writes the rates of the extra state variables of a cohort at `x`.
    ///
    /// `rates` is zeroed before the call.
    fn calc_rates_extra(&self, _x: f64, _t: f64, _env: &E, _state: &[f64], _rates: &mut [f64]) {}
}

impl<E, T> Model<E> for &T
where
    T: Model<E> + ?Sized,
{
    fn growth_rate(&self, x: f64, t: f64, env: &E) -> f64 {
        (**self).growth_rate(x, t, env)
    }

    fn mortality_rate(&self, x: f64, t: f64, env: &E) -> f64 {
        (**self).mortality_rate(x, t, env)
    }

    fn birth_rate(&self, x: f64, t: f64, env: &E) -> f64 {
        (**self).birth_rate(x, t, env)
    }

    fn init_density(&self, x: f64, env: &E) -> f64 {
        (**self).init_density(x, env)
    }

    fn establishment_probability(&self, t: f64, env: &E) -> f64 {
        (**self).establishment_probability(t, env)
    }

    fn init_state_extra(&self, x: f64, t: f64, env: &E) -> Vec<f64> {
        (**self).init_state_extra(x, t, env)
    }

    fn calc_rates_extra(&self, x: f64, t: f64, env: &E, state: &[f64], rates: &mut [f64]) {
        (**self).calc_rates_extra(x, t, env, state, rates);
    }
}

/// The population-level feedback shared by every species.
///
/// The solver calls [`compute_env`](Environment::compute_env) before every rate
/// evaluation, passing the buffer being evaluated (which is not necessarily the
/// solver's committed state). Implementations typically integrate over the
/// population with [`Population::integrate_x`] and friends.
pub trait Environment<M> {
    /// Recomputes the environment for time `t` and state `state`.
    fn compute_env(&mut self, t: f64, state: &[f64], population: &Population<M>);

    /// Evaluates the environment at trait value `x`.
    fn eval_env(&self, x: f64, t: f64) -> f64;
}

/// A constant, empty environment.
impl<M> Environment<M> for () {
    fn compute_env(&mut self, _t: f64, _state: &[f64], _population: &Population<M>) {}

    fn eval_env(&self, _x: f64, _t: f64) -> f64 {
        0.0
    }
}
