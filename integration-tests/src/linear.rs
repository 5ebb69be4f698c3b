use pspm::Model;

/// Constant growth, mortality and fecundity, independent of any environment.
///
/// With inflow `B` the steady state is `u(x) = B / g * exp(-μ x / g)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearModel {
    pub growth: f64,
    pub mortality: f64,
    pub fecundity: f64,
    pub density: f64,
}

impl LinearModel {
    /// A model in which nothing changes.
    #[must_use]
    pub fn frozen(density: f64) -> Self {
        Self {
            growth: 0.0,
            mortality: 0.0,
            fecundity: 0.0,
            density,
        }
    }
}

impl<E> Model<E> for LinearModel {
    fn growth_rate(&self, _x: f64, _t: f64, _env: &E) -> f64 {
        self.growth
    }

    fn mortality_rate(&self, _x: f64, _t: f64, _env: &E) -> f64 {
        self.mortality
    }

    fn birth_rate(&self, _x: f64, _t: f64, _env: &E) -> f64 {
        self.fecundity
    }

    fn init_density(&self, _x: f64, _env: &E) -> f64 {
        self.density
    }
}

/// Wraps a model so that mortality turns non-finite after `fail_after`.
#[derive(Debug, Clone, Copy)]
pub struct Poisoned<M> {
    pub inner: M,
    pub fail_after: f64,
}

impl<M, E> Model<E> for Poisoned<M>
where
    M: Model<E>,
{
    fn growth_rate(&self, x: f64, t: f64, env: &E) -> f64 {
        self.inner.growth_rate(x, t, env)
    }

    fn mortality_rate(&self, x: f64, t: f64, env: &E) -> f64 {
        if t > self.fail_after {
            f64::NAN
        } else {
            self.inner.mortality_rate(x, t, env)
        }
    }

    fn birth_rate(&self, x: f64, t: f64, env: &E) -> f64 {
        self.inner.birth_rate(x, t, env)
    }

    fn init_density(&self, x: f64, env: &E) -> f64 {
        self.inner.init_density(x, env)
    }
}
