use pspm::{Environment, Model, Population};

/// Smooth kernel: 1 below a third, 0 above two thirds, C¹ in between.
#[must_use]
pub fn competition_weight(z: f64) -> f64 {
    if z <= 1.0 / 3.0 {
        1.0
    } else if z <= 2.0 / 3.0 {
        (2.0 - 3.0 * z).powi(3) * (54.0 * z * z - 27.0 * z + 4.0)
    } else {
        0.0
    }
}

/// Individuals on `[0, 1]` competing for a single resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceModel;

impl Model<Competition> for ReferenceModel {
    fn growth_rate(&self, x: f64, _t: f64, env: &Competition) -> f64 {
        0.25 * (1.0 - x * x) / (1.0 + env.level * env.level)
    }

    fn mortality_rate(&self, _x: f64, _t: f64, env: &Competition) -> f64 {
        1.5 + 0.5 * env.level
    }

    fn birth_rate(&self, x: f64, _t: f64, env: &Competition) -> f64 {
        2.0 * x / (1.0 + env.level)
    }

    fn init_density(&self, x: f64, _env: &Competition) -> f64 {
        (1.0 - x).powi(2) / (1.0 + x).powi(4) + (1.0 - x) / (1.0 + x).powi(3)
    }
}

/// Total weighted density of all resident species.
#[derive(Debug, Clone, Copy, Default)]
pub struct Competition {
    pub level: f64,
}

impl<M> Environment<M> for Competition {
    fn compute_env(&mut self, t: f64, state: &[f64], population: &Population<M>) {
        self.level = (0..population.n_species())
            .map(|k| population.integrate_x(|x, _| competition_weight(x), t, state, k))
            .sum();
    }

    fn eval_env(&self, _x: f64, _t: f64) -> f64 {
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn weight_is_continuous() {
        assert_relative_eq!(competition_weight(1.0 / 3.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(competition_weight(2.0 / 3.0), 0.0, epsilon = 1e-12);
        assert_relative_eq!(competition_weight(0.5), 0.5, epsilon = 1e-12);
    }
}
