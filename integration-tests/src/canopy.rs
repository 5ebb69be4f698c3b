use pspm::{Environment, Model, Population};

/// Plants of height `x` that shade each other.
///
/// Extra state: cumulative `mortality` and `fecundity` of each cohort.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plant {
    pub max_height: f64,
    pub leaf_coefficient: f64,
}

impl Default for Plant {
    fn default() -> Self {
        Self {
            max_height: 5.0,
            leaf_coefficient: 0.2,
        }
    }
}

impl Plant {
    /// Extra state variable names, in record order.
    pub const EXTRAS: [&'static str; 2] = ["mortality", "fecundity"];

    #[must_use]
    pub fn leaf_area(&self, height: f64) -> f64 {
        self.leaf_coefficient * height * height
    }
}

impl Model<Canopy> for Plant {
    fn growth_rate(&self, x: f64, _t: f64, env: &Canopy) -> f64 {
        0.6 * env.openness(x) * (1.0 - x / self.max_height)
    }

    fn mortality_rate(&self, x: f64, _t: f64, env: &Canopy) -> f64 {
        0.05 + 0.3 * (1.0 - env.openness(x))
    }

    fn birth_rate(&self, x: f64, _t: f64, env: &Canopy) -> f64 {
        0.5 * x * env.openness(x)
    }

    fn init_density(&self, _x: f64, _env: &Canopy) -> f64 {
        0.0
    }

    fn establishment_probability(&self, _t: f64, env: &Canopy) -> f64 {
        env.openness(0.0)
    }

    fn init_state_extra(&self, _x: f64, _t: f64, _env: &Canopy) -> Vec<f64> {
        vec![0.0; Self::EXTRAS.len()]
    }

    fn calc_rates_extra(&self, x: f64, t: f64, env: &Canopy, _state: &[f64], rates: &mut [f64]) {
        rates[0] = self.mortality_rate(x, t, env);
        rates[1] = self.birth_rate(x, t, env);
    }
}

/// Canopy openness `exp(-k L(z))`, where `L(z)` is the leaf area above `z`.
///
/// Openness is tabulated on an even grid up to the tallest plant and
/// interpolated linearly in between.
#[derive(Debug, Clone, PartialEq)]
pub struct Canopy {
    pub extinction: f64,
    pub points: usize,
    plant: Plant,
    heights: Vec<f64>,
    openness: Vec<f64>,
}

impl Canopy {
    #[must_use]
    pub fn new(plant: Plant, extinction: f64, points: usize) -> Self {
        Self {
            extinction,
            points: points.max(2),
            plant,
            heights: Vec::new(),
            openness: Vec::new(),
        }
    }

    /// Fraction of light reaching height `z`.
    #[must_use]
    pub fn openness(&self, z: f64) -> f64 {
        let (Some(&first), Some(&top)) = (self.heights.first(), self.heights.last()) else {
            return 1.0;
        };
        if z >= top {
            return 1.0;
        }
        if z <= first {
            return self.openness[0];
        }

        let i = self.heights.partition_point(|&h| h <= z);
        let (h0, h1) = (self.heights[i - 1], self.heights[i]);
        let (o0, o1) = (self.openness[i - 1], self.openness[i]);
        o0 + (o1 - o0) * (z - h0) / (h1 - h0)
    }
}

impl<M> Environment<M> for Canopy {
    fn compute_env(&mut self, t: f64, state: &[f64], population: &Population<M>) {
        let top = population.max_size(state);
        self.heights.clear();
        self.openness.clear();
        if !(top > 0.0) {
            return;
        }

        let plant = self.plant;
        for i in 0..self.points {
            let z = top * (i as f64 / (self.points - 1) as f64);
            let leaf_area: f64 = (0..population.n_species())
                .map(|k| {
                    population.integrate_wudx_above(|x, _| plant.leaf_area(x), t, z, state, k)
                })
                .sum();
            self.heights.push(z);
            self.openness.push((-self.extinction * leaf_area).exp());
        }
    }

    fn eval_env(&self, x: f64, _t: f64) -> f64 {
        self.openness(x)
    }
}
