//! Weighted integrals of the density over the trait axis.
//!
//! | Method | Rule |
//! |---|---|
//! | FMU | midpoint: `Σ h_a w(X_a) u_a` |
//! | EBT | cohort sum `Σ w(X) u`, boundary cohort at its mean size |
//! | CM | trapezoid over ascending cohorts, interpolated at a threshold |
//!
//! Only resident species contribute unless [`Scope::IncludeInvaders`] is
//! requested.

use crate::{
    method::Method,
    species::{MethodData, Species},
};

use super::Population;

/// Which species a quadrature covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// Non-resident species integrate to zero.
    #[default]
    Residents,
    /// Every species is integrated.
    IncludeInvaders,
}

impl<M> Population<M> {
    /// Computes `∫ w(x, t) u(x) dx` over the whole domain of species `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k` is not a species index or `state` is shorter than the
    /// species segment.
    pub fn integrate_x<W>(&self, w: W, t: f64, state: &[f64], k: usize) -> f64
    where
        W: Fn(f64, f64) -> f64,
    {
        self.integrate_x_scoped(w, t, state, k, Scope::Residents)
    }

    /// [`integrate_x`](Self::integrate_x) with an explicit species scope.
    ///
    /// # Panics
    ///
    /// Panics if `k` is not a species index or `state` is shorter than the
    /// species segment.
    pub fn integrate_x_scoped<W>(&self, w: W, t: f64, state: &[f64], k: usize, scope: Scope) -> f64
    where
        W: Fn(f64, f64) -> f64,
    {
        self.integrate(&w, t, None, state, k, scope)
    }

    /// Computes `∫ w(x, t) u(x) dx` over trait values strictly above `threshold`.
    ///
    /// # Panics
    ///
    /// Panics if `k` is not a species index or `state` is shorter than the
    /// species segment.
    pub fn integrate_wudx_above<W>(&self, w: W, t: f64, threshold: f64, state: &[f64], k: usize) -> f64
    where
        W: Fn(f64, f64) -> f64,
    {
        self.integrate_wudx_above_scoped(w, t, threshold, state, k, Scope::Residents)
    }

    /// [`integrate_wudx_above`](Self::integrate_wudx_above) with an explicit
    /// species scope.
    ///
    /// # Panics
    ///
    /// Panics if `k` is not a species index or `state` is shorter than the
    /// species segment.
    pub fn integrate_wudx_above_scoped<W>(
        &self,
        w: W,
        t: f64,
        threshold: f64,
        state: &[f64],
        k: usize,
        scope: Scope,
    ) -> f64
    where
        W: Fn(f64, f64) -> f64,
    {
        self.integrate(&w, t, Some(threshold), state, k, scope)
    }

    fn integrate<W>(
        &self,
        w: &W,
        t: f64,
        threshold: Option<f64>,
        state: &[f64],
        k: usize,
        scope: Scope,
    ) -> f64
    where
        W: Fn(f64, f64) -> f64,
    {
        let sp = &self.species[k];
        if !sp.is_resident() && scope == Scope::Residents {
            return 0.0;
        }
        let segment = &state[sp.segment()];
        let above = |x: f64| threshold.is_none_or(|thr| x > thr);

        match (self.method, sp.data()) {
            (Method::Fmu, MethodData::Fmu(mesh)) => {
                let n = mesh.len();
                let width = sp.width();
                (0..n)
                    .filter(|&a| above(mesh.centres()[a]))
                    .map(|a| {
                        let x = mesh.centres()[a];
                        let u = segment[(n - 1 - a) * width];
                        mesh.widths()[a] * w(x, t) * u
                    })
                    .sum()
            }
            (Method::Ebt, _) => ebt_sum(sp, w, t, &above, segment),
            (Method::Cm, _) => {
                let log = self.control().use_log_densities();
                cm_trapezoid(sp, w, t, threshold, log, segment)
            }
            _ => 0.0,
        }
    }
}

fn ebt_sum<M, W, A>(sp: &Species<M>, w: &W, t: f64, above: &A, segment: &[f64]) -> f64
where
    W: Fn(f64, f64) -> f64,
    A: Fn(f64) -> bool,
{
    let width = sp.width();
    let len = sp.xsize();
    if len == 0 {
        return 0.0;
    }

    let mut total = 0.0;
    for record in segment.chunks_exact(width).take(len - 1) {
        let (x, u) = (record[0], record[1]);
        if above(x) {
            total += w(x, t) * u;
        }
    }

    let boundary = &segment[(len - 1) * width..];
    let (pi0, n0) = (boundary[0], boundary[1]);
    if n0 > 0.0 {
        let x = sp.boundary_size(pi0, n0);
        if above(x) {
            total += w(x, t) * n0;
        }
    }
    total
}

fn cm_trapezoid<M, W>(
    sp: &Species<M>,
    w: &W,
    t: f64,
    threshold: Option<f64>,
    log: bool,
    segment: &[f64],
) -> f64
where
    W: Fn(f64, f64) -> f64,
{
    let width = sp.width();
    let points = segment.chunks_exact(width).rev().map(|record| {
        let x = record[0];
        let u = if log { record[1].exp() } else { record[1] };
        (x, w(x, t) * u)
    });

    let mut total = 0.0;
    let mut prev: Option<(f64, f64)> = None;
    for (x1, f1) in points {
        if let Some((x0, f0)) = prev {
            match threshold {
                Some(thr) if x1 <= thr => {}
                Some(thr) if x0 <= thr => {
                    let f_thr = f0 + (f1 - f0) * (thr - x0) / (x1 - x0);
                    total += (x1 - thr) * (f_thr + f1) / 2.0;
                }
                _ => total += (x1 - x0) * (f0 + f1) / 2.0,
            }
        }
        prev = Some((x1, f1));
    }
    total
}

/// Trapezoid rule over sampled `(x, y)` pairs.
///
/// Extra samples in the longer slice are ignored.
#[must_use]
pub fn trapezium(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Control;
    use approx::assert_relative_eq;

    /// Three internal cohorts at 2.5, 1.5 and 0.5 plus a boundary cohort with
    /// `pi0 = 0.3`, `N0 = n0`.
    fn ebt_population(n0: f64) -> (Population<()>, Vec<f64>) {
        let mut population = Population::new(Method::Ebt, Control::default());
        let species = Species::new(Method::Ebt, &[0.0, 1.0, 2.0, 3.0], (), &[], 0.0).unwrap();
        population.push(species);
        population.pack();
        let state = vec![2.5, 1.0, 1.5, 2.0, 0.5, 4.0, 0.3, n0];
        (population, state)
    }

    #[test]
    fn ebt_counts_boundary_cohort_at_mean_size() {
        let (population, state) = ebt_population(2.0);
        let size = |x: f64, _t: f64| x;

        // 2.5 + 3.0 + 2.0, plus the boundary at x = 0.15 carrying N0 = 2.
        let whole = population.integrate_x(size, 0.0, &state, 0);
        assert_relative_eq!(whole, 7.8, max_relative = 1e-12);
        let above = population.integrate_wudx_above(size, 0.0, 0.1, &state, 0);
        assert_relative_eq!(above, 7.8, max_relative = 1e-12);
        let above = population.integrate_wudx_above(size, 0.0, 0.15, &state, 0);
        assert_relative_eq!(above, 7.5, max_relative = 1e-12);
    }

    #[test]
    fn ebt_threshold_is_strict() {
        let (population, state) = ebt_population(2.0);
        let size = |x: f64, _t: f64| x;

        let below = population.integrate_wudx_above(size, 0.0, 1.5 - 1e-9, &state, 0);
        assert_relative_eq!(below, 5.5, max_relative = 1e-12);
        let at = population.integrate_wudx_above(size, 0.0, 1.5, &state, 0);
        assert_relative_eq!(at, 2.5, max_relative = 1e-12);
        assert_eq!(population.integrate_wudx_above(size, 0.0, 3.0, &state, 0), 0.0);
    }

    #[test]
    fn empty_ebt_boundary_is_skipped() {
        let (population, state) = ebt_population(0.0);
        let one = |_: f64, _: f64| 1.0;

        let count = population.integrate_x(one, 0.0, &state, 0);
        assert_relative_eq!(count, 7.0, max_relative = 1e-12);
        let size = population.integrate_x(|x, _| x, 0.0, &state, 0);
        assert_relative_eq!(size, 7.5, max_relative = 1e-12);
    }

    #[test]
    fn trapezium_is_exact_for_lines() {
        let x = [0.0, 0.5, 2.0];
        let y = [1.0, 2.0, 5.0];
        assert_relative_eq!(trapezium(&x, &y), 6.0);
        assert_eq!(trapezium(&[1.0], &[1.0]), 0.0);
    }
}
