//! Escalator boxcar train rates.
//!
//! Internal cohorts move along characteristics: `dX/dt = g(X)` and
//! `du/dt = -μ(X) u`. The boundary cohort tracks the number `N0` of
//! individuals recruited since the last introduction and their first moment
//! `pi0 = ∫ (x - xb) u dx`, linearised around `xb`:
//!
//! ```text
//! dN0/dt  = -μ_b N0 - μ'_b pi0 + B
//! dpi0/dt =  g_b N0 + g'_b pi0 - μ_b pi0
//! ```
//!
//! The derivatives at `xb` are forward differences of width `ebt_grad_dx`.

use crate::{control::Control, model::Model, species::Species};

use super::extra_rates;

pub(super) fn rates<M, E>(
    sp: &Species<M>,
    control: &Control,
    t: f64,
    segment: &[f64],
    out: &mut [f64],
    env: &E,
) where
    M: Model<E>,
{
    let model = sp.model();
    let width = sp.width();
    let len = sp.xsize();
    if len == 0 {
        return;
    }

    for i in 0..len - 1 {
        let at = i * width;
        let record = &segment[at..at + width];
        let (x, u) = (record[0], record[1]);

        out[at] = model.growth_rate(x, t, env);
        out[at + 1] = -model.mortality_rate(x, t, env) * u;
        extra_rates(sp, x, t, env, record, &mut out[at..at + width]);
    }

    let at = (len - 1) * width;
    let record = &segment[at..at + width];
    let (pi0, n0) = (record[0], record[1]);
    let xb = sp.xb();
    let dx = control.ebt_grad_dx();

    let g_up = model.growth_rate(xb + dx, t, env);
    let mu_up = model.mortality_rate(xb + dx, t, env);
    let g_b = model.growth_rate(xb, t, env);
    let mu_b = model.mortality_rate(xb, t, env);
    let dg = (g_up - g_b) / dx;
    let dmu = (mu_up - mu_b) / dx;
    let b = sp.boundary_flux(t, env);

    out[at] = g_b * n0 + dg * pi0 - mu_b * pi0;
    out[at + 1] = -mu_b * n0 - dmu * pi0 + b;
    extra_rates(sp, sp.boundary_size(pi0, n0), t, env, record, &mut out[at..at + width]);
}
