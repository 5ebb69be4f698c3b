//! Characteristic method rates.
//!
//! Each cohort follows `dX/dt = g(X)` and its density obeys
//! `du/dt = -(μ + ∂g/∂x) u`, or `d(ln u)/dt = -μ - ∂g/∂x` in log mode. The
//! growth gradient is a forward difference of width `cm_grad_dx`.

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
    let dx = control.cm_grad_dx();
    let log = control.use_log_densities();

    for i in 0..sp.xsize() {
        let at = i * width;
        let record = &segment[at..at + width];
        let (x, v) = (record[0], record[1]);

        let g_up = model.growth_rate(x + dx, t, env);
        let g = model.growth_rate(x, t, env);
        let mu = model.mortality_rate(x, t, env);
        let dg = (g_up - g) / dx;

        out[at] = g;
        out[at + 1] = if log { -mu - dg } else { -(mu + dg) * v };
        extra_rates(sp, x, t, env, record, &mut out[at..at + width]);
    }
}
