//! Fixed-mesh upwind rates.
//!
//! Cell `a` (ascending) with edges `x_a, x_{a+1}`, width `h_a` and centre
//! `X_a` evolves as
//!
//! ```text
//! du_a/dt = -(g(x_{a+1}) u_a - F_a) / h_a - μ(X_a) u_a
//! F_0 = B,   F_a = g(x_a) u_{a-1}
//! ```
//!
//! Records run from the largest cell down, so cell `a` is record `n - 1 - a`.

use crate::{model::Model, species::Species};

use super::extra_rates;

pub(super) fn rates<M, E>(sp: &Species<M>, t: f64, segment: &[f64], out: &mut [f64], env: &E)
where
    M: Model<E>,
{
    let Some(mesh) = sp.mesh() else {
        return;
    };
    let model = sp.model();
    let width = sp.width();
    let n = mesh.len();

    let mut flux_in = sp.boundary_flux(t, env);
    for a in 0..n {
        let at = (n - 1 - a) * width;
        let record = &segment[at..at + width];
        let u = record[0];
        let x = mesh.centres()[a];

        let g_out = model.growth_rate(mesh.edges()[a + 1], t, env);
        let mu = model.mortality_rate(x, t, env);
        out[at] = -(g_out * u - flux_in) / mesh.widths()[a] - mu * u;
        flux_in = g_out * u;

        extra_rates(sp, x, t, env, record, &mut out[at..at + width]);
    }
}
