//! Cohort introduction at mandatory stops.
//!
//! - EBT: the boundary cohort becomes an internal cohort at its mean size
//!   and a fresh, empty boundary cohort is appended.
//! - CM: a cohort at `xb` with density `B / g(xb)` is appended.
//! - FMU: nothing is inserted; inflow enters through the rates.

use tracing::{debug, warn};

use crate::{
    error::Error,
    method::Method,
    model::{Environment, Model},
    observer::{Action, Event, Observer},
    ode::Outcome,
};

use super::Solver;

impl<M, E> Solver<M, E>
where
    M: Model<E>,
    E: Environment<M>,
{
    /// Inserts one record per species at the current time.
    pub(super) fn introduce_cohorts<O>(&mut self, observer: &mut O) -> Result<Outcome, Error>
    where
        O: Observer<Event, Action>,
    {
        let method = self.method();
        if method == Method::Fmu {
            return Ok(Outcome::Reached);
        }

        let t = self.current_time;
        self.compute_env(t);

        // Every record is built before any segment moves, so a failure leaves
        // the state untouched.
        let records = (0..self.n_species())
            .map(|k| self.new_record(k, t))
            .collect::<Result<Vec<_>, _>>()?;

        // Back to front, so earlier segments keep their start index.
        for (k, record) in records.into_iter().enumerate().rev() {
            let sp = &self.population.species()[k];
            let end = sp.segment().end;
            let width = sp.width();

            if method == Method::Ebt {
                let boundary = end - width;
                let (pi0, n0) = (self.state[boundary], self.state[boundary + 1]);
                self.state[boundary] = sp.boundary_size(pi0, n0);
                debug!(species = k, t, x = self.state[boundary], u = n0, "boundary cohort promoted");
            }

            self.state.splice(end..end, record);
            self.rates.splice(end..end, std::iter::repeat_n(0.0, width));
            let sp = &mut self.population.species_mut()[k];
            sp.set_len(sp.xsize() + 1);
        }
        self.population.pack();

        for species in 0..self.n_species() {
            let event = Event::CohortIntroduced { time: t, species };
            if let Some(Action::StopEarly) = observer.observe(&event) {
                return Ok(Outcome::Stopped);
            }
        }
        Ok(Outcome::Reached)
    }

    /// The record appended to species `k` at time `t`.
    fn new_record(&self, k: usize, t: f64) -> Result<Vec<f64>, Error> {
        let sp = &self.population.species()[k];
        let xb = sp.xb();
        let mut record = vec![0.0; sp.width()];

        if self.method() == Method::Cm {
            let g = sp.model().growth_rate(xb, t, &self.env);
            let b = sp.boundary_flux(t, &self.env);
            let u = if g > 0.0 {
                b / g
            } else {
                warn!(species = k, t, g, "non-positive growth at xb; new cohort is empty");
                0.0
            };

            record[0] = xb;
            record[1] = if self.control().use_log_densities() {
                u.max(f64::MIN_POSITIVE).ln()
            } else {
                u
            };
            debug!(species = k, t, u, "cohort added");
        }

        let extras = sp.layout().extra_range();
        sp.write_extras(k, xb, t, &self.env, &mut record[extras])?;
        Ok(record)
    }
}
