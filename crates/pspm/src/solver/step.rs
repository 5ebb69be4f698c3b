use tracing::debug;

use crate::{
    error::{Error, IntegrationError},
    model::{Environment, Model},
    observer::{Action, Event, Observer, Status},
    ode::Outcome,
};

use super::Solver;

impl<M, E> Solver<M, E>
where
    M: Model<E>,
    E: Environment<M>,
{
    /// Advances the solution to time `t`.
    ///
    /// Equivalent to [`step_to_observed`](Self::step_to_observed) with no
    /// observer.
    ///
    /// # Errors
    ///
    /// See [`step_to_observed`](Self::step_to_observed).
    pub fn step_to(&mut self, t: f64) -> Result<(), Error> {
        self.step_to_observed(t, ()).map(|_| ())
    }

    /// Advances the solution to time `t`, reporting progress to `observer`.
    ///
    /// # Algorithm
    ///
    /// 1. Collect the mandatory stops: scheduled introduction times in
    ///    `(current_time, t]`, then `t`. Without a schedule, `t` itself is an
    ///    introduction time.
    /// 2. For each stop, integrate adaptively up to it, then introduce
    ///    cohorts if the stop is an introduction time.
    /// 3. At `t`, recompute the environment and append `∫ β u dx` to every
    ///    species' output birth flux history.
    ///
    /// Calling with `t == current_time` does nothing.
    ///
    /// # Observer
    ///
    /// The observer receives [`Event::SubStep`] after every accepted sub-step
    /// and [`Event::CohortIntroduced`] after each insertion. Returning
    /// [`Action::StopEarly`] ends the call with [`Status::StoppedByObserver`];
    /// histories are not appended in that case.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::BackwardTime`] if `t` lies before the
    /// current time, and the other integration errors if the adaptive stepper
    /// cannot reach a stop. The state and time are then those of the last
    /// accepted sub-step.
    pub fn step_to_observed<O>(&mut self, t: f64, mut observer: O) -> Result<Status, Error>
    where
        O: Observer<Event, Action>,
    {
        let current = self.current_time;
        if t.is_nan() || t < current {
            return Err(IntegrationError::BackwardTime { current, target: t }.into());
        }
        if t == current {
            return Ok(Status::Complete);
        }

        for (stop, introduce) in self.stops(t) {
            debug!(from = self.current_time, to = stop, introduce, "integrating interval");
            if self.integrate_until(stop, &mut observer)? == Outcome::Stopped {
                return Ok(Status::StoppedByObserver);
            }
            if introduce && self.introduce_cohorts(&mut observer)? == Outcome::Stopped {
                return Ok(Status::StoppedByObserver);
            }
        }

        self.compute_env(t);
        for k in 0..self.n_species() {
            let flux = self.birth_flux_out(k);
            self.population.species_mut()[k].push_birth_flux_out(flux);
        }
        Ok(Status::Complete)
    }

    /// Mandatory stops in `(current_time, t]`, each flagged with whether
    /// cohorts are introduced there.
    fn stops(&self, t: f64) -> Vec<(f64, bool)> {
        let Some(schedule) = &self.schedule else {
            return vec![(t, true)];
        };

        let mut stops: Vec<(f64, bool)> = schedule
            .iter()
            .filter(|&&s| s > self.current_time && s <= t)
            .map(|&s| (s, true))
            .collect();
        if stops.last().is_none_or(|&(s, _)| s < t) {
            stops.push((t, false));
        }
        stops
    }

    /// Integrates the state up to `stop` without applying events.
    fn integrate_until<O>(&mut self, stop: f64, observer: &mut O) -> Result<Outcome, Error>
    where
        O: Observer<Event, Action>,
    {
        let Self {
            population,
            env,
            state,
            current_time,
            stepper,
            ..
        } = self;
        let population = &*population;

        let outcome = stepper.integrate(
            current_time,
            state,
            stop,
            |t, y, dydt| {
                env.compute_env(t, y, population);
                population.rates_unchecked(t, y, dydt, env);
            },
            |time, step_size| {
                let event = Event::SubStep { time, step_size };
                matches!(observer.observe(&event), Some(Action::StopEarly))
            },
        )?;
        Ok(outcome)
    }
}
